//! Snapshot persistence.
use camino::{Utf8Path, Utf8PathBuf};

use crate::{
    config::PatternList,
    snapshot::{Snapshot, SnapshotBuilder},
    storage::DirEntries,
    Result,
};

/// A snapshot saved as JSON on disk
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: Utf8PathBuf,
}

impl SnapshotCache {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub async fn load(&self) -> Result<Snapshot> {
        let json = tokio::fs::read(&self.path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&json)
            .map_err(|err| crate::cache_error!("{}: {err}", self.path))?;
        log::info!(
            "loaded snapshot of {} files from {}",
            snapshot.file_count(),
            self.path
        );
        Ok(snapshot)
    }

    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, json).await?;
        log::info!("saved snapshot to {}", self.path);
        Ok(())
    }
}

/// Where a snapshot comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Always list the namespace, then refresh the cache
    #[default]
    Refresh,
    /// Use the cache if it loads, list the namespace otherwise
    PreferCache,
}

/// Load or build a snapshot of `storage` according to `policy`.
pub async fn snapshot<S>(
    storage: &S,
    ignore: &PatternList,
    cache: &SnapshotCache,
    policy: CachePolicy,
) -> Result<Snapshot>
where
    S: DirEntries + Sync,
{
    if policy == CachePolicy::PreferCache {
        if cache.exists() {
            match cache.load().await {
                Ok(snapshot) => return Ok(snapshot),
                Err(err) if err.is_malformed_cache() => {
                    log::warn!("{err}, rebuilding the snapshot");
                }
                Err(err) => return Err(err),
            }
        } else {
            log::info!("no snapshot cached at {}", cache.path());
        }
    }

    let snapshot = SnapshotBuilder::new(storage).ignore(ignore).build().await?;
    cache.save(&snapshot).await?;
    Ok(snapshot)
}
