//! Mapping of actions to transfer calls.
//!
//! Moving bytes is left to a [Transfer] implementation.
use camino::{Utf8Path, Utf8PathBuf};
use futures::Future;

use crate::{
    action::{Action, Direction},
    path, Result,
};

/// One file transfer, with both native paths resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCall {
    pub direction: Direction,
    pub local: Utf8PathBuf,
    pub remote: String,
    pub size: Option<u64>,
}

/// Ordered transfer calls: uploads first, then downloads.
#[derive(Debug, Clone, Default)]
pub struct TransferPlan {
    calls: Vec<TransferCall>,
}

impl TransferPlan {
    pub fn new(actions: &[Action], local_root: &Utf8Path, remote_root: &str) -> Self {
        let mut uploads: Vec<&Action> = actions.iter().filter(|a| a.direction.is_upload()).collect();
        let mut downloads: Vec<&Action> =
            actions.iter().filter(|a| !a.direction.is_upload()).collect();
        uploads.sort_by(|a, b| (a.kind, &a.path).cmp(&(b.kind, &b.path)));
        downloads.sort_by(|a, b| (a.kind, &a.path).cmp(&(b.kind, &b.path)));

        let calls = uploads
            .into_iter()
            .chain(downloads)
            .map(|action| TransferCall {
                direction: action.direction,
                local: local_root.join(&action.path),
                remote: path::to_native(remote_root, action.remote_path()),
                size: action.size,
            })
            .collect();
        Self { calls }
    }

    pub fn calls(&self) -> &[TransferCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

pub trait Transfer {
    /// Copy the local file `local` to the remote file `remote`
    fn upload(&self, local: &Utf8Path, remote: &str) -> impl Future<Output = Result<()>> + Send;

    /// Copy the remote file `remote` to the local file `local`
    fn download(&self, remote: &str, local: &Utf8Path) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub uploaded: usize,
    pub downloaded: usize,
    pub bytes: u64,
}

/// Run every call of `plan` in order. The first failure stops the run.
pub async fn execute<T>(plan: &TransferPlan, transfer: &T) -> Result<TransferStats>
where
    T: Transfer,
{
    let mut stats = TransferStats::default();
    for call in plan.calls() {
        if call.direction.is_upload() {
            transfer.upload(&call.local, &call.remote).await?;
            stats.uploaded += 1;
        } else {
            transfer.download(&call.remote, &call.local).await?;
            stats.downloaded += 1;
        }
        stats.bytes += call.size.unwrap_or(0);
    }
    log::info!(
        "{} files uploaded, {} files downloaded",
        stats.uploaded,
        stats.downloaded
    );
    Ok(stats)
}

/// Logs the calls without transferring anything
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRun;

impl Transfer for DryRun {
    async fn upload(&self, local: &Utf8Path, remote: &str) -> Result<()> {
        log::info!("dry run: upload {local} to {remote}");
        Ok(())
    }

    async fn download(&self, remote: &str, local: &Utf8Path) -> Result<()> {
        log::info!("dry run: download {remote} to {local}");
        Ok(())
    }
}
