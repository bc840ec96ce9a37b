//! Snapshot: a fully materialized, timestamped listing of one side of a sync.
use chrono::{DateTime, Utc};
use futures::{future::BoxFuture, StreamExt};
use serde::{ser::SerializeStruct, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    config::PatternList,
    path,
    storage::{DirEntries, Metadata},
    Kind, Result,
};

/// A file or directory node of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    path: String,
    kind: Kind,
    mtime: DateTime<Utc>,
    size: Option<u64>,
    children: Vec<Entry>,
}

impl Entry {
    pub fn file(path: impl Into<String>, size: u64, mtime: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            kind: Kind::File,
            mtime,
            size: Some(size),
            children: Vec::new(),
        }
    }

    pub fn directory(path: impl Into<String>, mtime: DateTime<Utc>, children: Vec<Entry>) -> Self {
        Self {
            path: path.into(),
            kind: Kind::Directory,
            mtime,
            size: None,
            children,
        }
    }

    fn from_metadata(metadata: Metadata, children: Vec<Entry>) -> Self {
        Self {
            path: metadata.path,
            kind: metadata.kind,
            mtime: metadata.mtime,
            size: metadata.size,
            children,
        }
    }

    /// Native path of the entry
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        path::file_name(&self.path).unwrap_or("")
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn mtime(&self) -> DateTime<Utc> {
        self.mtime
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn children(&self) -> &[Entry] {
        &self.children
    }

    pub fn is_dir(&self) -> bool {
        self.kind == Kind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == Kind::File
    }

    /// Number of files in this entry, itself included
    pub fn file_count(&self) -> usize {
        match self.kind {
            Kind::File => 1,
            Kind::Directory => self.children.iter().map(Entry::file_count).sum(),
        }
    }
}

// Persisted shape of an entry. Directories carry `contents`, files `length`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    name: String,
    #[serde(rename = "type")]
    kind: Kind,
    /// Epoch milliseconds
    modification_time: i64,
    length: Option<u64>,
    contents: Option<Vec<Entry>>,
}

impl TryFrom<RawEntry> for Entry {
    type Error = String;

    fn try_from(raw: RawEntry) -> std::result::Result<Self, Self::Error> {
        let mtime = crate::mtime_from_millis(raw.modification_time)
            .ok_or_else(|| format!("invalid modificationTime for {}", raw.name))?;
        match raw.kind {
            Kind::File => {
                let size = raw
                    .length
                    .ok_or_else(|| format!("file {} has no length", raw.name))?;
                Ok(Entry::file(raw.name, size, mtime))
            }
            Kind::Directory => {
                let children = raw
                    .contents
                    .ok_or_else(|| format!("directory {} has no contents", raw.name))?;
                Ok(Entry::directory(raw.name, mtime, children))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawEntry::deserialize(deserializer)?;
        Entry::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Entry {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = serializer.serialize_struct("Entry", 4)?;
        st.serialize_field("name", &self.path)?;
        st.serialize_field("type", &self.kind)?;
        st.serialize_field("modificationTime", &self.mtime.timestamp_millis())?;
        match self.kind {
            Kind::File => st.serialize_field("length", &self.size.unwrap_or(0))?,
            Kind::Directory => st.serialize_field("contents", &self.children)?,
        }
        st.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(with = "chrono::serde::ts_seconds")]
    captured_at: DateTime<Utc>,
    root: Vec<Entry>,
}

impl Snapshot {
    pub fn new(captured_at: DateTime<Utc>, root: Vec<Entry>) -> Self {
        Self { captured_at, root }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Top level entries
    pub fn root(&self) -> &[Entry] {
        &self.root
    }

    pub fn file_count(&self) -> usize {
        self.root.iter().map(Entry::file_count).sum()
    }
}

/// Recursively captures a [Snapshot] through an accessor.
///
/// Directories are listed one at a time, and every directory is fully
/// listed before the snapshot is returned.
pub struct SnapshotBuilder<'a, S> {
    storage: &'a S,
    ignore: Option<&'a PatternList>,
    captured_at: Option<DateTime<Utc>>,
}

impl<'a, S> SnapshotBuilder<'a, S>
where
    S: DirEntries + Sync,
{
    pub fn new(storage: &'a S) -> Self {
        Self {
            storage,
            ignore: None,
            captured_at: None,
        }
    }

    /// Skip entries whose root-relative path matches one of `patterns`
    pub fn ignore(mut self, patterns: &'a PatternList) -> Self {
        self.ignore = Some(patterns);
        self
    }

    pub fn captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = Some(captured_at);
        self
    }

    pub async fn build(&self) -> Result<Snapshot> {
        let captured_at = self.captured_at.unwrap_or_else(Utc::now);
        let root = self.storage.root().to_owned();
        log::info!("capturing snapshot of {root}");
        let entries = self.walk(root.clone()).await?;
        let snapshot = Snapshot::new(captured_at, entries);
        log::info!("captured {} files under {root}", snapshot.file_count());
        Ok(snapshot)
    }

    fn walk(&self, dir_path: String) -> BoxFuture<'_, Result<Vec<Entry>>> {
        Box::pin(async move {
            let mut listed = Vec::new();
            {
                let dirent = self.storage.dir_entries(&dir_path);
                tokio::pin!(dirent);
                while let Some(metadata) = dirent.next().await {
                    let metadata = metadata?;
                    if self.is_ignored(&metadata)? {
                        log::debug!("ignoring {}", metadata.path);
                        continue;
                    }
                    listed.push(metadata);
                }
            }
            listed.sort_unstable_by(|a, b| a.name().cmp(b.name()));

            let mut entries = Vec::with_capacity(listed.len());
            for metadata in listed {
                let children = if metadata.is_dir() {
                    self.walk(metadata.path.clone()).await?
                } else {
                    Vec::new()
                };
                entries.push(Entry::from_metadata(metadata, children));
            }
            Ok(entries)
        })
    }

    fn is_ignored(&self, metadata: &Metadata) -> Result<bool> {
        match self.ignore {
            Some(patterns) if !patterns.is_empty() => {
                let rel = path::relative_to(&metadata.path, self.storage.root())?;
                Ok(patterns.matches(&rel))
            }
            _ => Ok(false),
        }
    }
}
