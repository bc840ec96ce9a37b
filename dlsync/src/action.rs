use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Kind;

/// Direction of a transfer
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Local only, copied to the remote store
    Upload,
    /// Remote only, copied to the local directory
    Download,
    /// Local is newer, replaces the remote file
    UploadOverwrite,
    /// Remote is newer or as recent, replaces the local file
    DownloadOverwrite,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Upload,
        Direction::Download,
        Direction::UploadOverwrite,
        Direction::DownloadOverwrite,
    ];

    pub fn is_upload(self) -> bool {
        matches!(self, Direction::Upload | Direction::UploadOverwrite)
    }

    pub fn is_overwrite(self) -> bool {
        matches!(
            self,
            Direction::UploadOverwrite | Direction::DownloadOverwrite
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Upload => "UPLOAD",
            Direction::Download => "DOWNLOAD",
            Direction::UploadOverwrite => "UPLOAD_OVERWRITE",
            Direction::DownloadOverwrite => "DOWNLOAD_OVERWRITE",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file to transfer, identified by its root-relative path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Relative path, as spelled on the local side when it exists there
    pub path: String,
    pub kind: Kind,
    pub direction: Direction,
    /// Size of the file on the side the data comes from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Relative path on the remote side, when it is spelled differently
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
}

impl Action {
    pub fn new(path: impl Into<String>, kind: Kind, direction: Direction) -> Self {
        Action {
            path: path.into(),
            kind,
            direction,
            size: None,
            remote_path: None,
        }
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    /// Record the remote spelling of the path if it differs from the local one
    pub fn with_remote_path(mut self, remote_path: &str) -> Self {
        self.remote_path = (remote_path != self.path).then(|| remote_path.to_owned());
        self
    }

    /// The relative path to use on the remote side
    pub fn remote_path(&self) -> &str {
        self.remote_path.as_deref().unwrap_or(&self.path)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.path)
    }
}
