//! Namespace accessors.
//!
//! An accessor lists the direct children of a directory of its namespace.
//! The snapshot walk is the same for every accessor.
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::{Kind, Result};

pub mod adls;
pub mod fs;

/// One listed child, as reported by an accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Native path of the entry
    pub path: String,
    pub kind: Kind,
    pub mtime: DateTime<Utc>,
    /// Size in bytes, files only
    pub size: Option<u64>,
}

impl Metadata {
    pub fn file(path: impl Into<String>, size: u64, mtime: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            kind: Kind::File,
            mtime,
            size: Some(size),
        }
    }

    pub fn directory(path: impl Into<String>, mtime: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            kind: Kind::Directory,
            mtime,
            size: None,
        }
    }

    pub fn name(&self) -> &str {
        crate::path::file_name(&self.path).unwrap_or("")
    }

    pub fn is_dir(&self) -> bool {
        self.kind == Kind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == Kind::File
    }
}

pub trait DirEntries {
    /// The native path of the namespace root
    fn root(&self) -> &str;

    /// List the direct children of the native directory `parent_path`.
    /// The stream fails with [`crate::Error::NamespaceUnavailable`] if
    /// the directory cannot be listed.
    fn dir_entries(&self, parent_path: &str) -> impl Stream<Item = Result<Metadata>> + Send;
}
