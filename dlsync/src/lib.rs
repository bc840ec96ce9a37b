use std::{cmp, fmt, time};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod action;
pub mod cache;
pub mod config;
pub mod diff;
pub mod loc;
pub mod normalize;
pub mod oauth;
pub mod path;
pub mod report;
pub mod snapshot;
pub mod storage;
pub mod transfer;

mod error;

pub use crate::action::{Action, Direction};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::snapshot::{Entry, Snapshot};

/// The type of a namespace entry
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    File,
    Directory,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::File => "FILE",
            Kind::Directory => "DIRECTORY",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare two modification times.
/// `lhs` is only `Greater` if it is newer than `rhs` by more than `tol`.
/// Symmetrically for `Less`.
pub fn compare_mtime(lhs: DateTime<Utc>, rhs: DateTime<Utc>, tol: time::Duration) -> cmp::Ordering {
    let Ok(tol) = chrono::Duration::from_std(tol) else {
        return cmp::Ordering::Equal;
    };
    // out of range bounds lie beyond any representable time
    let lower = lhs.checked_add_signed(tol).is_some_and(|l| l < rhs);
    let upper = lhs.checked_sub_signed(tol).is_some_and(|u| u > rhs);
    if lower {
        cmp::Ordering::Less
    } else if upper {
        cmp::Ordering::Greater
    } else {
        cmp::Ordering::Equal
    }
}

/// Convert epoch milliseconds, as reported by the remote store.
pub fn mtime_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
