use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use futures::Stream;
use async_stream::try_stream;
use tokio::fs::{self, DirEntry};
use tokio::io;

use super::Metadata;
use crate::{path, Error, Result};

/// Native root of the local namespace.
/// Local paths are reported relative to the sync directory, e.g. `./dir/a.txt`.
pub const LOCAL_ROOT: &str = ".";

/// Local file system accessor
#[derive(Debug, Clone)]
pub struct FileSystem {
    root: Utf8PathBuf,
}

impl FileSystem {
    /// Build a new filesystem accessor rooted at `root`.
    /// Fails if `root` does not exist or is not a directory.
    pub fn new<P>(root: P) -> Result<Self>
    where
        P: AsRef<Utf8Path>,
    {
        let root = root.as_ref();
        let root = root
            .canonicalize_utf8()
            .map_err(|err| Error::unavailable(root, err))?;
        if !root.is_dir() {
            return Err(Error::unavailable(root, "not a directory"));
        }
        log::info!("Initializing FS storage in {root}");

        Ok(FileSystem { root })
    }

    pub fn root_dir(&self) -> &Utf8Path {
        &self.root
    }

    /// The file system path of a native local path
    pub fn fs_path(&self, native: &str) -> Result<Utf8PathBuf> {
        let rel = path::relative_to(native, LOCAL_ROOT)?;
        Ok(self.root.join(rel))
    }
}

impl super::DirEntries for FileSystem {
    fn root(&self) -> &str {
        LOCAL_ROOT
    }

    fn dir_entries(&self, parent_path: &str) -> impl Stream<Item = Result<Metadata>> + Send {
        let parent_path = parent_path.to_owned();
        let fs_base = self.fs_path(&parent_path);
        try_stream! {
            let fs_base = fs_base?;
            log::trace!("listing entries of {fs_base}");
            let mut read_dir = fs::read_dir(&fs_base)
                .await
                .map_err(|err| Error::unavailable(&fs_base, err))?;
            loop {
                let direntry = read_dir
                    .next_entry()
                    .await
                    .map_err(|err| Error::unavailable(&fs_base, err))?;
                match direntry {
                    None => break,
                    Some(direntry) => {
                        if let Some(metadata) = map_direntry(&parent_path, &direntry).await? {
                            yield metadata;
                        }
                    }
                }
            }
        }
    }
}

async fn map_direntry(parent_path: &str, direntry: &DirEntry) -> Result<Option<Metadata>> {
    let Ok(file_name) = String::from_utf8(direntry.file_name().into_encoded_bytes()) else {
        log::warn!(
            "skipping non UTF-8 file name in {parent_path}: {}",
            direntry.file_name().to_string_lossy()
        );
        return Ok(None);
    };
    let path = path::join(parent_path, &file_name);

    // symlinks are followed
    let metadata = match fs::metadata(direntry.path()).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log::debug!("skipping dangling symlink {path}");
            return Ok(None);
        }
        Err(err) => return Err(Error::unavailable(&path, err)),
    };
    let mtime: DateTime<Utc> = metadata.modified()?.into();

    if metadata.is_file() {
        Ok(Some(Metadata::file(path, metadata.len(), mtime)))
    } else if metadata.is_dir() {
        Ok(Some(Metadata::directory(path, mtime)))
    } else {
        log::debug!("skipping special file {path}");
        Ok(None)
    }
}
