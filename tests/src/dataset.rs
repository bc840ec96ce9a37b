use std::time::{Duration, SystemTime, UNIX_EPOCH};

use camino::Utf8Path;
use dlsync::path::{self, Component};
use futures::future::BoxFuture;
use tokio::io::AsyncWriteExt;

mod build {
    #[derive(Debug, Copy, Clone)]
    pub enum Entry {
        Dir {
            /// Name of the directory
            name: &'static str,
            /// Entries of the directory
            entries: &'static [Entry],
        },
        File {
            /// Name of the file
            name: &'static str,
            /// Content of the file
            content: &'static str,
            /// Age of the file in seconds
            age: u32,
        },
    }

    #[rustfmt::skip]
    pub const LOCAL: &[Entry] = &[
        Entry::File{name: "only-local.txt", content: "/only-local.txt", age: 100},
        Entry::File{name: "both.txt", content: "/both.txt", age: 100},
        Entry::File{name: "newer-local.txt", content: "/newer-local.txt - local", age: 10},
        Entry::File{name: "newer-remote.txt", content: "/newer-remote.txt - local", age: 100},
        Entry::File{name: "data.csv", content: "/data.csv", age: 100},
        Entry::Dir{name: "only-local", entries: &[
            Entry::File{name: "file1.txt", content: "/only-local/file1.txt", age: 100},
            Entry::Dir{name: "deep", entries: &[
                Entry::File{name: "file1.txt", content: "/only-local/deep/file1.txt", age: 100},
            ]},
        ]},
        Entry::Dir{name: "both", entries: &[
            Entry::File{name: "both.txt", content: "/both/both.txt", age: 100},
            Entry::File{name: "only-local.txt", content: "/both/only-local.txt", age: 100},
            Entry::Dir{name: "deep", entries: &[
                Entry::File{name: "file1.txt", content: "/both/deep/file1.txt - local", age: 10},
            ]},
        ]},
    ];

    #[rustfmt::skip]
    pub const REMOTE: &[Entry] = &[
        Entry::File{name: "only-remote.txt", content: "/only-remote.txt", age: 100},
        Entry::File{name: "both.txt", content: "/both.txt", age: 100},
        Entry::File{name: "newer-local.txt", content: "/newer-local.txt - remote", age: 100},
        Entry::File{name: "newer-remote.txt", content: "/newer-remote.txt - remote", age: 10},
        Entry::File{name: "data.csv.bak", content: "/data.csv.bak", age: 100},
        Entry::Dir{name: "only-remote", entries: &[
            Entry::File{name: "file1.txt", content: "/only-remote/file1.txt", age: 100},
            Entry::Dir{name: "deep", entries: &[
                Entry::File{name: "file1.txt", content: "/only-remote/deep/file1.txt", age: 100},
            ]},
        ]},
        Entry::Dir{name: "both", entries: &[
            Entry::File{name: "both.txt", content: "/both/both.txt", age: 100},
            Entry::File{name: "only-remote.txt", content: "/both/only-remote.txt", age: 100},
            Entry::Dir{name: "deep", entries: &[
                Entry::File{name: "file1.txt", content: "/both/deep/file1.txt - remote", age: 100},
            ]},
        ]},
    ];
}

#[derive(Debug, Clone)]
pub enum Entry {
    Dir {
        name: String,
        entries: Vec<Entry>,
    },
    File {
        name: String,
        content: String,
        age: u32,
    },
}

impl Entry {
    pub fn dir(name: &str, entries: Vec<Entry>) -> Self {
        Entry::Dir {
            name: name.into(),
            entries,
        }
    }

    pub fn file(name: &str, age: u32) -> Self {
        Entry::File {
            name: name.into(),
            content: name.into(),
            age,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Dir { name, .. } => name,
            Entry::File { name, .. } => name,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Entry::File { content, .. } => Some(content.as_str()),
            _ => None,
        }
    }

    pub fn age(&self) -> Option<u32> {
        match self {
            Entry::File { age, .. } => Some(*age),
            _ => None,
        }
    }
}

impl From<build::Entry> for Entry {
    fn from(e: build::Entry) -> Self {
        match e {
            build::Entry::Dir { name, entries } => Entry::Dir {
                name: name.into(),
                entries: entries.iter().map(|e| (*e).into()).collect(),
            },
            build::Entry::File { name, content, age } => Entry::File {
                name: name.into(),
                content: content.into(),
                age,
            },
        }
    }
}

fn resolve_entry<'a>(entries: &'a mut [Entry], path: &str) -> Option<&'a mut Entry> {
    let names: Vec<&str> = path::components(path)
        .filter_map(|comp| match comp {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect();
    let (last, parents) = names.split_last()?;

    let mut entries = entries;
    for name in parents {
        match entries.iter_mut().find(|e| e.name() == *name)? {
            Entry::Dir {
                entries: children, ..
            } => entries = children,
            Entry::File { .. } => return None,
        }
    }
    entries.iter_mut().find(|e| e.name() == *last)
}

#[test]
fn test_resolve_entry() {
    let mut entries = build::LOCAL.iter().map(|e| (*e).into()).collect::<Vec<_>>();
    {
        let resolved = resolve_entry(&mut entries, "/only-local.txt").expect("Expected an entry");
        assert_eq!("only-local.txt", resolved.name());
        assert_eq!(Some("/only-local.txt"), resolved.content());
    }

    {
        let resolved =
            resolve_entry(&mut entries, "/both/deep/file1.txt").expect("Expected an entry");
        assert_eq!("file1.txt", resolved.name());
        assert_eq!(Some(10), resolved.age());
    }

    {
        let resolved = resolve_entry(&mut entries, "/both/deep").expect("Expected an entry");
        assert!(matches!(resolved, Entry::Dir { .. }));
    }

    assert!(resolve_entry(&mut entries, "/only-remote.txt").is_none());
}

pub struct Dataset {
    pub local: Vec<Entry>,
    pub remote: Vec<Entry>,
    /// Time the file ages are counted from, whole seconds
    pub mtime_ref: SystemTime,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            local: build::LOCAL.iter().map(|e| (*e).into()).collect(),
            remote: build::REMOTE.iter().map(|e| (*e).into()).collect(),
            mtime_ref: now_secs(),
        }
    }
}

/// Now, truncated to the second, so local and remote mtimes compare exactly
fn now_secs() -> SystemTime {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Clock before epoch");
    UNIX_EPOCH + Duration::from_secs(since_epoch.as_secs())
}

impl Dataset {
    pub fn new(local: Vec<Entry>, remote: Vec<Entry>) -> Self {
        Self {
            local,
            remote,
            mtime_ref: now_secs(),
        }
    }

    pub fn with_mtime_ref(mut self, mtime: SystemTime) -> Self {
        self.mtime_ref = mtime;
        self
    }

    pub fn apply_local(mut self, patch: Patch) -> Self {
        patch.apply(&mut self.local);
        self
    }

    pub fn apply_remote(mut self, patch: Patch) -> Self {
        patch.apply(&mut self.remote);
        self
    }

    /// Modification time of an entry of the given age
    pub fn mtime(&self, age: u32) -> SystemTime {
        self.mtime_ref - Duration::from_secs(age as u64)
    }
}

pub enum Patch {
    Age(&'static str, u32),
    Delete(&'static str),
}

impl Patch {
    pub fn apply(self, root_entries: &mut Vec<Entry>) {
        match self {
            Patch::Age(path, new_age) => match resolve_entry(root_entries, path) {
                Some(Entry::File { age, .. }) => {
                    *age = new_age;
                }
                _ => panic!("Expected a file entry"),
            },
            Patch::Delete(path) => {
                let (parent_path, file_name) = path.rsplit_once('/').expect("Expected a parent");
                let parent_entries = if parent_path.is_empty() {
                    root_entries
                } else {
                    match resolve_entry(root_entries, parent_path) {
                        Some(Entry::Dir { entries, .. }) => entries,
                        _ => panic!("Expected a directory as parent entry"),
                    }
                };
                let prev_len = parent_entries.len();
                parent_entries.retain(|e| e.name() != file_name);
                assert!(
                    prev_len == parent_entries.len() + 1,
                    "Expected to delete an entry"
                );
            }
        }
    }
}

#[test]
fn test_patch_apply() {
    let dataset = Dataset::default()
        .apply_local(Patch::Age("/only-local.txt", 42))
        .apply_local(Patch::Delete("/only-local"))
        .apply_local(Patch::Delete("/both/deep/file1.txt"));
    let mut entries = dataset.local;

    assert_eq!(
        Some(42),
        resolve_entry(&mut entries, "/only-local.txt")
            .unwrap()
            .age()
    );
    assert!(resolve_entry(&mut entries, "/only-local").is_none());
    assert!(resolve_entry(&mut entries, "/both/deep/file1.txt").is_none());
    assert!(resolve_entry(&mut entries, "/both/deep").is_some());
}

impl Entry {
    /// Create the entry under the local directory `path`
    pub fn create_fs<'a>(&'a self, path: &'a Utf8Path, now: SystemTime) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            match self {
                Entry::Dir { name, entries } => {
                    let path = path.join(name);
                    tokio::fs::create_dir(&path).await.unwrap();
                    for entry in entries.iter() {
                        entry.create_fs(&path, now).await;
                    }
                }
                Entry::File { name, content, age } => {
                    let path = path.join(name);
                    let mut f = tokio::fs::File::create(&path).await.unwrap();
                    f.write_all(content.as_bytes()).await.unwrap();
                    f.flush().await.unwrap();
                    let f = f.into_std().await;
                    let age = Duration::from_secs(*age as u64);
                    f.set_modified(now - age).unwrap();
                }
            }
        })
    }
}

impl Dataset {
    /// Write the local side of the dataset under `root`, which must exist
    pub async fn create_local(&self, root: &Utf8Path) {
        for entry in self.local.iter() {
            entry.create_fs(root, self.mtime_ref).await;
        }
    }
}
