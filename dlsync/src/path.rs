//! Path helpers shared by both sides of a sync.
//!
//! Accessors report native paths: the local accessor uses `./` prefixed
//! paths, the remote accessor absolute paths under the store root.
//! The canonical form used for matching is root-relative, without leading
//! `./` or `/`.
//!
//! `/` is the only separator on every host. Both accessors join names with
//! it, and `\` is a legal file name character locally and in the store.
use std::borrow::Cow;
use std::fmt;

pub const SEPARATOR: char = '/';
pub const SEPARATOR_STR: &str = "/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component<'a> {
    RootDir,
    CurDir,
    ParentDir,
    Normal(&'a str),
}

impl<'a> Component<'a> {
    pub fn as_str(self) -> &'a str {
        match self {
            Component::RootDir => SEPARATOR_STR,
            Component::CurDir => ".",
            Component::ParentDir => "..",
            Component::Normal(comp) => comp,
        }
    }
}

/// Iterate the components of `path`. Repeated separators are collapsed.
pub fn components(path: &str) -> impl Iterator<Item = Component<'_>> {
    let root = path.starts_with(SEPARATOR).then_some(Component::RootDir);
    let body = path.split(SEPARATOR).filter_map(|comp| match comp {
        "" => None,
        "." => Some(Component::CurDir),
        ".." => Some(Component::ParentDir),
        _ => Some(Component::Normal(comp)),
    });
    root.into_iter().chain(body)
}

/// Join a native directory path and a child name.
pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_owned()
    } else if base.ends_with(SEPARATOR) {
        format!("{base}{name}")
    } else {
        format!("{base}{SEPARATOR}{name}")
    }
}

/// The last normal component of `path`, if any.
pub fn file_name(path: &str) -> Option<&str> {
    match components(path).last() {
        Some(Component::Normal(name)) => Some(name),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeError {
    pub path: String,
    pub reason: &'static str,
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.path)
    }
}

impl std::error::Error for NormalizeError {}

impl From<NormalizeError> for crate::Error {
    fn from(value: NormalizeError) -> Self {
        crate::Error::ambiguous(value.path, value.reason)
    }
}

fn significant(path: &str) -> impl Iterator<Item = Component<'_>> {
    components(path).filter(|c| !matches!(c, Component::RootDir | Component::CurDir))
}

/// Express the native `path` relative to the native `root`.
///
/// Prefix matching works on whole components: `/data/pro` is not a prefix of
/// `/data/project/a`. Leading `/` and `./` markers are not significant.
pub fn relative_to(path: &str, root: &str) -> Result<String, NormalizeError> {
    let mut comps = significant(path);
    for root_comp in significant(root) {
        match comps.next() {
            Some(comp) if comp == root_comp => (),
            _ => {
                return Err(NormalizeError {
                    path: path.to_owned(),
                    reason: "Path is outside of the synchronized root",
                })
            }
        }
    }

    let mut rel = String::with_capacity(path.len());
    for comp in comps {
        match comp {
            Component::Normal(name) => {
                if !rel.is_empty() {
                    rel.push(SEPARATOR);
                }
                rel.push_str(name);
            }
            _ => {
                return Err(NormalizeError {
                    path: path.to_owned(),
                    reason: "Path can't be normalized",
                })
            }
        }
    }
    Ok(rel)
}

/// Reattach a root-relative path to a native root.
pub fn to_native(root: &str, rel: &str) -> String {
    if rel.is_empty() {
        return root.to_owned();
    }
    join(root, rel)
}

/// The key two relative paths are matched on.
pub fn match_key(rel: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(rel)
    } else {
        Cow::Owned(rel.to_lowercase())
    }
}
