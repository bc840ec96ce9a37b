//! Normalized trees: snapshots re-keyed by root-relative paths.
use chrono::{DateTime, Utc};

use crate::{
    path,
    snapshot::{Entry, Snapshot},
    storage::fs::LOCAL_ROOT,
    Error, Kind, Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    rel_path: String,
    key: String,
    kind: Kind,
    mtime: DateTime<Utc>,
    size: Option<u64>,
    children: Vec<Node>,
}

impl Node {
    /// Path relative to the synchronized root, e.g. `dir/a.txt`
    pub fn rel_path(&self) -> &str {
        &self.rel_path
    }

    pub fn name(&self) -> &str {
        path::file_name(&self.rel_path).unwrap_or("")
    }

    /// The key this node is matched on against the other side
    pub fn key(&self) -> &str {
        &self.key
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

    /// Children, sorted by key
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn is_dir(&self) -> bool {
        self.kind == Kind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == Kind::File
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTree {
    root: String,
    captured_at: DateTime<Utc>,
    children: Vec<Node>,
}

impl NormalizedTree {
    /// Native root the tree was normalized from
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Top level nodes, sorted by key
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Native path of a root-relative path of this tree
    pub fn native_path(&self, rel_path: &str) -> String {
        path::to_native(&self.root, rel_path)
    }

    /// Every node as `(relative path, kind)`, parents before their children.
    pub fn flatten(&self) -> Vec<(String, Kind)> {
        let mut flat = Vec::new();
        let mut stack: Vec<&Node> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            flat.push((node.rel_path.clone(), node.kind));
            stack.extend(node.children.iter().rev());
        }
        flat
    }
}

/// Strips a native root prefix from snapshot paths.
#[derive(Debug, Clone)]
pub struct Normalizer {
    root: String,
    case_sensitive: bool,
}

impl Normalizer {
    pub fn new(root: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            root: root.into(),
            case_sensitive,
        }
    }

    /// Normalizer of local snapshots (`./` prefixed paths)
    pub fn local(case_sensitive: bool) -> Self {
        Self::new(LOCAL_ROOT, case_sensitive)
    }

    /// Normalizer of remote snapshots rooted at `root`
    pub fn remote(root: impl Into<String>, case_sensitive: bool) -> Self {
        Self::new(root, case_sensitive)
    }

    pub fn normalize(&self, snapshot: &Snapshot) -> Result<NormalizedTree> {
        let children = self.nodes("", snapshot.root())?;
        Ok(NormalizedTree {
            root: self.root.clone(),
            captured_at: snapshot.captured_at(),
            children,
        })
    }

    fn nodes(&self, parent: &str, entries: &[Entry]) -> Result<Vec<Node>> {
        let mut nodes = entries
            .iter()
            .map(|entry| self.node(parent, entry))
            .collect::<Result<Vec<_>>>()?;
        nodes.sort_unstable_by(|a, b| a.key.cmp(&b.key));

        if let Some(pair) = nodes.windows(2).find(|pair| pair[0].key == pair[1].key) {
            let reason = if pair[0].rel_path == pair[1].rel_path {
                "listed twice".to_owned()
            } else {
                format!("collides with '{}' when ignoring case", pair[1].rel_path)
            };
            return Err(Error::ambiguous(&pair[0].rel_path, reason));
        }
        Ok(nodes)
    }

    fn node(&self, parent: &str, entry: &Entry) -> Result<Node> {
        let rel_path = path::relative_to(entry.path(), &self.root)?;
        if rel_path.is_empty() {
            return Err(Error::ambiguous(entry.path(), "entry is the synchronized root"));
        }
        let (entry_parent, _) = rel_path.rsplit_once(path::SEPARATOR).unwrap_or(("", &rel_path));
        if entry_parent != parent {
            return Err(Error::ambiguous(
                entry.path(),
                "entry is not located in its parent directory",
            ));
        }

        let children = match entry.kind() {
            Kind::Directory => self.nodes(&rel_path, entry.children())?,
            Kind::File => Vec::new(),
        };
        let key = path::match_key(&rel_path, self.case_sensitive).into_owned();
        Ok(Node {
            rel_path,
            key,
            kind: entry.kind(),
            mtime: entry.mtime(),
            size: entry.size(),
            children,
        })
    }
}
