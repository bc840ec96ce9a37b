//! Lockstep comparison of a local and a remote normalized tree.
use std::{cmp::Ordering, collections::VecDeque, time};

use crate::{
    action::{Action, Direction},
    normalize::{Node, NormalizedTree},
    Error, Kind, Result,
};

#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    mtime_tolerance: time::Duration,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The local file is only newer if it is by more than `tol`
    pub fn with_mtime_tolerance(mut self, tol: time::Duration) -> Self {
        self.mtime_tolerance = tol;
        self
    }

    /// Produce the actions that bring both sides in sync.
    ///
    /// Actions driven by the remote tree come first, followed by the
    /// uploads of local-only entries.
    pub fn diff(&self, local: &NormalizedTree, remote: &NormalizedTree) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        let mut local_only: Vec<&Node> = Vec::new();

        let mut queue: VecDeque<(&[Node], &[Node])> = VecDeque::new();
        queue.push_back((local.children(), remote.children()));

        while let Some((loc_children, rem_children)) = queue.pop_front() {
            let mut loc_children = loc_children.iter();
            let mut rem_children = rem_children.iter();
            let mut loc_child = loc_children.next();
            let mut rem_child = rem_children.next();

            loop {
                match (loc_child, rem_child) {
                    (None, None) => break,
                    (Some(loc), Some(rem)) => match loc.key().cmp(rem.key()) {
                        Ordering::Equal => {
                            match (loc.kind(), rem.kind()) {
                                (Kind::File, Kind::File) => actions.push(self.overwrite(loc, rem)),
                                (Kind::Directory, Kind::Directory) => {
                                    queue.push_back((loc.children(), rem.children()));
                                }
                                (loc_kind, rem_kind) => {
                                    return Err(Error::ambiguous(
                                        rem.rel_path(),
                                        format!("{loc_kind} locally but {rem_kind} remotely"),
                                    ));
                                }
                            }
                            loc_child = loc_children.next();
                            rem_child = rem_children.next();
                        }
                        Ordering::Less => {
                            local_only.push(loc);
                            loc_child = loc_children.next();
                        }
                        Ordering::Greater => {
                            expand(rem, Direction::Download, &mut actions);
                            rem_child = rem_children.next();
                        }
                    },
                    (Some(loc), None) => {
                        local_only.push(loc);
                        loc_child = loc_children.next();
                    }
                    (None, Some(rem)) => {
                        expand(rem, Direction::Download, &mut actions);
                        rem_child = rem_children.next();
                    }
                }
            }
        }

        for loc in local_only {
            expand(loc, Direction::Upload, &mut actions);
        }

        log::debug!(
            "{} actions between {} and {}",
            actions.len(),
            local.root(),
            remote.root()
        );
        Ok(actions)
    }

    /// Both sides keep their own spelling of the path.
    fn overwrite(&self, loc: &Node, rem: &Node) -> Action {
        let (direction, size) =
            match crate::compare_mtime(loc.mtime(), rem.mtime(), self.mtime_tolerance) {
                Ordering::Greater => (Direction::UploadOverwrite, loc.size()),
                Ordering::Equal | Ordering::Less => (Direction::DownloadOverwrite, rem.size()),
            };
        Action::new(loc.rel_path(), Kind::File, direction)
            .with_size(size)
            .with_remote_path(rem.rel_path())
    }
}

/// One action per file in `node`, `node` included.
fn expand(node: &Node, direction: Direction, actions: &mut Vec<Action>) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        match node.kind() {
            Kind::File => {
                actions.push(Action::new(node.rel_path(), Kind::File, direction).with_size(node.size()))
            }
            Kind::Directory => stack.extend(node.children().iter().rev()),
        }
    }
}
