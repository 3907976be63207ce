//! The recently-edited index.
//!
//! A trie keyed by the normalized values of successive path segments. Leaves
//! record when a path was last edited and the full path at that time. The
//! trie is updated in lock-step with renames and moves so no leaf is left
//! under a prefix that no longer exists.
//!
//! All operations are pure: they return a new tree and leave `self` alone.
//! [`RecentlyEdited::relocate`] reports structural anomalies as a
//! [`RecentError`] instead of panicking; the engine logs and skips them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use thoughts_core::{Path, Timestamp, ValueKey};
use thoughts_storage::hash_thought;

/// Errors from relocating a subtree of the index.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecentError {
    #[error("recently-edited paths must not be empty")]
    EmptyPath,

    #[error("stale leaf: recorded path {recorded} is not under {expected}")]
    StaleLeaf { recorded: String, expected: String },
}

/// One node of the trie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecentNode {
    Branch(IndexMap<ValueKey, RecentNode>),
    Leaf { last_updated: Timestamp, path: Path },
}

/// A leaf, flattened for listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentEntry {
    pub path: Path,
    pub last_updated: Timestamp,
}

/// The recently-edited trie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentlyEdited {
    root: IndexMap<ValueKey, RecentNode>,
}

fn keys(path: &Path) -> Vec<ValueKey> {
    path.segments().iter().map(|s| hash_thought(&s.value)).collect()
}

impl RecentlyEdited {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Records an edit at `path`.
    ///
    /// Intermediate nodes are created as needed; a leaf on the way down
    /// becomes a branch. Touching a position that already has recorded
    /// edits below it changes nothing: the deeper edits are the more
    /// specific record.
    pub fn touch(&self, path: &Path, now: Timestamp) -> RecentlyEdited {
        let mut next = self.clone();
        let leaf = RecentNode::Leaf {
            last_updated: now,
            path: path.clone(),
        };
        record(&mut next.root, &keys(path), leaf);
        next
    }

    /// Moves the subtree at `old` to `new`, rewriting the recorded paths.
    ///
    /// Nothing recorded at `old` is not an error. When `new` already holds
    /// entries the two subtrees are merged; for colliding leaves the later
    /// edit wins.
    pub fn relocate(&self, old: &Path, new: &Path) -> Result<RecentlyEdited, RecentError> {
        if old.is_empty() || new.is_empty() {
            return Err(RecentError::EmptyPath);
        }
        let mut next = self.clone();
        let Some(subtree) = take(&mut next.root, &keys(old)) else {
            return Ok(next);
        };
        let subtree = rebase(subtree, old, new)?;
        place(&mut next.root, &keys(new), subtree);
        Ok(next)
    }

    /// Drops everything recorded at or below `path`.
    pub fn remove(&self, path: &Path) -> RecentlyEdited {
        let mut next = self.clone();
        take(&mut next.root, &keys(path));
        next
    }

    /// Leaves, most recent first, at most `limit`.
    pub fn entries(&self, limit: usize) -> Vec<RecentEntry> {
        let mut entries = Vec::new();
        collect(&self.root, &mut entries);
        entries.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.path.to_string().cmp(&b.path.to_string()))
        });
        entries.truncate(limit);
        entries
    }
}

/// Detaches the node at `keys`, pruning branches it leaves empty.
fn take(level: &mut IndexMap<ValueKey, RecentNode>, keys: &[ValueKey]) -> Option<RecentNode> {
    let (first, rest) = keys.split_first()?;
    if rest.is_empty() {
        return level.shift_remove(first);
    }
    let taken = match level.get_mut(first)? {
        RecentNode::Branch(children) => {
            let taken = take(children, rest)?;
            if children.is_empty() {
                level.shift_remove(first);
            }
            taken
        }
        RecentNode::Leaf { .. } => return None,
    };
    Some(taken)
}

/// Writes `leaf` at `keys` unless edits are recorded below it.
fn record(level: &mut IndexMap<ValueKey, RecentNode>, keys: &[ValueKey], leaf: RecentNode) {
    let Some((first, rest)) = keys.split_first() else {
        return;
    };
    if rest.is_empty() {
        match level.get(first) {
            Some(RecentNode::Branch(children)) if !children.is_empty() => {}
            _ => {
                level.insert(first.clone(), leaf);
            }
        }
        return;
    }
    if let Some(children) = branch_mut(level, first) {
        record(children, rest, leaf);
    }
}

/// Attaches `node` at `keys`, merging with whatever is there.
fn place(level: &mut IndexMap<ValueKey, RecentNode>, keys: &[ValueKey], node: RecentNode) {
    let Some((first, rest)) = keys.split_first() else {
        return;
    };
    if rest.is_empty() {
        let merged = match level.shift_remove(first) {
            Some(existing) => merge(existing, node),
            None => node,
        };
        level.insert(first.clone(), merged);
        return;
    }
    if let Some(children) = branch_mut(level, first) {
        place(children, rest, node);
    }
}

/// The branch under `key`, created if missing. A leaf there is replaced.
fn branch_mut<'a>(
    level: &'a mut IndexMap<ValueKey, RecentNode>,
    key: &ValueKey,
) -> Option<&'a mut IndexMap<ValueKey, RecentNode>> {
    let slot = level
        .entry(key.clone())
        .or_insert_with(|| RecentNode::Branch(IndexMap::new()));
    if matches!(slot, RecentNode::Leaf { .. }) {
        *slot = RecentNode::Branch(IndexMap::new());
    }
    match slot {
        RecentNode::Branch(children) => Some(children),
        RecentNode::Leaf { .. } => None,
    }
}

fn merge(existing: RecentNode, incoming: RecentNode) -> RecentNode {
    match (existing, incoming) {
        (RecentNode::Branch(mut ours), RecentNode::Branch(theirs)) => {
            for (key, node) in theirs {
                let merged = match ours.shift_remove(&key) {
                    Some(prev) => merge(prev, node),
                    None => node,
                };
                ours.insert(key, merged);
            }
            RecentNode::Branch(ours)
        }
        (
            a @ RecentNode::Leaf { last_updated: ta, .. },
            b @ RecentNode::Leaf { last_updated: tb, .. },
        ) => {
            if tb >= ta {
                b
            } else {
                a
            }
        }
        (branch @ RecentNode::Branch(_), RecentNode::Leaf { .. }) => branch,
        (RecentNode::Leaf { .. }, branch @ RecentNode::Branch(_)) => branch,
    }
}

/// Rewrites every leaf path from under `old` to under `new`.
fn rebase(node: RecentNode, old: &Path, new: &Path) -> Result<RecentNode, RecentError> {
    match node {
        RecentNode::Leaf { last_updated, path } => {
            if !has_prefix(&path, old) {
                return Err(RecentError::StaleLeaf {
                    recorded: path.to_string(),
                    expected: old.to_string(),
                });
            }
            Ok(RecentNode::Leaf {
                last_updated,
                path: path.rebase(old, new),
            })
        }
        RecentNode::Branch(children) => {
            let mut rebased = IndexMap::with_capacity(children.len());
            for (key, child) in children {
                rebased.insert(key, rebase(child, old, new)?);
            }
            Ok(RecentNode::Branch(rebased))
        }
    }
}

/// Prefix test on values only; ranks in recorded paths go stale on reorder.
fn has_prefix(path: &Path, prefix: &Path) -> bool {
    path.len() >= prefix.len()
        && path
            .segments()
            .iter()
            .zip(prefix.segments())
            .all(|(a, b)| hash_thought(&a.value) == hash_thought(&b.value))
}

fn collect(level: &IndexMap<ValueKey, RecentNode>, out: &mut Vec<RecentEntry>) {
    for node in level.values() {
        match node {
            RecentNode::Leaf { last_updated, path } => out.push(RecentEntry {
                path: path.clone(),
                last_updated: *last_updated,
            }),
            RecentNode::Branch(children) => collect(children, out),
        }
    }
}
