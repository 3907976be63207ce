//! The mutation engine.
//!
//! Every operation runs inside a [`Txn`]: a copy-on-write overlay over the
//! live store plus the timestamp of the mutation. Operations read and write
//! the overlay freely (later steps see earlier ones), and the accumulated
//! delta is committed once at the end. A reader of the live store never sees
//! one index updated without the other.
//!
//! # Operations
//!
//! - [`create_in`]: insert a child, completing whichever index half is missing
//! - [`rename_in`]: change a node's text in place, merging into a same-value sibling
//! - [`move_in`]: relocate a subtree, merging into a same-value sibling
//! - [`delete_in`]: remove one occurrence and the subtree below it
//! - [`delete_value_in`]: remove every occurrence of a value
//!
//! Not-found is never an error: each operation reports `changed = false`.

mod descendants;
mod ops;
mod txn;

use serde::Serialize;

use thoughts_core::{Context, Path, Rank, Timestamp};
use thoughts_storage::ThoughtStore;

use crate::config::EngineConfig;

pub(crate) use ops::{create_in, delete_in, delete_value_in, move_in, rename_in};
pub(crate) use txn::{same_value, Txn};

/// How a descendant's rank changed when its ancestor chain was rewritten.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankRemap {
    pub value: String,
    pub old_context: Context,
    pub new_context: Context,
    pub old_rank: Rank,
    pub new_rank: Rank,
}

/// One subtree that changed address, in the order the steps ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relocation {
    pub from: Path,
    pub to: Path,
}

/// What a mutation did, for callers holding references into the outline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MutationOutcome {
    /// False when the operation was a no-op.
    pub changed: bool,
    /// True when the node collapsed into a same-value sibling.
    pub merged: bool,
    /// Path of the node before the mutation, where one was addressed.
    pub old_path: Option<Path>,
    /// Path of the node after the mutation, carrying the rank actually
    /// assigned (the surviving sibling's rank on a merge).
    pub new_path: Option<Path>,
    /// Every descendant whose ancestor chain was rewritten, top-down.
    pub remaps: Vec<RankRemap>,
    /// Every subtree a rename or move re-addressed, composite steps included.
    pub relocations: Vec<Relocation>,
}

impl MutationOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub(crate) fn changed() -> Self {
        MutationOutcome {
            changed: true,
            ..Self::default()
        }
    }

    /// Folds a later step of a composite edit into this outcome.
    pub(crate) fn absorb(&mut self, step: MutationOutcome) {
        self.changed |= step.changed;
        self.merged |= step.merged;
        self.remaps.extend(step.remaps);
        self.relocations.extend(step.relocations);
    }
}

/// Runs `f` on a fresh transaction over `store` and commits what it wrote.
pub(crate) fn transact<S, R, F>(store: &mut S, now: Timestamp, config: &EngineConfig, f: F) -> R
where
    S: ThoughtStore,
    F: FnOnce(&mut Txn<'_, S>) -> R,
{
    let (delta, result) = {
        let mut txn = Txn::new(&*store, now, config);
        let result = f(&mut txn);
        (txn.into_delta(), result)
    };
    if !delta.is_empty() {
        tracing::debug!(rows = delta.len(), "committing mutation");
        store.commit(delta);
    }
    result
}
