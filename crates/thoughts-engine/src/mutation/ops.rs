//! create / rename / move / delete on an open transaction.

use tracing::{debug, warn};

use thoughts_core::{Child, Context, Path, Rank, Segment};
use thoughts_storage::{hash_context, hash_thought, ThoughtRead, ThoughtWrite};

use super::descendants::{delete_subtree, rewrite_descendants};
use super::txn::{is_within, same_value, Txn};
use super::{MutationOutcome, Relocation};

/// Inserts `value` under `context` at `rank`.
///
/// A no-op when the child is already present in both indexes. When only
/// one half exists (a listed child without a lexeme occurrence, or the
/// reverse) both halves are written at `rank`.
pub(crate) fn create_in<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    context: &Context,
    value: &str,
    rank: Rank,
) -> MutationOutcome {
    let key = hash_context(context);
    let listed = txn
        .store
        .children_at(&key)
        .iter()
        .any(|c| same_value(&c.value, value));
    let mirrored = txn.occurrence(value, &key).is_some();
    if listed && mirrored {
        return MutationOutcome::unchanged();
    }

    let now = txn.now;
    txn.replace_child(context, &key, value, Child::new(value, rank, now));
    txn.add_occurrence(context, &key, value, rank);
    MutationOutcome::changed()
}

/// Changes the text of the node at `path` from `old_value` to `new_value`.
///
/// Rank and context are kept. When another sibling already carries
/// `new_value` the node merges into it and takes the sibling's rank and
/// display text. Both subtrees end up under the surviving chain.
pub(crate) fn rename_in<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    path: &Path,
    old_value: &str,
    new_value: &str,
) -> MutationOutcome {
    if path.is_empty() || old_value == new_value {
        return MutationOutcome::unchanged();
    }
    let context = path.parent_context();
    let key = hash_context(&context);
    let Some(existing) = txn.find_child(&key, old_value) else {
        debug!(%context, value = old_value, "rename target not listed");
        return MutationOutcome::unchanged();
    };

    let same_key = same_value(old_value, new_value);
    let duplicate = if same_key {
        None
    } else {
        txn.find_child(&key, new_value)
    };
    let (display, rank) = match &duplicate {
        Some(d) => (d.value.clone(), d.rank),
        None => (new_value.to_string(), existing.rank),
    };

    let now = txn.now;
    txn.replace_child(&context, &key, old_value, Child::new(display.clone(), rank, now));
    if same_key {
        txn.add_occurrence(&context, &key, new_value, rank);
        txn.set_display(new_value);
    } else {
        txn.remove_occurrence(&key, old_value);
        txn.add_occurrence(&context, &key, &display, rank);
    }

    let remaps = rewrite_descendants(
        txn,
        &context.child(&existing.value),
        &context.child(&display),
    );
    if duplicate.is_some() {
        debug!(%context, from = old_value, into = new_value, %rank, "rename merged into sibling");
    }

    let parent = path.parent();
    let from = parent.child(Segment::new(existing.value, existing.rank));
    let to = parent.child(Segment::new(display, rank));
    MutationOutcome {
        changed: true,
        merged: duplicate.is_some(),
        old_path: Some(from.clone()),
        new_path: Some(to.clone()),
        remaps,
        relocations: vec![Relocation { from, to }],
    }
}

/// Relocates the subtree at `old_path` to `new_path`.
///
/// The head value of `new_path` is ignored; the node keeps its value. Its
/// head rank is the requested rank, overridden by a same-value sibling's
/// rank when the move crosses contexts and merges. Moving a node into its
/// own subtree is refused.
pub(crate) fn move_in<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    old_path: &Path,
    new_path: &Path,
) -> MutationOutcome {
    let (Some(old_head), Some(new_head)) = (old_path.head(), new_path.head()) else {
        return MutationOutcome::unchanged();
    };
    let value = old_head.value.as_str();
    let from = old_path.parent_context();
    let from_key = hash_context(&from);
    let to = new_path.parent_context();
    let to_key = hash_context(&to);

    let Some(existing) = txn.find_child(&from_key, value) else {
        debug!(context = %from, value, "move source not listed");
        return MutationOutcome::unchanged();
    };
    let same_context = from_key == to_key;
    let node = from.child(&existing.value);
    if !same_context && is_within(&to, &node) {
        warn!(from = %node, to = %to, "refusing to move a thought into its own subtree");
        return MutationOutcome::unchanged();
    }

    let duplicate = if same_context {
        None
    } else {
        txn.find_child(&to_key, value)
    };
    let (display, rank) = match &duplicate {
        Some(d) => (d.value.clone(), d.rank),
        None => (existing.value.clone(), new_head.rank),
    };
    if same_context && rank == existing.rank {
        return MutationOutcome::unchanged();
    }

    let now = txn.now;
    let mut remaps = Vec::new();
    if same_context {
        txn.replace_child(&from, &from_key, value, Child::new(display.clone(), rank, now));
        txn.add_occurrence(&from, &from_key, &display, rank);
    } else {
        txn.remove_child(&from, &from_key, value);
        txn.replace_child(&to, &to_key, value, Child::new(display.clone(), rank, now));
        txn.move_occurrence(value, &from_key, &to, &to_key, rank);
        remaps = rewrite_descendants(txn, &node, &to.child(&display));
    }
    if duplicate.is_some() {
        debug!(value, to = %to, %rank, "move merged into sibling");
    }

    let from = old_path
        .parent()
        .child(Segment::new(existing.value, existing.rank));
    let to = new_path.parent().child(Segment::new(display, rank));
    MutationOutcome {
        changed: true,
        merged: duplicate.is_some(),
        old_path: Some(from.clone()),
        new_path: Some(to.clone()),
        remaps,
        relocations: vec![Relocation { from, to }],
    }
}

/// Removes one occurrence of `value` under `context`, with its subtree.
pub(crate) fn delete_in<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    value: &str,
    context: &Context,
) -> MutationOutcome {
    let key = hash_context(context);
    let listed = txn.find_child(&key, value);
    if listed.is_none() && txn.occurrence(value, &key).is_none() {
        return MutationOutcome::unchanged();
    }
    let display = listed
        .map(|c| c.value)
        .unwrap_or_else(|| value.to_string());

    txn.remove_child(context, &key, value);
    txn.remove_occurrence(&key, value);
    let removed = delete_subtree(txn, &context.child(&display));
    debug!(%context, value, descendants = removed, "deleted thought");
    MutationOutcome::changed()
}

/// Removes `value` everywhere it occurs.
pub(crate) fn delete_value_in<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    value: &str,
) -> MutationOutcome {
    let Some(lexeme) = txn.store.lexeme_of(value).cloned() else {
        return MutationOutcome::unchanged();
    };
    for occurrence in &lexeme.contexts {
        delete_in(txn, value, &occurrence.context);
    }
    // occurrences without a listed child leave the lexeme behind
    if txn.store.lexeme_of(value).is_some() {
        txn.store.remove_lexeme(&hash_thought(value));
    }
    MutationOutcome::changed()
}
