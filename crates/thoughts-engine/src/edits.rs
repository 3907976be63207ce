//! Composite edits built from the primitive mutations.
//!
//! Each edit runs all of its steps on one transaction, so it commits as a
//! single unit like the primitives do.

use tracing::debug;

use thoughts_core::{Child, Path, Segment};
use thoughts_storage::{hash_context, normalize_value, ThoughtRead};

use crate::mutation::{create_in, move_in, rename_in, MutationOutcome, Txn};
use crate::ranking::{next_rank, position_of, prev_rank, rank_after, rank_before};

/// Swaps the thought with its previous sibling. A first child moves to the
/// end of the previous sibling of its parent.
pub(crate) fn move_up_in<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    path: &Path,
) -> MutationOutcome {
    let Some(head) = path.head() else {
        return MutationOutcome::unchanged();
    };
    let context = path.parent_context();
    let siblings = txn.store.children_of(&context);
    let Some(i) = position_of(&siblings, &head.value) else {
        return MutationOutcome::unchanged();
    };
    let increment = txn.config.rank_increment;

    if i > 0 {
        let rank = rank_before(&txn.store, &context, &siblings[i - 1], increment);
        let target = path.parent().child(Segment::new(head.value.clone(), rank));
        return move_in(txn, path, &target);
    }

    let Some((uncle, parent)) = uncle(txn, path, -1) else {
        return MutationOutcome::unchanged();
    };
    let uncle_path = parent.child(Segment::new(uncle.value, uncle.rank));
    let rank = next_rank(&txn.store, &uncle_path.to_context());
    move_in(
        txn,
        path,
        &uncle_path.child(Segment::new(head.value.clone(), rank)),
    )
}

/// Swaps the thought with its next sibling. A last child moves to the
/// start of the next sibling of its parent.
pub(crate) fn move_down_in<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    path: &Path,
) -> MutationOutcome {
    let Some(head) = path.head() else {
        return MutationOutcome::unchanged();
    };
    let context = path.parent_context();
    let siblings = txn.store.children_of(&context);
    let Some(i) = position_of(&siblings, &head.value) else {
        return MutationOutcome::unchanged();
    };
    let increment = txn.config.rank_increment;

    if i + 1 < siblings.len() {
        let rank = rank_after(&txn.store, &context, &siblings[i + 1], increment);
        let target = path.parent().child(Segment::new(head.value.clone(), rank));
        return move_in(txn, path, &target);
    }

    let Some((uncle, parent)) = uncle(txn, path, 1) else {
        return MutationOutcome::unchanged();
    };
    let uncle_path = parent.child(Segment::new(uncle.value, uncle.rank));
    let rank = prev_rank(&txn.store, &uncle_path.to_context());
    move_in(
        txn,
        path,
        &uncle_path.child(Segment::new(head.value.clone(), rank)),
    )
}

/// The sibling of `path`'s parent at `offset`, with the grandparent path.
fn uncle<S: ThoughtRead + ?Sized>(
    txn: &Txn<'_, S>,
    path: &Path,
    offset: isize,
) -> Option<(Child, Path)> {
    let parent = path.parent();
    let parent_head = parent.head()?;
    let grandparent = parent.parent();
    let uncles = txn.store.children_of(&grandparent.to_context());
    let j = position_of(&uncles, &parent_head.value)?;
    let k = j.checked_add_signed(offset)?;
    let uncle = uncles.get(k)?.clone();
    Some((uncle, grandparent))
}

/// Inserts an empty thought before all siblings of `path` and moves every
/// sibling, `path` included, under it.
pub(crate) fn subcategorize_all_in<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    path: &Path,
) -> MutationOutcome {
    if path.is_empty() {
        return MutationOutcome::unchanged();
    }
    let context = path.parent_context();
    let parent = path.parent();
    let siblings = txn.store.children_of(&context);
    if siblings.is_empty() {
        return MutationOutcome::unchanged();
    }
    if siblings.iter().any(|c| normalize_value(&c.value).is_empty()) {
        debug!(%context, "an empty thought already exists; not subcategorizing");
        return MutationOutcome::unchanged();
    }

    let rank = prev_rank(&txn.store, &context);
    let mut outcome = create_in(txn, &context, "", rank);
    let category = parent.child(Segment::new("", rank));
    for sibling in &siblings {
        let from = parent.child(Segment::new(sibling.value.clone(), sibling.rank));
        let to = category.child(Segment::new(sibling.value.clone(), sibling.rank));
        outcome.absorb(move_in(txn, &from, &to));
    }
    outcome.old_path = Some(path.clone());
    outcome.new_path = Some(category);
    outcome
}

/// Moves the thought's text into a new first child and blanks the thought.
pub(crate) fn bump_down_in<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    path: &Path,
) -> MutationOutcome {
    let Some(head) = path.head() else {
        return MutationOutcome::unchanged();
    };
    if normalize_value(&head.value).is_empty() {
        return MutationOutcome::unchanged();
    }
    let key = hash_context(&path.parent_context());
    if txn.find_child(&key, "").is_some() {
        debug!(%path, "an empty sibling already exists; not bumping down");
        return MutationOutcome::unchanged();
    }
    let Some(existing) = txn.find_child(&key, &head.value) else {
        return MutationOutcome::unchanged();
    };

    let mut outcome = rename_in(txn, path, &existing.value, "");
    let Some(blank) = outcome.new_path.clone() else {
        return outcome;
    };
    let below = blank.to_context();
    let rank = prev_rank(&txn.store, &below);
    outcome.absorb(create_in(txn, &below, &existing.value, rank));
    outcome.new_path = Some(blank.child(Segment::new(existing.value, rank)));
    outcome
}

/// Splits a thought into sentences: the thought keeps the first, the rest
/// follow it as siblings.
pub(crate) fn split_sentences_in<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    path: &Path,
) -> MutationOutcome {
    let Some(head) = path.head() else {
        return MutationOutcome::unchanged();
    };
    let sentences = split_sentences(&head.value);
    let Some((first, rest)) = sentences.split_first() else {
        return MutationOutcome::unchanged();
    };
    if rest.is_empty() {
        return MutationOutcome::unchanged();
    }

    let mut outcome = rename_in(txn, path, &head.value, first);
    let Some(renamed) = outcome.new_path.clone() else {
        return outcome;
    };
    let context = path.parent_context();
    let increment = txn.config.rank_increment;
    let now = txn.now;
    let first_rank = renamed.head().map(|s| s.rank).unwrap_or_default();
    let mut previous = Child::new(first.clone(), first_rank, now);
    for sentence in rest {
        let rank = rank_after(&txn.store, &context, &previous, increment);
        outcome.absorb(create_in(txn, &context, sentence, rank));
        previous = Child::new(sentence.clone(), rank, now);
    }
    outcome
}

/// Splits text after runs of `.`, `!` or `?` that end a word.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        while let Some(&next) = chars.peek() {
            if !matches!(next, '.' | '!' | '?') {
                break;
            }
            current.push(next);
            chars.next();
        }
        if chars.peek().map_or(true, |n| n.is_whitespace()) {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}
