//! Sibling ranks.
//!
//! Ranks are never renumbered. Inserting between two siblings takes the
//! midpoint, inserting past either end steps by an increment, so computing a
//! rank only looks at the immediate neighbours.

use thoughts_core::{Child, Context, Rank};
use thoughts_storage::{normalize_value, ThoughtRead};

/// Rank for a new child placed directly after `after`.
///
/// Midpoint to the following sibling, or `after.rank + increment` when
/// `after` is last (or not a child of `context`).
pub fn rank_after<R: ThoughtRead + ?Sized>(
    store: &R,
    context: &Context,
    after: &Child,
    increment: f64,
) -> Rank {
    let siblings = store.children_of(context);
    let next = position_of(&siblings, &after.value).and_then(|i| siblings.get(i + 1));
    match next {
        Some(next) => Rank::between(after.rank, next.rank),
        None => after.rank.offset(increment),
    }
}

/// Rank for a new child placed directly before `before`.
pub fn rank_before<R: ThoughtRead + ?Sized>(
    store: &R,
    context: &Context,
    before: &Child,
    increment: f64,
) -> Rank {
    let siblings = store.children_of(context);
    let prev = position_of(&siblings, &before.value)
        .filter(|&i| i > 0)
        .and_then(|i| siblings.get(i - 1));
    match prev {
        Some(prev) => Rank::between(prev.rank, before.rank),
        None => before.rank.offset(-increment),
    }
}

/// Rank that appends to the end of `context`: max + 1, or 0 when empty.
pub fn next_rank<R: ThoughtRead + ?Sized>(store: &R, context: &Context) -> Rank {
    store
        .children_of(context)
        .last()
        .map(|c| c.rank.offset(1.0))
        .unwrap_or(Rank::ZERO)
}

/// Rank that prepends to the start of `context`: min - 1, or 0 when empty.
pub fn prev_rank<R: ThoughtRead + ?Sized>(store: &R, context: &Context) -> Rank {
    store
        .children_of(context)
        .first()
        .map(|c| c.rank.offset(-1.0))
        .unwrap_or(Rank::ZERO)
}

/// Index of the child whose value normalizes like `value`.
pub(crate) fn position_of(children: &[Child], value: &str) -> Option<usize> {
    let key = normalize_value(value);
    children
        .iter()
        .position(|c| normalize_value(&c.value) == key)
}
