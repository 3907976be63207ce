//! Recursive subtree rewriting.
//!
//! Lexeme occurrences store full ancestor chains, so renaming or moving a
//! node invalidates the stored context of everything below it. These walks
//! run top-down on the transaction overlay.

use thoughts_core::{Child, Context};
use thoughts_storage::{hash_context, ThoughtRead, ThoughtWrite};

use super::txn::{same_value, Txn};
use super::RankRemap;
use crate::ranking::next_rank;

/// Moves every descendant of `old` to sit under `new`.
///
/// Level by level: when the destination level starts empty each child keeps
/// its rank; otherwise children are appended after the existing ones in
/// their original order. A child that already exists at the destination
/// merges and takes the existing rank. When `old` and `new` normalize to
/// the same chain only the stored display text changes.
pub(crate) fn rewrite_descendants<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    old: &Context,
    new: &Context,
) -> Vec<RankRemap> {
    let mut remaps = Vec::new();
    if old != new {
        rewrite_level(txn, old, new, &mut remaps);
    }
    if !remaps.is_empty() {
        tracing::debug!(from = %old, to = %new, descendants = remaps.len(), "rewrote descendants");
    }
    remaps
}

fn rewrite_level<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    old: &Context,
    new: &Context,
    remaps: &mut Vec<RankRemap>,
) {
    let old_key = hash_context(old);
    let new_key = hash_context(new);
    let mut children = txn.store.raw_children_at(&old_key).to_vec();
    if children.is_empty() {
        return;
    }
    children.sort_by(|a, b| a.rank.cmp(&b.rank));
    let now = txn.now;

    if old_key == new_key {
        txn.store.set_children_at(new_key, new, children.clone(), now);
        for child in &children {
            txn.move_occurrence(&child.value, &old_key, new, &new_key, child.rank);
            remaps.push(RankRemap {
                value: child.value.clone(),
                old_context: old.clone(),
                new_context: new.clone(),
                old_rank: child.rank,
                new_rank: child.rank,
            });
        }
        for child in &children {
            rewrite_level(txn, &old.child(&child.value), &new.child(&child.value), remaps);
        }
        return;
    }

    let destination = txn.store.raw_children_at(&new_key).to_vec();
    let base = if destination.is_empty() {
        None
    } else {
        Some(next_rank(&txn.store, new))
    };

    let mut placed = Vec::with_capacity(children.len());
    for (i, child) in children.iter().enumerate() {
        let existing = destination
            .iter()
            .find(|d| same_value(&d.value, &child.value));
        let (display, rank) = match existing {
            Some(d) => (d.value.clone(), d.rank),
            None => (
                child.value.clone(),
                base.map(|b| b.offset(i as f64)).unwrap_or(child.rank),
            ),
        };
        txn.replace_child(new, &new_key, &child.value, Child::new(display.clone(), rank, now));
        txn.move_occurrence(&child.value, &old_key, new, &new_key, rank);
        remaps.push(RankRemap {
            value: child.value.clone(),
            old_context: old.clone(),
            new_context: new.clone(),
            old_rank: child.rank,
            new_rank: rank,
        });
        placed.push(display);
    }
    txn.store.set_children_at(old_key, old, Vec::new(), now);

    for (child, display) in children.iter().zip(&placed) {
        rewrite_level(txn, &old.child(&child.value), &new.child(display), remaps);
    }
}

/// Removes every row and occurrence below `context`. Returns how many
/// child entries were dropped.
pub(crate) fn delete_subtree<S: ThoughtRead + ?Sized>(
    txn: &mut Txn<'_, S>,
    context: &Context,
) -> usize {
    let key = hash_context(context);
    let children = txn.store.raw_children_at(&key).to_vec();
    if children.is_empty() {
        return 0;
    }
    let mut removed = children.len();
    for child in &children {
        txn.remove_occurrence(&key, &child.value);
        removed += delete_subtree(txn, &context.child(&child.value));
    }
    txn.store.set_children_at(key, context, Vec::new(), txn.now);
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::mutation::{create_in, delete_in, transact};
    use thoughts_core::{Rank, Timestamp};
    use thoughts_storage::InMemoryStore;

    /// Contexts are written `a/b`; the empty string is the root.
    fn seed(entries: &[(&str, &str, f64)]) -> InMemoryStore {
        let mut store = InMemoryStore::new();
        let config = EngineConfig::default();
        transact(&mut store, Timestamp::from_millis(1), &config, |txn| {
            for (context, value, rank) in entries {
                let context: Context = context.parse().unwrap();
                create_in(txn, &context, value, Rank(*rank));
            }
        });
        store
    }

    fn rewrite(store: &mut InMemoryStore, old: &[&str], new: &[&str]) -> Vec<RankRemap> {
        let config = EngineConfig::default();
        let old = Context::new(old.iter().copied());
        let new = Context::new(new.iter().copied());
        transact(store, Timestamp::from_millis(2), &config, |txn| {
            rewrite_descendants(txn, &old, &new)
        })
    }

    #[test]
    fn test_rewrite_into_empty_level_keeps_ranks() {
        let mut store = seed(&[
            ("a", "a1", 5.0),
            ("a", "a2", 7.0),
            ("a/a1", "deep", 0.0),
        ]);
        let remaps = rewrite(&mut store, &["a"], &["x", "a"]);

        assert_eq!(remaps.len(), 3);
        assert!(remaps.iter().all(|r| r.old_rank == r.new_rank));
        let moved = store.children_of(&Context::new(["x", "a"]));
        assert_eq!(moved[0].rank, Rank(5.0));
        assert_eq!(moved[1].rank, Rank(7.0));
        assert!(store.children_of(&Context::new(["a"])).is_empty());
        assert_eq!(
            store.lexeme_of("deep").unwrap().contexts[0].context,
            Context::new(["x", "a", "a1"])
        );
    }

    #[test]
    fn test_rewrite_into_occupied_level_appends_and_merges() {
        let mut store = seed(&[
            ("a", "p", 0.0),
            ("a", "q", 1.0),
            ("b", "q", 4.0),
        ]);
        let remaps = rewrite(&mut store, &["a"], &["b"]);

        let values: Vec<(String, Rank)> = store
            .children_of(&Context::new(["b"]))
            .into_iter()
            .map(|c| (c.value, c.rank))
            .collect();
        // q merged at its existing rank, p appended after it
        assert_eq!(
            values,
            vec![("q".to_string(), Rank(4.0)), ("p".to_string(), Rank(5.0))]
        );
        assert_eq!(remaps.len(), 2);
        let q = store.lexeme_of("q").unwrap();
        assert_eq!(q.contexts.len(), 1);
        assert_eq!(q.contexts[0].context, Context::new(["b"]));
    }

    #[test]
    fn test_identical_contexts_are_untouched() {
        let mut store = seed(&[("a", "p", 0.0)]);
        assert!(rewrite(&mut store, &["a"], &["a"]).is_empty());
    }

    #[test]
    fn test_delete_subtree_clears_rows() {
        let mut store = seed(&[
            ("", "a", 0.0),
            ("a", "b", 0.0),
            ("a/b", "c", 0.0),
            ("", "c", 1.0),
        ]);
        let config = EngineConfig::default();
        transact(&mut store, Timestamp::from_millis(2), &config, |txn| {
            delete_in(txn, "a", &Context::root())
        });
        assert!(store.lexeme_of("a").is_none());
        assert!(store.lexeme_of("b").is_none());
        // c survives through its root occurrence
        assert_eq!(store.lexeme_of("c").unwrap().contexts.len(), 1);
        assert_eq!(store.parent_count(), 1);
    }
}
