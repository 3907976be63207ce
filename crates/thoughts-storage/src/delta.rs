//! Deltas and the transaction overlay.
//!
//! A mutation never writes to the live store while it is still computing.
//! It writes to an [`Overlay`]: a read-through view over the base store that
//! records replaced rows in a [`StoreDelta`]. Reads hit the delta first, so
//! later steps of the same mutation see earlier ones. Only touched rows are
//! copied. When the mutation is done the delta is committed in one step.

use indexmap::IndexMap;

use thoughts_core::{Child, Context, ContextKey, Lexeme, ParentEntry, Timestamp, ValueKey};

use crate::hash::hash_thought;
use crate::traits::{parent_row, ThoughtRead, ThoughtWrite};

/// Row replacements for both indexes. `None` removes the row.
///
/// Insertion ordered so commit order is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreDelta {
    pub lexemes: IndexMap<ValueKey, Option<Lexeme>>,
    pub parents: IndexMap<ContextKey, Option<ParentEntry>>,
}

impl StoreDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lexemes.is_empty() && self.parents.is_empty()
    }

    /// Number of replaced rows across both indexes.
    pub fn len(&self) -> usize {
        self.lexemes.len() + self.parents.len()
    }
}

/// Copy-on-write view over a base store.
pub struct Overlay<'a, S: ThoughtRead + ?Sized> {
    base: &'a S,
    delta: StoreDelta,
}

impl<'a, S: ThoughtRead + ?Sized> Overlay<'a, S> {
    pub fn new(base: &'a S) -> Self {
        Overlay {
            base,
            delta: StoreDelta::new(),
        }
    }

    /// The rows written so far.
    pub fn delta(&self) -> &StoreDelta {
        &self.delta
    }

    /// Finishes the transaction, handing back the rows to commit.
    pub fn into_delta(self) -> StoreDelta {
        self.delta
    }
}

impl<S: ThoughtRead + ?Sized> ThoughtRead for Overlay<'_, S> {
    fn lexeme(&self, key: &ValueKey) -> Option<&Lexeme> {
        match self.delta.lexemes.get(key) {
            Some(row) => row.as_ref(),
            None => self.base.lexeme(key),
        }
    }

    fn parent(&self, key: &ContextKey) -> Option<&ParentEntry> {
        match self.delta.parents.get(key) {
            Some(row) => row.as_ref(),
            None => self.base.parent(key),
        }
    }
}

impl<S: ThoughtRead + ?Sized> ThoughtWrite for Overlay<'_, S> {
    fn put_lexeme(&mut self, lexeme: Lexeme) {
        self.delta
            .lexemes
            .insert(hash_thought(&lexeme.value), Some(lexeme));
    }

    fn remove_lexeme(&mut self, key: &ValueKey) {
        self.delta.lexemes.insert(key.clone(), None);
    }

    fn set_children_at(
        &mut self,
        key: ContextKey,
        context: &Context,
        children: Vec<Child>,
        now: Timestamp,
    ) {
        self.delta
            .parents
            .insert(key, parent_row(context, children, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_context;
    use crate::memory::InMemoryStore;
    use thoughts_core::{Rank, ThoughtContext};

    fn ts(ms: i64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn seeded() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        let mut lexeme = Lexeme::new("a", ts(0));
        lexeme.contexts.push(ThoughtContext {
            context: Context::root(),
            rank: Rank(0.0),
            last_updated: None,
        });
        store.put_lexeme(lexeme);
        store.set_children(&Context::root(), vec![Child::new("a", Rank(0.0), ts(0))], ts(0));
        store
    }

    #[test]
    fn reads_fall_through_to_base() {
        let store = seeded();
        let overlay = Overlay::new(&store);
        assert!(overlay.lexeme_of("a").is_some());
        assert_eq!(overlay.children_of(&Context::root()).len(), 1);
        assert!(overlay.delta().is_empty());
    }

    #[test]
    fn writes_shadow_base_without_touching_it() {
        let store = seeded();
        let mut overlay = Overlay::new(&store);
        overlay.remove_lexeme(&hash_thought("a"));
        overlay.set_children(&Context::root(), Vec::new(), ts(1));

        assert!(overlay.lexeme_of("a").is_none());
        assert!(overlay.parent(&hash_context(&Context::root())).is_none());
        // base is untouched until commit
        assert!(store.lexeme_of("a").is_some());
        assert_eq!(overlay.delta().len(), 2);
    }

    #[test]
    fn empty_children_record_a_removal() {
        let store = seeded();
        let mut overlay = Overlay::new(&store);
        overlay.set_children(&Context::root(), Vec::new(), ts(1));
        let delta = overlay.into_delta();
        assert_eq!(
            delta.parents.get(&hash_context(&Context::root())),
            Some(&None)
        );
    }
}
