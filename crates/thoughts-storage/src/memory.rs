//! In-memory implementation of [`ThoughtStore`].
//!
//! [`InMemoryStore`] is the backend the engine runs against. Persistence is
//! layered on top by loading and saving whole [`Snapshot`]s.
//!
//! [`Snapshot`]: crate::snapshot::Snapshot

use std::collections::HashMap;

use thoughts_core::{Child, Context, ContextKey, Lexeme, ParentEntry, Timestamp, ValueKey};

use crate::delta::StoreDelta;
use crate::hash::hash_thought;
use crate::traits::{parent_row, ThoughtRead, ThoughtStore, ThoughtWrite};

/// In-memory implementation of [`ThoughtStore`]. All rows live in HashMaps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    /// Lexemes indexed by normalized value
    lexemes: HashMap<ValueKey, Lexeme>,
    /// Parent entries indexed by context digest
    parents: HashMap<ContextKey, ParentEntry>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        InMemoryStore {
            lexemes: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    pub fn lexeme_count(&self) -> usize {
        self.lexemes.len()
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    /// Inserts a parent row as-is, bypassing the empty-row rule.
    ///
    /// Used when loading snapshots and by tests that need to stage a
    /// corrupted store.
    pub fn insert_parent_row(&mut self, key: ContextKey, entry: ParentEntry) {
        self.parents.insert(key, entry);
    }
}

impl ThoughtRead for InMemoryStore {
    fn lexeme(&self, key: &ValueKey) -> Option<&Lexeme> {
        self.lexemes.get(key)
    }

    fn parent(&self, key: &ContextKey) -> Option<&ParentEntry> {
        self.parents.get(key)
    }
}

impl ThoughtWrite for InMemoryStore {
    fn put_lexeme(&mut self, lexeme: Lexeme) {
        self.lexemes.insert(hash_thought(&lexeme.value), lexeme);
    }

    fn remove_lexeme(&mut self, key: &ValueKey) {
        self.lexemes.remove(key);
    }

    fn set_children_at(
        &mut self,
        key: ContextKey,
        context: &Context,
        children: Vec<Child>,
        now: Timestamp,
    ) {
        match parent_row(context, children, now) {
            Some(entry) => {
                self.parents.insert(key, entry);
            }
            None => {
                self.parents.remove(&key);
            }
        }
    }
}

impl ThoughtStore for InMemoryStore {
    fn commit(&mut self, delta: StoreDelta) {
        for (key, row) in delta.lexemes {
            match row {
                Some(lexeme) => {
                    self.lexemes.insert(key, lexeme);
                }
                None => {
                    self.lexemes.remove(&key);
                }
            }
        }
        for (key, row) in delta.parents {
            match row {
                Some(entry) => {
                    self.parents.insert(key, entry);
                }
                None => {
                    self.parents.remove(&key);
                }
            }
        }
    }

    fn lexemes(&self) -> Box<dyn Iterator<Item = (&ValueKey, &Lexeme)> + '_> {
        Box::new(self.lexemes.iter())
    }

    fn parents(&self) -> Box<dyn Iterator<Item = (&ContextKey, &ParentEntry)> + '_> {
        Box::new(self.parents.iter())
    }
}
