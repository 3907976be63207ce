//! Wholesale snapshot load/save.
//!
//! Persistence is not part of the engine's per-operation API. Hosts read
//! and write both indexes at once as a [`Snapshot`]. Keys are not stored:
//! they are derived from row content on load, so a snapshot cannot carry a
//! key that disagrees with its row.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};

use thoughts_core::{ContextKey, Lexeme, ParentEntry, ValueKey};

use crate::error::StorageError;
use crate::hash::{hash_context, hash_thought};
use crate::memory::InMemoryStore;
use crate::traits::{ThoughtStore, ThoughtWrite};

/// Both indexes as flat row lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub lexemes: Vec<Lexeme>,
    pub contexts: Vec<ParentEntry>,
}

impl Snapshot {
    /// Captures every row of `store`, sorted by key for stable output.
    pub fn capture<S: ThoughtStore + ?Sized>(store: &S) -> Self {
        let mut lexemes: Vec<(&ValueKey, &Lexeme)> = store.lexemes().collect();
        lexemes.sort_by(|a, b| a.0.cmp(b.0));
        let mut contexts: Vec<(&ContextKey, &ParentEntry)> = store.parents().collect();
        contexts.sort_by(|a, b| a.1.context.len().cmp(&b.1.context.len()).then(a.0.cmp(b.0)));

        Snapshot {
            lexemes: lexemes.into_iter().map(|(_, l)| l.clone()).collect(),
            contexts: contexts.into_iter().map(|(_, p)| p.clone()).collect(),
        }
    }

    /// Rebuilds a store from the rows.
    ///
    /// Two rows that derive the same key are rejected: silently keeping
    /// either one would drop data.
    pub fn restore(self) -> Result<InMemoryStore, StorageError> {
        let mut store = InMemoryStore::new();

        let mut seen: HashMap<ValueKey, String> = HashMap::new();
        for lexeme in self.lexemes {
            match seen.entry(hash_thought(&lexeme.value)) {
                Entry::Occupied(prev) => {
                    return Err(StorageError::IntegrityError {
                        reason: format!(
                            "lexemes '{}' and '{}' normalize to the same value",
                            prev.get(),
                            lexeme.value
                        ),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(lexeme.value.clone());
                }
            }
            store.put_lexeme(lexeme);
        }

        let mut seen: HashMap<ContextKey, String> = HashMap::new();
        for entry in self.contexts {
            let key = hash_context(&entry.context);
            match seen.entry(key) {
                Entry::Occupied(prev) => {
                    return Err(StorageError::IntegrityError {
                        reason: format!(
                            "contexts '{}' and '{}' normalize to the same chain",
                            prev.get(),
                            entry.context
                        ),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(entry.context.to_string());
                }
            }
            store.insert_parent_row(key, entry);
        }

        Ok(store)
    }

    /// Reads a snapshot from a JSON file.
    pub fn load(path: &FsPath) -> Result<Self, StorageError> {
        let bytes = std::fs::read(path)?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        tracing::debug!(
            path = %path.display(),
            lexemes = snapshot.lexemes.len(),
            contexts = snapshot.contexts.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Writes the snapshot as pretty JSON, replacing `path` atomically.
    pub fn save(&self, path: &FsPath) -> Result<(), StorageError> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => FsPath::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;
        file.persist(path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }
}
