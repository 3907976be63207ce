//! Storage for the two thought indexes.
//!
//! Provides the [`ThoughtStore`] contract, the [`InMemoryStore`] backend, the
//! copy-on-write [`Overlay`] the engine builds each mutation on, and
//! wholesale snapshot load/save.
//!
//! # Architecture
//!
//! The storage layer is a pair of keyed maps and nothing more:
//! - **Lexeme index**: [`ValueKey`] -> [`Lexeme`]
//! - **Context index**: [`ContextKey`] -> [`ParentEntry`]
//!
//! No method here enforces cross-index consistency. Every write replaces a
//! whole row; the engine is responsible for computing rows that agree.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`hash`]: value normalization and context digests
//! - [`traits`]: ThoughtRead / ThoughtWrite / ThoughtStore contracts
//! - [`delta`]: StoreDelta and the Overlay transaction view
//! - [`memory`]: InMemoryStore implementation
//! - [`snapshot`]: JSON snapshot load/save
//!
//! [`ValueKey`]: thoughts_core::ValueKey
//! [`ContextKey`]: thoughts_core::ContextKey
//! [`Lexeme`]: thoughts_core::Lexeme
//! [`ParentEntry`]: thoughts_core::ParentEntry

pub mod delta;
pub mod error;
pub mod hash;
pub mod memory;
pub mod snapshot;
pub mod traits;

// Re-export key types for ergonomic use.
pub use delta::{Overlay, StoreDelta};
pub use error::StorageError;
pub use hash::{child_context_key, hash_context, hash_thought, normalize_value, root_context_key};
pub use memory::InMemoryStore;
pub use snapshot::Snapshot;
pub use traits::{ThoughtRead, ThoughtStore, ThoughtWrite};
