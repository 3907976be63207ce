//! The thought outline engine.
//!
//! Mutates the two thought indexes so they stay in lock-step, keeps the
//! recently-edited trie in line with every move, and detects and repairs
//! drift between the indexes.
//!
//! # Architecture
//!
//! Every write goes through [`Outline`], which holds the store, the
//! recently-edited trie, a [`Clock`](thoughts_core::Clock) and the
//! [`EngineConfig`]. A write takes one timestamp, runs on a copy-on-write
//! overlay of the store and commits the accumulated rows once. Operations
//! never fail: a missing thought makes the operation a no-op and the
//! returned [`MutationOutcome`] says so.
//!
//! # Modules
//!
//! - [`config`]: EngineConfig knobs
//! - [`ranking`]: rank placement between, before and after siblings
//! - [`mutation`]: create, rename, move, delete and the descendant rewrite
//! - [`edits`]: composite edits built from the primitives
//! - [`recent`]: the recently-edited trie
//! - [`integrity`]: per-thought repair and whole-store audit
//! - [`outline`]: the Outline handle tying it together

pub mod config;
pub mod edits;
pub mod integrity;
pub mod mutation;
pub mod outline;
pub mod ranking;
pub mod recent;

pub use config::EngineConfig;
pub use edits::split_sentences;
pub use integrity::{audit, check_integrity, IntegrityOutcome, RepairKind, Violation};
pub use mutation::{MutationOutcome, RankRemap, Relocation};
pub use outline::{Outline, OutlineNode};
pub use ranking::{next_rank, prev_rank, rank_after, rank_before};
pub use recent::{RecentEntry, RecentError, RecentNode, RecentlyEdited};
