//! Core data model for the thought outline.
//!
//! A thought outline is a graph of short text values. The same value may
//! appear under several parents, so identity lives in two denormalized
//! indexes kept in lock-step by the engine:
//!
//! - the **lexeme** index: value -> every `(context, rank)` it occurs at
//! - the **context** index: context -> its ranked children
//!
//! This crate only defines the shapes those indexes store. Hashing, storage
//! and mutation live in `thoughts-storage` and `thoughts-engine`.

pub mod error;
pub mod id;
pub mod path;
pub mod rank;
pub mod thought;
pub mod time;

// Re-export commonly used types
pub use error::CoreError;
pub use id::{ContextKey, ValueKey};
pub use path::{Context, Path, Segment, ROOT_TOKEN};
pub use rank::Rank;
pub use thought::{Child, Lexeme, ParentEntry, ThoughtContext};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
