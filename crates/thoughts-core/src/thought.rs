//! Rows of the two indexes.
//!
//! [`Lexeme`] is the value-keyed row: "this value, wherever it occurs".
//! [`ParentEntry`] is the context-keyed row: "the ranked children of this
//! context". The engine keeps every `(context, rank)` occurrence on a
//! lexeme mirrored by a [`Child`] in the matching parent entry, and vice
//! versa.

use serde::{Deserialize, Serialize};

use crate::path::Context;
use crate::rank::Rank;
use crate::time::Timestamp;

/// One child record inside a [`ParentEntry`].
///
/// `value` and `rank` default when absent from persisted data so a damaged
/// record loads as `""` at rank 0 instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub rank: Rank,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

impl Child {
    pub fn new(value: impl Into<String>, rank: Rank, last_updated: Timestamp) -> Self {
        Child {
            value: value.into(),
            rank,
            last_updated: Some(last_updated),
        }
    }
}

/// One occurrence of a lexeme: the context it appears in and its rank there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtContext {
    pub context: Context,
    #[serde(default)]
    pub rank: Rank,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

/// Every occurrence of one value across the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexeme {
    /// Display form of the value (original casing of the first occurrence).
    pub value: String,
    pub contexts: Vec<ThoughtContext>,
    pub created: Timestamp,
    pub last_updated: Timestamp,
}

impl Lexeme {
    /// A lexeme with no occurrences yet.
    pub fn new(value: impl Into<String>, now: Timestamp) -> Self {
        Lexeme {
            value: value.into(),
            contexts: Vec::new(),
            created: now,
            last_updated: now,
        }
    }

    /// An orphaned lexeme has no occurrences and must not be stored.
    pub fn is_orphan(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// The ranked children of one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentEntry {
    /// The context this row lists children for.
    pub context: Context,
    pub children: Vec<Child>,
    pub last_updated: Timestamp,
}

impl ParentEntry {
    pub fn new(context: Context, children: Vec<Child>, last_updated: Timestamp) -> Self {
        ParentEntry {
            context,
            children,
            last_updated,
        }
    }
}
