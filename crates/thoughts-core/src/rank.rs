//! Sibling order keys.
//!
//! A [`Rank`] only orders children of one parent. Ranks are not dense and
//! are never renumbered globally: inserting between two siblings takes the
//! midpoint, so ranks drift into fractions over time.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Orderable sibling key. Total order via `f64::total_cmp`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(pub f64);

impl Rank {
    pub const ZERO: Rank = Rank(0.0);

    pub fn value(self) -> f64 {
        self.0
    }

    /// Midpoint between two ranks.
    pub fn between(a: Rank, b: Rank) -> Rank {
        Rank((a.0 + b.0) / 2.0)
    }

    pub fn offset(self, delta: f64) -> Rank {
        Rank(self.0 + delta)
    }
}

impl PartialEq for Rank {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Rank {}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for Rank {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // -0.0 and 0.0 compare unequal under total_cmp, so bits are consistent with Eq.
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for Rank {
    fn from(v: f64) -> Self {
        Rank(v)
    }
}

impl From<i32> for Rank {
    fn from(v: i32) -> Self {
        Rank(v as f64)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
