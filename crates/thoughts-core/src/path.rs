//! Contexts and paths.
//!
//! A [`Context`] is an ancestor chain of values without ranks; it is the key
//! of "children of". A [`Path`] pins one concrete route through the graph as
//! a chain of `(value, rank)` [`Segment`]s. A path always carries strictly
//! more information than the context it projects to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;
use crate::rank::Rank;

/// Display token for the root context. A context that starts with this
/// token names the same chain as the context without it.
pub const ROOT_TOKEN: &str = "__ROOT__";

/// An ordered ancestor chain of values, root first. Empty is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(SmallVec<[String; 4]>);

impl Context {
    /// The root context.
    pub fn root() -> Self {
        Context(SmallVec::new())
    }

    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Context(values.into_iter().map(Into::into).collect()).unroot()
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The last value of the chain, `None` at the root.
    pub fn head(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// The chain without its last value, `None` at the root.
    pub fn parent(&self) -> Option<Context> {
        if self.0.is_empty() {
            return None;
        }
        let mut parent = self.0.clone();
        parent.pop();
        Some(Context(parent))
    }

    /// Extends the chain by one value.
    pub fn child(&self, value: &str) -> Context {
        let mut values = self.0.clone();
        values.push(value.to_string());
        Context(values)
    }

    /// Replaces the first `prefix.len()` values with `replacement`.
    ///
    /// The caller is responsible for `prefix` actually being a prefix.
    pub fn rebase(&self, prefix: &Context, replacement: &Context) -> Context {
        let mut values: SmallVec<[String; 4]> = replacement.0.clone();
        values.extend(self.0.iter().skip(prefix.len()).cloned());
        Context(values)
    }

    /// Drops a leading [`ROOT_TOKEN`].
    fn unroot(mut self) -> Self {
        if self.0.first().map(String::as_str) == Some(ROOT_TOKEN) {
            self.0.remove(0);
        }
        self
    }
}

impl<S: Into<String>> FromIterator<S> for Context {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Context::new(iter)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "{}", ROOT_TOKEN);
        }
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for Context {
    type Err = CoreError;

    /// Parses `a/b/c`. The empty string and `__ROOT__` are the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Context::root());
        }
        Ok(Context::new(trimmed.split('/')))
    }
}

/// One step of a [`Path`]: a value pinned to its rank under its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub value: String,
    pub rank: Rank,
}

impl Segment {
    pub fn new(value: impl Into<String>, rank: impl Into<Rank>) -> Self {
        Segment {
            value: value.into(),
            rank: rank.into(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value, self.rank)
    }
}

/// A concrete route from the root to one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn new(segments: Vec<Segment>) -> Self {
        Path(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn head(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// The path of the parent node. The parent of a top-level thought is
    /// the empty path.
    pub fn parent(&self) -> Path {
        let mut segments = self.0.clone();
        segments.pop();
        Path(segments)
    }

    /// Appends one segment.
    pub fn child(&self, segment: Segment) -> Path {
        let mut segments = self.0.clone();
        segments.push(segment);
        Path(segments)
    }

    /// Projects away the ranks.
    pub fn to_context(&self) -> Context {
        Context(self.0.iter().map(|s| s.value.clone()).collect())
    }

    /// The context this node lives in: the path's context minus its head.
    pub fn parent_context(&self) -> Context {
        self.parent().to_context()
    }

    /// Exact segment-wise prefix test.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// Replaces `prefix` with `replacement`; the caller ensures the prefix.
    pub fn rebase(&self, prefix: &Path, replacement: &Path) -> Path {
        let mut segments = replacement.0.clone();
        segments.extend(self.0.iter().skip(prefix.len()).cloned());
        Path(segments)
    }

    /// Returns this path with its head's rank replaced.
    pub fn with_head_rank(&self, rank: Rank) -> Path {
        let mut segments = self.0.clone();
        if let Some(last) = segments.last_mut() {
            last.rank = rank;
        }
        Path(segments)
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Path(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("/"))
    }
}

impl FromStr for Path {
    type Err = CoreError;

    /// Parses `a@0/b@1.5`. The value is everything before the last `@`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Path::default());
        }
        let mut segments = Vec::new();
        for raw in trimmed.split('/') {
            let (value, rank) = raw
                .rsplit_once('@')
                .ok_or_else(|| CoreError::MalformedSegment {
                    segment: raw.to_string(),
                })?;
            let rank: f64 = rank.parse().map_err(|_| CoreError::InvalidRank {
                segment: raw.to_string(),
                raw: rank.to_string(),
            })?;
            if !rank.is_finite() {
                return Err(CoreError::InvalidRank {
                    segment: raw.to_string(),
                    raw: rank.to_string(),
                });
            }
            segments.push(Segment::new(value, rank));
        }
        Ok(Path(segments))
    }
}
