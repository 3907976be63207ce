//! The storage contract for the two indexes.
//!
//! Three layers:
//! - [`ThoughtRead`]: total, synchronous row reads plus the derived ranked
//!   children view. Implemented by stores and by [`Overlay`].
//! - [`ThoughtWrite`]: whole-row replacement. Also implemented by both.
//! - [`ThoughtStore`]: a backing store that can absorb a [`StoreDelta`] in
//!   one step and enumerate its rows.
//!
//! [`Overlay`]: crate::delta::Overlay

use thoughts_core::{Child, Context, ContextKey, Lexeme, ParentEntry, Timestamp, ValueKey};

use crate::delta::StoreDelta;
use crate::hash::{hash_context, hash_thought};

/// Row reads over both indexes.
pub trait ThoughtRead {
    /// The lexeme stored under `key`, if any.
    fn lexeme(&self, key: &ValueKey) -> Option<&Lexeme>;

    /// The parent entry stored under `key`, if any.
    fn parent(&self, key: &ContextKey) -> Option<&ParentEntry>;

    /// Looks a lexeme up by display value.
    fn lexeme_of(&self, value: &str) -> Option<&Lexeme> {
        self.lexeme(&hash_thought(value))
    }

    /// Stored children of a context, unfiltered and in stored order.
    fn raw_children_at(&self, key: &ContextKey) -> &[Child] {
        self.parent(key)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    /// Ranked children of a context.
    ///
    /// Sorted by rank ascending; equal ranks keep stored order. Children
    /// whose value has no lexeme are omitted so reads stay total while the
    /// indexes disagree.
    fn children_at(&self, key: &ContextKey) -> Vec<Child> {
        let mut children: Vec<Child> = self
            .raw_children_at(key)
            .iter()
            .filter(|child| self.lexeme(&hash_thought(&child.value)).is_some())
            .cloned()
            .collect();
        children.sort_by(|a, b| a.rank.cmp(&b.rank));
        children
    }

    /// Ranked children of a context. See [`ThoughtRead::children_at`].
    fn children_of(&self, context: &Context) -> Vec<Child> {
        self.children_at(&hash_context(context))
    }

    /// Stored children of a context. See [`ThoughtRead::raw_children_at`].
    fn raw_children(&self, context: &Context) -> Vec<Child> {
        self.raw_children_at(&hash_context(context)).to_vec()
    }
}

/// Whole-row writes. A write either fully replaces a row or does not happen.
pub trait ThoughtWrite {
    /// Replaces the lexeme for `lexeme.value`.
    fn put_lexeme(&mut self, lexeme: Lexeme);

    fn remove_lexeme(&mut self, key: &ValueKey);

    /// Replaces the children of the context with key `key`. An empty list
    /// removes the row.
    fn set_children_at(
        &mut self,
        key: ContextKey,
        context: &Context,
        children: Vec<Child>,
        now: Timestamp,
    );

    /// Replaces the children of `context`. An empty list removes the row.
    fn set_children(&mut self, context: &Context, children: Vec<Child>, now: Timestamp) {
        self.set_children_at(hash_context(context), context, children, now);
    }
}

/// A backing store for both indexes.
pub trait ThoughtStore: ThoughtRead + ThoughtWrite {
    /// Applies every row of `delta` as one unit.
    fn commit(&mut self, delta: StoreDelta);

    /// Every stored lexeme.
    fn lexemes(&self) -> Box<dyn Iterator<Item = (&ValueKey, &Lexeme)> + '_>;

    /// Every stored parent entry.
    fn parents(&self) -> Box<dyn Iterator<Item = (&ContextKey, &ParentEntry)> + '_>;
}

/// Builds the row for `context`, or `None` when it should not exist.
pub(crate) fn parent_row(
    context: &Context,
    children: Vec<Child>,
    now: Timestamp,
) -> Option<ParentEntry> {
    if children.is_empty() {
        None
    } else {
        Some(ParentEntry::new(context.clone(), children, now))
    }
}
