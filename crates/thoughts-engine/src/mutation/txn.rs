//! Row-level primitives shared by every mutation.
//!
//! Each helper replaces whole rows on the overlay. Child rows are kept free
//! of same-value duplicates on every write.

use thoughts_core::{Child, Context, ContextKey, Lexeme, Rank, ThoughtContext, Timestamp};
use thoughts_storage::{
    hash_context, hash_thought, normalize_value, Overlay, StoreDelta, ThoughtRead, ThoughtWrite,
};

use crate::config::EngineConfig;

/// An open mutation: overlay, clock reading, config.
pub(crate) struct Txn<'a, S: ThoughtRead + ?Sized> {
    pub(crate) store: Overlay<'a, S>,
    pub(crate) now: Timestamp,
    pub(crate) config: &'a EngineConfig,
}

/// True when two display values share a lexeme.
pub(crate) fn same_value(a: &str, b: &str) -> bool {
    a == b || normalize_value(a) == normalize_value(b)
}

/// True when `context` is `ancestor` or lies below it.
pub(crate) fn is_within(context: &Context, ancestor: &Context) -> bool {
    context.len() >= ancestor.len()
        && context
            .values()
            .iter()
            .zip(ancestor.values())
            .all(|(a, b)| same_value(a, b))
}

impl<'a, S: ThoughtRead + ?Sized> Txn<'a, S> {
    pub(crate) fn new(base: &'a S, now: Timestamp, config: &'a EngineConfig) -> Self {
        Txn {
            store: Overlay::new(base),
            now,
            config,
        }
    }

    pub(crate) fn into_delta(self) -> StoreDelta {
        self.store.into_delta()
    }

    /// The stored child of `key` with the same value, dangling or not.
    pub(crate) fn find_child(&self, key: &ContextKey, value: &str) -> Option<Child> {
        self.store
            .raw_children_at(key)
            .iter()
            .find(|c| same_value(&c.value, value))
            .cloned()
    }

    /// The lexeme occurrence of `value` under the context with key `key`.
    pub(crate) fn occurrence(&self, value: &str, key: &ContextKey) -> Option<ThoughtContext> {
        self.store
            .lexeme_of(value)?
            .contexts
            .iter()
            .find(|o| hash_context(&o.context) == *key)
            .cloned()
    }

    /// Writes `child` over the entry for `old_value`, in place.
    ///
    /// Any other entry sharing either value is dropped. Appends when
    /// `old_value` is not listed.
    pub(crate) fn replace_child(
        &mut self,
        context: &Context,
        key: &ContextKey,
        old_value: &str,
        child: Child,
    ) {
        let mut children = Vec::new();
        let mut placed = false;
        for existing in self.store.raw_children_at(key) {
            let is_old = same_value(&existing.value, old_value);
            if is_old && !placed {
                children.push(child.clone());
                placed = true;
            } else if !is_old && !same_value(&existing.value, &child.value) {
                children.push(existing.clone());
            }
        }
        if !placed {
            children.push(child);
        }
        self.store.set_children_at(*key, context, children, self.now);
    }

    /// Drops every entry for `value`. An emptied row is removed.
    pub(crate) fn remove_child(&mut self, context: &Context, key: &ContextKey, value: &str) {
        let children = self.store.raw_children_at(key);
        if !children.iter().any(|c| same_value(&c.value, value)) {
            return;
        }
        let children: Vec<Child> = children
            .iter()
            .filter(|c| !same_value(&c.value, value))
            .cloned()
            .collect();
        self.store.set_children_at(*key, context, children, self.now);
    }

    /// Records `value` at `context`/`rank`, creating the lexeme if new.
    ///
    /// An existing occurrence for the same context is replaced in place.
    pub(crate) fn add_occurrence(
        &mut self,
        context: &Context,
        key: &ContextKey,
        value: &str,
        rank: Rank,
    ) {
        let now = self.now;
        let mut lexeme = self
            .store
            .lexeme_of(value)
            .cloned()
            .unwrap_or_else(|| Lexeme::new(value, now));
        let occurrence = ThoughtContext {
            context: context.clone(),
            rank,
            last_updated: Some(now),
        };
        place_occurrence(&mut lexeme, occurrence, |k| k == *key);
        lexeme.last_updated = now;
        self.store.put_lexeme(lexeme);
    }

    /// Drops the occurrence of `value` under `key`. An orphaned lexeme is
    /// removed.
    pub(crate) fn remove_occurrence(&mut self, key: &ContextKey, value: &str) {
        let Some(mut lexeme) = self.store.lexeme_of(value).cloned() else {
            return;
        };
        let before = lexeme.contexts.len();
        lexeme.contexts.retain(|o| hash_context(&o.context) != *key);
        if lexeme.contexts.len() == before {
            return;
        }
        if lexeme.is_orphan() {
            self.store.remove_lexeme(&hash_thought(value));
        } else {
            lexeme.last_updated = self.now;
            self.store.put_lexeme(lexeme);
        }
    }

    /// Rewrites the occurrence of `value` under `from` to sit under `to`.
    ///
    /// The lexeme is never dropped in between, so its creation time
    /// survives. An occurrence already under `to` is collapsed into the
    /// moved one.
    pub(crate) fn move_occurrence(
        &mut self,
        value: &str,
        from: &ContextKey,
        to: &Context,
        to_key: &ContextKey,
        rank: Rank,
    ) {
        let Some(mut lexeme) = self.store.lexeme_of(value).cloned() else {
            return;
        };
        let occurrence = ThoughtContext {
            context: to.clone(),
            rank,
            last_updated: Some(self.now),
        };
        place_occurrence(&mut lexeme, occurrence, |k| k == *from || k == *to_key);
        lexeme.last_updated = self.now;
        self.store.put_lexeme(lexeme);
    }

    /// Sets the display text of the lexeme for `value` to `value`.
    pub(crate) fn set_display(&mut self, value: &str) {
        if let Some(mut lexeme) = self.store.lexeme_of(value).cloned() {
            if lexeme.value != value {
                lexeme.value = value.to_string();
                lexeme.last_updated = self.now;
                self.store.put_lexeme(lexeme);
            }
        }
    }
}

/// Replaces every occurrence whose context key matches with `occurrence`,
/// at the position of the first match.
fn place_occurrence<F>(lexeme: &mut Lexeme, occurrence: ThoughtContext, matches: F)
where
    F: Fn(ContextKey) -> bool,
{
    let position = lexeme
        .contexts
        .iter()
        .position(|o| matches(hash_context(&o.context)));
    lexeme
        .contexts
        .retain(|o| !matches(hash_context(&o.context)));
    match position {
        Some(i) => lexeme.contexts.insert(i.min(lexeme.contexts.len()), occurrence),
        None => lexeme.contexts.push(occurrence),
    }
}
