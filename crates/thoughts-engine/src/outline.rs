//! The composite handle over a store, its recently-edited index, a clock
//! and the engine config.
//!
//! [`Outline`] owns everything a mutation needs and passes it explicitly;
//! there is no global store. Reads delegate to the store. Writes run one
//! transaction, commit it, then bring the recently-edited index in line
//! with the outcome.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use thoughts_core::{
    Child, Clock, Context, Lexeme, Path, Rank, Segment, SystemClock, Timestamp, ROOT_TOKEN,
};
use thoughts_storage::{InMemoryStore, ThoughtStore};

use crate::config::EngineConfig;
use crate::edits::{
    bump_down_in, move_down_in, move_up_in, split_sentences_in, subcategorize_all_in,
};
use crate::integrity::{self, IntegrityOutcome, Violation};
use crate::mutation::{
    create_in, delete_in, delete_value_in, move_in, rename_in, same_value, transact,
    MutationOutcome, Relocation,
};
use crate::ranking;
use crate::recent::{RecentEntry, RecentlyEdited};

/// A nested, rank-ordered read of a subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineNode {
    pub value: String,
    pub rank: Rank,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}- {}", "", self.value, indent = depth * 2)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for OutlineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// A store plus everything needed to mutate it.
pub struct Outline<S: ThoughtStore = InMemoryStore> {
    store: S,
    recent: RecentlyEdited,
    clock: Box<dyn Clock>,
    config: EngineConfig,
}

impl Default for Outline<InMemoryStore> {
    fn default() -> Self {
        Outline::new(InMemoryStore::new())
    }
}

impl<S: ThoughtStore> Outline<S> {
    /// Wraps `store` with the system clock and default config.
    pub fn new(store: S) -> Self {
        Outline {
            store,
            recent: RecentlyEdited::new(),
            clock: Box::new(SystemClock::new()),
            config: EngineConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_recent(mut self, recent: RecentlyEdited) -> Self {
        self.recent = recent;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn recent(&self) -> &RecentlyEdited {
        &self.recent
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- reads ----

    pub fn lexeme_of(&self, value: &str) -> Option<&Lexeme> {
        self.store.lexeme_of(value)
    }

    /// Ranked children of `context`; dangling entries are omitted.
    pub fn children_of(&self, context: &Context) -> Vec<Child> {
        self.store.children_of(context)
    }

    pub fn path_to_context(&self, path: &Path) -> Context {
        path.to_context()
    }

    /// Resolves a context to the path through the listed children, or
    /// `None` if some step is not listed.
    pub fn path_of(&self, context: &Context) -> Option<Path> {
        let mut walked = Context::root();
        let mut segments = Vec::with_capacity(context.len());
        for value in context.values() {
            let child = self
                .store
                .children_of(&walked)
                .into_iter()
                .find(|c| same_value(&c.value, value))?;
            segments.push(Segment::new(child.value.clone(), child.rank));
            walked = walked.child(&child.value);
        }
        Some(Path::new(segments))
    }

    pub fn rank_after(&self, context: &Context, after: &Child) -> Rank {
        ranking::rank_after(&self.store, context, after, self.config.rank_increment)
    }

    pub fn rank_before(&self, context: &Context, before: &Child) -> Rank {
        ranking::rank_before(&self.store, context, before, self.config.rank_increment)
    }

    pub fn next_rank(&self, context: &Context) -> Rank {
        ranking::next_rank(&self.store, context)
    }

    pub fn prev_rank(&self, context: &Context) -> Rank {
        ranking::prev_rank(&self.store, context)
    }

    /// The subtree under `context`, rank ordered.
    pub fn outline_tree(&self, context: &Context) -> OutlineNode {
        let (value, rank) = match context.head() {
            Some(head) => {
                let rank = self
                    .path_of(context)
                    .and_then(|p| p.head().map(|s| s.rank))
                    .unwrap_or_default();
                (head.to_string(), rank)
            }
            None => (ROOT_TOKEN.to_string(), Rank::ZERO),
        };
        OutlineNode {
            value,
            rank,
            children: self.subtree(context),
        }
    }

    fn subtree(&self, context: &Context) -> Vec<OutlineNode> {
        self.store
            .children_of(context)
            .into_iter()
            .map(|child| OutlineNode {
                children: self.subtree(&context.child(&child.value)),
                value: child.value,
                rank: child.rank,
            })
            .collect()
    }

    // ---- writes ----

    /// Inserts `value` under `context` at `rank`.
    pub fn create(&mut self, context: &Context, value: &str, rank: Rank) -> MutationOutcome {
        let now = self.clock.now();
        let mut outcome = transact(&mut self.store, now, &self.config, |txn| {
            create_in(txn, context, value, rank)
        });
        if outcome.changed {
            outcome.new_path = self.path_of(&context.child(value));
            if let Some(path) = &outcome.new_path {
                self.recent = self.recent.touch(path, now);
            }
        }
        outcome
    }

    /// Changes the text of the node at `path` from `old_value` to `new_value`.
    pub fn rename(&mut self, path: &Path, old_value: &str, new_value: &str) -> MutationOutcome {
        let now = self.clock.now();
        let outcome = transact(&mut self.store, now, &self.config, |txn| {
            rename_in(txn, path, old_value, new_value)
        });
        self.follow(&outcome, now);
        outcome
    }

    /// Relocates the subtree at `old_path` to `new_path`.
    pub fn move_thought(&mut self, old_path: &Path, new_path: &Path) -> MutationOutcome {
        let now = self.clock.now();
        let outcome = transact(&mut self.store, now, &self.config, |txn| {
            move_in(txn, old_path, new_path)
        });
        self.follow(&outcome, now);
        outcome
    }

    /// Removes the occurrence of `value` under `context` and its subtree.
    pub fn delete(&mut self, value: &str, context: &Context) -> MutationOutcome {
        let removed_path = self.path_of(&context.child(value));
        let now = self.clock.now();
        let outcome = transact(&mut self.store, now, &self.config, |txn| {
            delete_in(txn, value, context)
        });
        if let (true, Some(path)) = (outcome.changed, removed_path) {
            self.recent = self.recent.remove(&path);
        }
        outcome
    }

    /// Removes `value` everywhere.
    pub fn delete_value(&mut self, value: &str) -> MutationOutcome {
        let removed: Vec<Path> = self
            .store
            .lexeme_of(value)
            .map(|l| {
                l.contexts
                    .iter()
                    .filter_map(|o| self.path_of(&o.context.child(value)))
                    .collect()
            })
            .unwrap_or_default();
        let now = self.clock.now();
        let outcome = transact(&mut self.store, now, &self.config, |txn| {
            delete_value_in(txn, value)
        });
        if outcome.changed {
            for path in &removed {
                self.recent = self.recent.remove(path);
            }
        }
        outcome
    }

    pub fn move_up(&mut self, path: &Path) -> MutationOutcome {
        let now = self.clock.now();
        let outcome = transact(&mut self.store, now, &self.config, |txn| move_up_in(txn, path));
        self.follow(&outcome, now);
        outcome
    }

    pub fn move_down(&mut self, path: &Path) -> MutationOutcome {
        let now = self.clock.now();
        let outcome = transact(&mut self.store, now, &self.config, |txn| {
            move_down_in(txn, path)
        });
        self.follow(&outcome, now);
        outcome
    }

    /// Groups `path` and all its siblings under a new empty thought.
    pub fn subcategorize_all(&mut self, path: &Path) -> MutationOutcome {
        let now = self.clock.now();
        let outcome = transact(&mut self.store, now, &self.config, |txn| {
            subcategorize_all_in(txn, path)
        });
        self.follow(&outcome, now);
        outcome
    }

    /// Moves the thought's text into a new first child and blanks it.
    pub fn bump_down(&mut self, path: &Path) -> MutationOutcome {
        let now = self.clock.now();
        let outcome = transact(&mut self.store, now, &self.config, |txn| {
            bump_down_in(txn, path)
        });
        self.follow(&outcome, now);
        outcome
    }

    pub fn split_sentences(&mut self, path: &Path) -> MutationOutcome {
        let now = self.clock.now();
        let outcome = transact(&mut self.store, now, &self.config, |txn| {
            split_sentences_in(txn, path)
        });
        self.follow(&outcome, now);
        outcome
    }

    // ---- integrity ----

    pub fn check_integrity(&mut self, path: &Path) -> IntegrityOutcome {
        let now = self.clock.now();
        integrity::check_integrity(&mut self.store, now, &self.config, path)
    }

    pub fn audit(&self) -> Vec<Violation> {
        integrity::audit(&self.store)
    }

    // ---- recently edited ----

    pub fn recent_entries(&self, limit: usize) -> Vec<RecentEntry> {
        self.recent.entries(limit)
    }

    /// Replays every relocation the edit made on the recently-edited index,
    /// then records the edit at its final path. A failed relocation is
    /// logged and skipped.
    fn follow(&mut self, outcome: &MutationOutcome, now: Timestamp) {
        if !outcome.changed {
            return;
        }
        for Relocation { from, to } in &outcome.relocations {
            match self.recent.relocate(from, to) {
                Ok(relocated) => self.recent = relocated,
                Err(e) => warn!(error = %e, %from, %to, "skipping recently-edited update"),
            }
        }
        if let Some(new) = &outcome.new_path {
            self.recent = self.recent.touch(new, now);
        }
    }
}
