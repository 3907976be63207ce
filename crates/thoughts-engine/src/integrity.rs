//! Read-triggered repair and whole-store audit.
//!
//! [`check_integrity`] looks at one location and repairs the first
//! divergence it finds between the two indexes, in a fixed order:
//!
//! 1. duplicate (value, rank) entries among the location's children
//! 2. children of the location whose value has no lexeme
//! 3. a lexeme missing its occurrence under the location's parent
//! 4. lexeme occurrences with no matching child entry
//! 5. an occurrence rank that disagrees with the listed child's rank
//!
//! Each repair is one committed mutation, logged at `warn`. The context
//! index is the rank of record.
//!
//! [`audit`] reports every violation of the bidirectional invariant in the
//! whole store without repairing anything.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use thoughts_core::{Child, Context, ContextKey, Path, Rank, Timestamp};
use thoughts_storage::{hash_context, normalize_value, ThoughtRead, ThoughtStore, ThoughtWrite};

use crate::config::EngineConfig;
use crate::mutation::{create_in, same_value, transact, Txn};

/// Result of one integrity check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IntegrityOutcome {
    NoOp,
    Repaired(RepairKind),
}

impl IntegrityOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, IntegrityOutcome::NoOp)
    }
}

/// Which repair was applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RepairKind {
    /// Entries repeating an earlier (value, rank) pair were dropped.
    DuplicateChildren { context: Context, removed: usize },
    /// Lexemes were recreated for listed children.
    MissingLexemes { context: Context, values: Vec<String> },
    /// The lexeme's occurrence under the parent was recreated.
    MissingOccurrence { context: Context, value: String },
    /// Child entries were appended for unmirrored occurrences.
    MissingChildren { value: String, contexts: Vec<Context> },
    /// The occurrence rank was overwritten with the listed rank.
    DivergentRank {
        context: Context,
        value: String,
        from: Rank,
        to: Rank,
    },
}

/// Checks the location `path` and repairs the first divergence found.
///
/// Always `NoOp` when `config.integrity_check` is off.
pub fn check_integrity<S: ThoughtStore>(
    store: &mut S,
    now: Timestamp,
    config: &EngineConfig,
    path: &Path,
) -> IntegrityOutcome {
    if !config.integrity_check || path.is_empty() {
        return IntegrityOutcome::NoOp;
    }
    let outcome = transact(store, now, config, |txn| repair(txn, path));
    if let IntegrityOutcome::Repaired(kind) = &outcome {
        warn!(%path, repair = ?kind, "repaired index divergence");
    }
    outcome
}

fn repair<S: ThoughtRead + ?Sized>(txn: &mut Txn<'_, S>, path: &Path) -> IntegrityOutcome {
    let now = txn.now;
    let own = path.to_context();
    let own_key = hash_context(&own);
    let children = txn.store.raw_children_at(&own_key).to_vec();

    // 1. duplicate children, first occurrence wins
    let mut seen = HashSet::new();
    let unique: Vec<Child> = children
        .iter()
        .filter(|c| seen.insert((normalize_value(&c.value), c.rank)))
        .cloned()
        .collect();
    if unique.len() < children.len() {
        let removed = children.len() - unique.len();
        txn.store.set_children_at(own_key, &own, unique, now);
        return IntegrityOutcome::Repaired(RepairKind::DuplicateChildren {
            context: own,
            removed,
        });
    }

    // 2. listed children without a lexeme
    let missing: Vec<Child> = children
        .into_iter()
        .filter(|c| txn.store.lexeme_of(&c.value).is_none())
        .collect();
    if !missing.is_empty() {
        for child in &missing {
            create_in(txn, &own, &child.value, child.rank);
        }
        return IntegrityOutcome::Repaired(RepairKind::MissingLexemes {
            context: own,
            values: missing.into_iter().map(|c| c.value).collect(),
        });
    }

    let Some(head) = path.head() else {
        return IntegrityOutcome::NoOp;
    };
    let context = path.parent_context();
    let key = hash_context(&context);
    let Some(lexeme) = txn.store.lexeme_of(&head.value).cloned() else {
        return IntegrityOutcome::NoOp;
    };

    // 3. occurrence under the parent
    let Some(occurrence) = lexeme
        .contexts
        .iter()
        .find(|o| hash_context(&o.context) == key)
        .cloned()
    else {
        create_in(txn, &context, &head.value, head.rank);
        return IntegrityOutcome::Repaired(RepairKind::MissingOccurrence {
            context,
            value: head.value.clone(),
        });
    };

    // 4. occurrences with no child entry
    let mut restored = Vec::new();
    for occ in &lexeme.contexts {
        let occ_key = hash_context(&occ.context);
        if txn.find_child(&occ_key, &lexeme.value).is_none() {
            let child = Child::new(lexeme.value.clone(), occ.rank, now);
            txn.replace_child(&occ.context, &occ_key, &lexeme.value, child);
            restored.push(occ.context.clone());
        }
    }
    if !restored.is_empty() {
        return IntegrityOutcome::Repaired(RepairKind::MissingChildren {
            value: lexeme.value,
            contexts: restored,
        });
    }

    // 5. rank drift
    if let Some(child) = txn.find_child(&key, &head.value) {
        if child.rank != occurrence.rank {
            txn.add_occurrence(&context, &key, &head.value, child.rank);
            return IntegrityOutcome::Repaired(RepairKind::DivergentRank {
                context,
                value: head.value.clone(),
                from: occurrence.rank,
                to: child.rank,
            });
        }
    }

    IntegrityOutcome::NoOp
}

/// One breach of the bidirectional invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Violation {
    /// A context row with no children.
    EmptyRow { context: Context },
    /// Two entries with the same value in one row.
    DuplicateChild { context: Context, value: String },
    /// A listed child whose value has no lexeme.
    DanglingChild { context: Context, value: String },
    /// A listed child whose lexeme lacks the occurrence.
    MissingOccurrence { context: Context, value: String },
    /// A listed child whose occurrence carries another rank.
    RankMismatch {
        context: Context,
        value: String,
        listed: Rank,
        recorded: Rank,
    },
    /// An occurrence with no listed child.
    MissingChild { context: Context, value: String },
    /// Two occurrences of one value under the same context.
    DuplicateOccurrence { context: Context, value: String },
    /// A lexeme with no occurrences.
    OrphanLexeme { value: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::EmptyRow { context } => write!(f, "empty row at {}", context),
            Violation::DuplicateChild { context, value } => {
                write!(f, "duplicate child '{}' under {}", value, context)
            }
            Violation::DanglingChild { context, value } => {
                write!(f, "child '{}' under {} has no lexeme", value, context)
            }
            Violation::MissingOccurrence { context, value } => {
                write!(f, "lexeme '{}' does not record {}", value, context)
            }
            Violation::RankMismatch {
                context,
                value,
                listed,
                recorded,
            } => write!(
                f,
                "'{}' under {} listed at {} but recorded at {}",
                value, context, listed, recorded
            ),
            Violation::MissingChild { context, value } => {
                write!(f, "lexeme '{}' records {} but is not listed there", value, context)
            }
            Violation::DuplicateOccurrence { context, value } => {
                write!(f, "lexeme '{}' records {} twice", value, context)
            }
            Violation::OrphanLexeme { value } => write!(f, "lexeme '{}' has no occurrences", value),
        }
    }
}

/// Every violation in `store`, sorted by description.
pub fn audit<S: ThoughtStore + ?Sized>(store: &S) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (key, entry) in store.parents() {
        if entry.children.is_empty() {
            violations.push(Violation::EmptyRow {
                context: entry.context.clone(),
            });
        }
        let mut seen = HashSet::new();
        for child in &entry.children {
            let context = entry.context.clone();
            let value = child.value.clone();
            if !seen.insert(normalize_value(&child.value)) {
                violations.push(Violation::DuplicateChild { context, value });
                continue;
            }
            let Some(lexeme) = store.lexeme_of(&child.value) else {
                violations.push(Violation::DanglingChild { context, value });
                continue;
            };
            match occurrence_rank(&lexeme.contexts, key) {
                None => violations.push(Violation::MissingOccurrence { context, value }),
                Some(recorded) if recorded != child.rank => {
                    violations.push(Violation::RankMismatch {
                        context,
                        value,
                        listed: child.rank,
                        recorded,
                    })
                }
                Some(_) => {}
            }
        }
    }

    for (_, lexeme) in store.lexemes() {
        if lexeme.is_orphan() {
            violations.push(Violation::OrphanLexeme {
                value: lexeme.value.clone(),
            });
        }
        let mut seen = HashSet::new();
        for occ in &lexeme.contexts {
            let key = hash_context(&occ.context);
            let context = occ.context.clone();
            let value = lexeme.value.clone();
            if !seen.insert(key) {
                violations.push(Violation::DuplicateOccurrence { context, value });
                continue;
            }
            let listed = store
                .raw_children_at(&key)
                .iter()
                .any(|c| same_value(&c.value, &lexeme.value));
            if !listed {
                violations.push(Violation::MissingChild { context, value });
            }
        }
    }

    violations.sort_by_key(|v| v.to_string());
    violations
}

fn occurrence_rank(contexts: &[thoughts_core::ThoughtContext], key: &ContextKey) -> Option<Rank> {
    contexts
        .iter()
        .find(|o| hash_context(&o.context) == *key)
        .map(|o| o.rank)
}
