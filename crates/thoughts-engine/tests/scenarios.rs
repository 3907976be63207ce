//! End-to-end outline scenarios.
//!
//! Each test drives a fresh `Outline` over an in-memory store with a manual
//! clock, then checks both indexes through the public read API and `audit`.

use thoughts_core::{
    Child, Context, Lexeme, ManualClock, ParentEntry, Path, Rank, Segment, ThoughtContext,
    Timestamp,
};
use thoughts_engine::{IntegrityOutcome, Outline, RepairKind};
use thoughts_storage::{InMemoryStore, ThoughtWrite};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn outline() -> Outline {
    Outline::new(InMemoryStore::new()).with_clock(ManualClock::default())
}

fn ctx(s: &str) -> Context {
    s.parse().unwrap()
}

fn path(s: &str) -> Path {
    s.parse().unwrap()
}

fn values(outline: &Outline, context: &str) -> Vec<String> {
    outline
        .children_of(&ctx(context))
        .into_iter()
        .map(|c| c.value)
        .collect()
}

fn contexts_of(outline: &Outline, value: &str) -> Vec<Context> {
    outline
        .lexeme_of(value)
        .map(|l| l.contexts.iter().map(|o| o.context.clone()).collect())
        .unwrap_or_default()
}

fn assert_consistent(outline: &Outline) {
    let violations = outline.audit();
    assert!(violations.is_empty(), "violations: {:?}", violations);
}

fn recent_paths(outline: &Outline) -> Vec<String> {
    outline
        .recent_entries(usize::MAX)
        .into_iter()
        .map(|e| e.path.to_string())
        .collect()
}

fn assert_recent_resolves(outline: &Outline) {
    for entry in outline.recent_entries(usize::MAX) {
        assert!(
            outline.path_of(&entry.path.to_context()).is_some(),
            "recently-edited entry under a missing path: {}",
            entry.path
        );
    }
}

// ---------------------------------------------------------------------------
// Rename
// ---------------------------------------------------------------------------

#[test]
fn test_rename_keeps_rank_and_position() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "b", Rank(1.0));

    let outcome = o.rename(&path("a@0"), "a", "aa");
    assert!(outcome.changed);
    assert!(!outcome.merged);
    assert_eq!(outcome.new_path, Some(path("aa@0")));

    insta::assert_snapshot!(o.outline_tree(&Context::root()).to_string(), @r"
- __ROOT__
  - aa
  - b
");
    assert!(o.lexeme_of("a").is_none());
    let aa = o.lexeme_of("aa").unwrap();
    assert_eq!(aa.contexts.len(), 1);
    assert_eq!(aa.contexts[0].rank, Rank(0.0));
    assert_consistent(&o);
}

#[test]
fn test_rename_case_only_changes_display() {
    let mut o = outline();
    o.create(&Context::root(), "apple", Rank(0.0));

    let outcome = o.rename(&path("apple@0"), "apple", "Apple");
    assert!(outcome.changed);
    assert_eq!(values(&o, ""), vec!["Apple"]);
    assert_eq!(o.lexeme_of("apple").unwrap().value, "Apple");
    assert_consistent(&o);
}

#[test]
fn test_rename_into_sibling_merges_subtrees() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "b", Rank(3.0));
    o.create(&ctx("a"), "x", Rank(0.0));
    o.create(&ctx("b"), "y", Rank(0.0));

    let outcome = o.rename(&path("a@0"), "a", "b");
    assert!(outcome.merged);
    assert_eq!(outcome.new_path, Some(path("b@3")));

    assert_eq!(values(&o, ""), vec!["b"]);
    assert_eq!(values(&o, "b"), vec!["y", "x"]);
    assert_eq!(contexts_of(&o, "x"), vec![ctx("b")]);
    assert!(o.lexeme_of("a").is_none());
    assert_consistent(&o);
}

#[test]
fn test_rename_merge_keeps_sibling_display() {
    let mut o = outline();
    o.create(&Context::root(), "x", Rank(0.0));
    o.create(&Context::root(), "Fruit", Rank(1.0));

    let outcome = o.rename(&path("x@0"), "x", "fruit");
    assert!(outcome.merged);
    assert_eq!(outcome.new_path, Some(path("Fruit@1")));
    assert_eq!(values(&o, ""), vec!["Fruit"]);
    assert_eq!(o.lexeme_of("fruit").unwrap().value, "Fruit");
    assert_consistent(&o);
}

#[test]
fn test_rename_missing_is_noop() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    let outcome = o.rename(&path("zzz@0"), "zzz", "q");
    assert!(!outcome.changed);
    assert_eq!(values(&o, ""), vec!["a"]);
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

#[test]
fn test_move_merge_collapses_duplicate() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "c", Rank(1.0));
    o.create(&ctx("a"), "b", Rank(0.0));
    o.create(&ctx("a/b"), "x", Rank(0.0));
    o.create(&ctx("c"), "b", Rank(5.0));
    o.create(&ctx("c/b"), "y", Rank(0.0));
    let created = o.lexeme_of("b").unwrap().created;

    let outcome = o.move_thought(&path("a@0/b@0"), &path("c@1/b@0"));
    assert!(outcome.changed);
    assert!(outcome.merged);
    // the existing sibling's rank wins
    assert_eq!(outcome.new_path, Some(path("c@1/b@5")));

    assert!(o.children_of(&ctx("a")).is_empty());
    let under_c = o.children_of(&ctx("c"));
    assert_eq!(under_c.len(), 1);
    assert_eq!(under_c[0].rank, Rank(5.0));
    assert_eq!(values(&o, "c/b"), vec!["y", "x"]);

    let b = o.lexeme_of("b").unwrap();
    assert_eq!(b.contexts.len(), 1);
    assert_eq!(b.contexts[0].context, ctx("c"));
    assert_eq!(b.created, created);
    assert_consistent(&o);
}

#[test]
fn test_move_rewrites_descendants_into_empty_context() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "root2", Rank(1.0));
    o.create(&ctx("a"), "b", Rank(0.0));
    o.create(&ctx("a/b"), "c", Rank(7.0));
    o.create(&ctx("a/b/c"), "d", Rank(2.0));

    let outcome = o.move_thought(&path("a@0/b@0"), &path("root2@1/b@3"));
    assert!(outcome.changed);
    assert!(!outcome.merged);

    let moved = o.children_of(&ctx("root2"));
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].rank, Rank(3.0));
    // ranks survive when the destination level was empty
    assert_eq!(o.children_of(&ctx("root2/b"))[0].rank, Rank(7.0));
    assert_eq!(o.children_of(&ctx("root2/b/c"))[0].rank, Rank(2.0));
    assert_eq!(contexts_of(&o, "c"), vec![ctx("root2/b")]);
    assert_eq!(contexts_of(&o, "d"), vec![ctx("root2/b/c")]);

    let remapped: Vec<&str> = outcome.remaps.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(remapped, vec!["c", "d"]);
    assert_eq!(outcome.remaps[0].old_context, ctx("a/b"));
    assert_eq!(outcome.remaps[0].new_context, ctx("root2/b"));
    assert_consistent(&o);
}

#[test]
fn test_move_into_own_subtree_is_refused() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&ctx("a"), "b", Rank(0.0));

    let outcome = o.move_thought(&path("a@0"), &path("a@0/b@0/a@0"));
    assert!(!outcome.changed);
    assert_eq!(values(&o, ""), vec!["a"]);
    assert_eq!(values(&o, "a"), vec!["b"]);
    assert_consistent(&o);
}

#[test]
fn test_reorder_within_context() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "b", Rank(1.0));

    let outcome = o.move_thought(&path("a@0"), &path("a@2"));
    assert!(outcome.changed);
    assert_eq!(values(&o, ""), vec!["b", "a"]);
    assert_eq!(o.lexeme_of("a").unwrap().contexts[0].rank, Rank(2.0));
    assert_consistent(&o);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn test_delete_cascades_over_subtree() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "d", Rank(1.0));
    o.create(&ctx("a"), "b", Rank(0.0));
    o.create(&ctx("a/b"), "c", Rank(0.0));
    o.create(&ctx("d"), "c", Rank(0.0));

    let outcome = o.delete("a", &Context::root());
    assert!(outcome.changed);

    assert_eq!(values(&o, ""), vec!["d"]);
    assert!(o.lexeme_of("a").is_none());
    assert!(o.lexeme_of("b").is_none());
    assert_eq!(contexts_of(&o, "c"), vec![ctx("d")]);
    assert!(o.children_of(&ctx("a/b")).is_empty());
    assert_consistent(&o);
}

#[test]
fn test_delete_value_removes_every_occurrence() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "b", Rank(1.0));
    o.create(&ctx("a"), "x", Rank(0.0));
    o.create(&ctx("b"), "x", Rank(0.0));
    o.create(&ctx("b/x"), "y", Rank(0.0));

    let outcome = o.delete_value("x");
    assert!(outcome.changed);
    assert!(o.lexeme_of("x").is_none());
    assert!(o.lexeme_of("y").is_none());
    assert!(o.children_of(&ctx("a")).is_empty());
    assert!(o.children_of(&ctx("b")).is_empty());
    assert_eq!(o.store().lexeme_count(), 2);
    assert_consistent(&o);
}

#[test]
fn test_delete_everything_empties_store() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&ctx("a"), "b", Rank(0.0));
    o.delete("a", &Context::root());
    assert_eq!(o.store().lexeme_count(), 0);
    assert_eq!(o.store().parent_count(), 0);
}

// ---------------------------------------------------------------------------
// Recently edited
// ---------------------------------------------------------------------------

#[test]
fn test_recent_follows_rename_and_delete() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "b", Rank(1.0));
    o.rename(&path("a@0"), "a", "aa");

    let entries = o.recent_entries(10);
    let paths: Vec<String> = entries.iter().map(|e| e.path.to_string()).collect();
    assert_eq!(paths, vec!["aa@0", "b@1"]);

    o.delete("aa", &Context::root());
    let paths: Vec<String> = o
        .recent_entries(10)
        .iter()
        .map(|e| e.path.to_string())
        .collect();
    assert_eq!(paths, vec!["b@1"]);
}

#[test]
fn test_recent_follows_move() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "b", Rank(1.0));
    o.create(&ctx("a"), "x", Rank(0.0));

    o.move_thought(&path("a@0/x@0"), &path("b@1/x@4"));
    let latest = o.recent_entries(1);
    assert_eq!(latest[0].path, path("b@1/x@4"));
    assert!(o
        .recent_entries(10)
        .iter()
        .all(|e| !e.path.starts_with(&path("a@0/x@0"))));
    assert_recent_resolves(&o);
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

fn ts(ms: i64) -> Timestamp {
    Timestamp::from_millis(ms)
}

fn occurrence(context: Context, rank: f64) -> ThoughtContext {
    ThoughtContext {
        context,
        rank: Rank(rank),
        last_updated: Some(ts(1)),
    }
}

#[test]
fn test_integrity_repairs_rank_drift_once() {
    let mut store = InMemoryStore::new();
    store.set_children(&Context::root(), vec![Child::new("a", Rank(0.0), ts(1))], ts(1));
    let mut lexeme = Lexeme::new("a", ts(1));
    lexeme.contexts.push(occurrence(Context::root(), 5.0));
    store.put_lexeme(lexeme);

    let mut o = Outline::new(store).with_clock(ManualClock::default());
    assert_eq!(o.audit().len(), 1);

    let first = o.check_integrity(&path("a@0"));
    assert_eq!(
        first,
        IntegrityOutcome::Repaired(RepairKind::DivergentRank {
            context: Context::root(),
            value: "a".to_string(),
            from: Rank(5.0),
            to: Rank(0.0),
        })
    );
    assert!(o.check_integrity(&path("a@0")).is_noop());
    assert_consistent(&o);
}

#[test]
fn test_integrity_recreates_missing_lexemes() {
    let mut store = InMemoryStore::new();
    store.set_children(&Context::root(), vec![Child::new("a", Rank(0.0), ts(1))], ts(1));
    store.set_children(&ctx("a"), vec![Child::new("ghost", Rank(2.0), ts(1))], ts(1));
    let mut lexeme = Lexeme::new("a", ts(1));
    lexeme.contexts.push(occurrence(Context::root(), 0.0));
    store.put_lexeme(lexeme);

    let mut o = Outline::new(store).with_clock(ManualClock::default());
    // dangling children are hidden from reads
    assert!(o.children_of(&ctx("a")).is_empty());

    let repaired = o.check_integrity(&path("a@0"));
    assert!(matches!(
        repaired,
        IntegrityOutcome::Repaired(RepairKind::MissingLexemes { .. })
    ));
    assert_eq!(values(&o, "a"), vec!["ghost"]);
    assert_eq!(o.lexeme_of("ghost").unwrap().contexts[0].rank, Rank(2.0));
    assert!(o.check_integrity(&path("a@0")).is_noop());
    assert_consistent(&o);
}

#[test]
fn test_integrity_disabled_is_noop() {
    let mut store = InMemoryStore::new();
    store.insert_parent_row(
        thoughts_storage::hash_context(&Context::root()),
        ParentEntry::new(
            Context::root(),
            vec![Child::new("a", Rank(0.0), ts(1))],
            ts(1),
        ),
    );
    let config = thoughts_engine::EngineConfig {
        integrity_check: false,
        ..Default::default()
    };
    let mut o = Outline::new(store)
        .with_clock(ManualClock::default())
        .with_config(config);
    assert!(o.check_integrity(&path("a@0")).is_noop());
    assert_eq!(o.audit().len(), 1);
}

// ---------------------------------------------------------------------------
// Composite edits
// ---------------------------------------------------------------------------

#[test]
fn test_move_up_and_down_swap_siblings() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "b", Rank(1.0));
    o.create(&Context::root(), "c", Rank(2.0));

    o.move_up(&path("c@2"));
    assert_eq!(values(&o, ""), vec!["a", "c", "b"]);

    let c = o.children_of(&Context::root())[1].clone();
    o.move_down(&Path::new(vec![Segment::new(c.value, c.rank)]));
    assert_eq!(values(&o, ""), vec!["a", "b", "c"]);
    assert_consistent(&o);
}

#[test]
fn test_move_up_first_child_goes_to_previous_uncle() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "b", Rank(1.0));
    o.create(&ctx("a"), "x", Rank(0.0));
    o.create(&ctx("b"), "y", Rank(0.0));

    let outcome = o.move_up(&path("b@1/y@0"));
    assert!(outcome.changed);
    assert_eq!(values(&o, "a"), vec!["x", "y"]);
    assert!(o.children_of(&ctx("b")).is_empty());
    assert_consistent(&o);
}

#[test]
fn test_subcategorize_all_groups_siblings() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&Context::root(), "b", Rank(1.0));

    let outcome = o.subcategorize_all(&path("a@0"));
    assert!(outcome.changed);
    assert_eq!(values(&o, ""), vec![""]);
    let grouped = o.children_of(&Context::new([""]));
    let grouped: Vec<(String, Rank)> = grouped.into_iter().map(|c| (c.value, c.rank)).collect();
    assert_eq!(
        grouped,
        vec![("a".to_string(), Rank(0.0)), ("b".to_string(), Rank(1.0))]
    );
    assert_consistent(&o);
}

#[test]
fn test_subcategorize_all_relocates_recent_edits() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&ctx("a"), "x", Rank(0.0));
    o.create(&Context::root(), "b", Rank(1.0));

    let outcome = o.subcategorize_all(&path("a@0"));
    assert!(outcome.changed);
    assert_eq!(outcome.relocations.len(), 2);
    assert_eq!(recent_paths(&o), vec!["@-1/b@1", "@-1/a@0/x@0"]);
    assert_recent_resolves(&o);
}

#[test]
fn test_bump_down_moves_text_into_child() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&ctx("a"), "x", Rank(0.0));

    let outcome = o.bump_down(&path("a@0"));
    assert!(outcome.changed);
    assert_eq!(values(&o, ""), vec![""]);
    assert_eq!(
        o.outline_tree(&Context::root()).to_string(),
        "- __ROOT__\n  - \n    - a\n    - x\n"
    );
    assert_eq!(contexts_of(&o, "a"), vec![Context::new([""])]);
    assert_consistent(&o);
}

#[test]
fn test_bump_down_relocates_recent_edits() {
    let mut o = outline();
    o.create(&Context::root(), "a", Rank(0.0));
    o.create(&ctx("a"), "x", Rank(0.0));

    o.bump_down(&path("a@0"));
    assert_eq!(recent_paths(&o), vec!["@0/a@-1", "@0/x@0"]);
    assert_recent_resolves(&o);
}

#[test]
fn test_split_sentences_creates_siblings_in_order() {
    let mut o = outline();
    o.create(&Context::root(), "One. Two. Three.", Rank(0.0));
    o.create(&Context::root(), "after", Rank(1.0));

    let outcome = o.split_sentences(&path("One. Two. Three.@0"));
    assert!(outcome.changed);
    assert_eq!(values(&o, ""), vec!["One.", "Two.", "Three.", "after"]);
    assert_consistent(&o);
}
