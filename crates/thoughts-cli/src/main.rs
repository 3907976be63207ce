//! Thought outline CLI.
//!
//! Provides the `thoughts` binary, which edits an outline stored as a JSON
//! snapshot. Every subcommand loads the snapshot, applies one operation
//! through `thoughts_engine::Outline` and, for edits, writes the snapshot
//! back. The recently-edited trie lives in a sidecar file next to it.

use std::path::{Path as FsPath, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use thoughts_core::{Context, CoreError, Path, Rank};
use thoughts_engine::{EngineConfig, MutationOutcome, Outline, RecentlyEdited};
use thoughts_storage::{Snapshot, StorageError};

/// Thought outline editor.
#[derive(Parser)]
#[command(name = "thoughts", about = "Edit a thought outline snapshot")]
struct Cli {
    /// Path to the snapshot file.
    #[arg(long, env = "THOUGHTS_SNAPSHOT", default_value = "thoughts.json")]
    snapshot: PathBuf,

    /// Skip read-triggered integrity repair.
    #[arg(long)]
    no_integrity_check: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Add a thought.
    Add {
        /// Text of the new thought.
        value: String,

        /// Parent context as `a/b` (default: root).
        #[arg(short, long, default_value = "")]
        under: String,

        /// Rank among siblings (default: after the last one).
        #[arg(short, long)]
        rank: Option<f64>,
    },

    /// Change the text of the thought at a path like `a@0/b@1`.
    Rename { path: String, new_value: String },

    /// Move the thought at one path to another.
    Move { from: String, to: String },

    /// Delete the thought at a path and everything below it.
    Delete {
        path: String,

        /// Delete every occurrence of the value instead.
        #[arg(long)]
        everywhere: bool,
    },

    /// Print the outline below a context.
    Show {
        #[arg(default_value = "")]
        context: String,

        /// Print JSON instead of an indented list.
        #[arg(long)]
        json: bool,
    },

    /// Repair one thought, then report every remaining violation.
    Check { path: Option<String> },

    /// List recently edited thoughts, newest first.
    Recent {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() {
    let filter =
        EnvFilter::try_from_env("THOUGHTS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig {
        integrity_check: !cli.no_integrity_check,
        ..EngineConfig::default()
    };
    let snapshot = cli.snapshot.as_path();

    let exit_code = match cli.command {
        Commands::Add { value, under, rank } => run_add(snapshot, config, &value, &under, rank),
        Commands::Rename { path, new_value } => run_rename(snapshot, config, &path, &new_value),
        Commands::Move { from, to } => run_move(snapshot, config, &from, &to),
        Commands::Delete { path, everywhere } => run_delete(snapshot, config, &path, everywhere),
        Commands::Show { context, json } => run_show(snapshot, config, &context, json),
        Commands::Check { path } => run_check(snapshot, config, path.as_deref()),
        Commands::Recent { limit } => run_recent(snapshot, config, limit),
    };
    process::exit(exit_code);
}

/// Execute the add subcommand.
fn run_add(
    snapshot: &FsPath,
    config: EngineConfig,
    value: &str,
    under: &str,
    rank: Option<f64>,
) -> i32 {
    let context: Context = match under.parse() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Some(raw) = rank.filter(|r| !r.is_finite()) {
        let e = CoreError::InvalidRank {
            segment: format!("{}@{}", value, raw),
            raw: raw.to_string(),
        };
        eprintln!("Error: {}", e);
        return 1;
    }
    edit(snapshot, config, |outline| {
        let rank = rank
            .map(Rank)
            .unwrap_or_else(|| outline.next_rank(&context));
        outline.create(&context, value, rank)
    })
}

/// Execute the rename subcommand.
fn run_rename(snapshot: &FsPath, config: EngineConfig, path: &str, new_value: &str) -> i32 {
    let path = match parse_path(path) {
        Ok(p) => p,
        Err(code) => return code,
    };
    edit(snapshot, config, |outline| {
        let old_value = path.head().map(|s| s.value.clone()).unwrap_or_default();
        outline.check_integrity(&path);
        outline.rename(&path, &old_value, new_value)
    })
}

/// Execute the move subcommand.
fn run_move(snapshot: &FsPath, config: EngineConfig, from: &str, to: &str) -> i32 {
    let (from, to) = match (parse_path(from), parse_path(to)) {
        (Ok(f), Ok(t)) => (f, t),
        (Err(code), _) | (_, Err(code)) => return code,
    };
    edit(snapshot, config, |outline| {
        outline.check_integrity(&from);
        outline.move_thought(&from, &to)
    })
}

/// Execute the delete subcommand.
fn run_delete(snapshot: &FsPath, config: EngineConfig, path: &str, everywhere: bool) -> i32 {
    let path = match parse_path(path) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let Some(head) = path.head().map(|s| s.value.clone()) else {
        eprintln!("Error: cannot delete the root");
        return 1;
    };
    edit(snapshot, config, |outline| {
        if everywhere {
            outline.delete_value(&head)
        } else {
            outline.delete(&head, &path.parent_context())
        }
    })
}

/// Execute the show subcommand.
fn run_show(snapshot: &FsPath, config: EngineConfig, context: &str, json: bool) -> i32 {
    let context: Context = match context.parse() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let outline = match load_outline(snapshot, config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: failed to load '{}': {}", snapshot.display(), e);
            return 3;
        }
    };
    let tree = outline.outline_tree(&context);
    if json {
        print_json(&tree);
    } else {
        print!("{}", tree);
    }
    0
}

/// Execute the check subcommand.
///
/// Returns 0 when the store is consistent after the optional repair, 1
/// when violations remain.
fn run_check(snapshot: &FsPath, config: EngineConfig, path: Option<&str>) -> i32 {
    let path = match path.map(parse_path).transpose() {
        Ok(p) => p,
        Err(code) => return code,
    };
    let mut outline = match load_outline(snapshot, config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: failed to load '{}': {}", snapshot.display(), e);
            return 3;
        }
    };

    if let Some(path) = &path {
        let outcome = outline.check_integrity(path);
        if !outcome.is_noop() {
            print_json(&outcome);
            if let Err(e) = save_outline(&outline, snapshot) {
                eprintln!("Error: failed to save '{}': {}", snapshot.display(), e);
                return 3;
            }
        }
    }

    let violations = outline.audit();
    for violation in &violations {
        println!("{}", violation);
    }
    if violations.is_empty() {
        0
    } else {
        eprintln!("{} violation(s)", violations.len());
        1
    }
}

/// Execute the recent subcommand.
fn run_recent(snapshot: &FsPath, config: EngineConfig, limit: usize) -> i32 {
    let outline = match load_outline(snapshot, config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: failed to load '{}': {}", snapshot.display(), e);
            return 3;
        }
    };
    print_json(&outline.recent_entries(limit));
    0
}

/// Loads the outline, applies `f`, saves it back and prints the outcome.
fn edit<F>(snapshot: &FsPath, config: EngineConfig, f: F) -> i32
where
    F: FnOnce(&mut Outline) -> MutationOutcome,
{
    let mut outline = match load_outline(snapshot, config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: failed to load '{}': {}", snapshot.display(), e);
            return 3;
        }
    };
    // saved even when unchanged: a read-triggered repair may have run
    let outcome = f(&mut outline);
    if let Err(e) = save_outline(&outline, snapshot) {
        eprintln!("Error: failed to save '{}': {}", snapshot.display(), e);
        return 3;
    }
    print_json(&outcome);
    0
}

fn parse_path(raw: &str) -> Result<Path, i32> {
    raw.parse().map_err(|e| {
        eprintln!("Error: {}", e);
        1
    })
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}

/// Where the recently-edited trie for `snapshot` is kept.
fn recent_path(snapshot: &FsPath) -> PathBuf {
    let mut name = snapshot.as_os_str().to_owned();
    name.push(".recent");
    PathBuf::from(name)
}

/// Opens the snapshot, or an empty outline when it does not exist yet.
fn load_outline(snapshot: &FsPath, config: EngineConfig) -> Result<Outline, StorageError> {
    let store = if snapshot.exists() {
        Snapshot::load(snapshot)?.restore()?
    } else {
        debug!(path = %snapshot.display(), "no snapshot yet; starting empty");
        Default::default()
    };
    let sidecar = recent_path(snapshot);
    let recent = if sidecar.exists() {
        let bytes = std::fs::read(&sidecar)?;
        serde_json::from_slice(&bytes)?
    } else {
        RecentlyEdited::new()
    };
    Ok(Outline::new(store).with_config(config).with_recent(recent))
}

fn save_outline(outline: &Outline, snapshot: &FsPath) -> Result<(), StorageError> {
    Snapshot::capture(outline.store()).save(snapshot)?;
    let json = serde_json::to_vec_pretty(outline.recent())?;
    std::fs::write(recent_path(snapshot), json)?;
    Ok(())
}
