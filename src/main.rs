//! # Lorekeeper CLI (`lore`)
//!
//! The `lore` binary is the primary interface for Lorekeeper. It scans a
//! manuscript corpus into a validated Snapshot and reports on the persisted
//! artifact.
//!
//! ## Usage
//!
//! ```bash
//! lore --config ./lore.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lore scan` | Scan the corpus and write the snapshot artifact |
//! | `lore stats` | Print aggregate statistics from the persisted artifact |
//!
//! ## Examples
//!
//! ```bash
//! # Incremental scan of ./lore under the current directory
//! lore scan
//!
//! # Scan a different corpus root, re-parsing everything
//! lore scan --root ~/books/saga --mode full
//!
//! # Validate strictly without touching the cache artifact
//! lore scan --strict --no-write-cache
//!
//! # Inspect the artifact a previous scan wrote
//! lore stats --root ~/books/saga
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use lorekeeper::cache::{CacheStore, JsonCacheStore};
use lorekeeper::config::{self, Config};
use lorekeeper::diagnostics::Severity;
use lorekeeper::models::EntityKind;
use lorekeeper::scan::{run_scan, ScanMode, ScanOptions};
use lorekeeper::snapshot::Snapshot;

/// Lorekeeper CLI — an incremental scan engine for novel manuscript corpora.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Every setting has a default, so the file is optional.
#[derive(Parser)]
#[command(
    name = "lore",
    about = "Lorekeeper — an incremental scan engine for novel manuscript corpora",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./lore.toml`. Naming patterns, feature toggles,
    /// collation, and the cache file name are read from this file; a
    /// missing file at the default path means built-in defaults.
    #[arg(long, global = true, default_value = "./lore.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Scan the corpus into a snapshot.
    ///
    /// Discovers entity documents under `<root>/<entity-root>`, reuses
    /// cached results for unchanged files, parses the rest, validates
    /// cross-entity references, and writes the snapshot artifact.
    Scan {
        /// Manuscript root directory.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Entity subdirectory name under the root.
        #[arg(long, default_value = "lore")]
        entity_root: String,

        /// Scan mode: reuse cached results or re-parse everything.
        #[arg(long, value_enum, default_value = "incremental")]
        mode: ScanMode,

        /// Escalate warning diagnostics to errors.
        #[arg(long)]
        strict: bool,

        /// Do not write the snapshot artifact back to disk.
        #[arg(long)]
        no_write_cache: bool,
    },

    /// Print statistics from the persisted snapshot artifact.
    ///
    /// Reads the artifact written by a previous `lore scan`; never scans
    /// or touches the corpus itself.
    Stats {
        /// Manuscript root directory.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Scan {
            root,
            entity_root,
            mode,
            strict,
            no_write_cache,
        } => {
            let store = JsonCacheStore::new(root.join(&config.cache.file));
            let options = ScanOptions {
                root,
                entity_root,
                mode,
                strict,
                write_cache: !no_write_cache,
            };
            let snapshot = run_scan(&options, &config, &store)?;
            print_scan_report(&snapshot);
            if count_severity(&snapshot, Severity::Error) > 0 {
                std::process::exit(1);
            }
        }
        Commands::Stats { root } => {
            let store = JsonCacheStore::new(root.join(&config.cache.file));
            let Some(snapshot) = store.load() else {
                bail!(
                    "No snapshot artifact at {}. Run `lore scan` first.",
                    store.path().display()
                );
            };
            print_stats_report(&snapshot);
        }
    }

    Ok(())
}

/// A missing config file is not an error: every setting has a default.
fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        Ok(Config::default())
    }
}

fn count_severity(snapshot: &Snapshot, severity: Severity) -> usize {
    snapshot
        .diagnostics
        .iter()
        .filter(|d| d.severity == severity)
        .count()
}

fn print_scan_report(snapshot: &Snapshot) {
    let stats = &snapshot.stats;
    println!(
        "Scanned {} files in {} ms ({} fast, {} hash, {} parsed)",
        stats.files_scanned, stats.duration_ms, stats.fast_hits, stats.hash_hits, stats.misses
    );
    let counts: Vec<String> = EntityKind::ALL
        .iter()
        .map(|kind| format!("{}s: {}", kind.label(), stats.entity_count(*kind)))
        .collect();
    println!("  {}", counts.join("  "));

    if snapshot.diagnostics.is_empty() {
        println!("No diagnostics.");
        return;
    }
    println!(
        "Diagnostics: {} error(s), {} warning(s), {} info",
        count_severity(snapshot, Severity::Error),
        count_severity(snapshot, Severity::Warn),
        count_severity(snapshot, Severity::Info)
    );
    for diagnostic in &snapshot.diagnostics {
        println!("  {}", diagnostic);
    }
}

fn print_stats_report(snapshot: &Snapshot) {
    println!("Snapshot of {} (generated {})", snapshot.root, snapshot.generated_at);
    println!(
        "  files: {}  entities: {}",
        snapshot.stats.files_scanned,
        snapshot.stats.total_entities()
    );
    for kind in EntityKind::ALL {
        println!("  {}s: {}", kind.label(), snapshot.entity_count(kind));
    }
    println!(
        "  last run: {} fast, {} hash, {} parsed, {} ms",
        snapshot.stats.fast_hits,
        snapshot.stats.hash_hits,
        snapshot.stats.misses,
        snapshot.stats.duration_ms
    );
    println!(
        "  diagnostics: {} error(s), {} warning(s), {} info",
        count_severity(snapshot, Severity::Error),
        count_severity(snapshot, Severity::Warn),
        count_severity(snapshot, Severity::Info)
    );
}
