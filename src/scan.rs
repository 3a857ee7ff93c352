//! Scan pipeline orchestration.
//!
//! One `run_scan` call drives the whole engine: load the prior snapshot
//! (incremental mode only), discover files, classify each against the cache,
//! parse the misses, validate the collected entities, assemble the ordered
//! snapshot, and persist it back through the store. Single-threaded and
//! synchronous; at the corpus sizes this serves, hashing and parsing are
//! not the bottleneck worth a thread pool.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};

use crate::cache::{classify, CacheDecision, CacheIndex, CacheStore, FileStat};
use crate::config::Config;
use crate::discover::{absolute_path, discover};
use crate::extract::extract_entity;
use crate::models::{FileRecord, ScanStats};
use crate::snapshot::{Snapshot, SnapshotBuilder};
use crate::validate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ScanMode {
    /// Re-read and re-parse every file, ignoring any cache artifact.
    Full,
    /// Reuse prior results for files whose stat or content is unchanged.
    #[default]
    Incremental,
}

/// Invocation-level inputs. Everything else comes from [`Config`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub root: PathBuf,
    pub entity_root: String,
    pub mode: ScanMode,
    pub strict: bool,
    pub write_cache: bool,
}

/// Run one scan and return the assembled snapshot.
pub fn run_scan(
    options: &ScanOptions,
    config: &Config,
    store: &dyn CacheStore,
) -> Result<Snapshot> {
    let started = Instant::now();
    let root_key = options.root.to_string_lossy().to_string();

    let index = match options.mode {
        ScanMode::Incremental => store
            .load()
            .map(|prior| CacheIndex::from_snapshot(&prior, &root_key, &options.entity_root))
            .unwrap_or_default(),
        ScanMode::Full => CacheIndex::default(),
    };

    let discovery = discover(&options.root, &options.entity_root, config)?;
    tracing::debug!(
        files = discovery.file_count(),
        cached = index.len(),
        mode = ?options.mode,
        "discovery complete"
    );

    let mut builder = SnapshotBuilder::default();
    builder.push_global_diagnostics(discovery.diagnostics);
    let mut stats = ScanStats::default();

    for (kind, paths) in &discovery.files {
        for rel_path in paths {
            let abs = absolute_path(&options.root, &options.entity_root, rel_path);
            let metadata = std::fs::metadata(&abs)
                .with_context(|| format!("Failed to stat file: {}", abs.display()))?;
            let stat = FileStat {
                mtime_ms: mtime_millis(&metadata)?,
                size_bytes: metadata.len(),
            };

            let entry = index.get(rel_path);
            let decision = classify(&stat, entry, || read_file(&abs))?;
            match decision {
                CacheDecision::FastHit => {
                    stats.fast_hits += 1;
                    let entry = entry.expect("fast hit implies a cache entry");
                    builder.push_file(entry.record.clone());
                    if let Some(entity) = &entry.entity {
                        builder.push_entity(entity.clone());
                    }
                    builder.push_file_diagnostics(rel_path, entry.diagnostics.clone());
                }
                CacheDecision::HashHit { hash, .. } => {
                    stats.hash_hits += 1;
                    let entry = entry.expect("hash hit implies a cache entry");
                    // Content is unchanged; only the stat values refresh.
                    builder.push_file(FileRecord {
                        path: rel_path.clone(),
                        mtime_ms: stat.mtime_ms,
                        size_bytes: stat.size_bytes,
                        content_hash: hash,
                    });
                    if let Some(entity) = &entry.entity {
                        builder.push_entity(entity.clone());
                    }
                    builder.push_file_diagnostics(rel_path, entry.diagnostics.clone());
                }
                CacheDecision::Miss { hash, content } => {
                    stats.misses += 1;
                    builder.push_file(FileRecord {
                        path: rel_path.clone(),
                        mtime_ms: stat.mtime_ms,
                        size_bytes: stat.size_bytes,
                        content_hash: hash,
                    });
                    let parsed = extract_entity(*kind, rel_path, &content, config, options.strict);
                    if let Some(entity) = parsed.entity {
                        builder.push_entity(entity);
                    }
                    builder.push_file_diagnostics(rel_path, parsed.diagnostics);
                }
            }
        }
    }

    builder.push_global_diagnostics(validate(&builder, config, options.strict));

    stats.duration_ms = started.elapsed().as_millis() as u64;
    let snapshot = builder.assemble(
        root_key,
        options.entity_root.clone(),
        config.collation.mode,
        stats,
    );

    tracing::info!(
        files = snapshot.stats.files_scanned,
        entities = snapshot.stats.total_entities(),
        fast_hits = snapshot.stats.fast_hits,
        hash_hits = snapshot.stats.hash_hits,
        misses = snapshot.stats.misses,
        diagnostics = snapshot.diagnostics.len(),
        "scan complete"
    );

    if options.write_cache {
        store.save(&snapshot)?;
    }
    Ok(snapshot)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Modification time as signed milliseconds since the Unix epoch.
fn mtime_millis(metadata: &std::fs::Metadata) -> Result<i64> {
    let modified = metadata
        .modified()
        .context("Filesystem does not report modification times")?;
    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use std::fs;
    use tempfile::TempDir;

    fn write_corpus(root: &Path) {
        let base = root.join("lore");
        for dir in ["chapters", "characters", "threads", "factions", "locations"] {
            fs::create_dir_all(base.join(dir)).unwrap();
        }
        fs::write(
            base.join("chapters/ch-001.md"),
            "---\nchapter_id: ch-001\ntitle: Landfall\ncharacters: [char-mara]\n---\nBody.\n",
        )
        .unwrap();
        fs::write(
            base.join("characters/mara.md"),
            "---\nid: char-mara\nname: Mara\n---\nBody.\n",
        )
        .unwrap();
    }

    fn options(root: &Path, mode: ScanMode) -> ScanOptions {
        ScanOptions {
            root: root.to_path_buf(),
            entity_root: "lore".to_string(),
            mode,
            strict: false,
            write_cache: true,
        }
    }

    #[test]
    fn first_run_misses_everything_and_caches() {
        let tmp = TempDir::new().unwrap();
        write_corpus(tmp.path());
        let store = MemoryCacheStore::new();
        let config = Config::default();

        let snapshot =
            run_scan(&options(tmp.path(), ScanMode::Incremental), &config, &store).unwrap();
        assert_eq!(snapshot.stats.misses, 2);
        assert_eq!(snapshot.stats.fast_hits, 0);
        assert_eq!(snapshot.stats.chapters, 1);
        assert_eq!(snapshot.stats.characters, 1);
        assert!(store.load().is_some());
    }

    #[test]
    fn second_run_is_all_fast_hits() {
        let tmp = TempDir::new().unwrap();
        write_corpus(tmp.path());
        let store = MemoryCacheStore::new();
        let config = Config::default();
        let opts = options(tmp.path(), ScanMode::Incremental);

        let first = run_scan(&opts, &config, &store).unwrap();
        let second = run_scan(&opts, &config, &store).unwrap();
        assert_eq!(second.stats.fast_hits, 2);
        assert_eq!(second.stats.misses, 0);
        assert_eq!(
            serde_json::to_string(&first.chapters).unwrap(),
            serde_json::to_string(&second.chapters).unwrap()
        );
    }

    #[test]
    fn full_mode_ignores_the_cache() {
        let tmp = TempDir::new().unwrap();
        write_corpus(tmp.path());
        let store = MemoryCacheStore::new();
        let config = Config::default();

        run_scan(&options(tmp.path(), ScanMode::Incremental), &config, &store).unwrap();
        let full = run_scan(&options(tmp.path(), ScanMode::Full), &config, &store).unwrap();
        assert_eq!(full.stats.misses, 2);
        assert_eq!(full.stats.fast_hits, 0);
        assert_eq!(full.stats.hash_hits, 0);
    }

    #[test]
    fn write_cache_flag_skips_persistence() {
        let tmp = TempDir::new().unwrap();
        write_corpus(tmp.path());
        let store = MemoryCacheStore::new();
        let config = Config::default();
        let mut opts = options(tmp.path(), ScanMode::Incremental);
        opts.write_cache = false;

        run_scan(&opts, &config, &store).unwrap();
        assert!(store.load().is_none());
    }
}
