//! Library-level pipeline tests: full scans against a temp corpus with an
//! in-memory cache store, exercising incremental reuse, validation, and
//! ordering guarantees end to end.

use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tempfile::TempDir;

use lorekeeper::cache::MemoryCacheStore;
use lorekeeper::config::Config;
use lorekeeper::diagnostics::Severity;
use lorekeeper::scan::{run_scan, ScanMode, ScanOptions};
use lorekeeper::snapshot::Snapshot;

fn write_corpus(root: &Path) -> PathBuf {
    let base = root.join("lore");
    for dir in ["chapters", "characters", "threads", "factions", "locations"] {
        fs::create_dir_all(base.join(dir)).unwrap();
    }
    fs::write(
        base.join("chapters/ch-001.md"),
        "---\nchapter_id: ch-001\ntitle: Landfall\npov: char-mara\n\
         characters: [char-mara, char-oren]\nthreads: [thr-rebellion]\n\
         factions: [fac-guild]\nlocations: [loc-harbor]\n---\nShe came ashore at dusk.\n",
    )
    .unwrap();
    fs::write(
        base.join("chapters/ch-002.md"),
        "---\nchapter_id: ch-002\ntitle: The Ledger\ncharacters: [char-oren]\n---\nBody.\n",
    )
    .unwrap();
    fs::write(
        base.join("characters/mara.md"),
        "---\nid: char-mara\nname: Mara Voss\naliases: [the ferrywoman]\nfaction: fac-guild\n---\n",
    )
    .unwrap();
    fs::write(
        base.join("characters/oren.md"),
        "---\nid: char-oren\nname: Oren\n---\n",
    )
    .unwrap();
    fs::write(
        base.join("threads/rebellion.md"),
        "---\nthread_id: thr-rebellion\ntitle: The Rebellion\nstatus: open\n---\n",
    )
    .unwrap();
    fs::write(
        base.join("factions/guild.md"),
        "---\nid: fac-guild\nname: The Guild\n---\n",
    )
    .unwrap();
    fs::write(
        base.join("locations/harbor.md"),
        "---\nid: loc-harbor\nname: Harbor\nregion: The Sound\n---\n",
    )
    .unwrap();
    base
}

const CORPUS_FILES: usize = 7;

fn options(root: &Path, mode: ScanMode) -> ScanOptions {
    ScanOptions {
        root: root.to_path_buf(),
        entity_root: "lore".to_string(),
        mode,
        strict: false,
        write_cache: true,
    }
}

fn scan(root: &Path, mode: ScanMode, store: &MemoryCacheStore) -> Snapshot {
    run_scan(&options(root, mode), &Config::default(), store).unwrap()
}

/// Lists and diagnostics without the run-varying fields (timestamp,
/// duration), for cross-run comparison.
fn stable_view(snapshot: &Snapshot) -> String {
    serde_json::to_string(&(
        &snapshot.files,
        &snapshot.chapters,
        &snapshot.characters,
        &snapshot.threads,
        &snapshot.factions,
        &snapshot.locations,
        &snapshot.diagnostics,
    ))
    .unwrap()
}

#[test]
fn unchanged_rescan_is_fast_hits_with_identical_output() {
    let tmp = TempDir::new().unwrap();
    write_corpus(tmp.path());
    let store = MemoryCacheStore::new();

    let first = scan(tmp.path(), ScanMode::Incremental, &store);
    assert_eq!(first.stats.misses, CORPUS_FILES);

    let second = scan(tmp.path(), ScanMode::Incremental, &store);
    assert_eq!(second.stats.fast_hits, CORPUS_FILES);
    assert_eq!(second.stats.hash_hits, 0);
    assert_eq!(second.stats.misses, 0);
    assert_eq!(stable_view(&first), stable_view(&second));
}

#[test]
fn touched_but_unchanged_file_is_exactly_one_hash_hit() {
    let tmp = TempDir::new().unwrap();
    let base = write_corpus(tmp.path());
    let store = MemoryCacheStore::new();
    let first = scan(tmp.path(), ScanMode::Incremental, &store);

    let touched = base.join("chapters/ch-001.md");
    filetime::set_file_mtime(&touched, FileTime::from_unix_time(99, 0)).unwrap();

    let second = scan(tmp.path(), ScanMode::Incremental, &store);
    assert_eq!(second.stats.hash_hits, 1);
    assert_eq!(second.stats.fast_hits, CORPUS_FILES - 1);
    assert_eq!(second.stats.misses, 0);
    // Replayed results, no duplicated diagnostics.
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(first.chapters, second.chapters);
}

#[test]
fn modified_file_is_the_only_miss() {
    let tmp = TempDir::new().unwrap();
    let base = write_corpus(tmp.path());
    let store = MemoryCacheStore::new();
    scan(tmp.path(), ScanMode::Incremental, &store);

    fs::write(
        base.join("chapters/ch-002.md"),
        "---\nchapter_id: ch-002\ntitle: The Ledger, Revised\n---\nNew body.\n",
    )
    .unwrap();

    let second = scan(tmp.path(), ScanMode::Incremental, &store);
    assert_eq!(second.stats.misses, 1);
    assert_eq!(second.stats.fast_hits + second.stats.hash_hits, CORPUS_FILES - 1);
    let ch2 = second
        .chapters
        .iter()
        .find(|c| c.chapter_id == "ch-002")
        .unwrap();
    assert_eq!(ch2.title.as_deref(), Some("The Ledger, Revised"));
}

#[test]
fn full_mode_bypasses_a_populated_cache() {
    let tmp = TempDir::new().unwrap();
    write_corpus(tmp.path());
    let store = MemoryCacheStore::new();
    scan(tmp.path(), ScanMode::Incremental, &store);

    let full = scan(tmp.path(), ScanMode::Full, &store);
    assert_eq!(full.stats.misses, CORPUS_FILES);
    assert_eq!(full.stats.fast_hits, 0);
    assert_eq!(full.stats.hash_hits, 0);
}

#[test]
fn duplicate_ids_keep_both_entities_and_flag_once() {
    let tmp = TempDir::new().unwrap();
    let base = write_corpus(tmp.path());
    fs::write(
        base.join("characters/mara-copy.md"),
        "---\nid: char-mara\nname: The Other Mara\n---\n",
    )
    .unwrap();
    let store = MemoryCacheStore::new();
    let snapshot = scan(tmp.path(), ScanMode::Incremental, &store);

    let maras: Vec<_> = snapshot
        .characters
        .iter()
        .filter(|c| c.id == "char-mara")
        .collect();
    assert_eq!(maras.len(), 2);

    let dups: Vec<_> = snapshot
        .diagnostics
        .iter()
        .filter(|d| d.code == "CHARACTER_DUP_ID")
        .collect();
    assert_eq!(dups.len(), 1);
    let evidence = dups[0].evidence.as_deref().unwrap();
    assert!(evidence.contains("characters/mara.md"));
    assert!(evidence.contains("characters/mara-copy.md"));
}

#[test]
fn unresolved_reference_flagged_but_kept() {
    let tmp = TempDir::new().unwrap();
    let base = write_corpus(tmp.path());
    fs::write(
        base.join("chapters/ch-003.md"),
        "---\nchapter_id: ch-003\ncharacters: [char-missing]\n---\n",
    )
    .unwrap();
    let store = MemoryCacheStore::new();
    let snapshot = scan(tmp.path(), ScanMode::Incremental, &store);

    let unresolved = snapshot
        .diagnostics
        .iter()
        .find(|d| d.code == "CHARACTER_REF_UNRESOLVED")
        .unwrap();
    assert!(unresolved.message.contains("char-missing"));
    assert_eq!(unresolved.file.as_deref(), Some("chapters/ch-003.md"));
    assert_eq!(unresolved.severity, Severity::Warn);

    let ch3 = snapshot
        .chapters
        .iter()
        .find(|c| c.chapter_id == "ch-003")
        .unwrap();
    assert_eq!(ch3.characters, vec!["char-missing"]);
}

#[test]
fn strict_mode_escalates_reference_warnings() {
    let tmp = TempDir::new().unwrap();
    let base = write_corpus(tmp.path());
    fs::write(
        base.join("chapters/ch-003.md"),
        "---\nchapter_id: ch-003\ncharacters: [char-missing]\n---\n",
    )
    .unwrap();
    let store = MemoryCacheStore::new();
    let mut opts = options(tmp.path(), ScanMode::Incremental);
    opts.strict = true;
    let snapshot = run_scan(&opts, &Config::default(), &store).unwrap();

    let unresolved = snapshot
        .diagnostics
        .iter()
        .find(|d| d.code == "CHARACTER_REF_UNRESOLVED")
        .unwrap();
    assert_eq!(unresolved.severity, Severity::Error);
}

#[test]
fn headerless_file_keeps_record_and_replays_diagnostic_on_hit() {
    let tmp = TempDir::new().unwrap();
    let base = write_corpus(tmp.path());
    fs::write(base.join("chapters/ch-004.md"), "Just prose, no header.\n").unwrap();
    let store = MemoryCacheStore::new();

    let first = scan(tmp.path(), ScanMode::Incremental, &store);
    assert_eq!(first.stats.files_scanned, CORPUS_FILES + 1);
    assert_eq!(first.stats.chapters, 2);
    let missing = first
        .diagnostics
        .iter()
        .filter(|d| d.code == "HEADER_MISSING")
        .count();
    assert_eq!(missing, 1);

    // The diagnostic replays from the cache, once, on a fast hit.
    let second = scan(tmp.path(), ScanMode::Incremental, &store);
    assert_eq!(second.stats.fast_hits, CORPUS_FILES + 1);
    let replayed = second
        .diagnostics
        .iter()
        .filter(|d| d.code == "HEADER_MISSING")
        .count();
    assert_eq!(replayed, 1);
}

#[test]
fn entity_lists_are_ordered_and_insertion_independent() {
    let tmp = TempDir::new().unwrap();
    let base = write_corpus(tmp.path());
    // IDs written out of order on disk.
    fs::write(
        base.join("characters/zed.md"),
        "---\nid: char-zed\n---\n",
    )
    .unwrap();
    fs::write(
        base.join("characters/abel.md"),
        "---\nid: char-abel\n---\n",
    )
    .unwrap();
    let store = MemoryCacheStore::new();
    let snapshot = scan(tmp.path(), ScanMode::Incremental, &store);

    let ids: Vec<&str> = snapshot.characters.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["char-abel", "char-mara", "char-oren", "char-zed"]);
}

#[test]
fn large_corpus_scans_once_then_fast_hits() {
    let tmp = TempDir::new().unwrap();
    let base = write_corpus(tmp.path());
    for n in 3..=500 {
        fs::write(
            base.join(format!("chapters/ch-{:03}.md", n)),
            format!("---\nchapter_id: ch-{:03}\n---\nBody {}.\n", n, n),
        )
        .unwrap();
    }
    let store = MemoryCacheStore::new();

    let full = scan(tmp.path(), ScanMode::Full, &store);
    assert_eq!(full.stats.chapters, 500);
    assert_eq!(full.stats.misses, CORPUS_FILES + 498);

    let incremental = scan(tmp.path(), ScanMode::Incremental, &store);
    assert_eq!(incremental.stats.fast_hits, CORPUS_FILES + 498);
    assert_eq!(incremental.stats.misses, 0);
}
