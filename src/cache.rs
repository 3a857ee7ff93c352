//! Two-tier change-detection cache.
//!
//! Per file, the engine makes up to two cheap checks before paying for a
//! full parse:
//!
//! 1. fast path — cached size and mtime both match the current stat: the
//!    file is never opened and the cached entity/diagnostics are replayed;
//! 2. hash path — the file is read and hashed; if the digest matches the
//!    cached one (a touch, checkout, or byte-preserving copy), the cached
//!    results are replayed under refreshed stat values;
//! 3. miss — a full parse is required.
//!
//! The decision lives in [`classify`] so it can be tested apart from the
//! pipeline. Persistence goes through the [`CacheStore`] trait, injected
//! into the scan rather than reached as a process-wide singleton, so tests
//! can supply an in-memory store.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::diagnostics::Diagnostic;
use crate::models::{Entity, FileRecord};
use crate::snapshot::{Snapshot, SNAPSHOT_VERSION};

/// Lowercase hex SHA-256 digest of raw file bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Current stat values for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub mtime_ms: i64,
    pub size_bytes: u64,
}

/// Prior-run results for one file, reusable on a hit.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub record: FileRecord,
    pub entity: Option<Entity>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Three-outcome decision for one file. Hash-path and miss outcomes carry
/// the bytes already read so the caller never reads a file twice.
#[derive(Debug)]
pub enum CacheDecision {
    /// Size and mtime match; the file was never opened.
    FastHit,
    /// Stat changed but content did not; the FileRecord must be refreshed
    /// with the new stat values.
    HashHit { hash: String, content: String },
    /// Content changed or nothing was cached; a full parse is required.
    Miss { hash: String, content: String },
}

/// Decide how to treat one file given its current stat and the prior-run
/// cache entry (if any). `read` is invoked at most once, only when the
/// fast path fails.
pub fn classify<F>(stat: &FileStat, entry: Option<&CacheEntry>, read: F) -> Result<CacheDecision>
where
    F: FnOnce() -> Result<Vec<u8>>,
{
    if let Some(entry) = entry {
        if entry.record.mtime_ms == stat.mtime_ms && entry.record.size_bytes == stat.size_bytes {
            return Ok(CacheDecision::FastHit);
        }
    }

    let bytes = read()?;
    let hash = content_hash(&bytes);
    let content = String::from_utf8_lossy(&bytes).into_owned();

    if let Some(entry) = entry {
        if entry.record.content_hash == hash {
            return Ok(CacheDecision::HashHit { hash, content });
        }
    }
    Ok(CacheDecision::Miss { hash, content })
}

/// Per-path lookup over a loaded snapshot. Built once at the start of an
/// incremental run; read-only input from then on.
#[derive(Debug, Default)]
pub struct CacheIndex {
    entries: BTreeMap<String, CacheEntry>,
}

impl CacheIndex {
    /// Index a prior snapshot by relative path. The snapshot is trusted
    /// only if its version, root, and entity root match the current
    /// invocation; otherwise the index is empty (every file misses).
    pub fn from_snapshot(snapshot: &Snapshot, root: &str, entity_root: &str) -> CacheIndex {
        if snapshot.version != SNAPSHOT_VERSION
            || snapshot.root != root
            || snapshot.entity_root != entity_root
        {
            tracing::warn!(
                version = snapshot.version,
                root = %snapshot.root,
                "cache artifact does not match this invocation; ignoring it"
            );
            return CacheIndex::default();
        }

        let mut entries = BTreeMap::new();
        for record in &snapshot.files {
            let entity = snapshot.entity_for_path(&record.path);
            let diagnostics = snapshot
                .file_diagnostics
                .get(&record.path)
                .cloned()
                .unwrap_or_default();
            entries.insert(
                record.path.clone(),
                CacheEntry {
                    record: record.clone(),
                    entity,
                    diagnostics,
                },
            );
        }
        CacheIndex { entries }
    }

    pub fn get(&self, path: &str) -> Option<&CacheEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Persistence seam for the snapshot artifact.
///
/// `load` failures are soft (a missing or corrupt artifact means "no cache
/// available"); `save` failures are hard, since an unwritable artifact is an
/// environment problem the caller must see.
pub trait CacheStore {
    fn load(&self) -> Option<Snapshot>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// On-disk JSON artifact store. The artifact is derived output and is
/// overwritten wholesale on every save.
pub struct JsonCacheStore {
    path: PathBuf,
}

impl JsonCacheStore {
    pub fn new(path: PathBuf) -> Self {
        JsonCacheStore { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl CacheStore for JsonCacheStore {
    fn load(&self) -> Option<Snapshot> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(path = %self.path.display(), %err, "no cache artifact loaded");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %err,
                    "cache artifact unreadable; scanning without it"
                );
                None
            }
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .context("Failed to serialize snapshot artifact")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write cache artifact: {}", self.path.display()))
    }
}

/// In-memory store for tests and embedders that manage persistence
/// themselves.
#[derive(Default)]
pub struct MemoryCacheStore {
    inner: Mutex<Option<Snapshot>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self) -> Option<Snapshot> {
        self.inner.lock().expect("cache store poisoned").clone()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.inner.lock().expect("cache store poisoned") = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanStats;
    use chrono::Utc;

    fn entry(mtime_ms: i64, size_bytes: u64, hash: &str) -> CacheEntry {
        CacheEntry {
            record: FileRecord {
                path: "chapters/ch-001.md".to_string(),
                mtime_ms,
                size_bytes,
                content_hash: hash.to_string(),
            },
            entity: None,
            diagnostics: Vec::new(),
        }
    }

    fn empty_snapshot(root: &str, entity_root: &str) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            root: root.to_string(),
            entity_root: entity_root.to_string(),
            generated_at: Utc::now(),
            stats: ScanStats::default(),
            files: Vec::new(),
            chapters: Vec::new(),
            characters: Vec::new(),
            threads: Vec::new(),
            factions: Vec::new(),
            locations: Vec::new(),
            diagnostics: Vec::new(),
            file_diagnostics: BTreeMap::new(),
        }
    }

    #[test]
    fn matching_stat_is_fast_hit_without_read() {
        let stat = FileStat {
            mtime_ms: 1000,
            size_bytes: 42,
        };
        let entry = entry(1000, 42, "abc");
        let decision = classify(&stat, Some(&entry), || {
            panic!("fast path must not read the file")
        })
        .unwrap();
        assert!(matches!(decision, CacheDecision::FastHit));
    }

    #[test]
    fn stat_mismatch_same_content_is_hash_hit() {
        let bytes = b"---\nchapter_id: ch-001\n---\n".to_vec();
        let hash = content_hash(&bytes);
        let stat = FileStat {
            mtime_ms: 2000,
            size_bytes: bytes.len() as u64,
        };
        // Same size, different mtime: the touched-but-unchanged case.
        let entry = entry(1000, bytes.len() as u64, &hash);
        let decision = classify(&stat, Some(&entry), || Ok(bytes.clone())).unwrap();
        match decision {
            CacheDecision::HashHit { hash: got, .. } => assert_eq!(got, hash),
            other => panic!("expected hash hit, got {:?}", other),
        }
    }

    #[test]
    fn changed_content_is_miss() {
        let stat = FileStat {
            mtime_ms: 2000,
            size_bytes: 10,
        };
        let entry = entry(1000, 5, "stale-hash");
        let decision = classify(&stat, Some(&entry), || Ok(b"new bytes!".to_vec())).unwrap();
        assert!(matches!(decision, CacheDecision::Miss { .. }));
    }

    #[test]
    fn no_entry_is_miss() {
        let stat = FileStat {
            mtime_ms: 1,
            size_bytes: 1,
        };
        let decision = classify(&stat, None, || Ok(b"x".to_vec())).unwrap();
        match decision {
            CacheDecision::Miss { hash, content } => {
                assert_eq!(hash, content_hash(b"x"));
                assert_eq!(content, "x");
            }
            other => panic!("expected miss, got {:?}", other),
        }
    }

    #[test]
    fn read_failure_propagates() {
        let stat = FileStat {
            mtime_ms: 1,
            size_bytes: 1,
        };
        let result = classify(&stat, None, || anyhow::bail!("gone mid-scan"));
        assert!(result.is_err());
    }

    #[test]
    fn index_rejects_version_mismatch() {
        let mut snapshot = empty_snapshot("/corpus", "lore");
        snapshot.version = SNAPSHOT_VERSION + 1;
        let index = CacheIndex::from_snapshot(&snapshot, "/corpus", "lore");
        assert!(index.is_empty());
    }

    #[test]
    fn index_rejects_root_mismatch() {
        let snapshot = empty_snapshot("/elsewhere", "lore");
        let index = CacheIndex::from_snapshot(&snapshot, "/corpus", "lore");
        assert!(index.is_empty());
    }

    #[test]
    fn index_carries_records_entities_and_diagnostics() {
        let mut snapshot = empty_snapshot("/corpus", "lore");
        snapshot.files.push(FileRecord {
            path: "chapters/ch-001.md".to_string(),
            mtime_ms: 5,
            size_bytes: 9,
            content_hash: "aa".to_string(),
        });
        snapshot.chapters.push(crate::models::Chapter {
            chapter_id: "ch-001".to_string(),
            path: "chapters/ch-001.md".to_string(),
            title: None,
            pov: None,
            timeline: None,
            characters: Vec::new(),
            factions: Vec::new(),
            locations: Vec::new(),
            threads: Vec::new(),
            summary: None,
            beat: None,
            scenes: None,
        });
        snapshot.file_diagnostics.insert(
            "chapters/ch-001.md".to_string(),
            vec![Diagnostic::info("STRAY_DIRECTORY", "placeholder")],
        );

        let index = CacheIndex::from_snapshot(&snapshot, "/corpus", "lore");
        assert_eq!(index.len(), 1);
        let entry = index.get("chapters/ch-001.md").unwrap();
        assert_eq!(entry.record.content_hash, "aa");
        assert!(entry.entity.is_some());
        assert_eq!(entry.diagnostics.len(), 1);
    }

    #[test]
    fn json_store_load_missing_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = JsonCacheStore::new(tmp.path().join(".lore-cache.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn json_store_roundtrip_and_corrupt_artifact() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(".lore-cache.json");
        let store = JsonCacheStore::new(path.clone());

        let snapshot = empty_snapshot("/corpus", "lore");
        store.save(&snapshot).unwrap();
        let loaded = store.load().expect("saved artifact must load");
        assert_eq!(loaded.root, "/corpus");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn memory_store_replaces_wholesale() {
        let store = MemoryCacheStore::new();
        assert!(store.load().is_none());
        store.save(&empty_snapshot("/a", "lore")).unwrap();
        store.save(&empty_snapshot("/b", "lore")).unwrap();
        assert_eq!(store.load().unwrap().root, "/b");
    }
}
