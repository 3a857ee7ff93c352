//! The Snapshot: the complete, ordered result of one scan run.
//!
//! A Snapshot doubles as the cache artifact: serialized wholesale to JSON at
//! the end of a run and read back at the start of the next. Downstream
//! consumers (reports, exports) read only this structure and never touch
//! discovery or caching directly. The `file_diagnostics` section is internal
//! plumbing: it lets a future fast/hash cache hit replay a file's parse-time
//! diagnostics without re-parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Collation;
use crate::diagnostics::Diagnostic;
use crate::models::{
    Chapter, Character, Entity, EntityKind, Faction, FileRecord, Location, ScanStats, Thread,
};

/// Version tag of the serialized artifact. Bumped whenever the shape
/// changes; a mismatched artifact is ignored wholesale.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub root: String,
    pub entity_root: String,
    pub generated_at: DateTime<Utc>,
    pub stats: ScanStats,
    pub files: Vec<FileRecord>,
    pub chapters: Vec<Chapter>,
    pub characters: Vec<Character>,
    pub threads: Vec<Thread>,
    pub factions: Vec<Faction>,
    pub locations: Vec<Location>,
    pub diagnostics: Vec<Diagnostic>,
    /// Relative path → that file's parse-time diagnostics. Internal; needed
    /// to replay diagnostics on cache hits.
    #[serde(default)]
    pub file_diagnostics: BTreeMap<String, Vec<Diagnostic>>,
}

impl Snapshot {
    pub fn entity_count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Chapter => self.chapters.len(),
            EntityKind::Character => self.characters.len(),
            EntityKind::Thread => self.threads.len(),
            EntityKind::Faction => self.factions.len(),
            EntityKind::Location => self.locations.len(),
        }
    }

    /// Iterate (kind, id, path) over every entity, in list order.
    pub fn entity_keys(&self) -> impl Iterator<Item = (EntityKind, &str, &str)> {
        let chapters = self
            .chapters
            .iter()
            .map(|c| (EntityKind::Chapter, c.chapter_id.as_str(), c.path.as_str()));
        let characters = self
            .characters
            .iter()
            .map(|c| (EntityKind::Character, c.id.as_str(), c.path.as_str()));
        let threads = self
            .threads
            .iter()
            .map(|t| (EntityKind::Thread, t.thread_id.as_str(), t.path.as_str()));
        let factions = self
            .factions
            .iter()
            .map(|f| (EntityKind::Faction, f.id.as_str(), f.path.as_str()));
        let locations = self
            .locations
            .iter()
            .map(|l| (EntityKind::Location, l.id.as_str(), l.path.as_str()));
        chapters
            .chain(characters)
            .chain(threads)
            .chain(factions)
            .chain(locations)
    }

    /// Find the entity a given file contributed, if any.
    pub fn entity_for_path(&self, path: &str) -> Option<Entity> {
        if let Some(c) = self.chapters.iter().find(|c| c.path == path) {
            return Some(Entity::Chapter(c.clone()));
        }
        if let Some(c) = self.characters.iter().find(|c| c.path == path) {
            return Some(Entity::Character(c.clone()));
        }
        if let Some(t) = self.threads.iter().find(|t| t.path == path) {
            return Some(Entity::Thread(t.clone()));
        }
        if let Some(f) = self.factions.iter().find(|f| f.path == path) {
            return Some(Entity::Faction(f.clone()));
        }
        if let Some(l) = self.locations.iter().find(|l| l.path == path) {
            return Some(Entity::Location(l.clone()));
        }
        None
    }
}

/// Accumulates per-file results during a run, then assembles the final
/// ordered Snapshot.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    files: Vec<FileRecord>,
    chapters: Vec<Chapter>,
    characters: Vec<Character>,
    threads: Vec<Thread>,
    factions: Vec<Faction>,
    locations: Vec<Location>,
    diagnostics: Vec<Diagnostic>,
    file_diagnostics: BTreeMap<String, Vec<Diagnostic>>,
}

impl SnapshotBuilder {
    pub fn push_file(&mut self, record: FileRecord) {
        self.files.push(record);
    }

    pub fn push_entity(&mut self, entity: Entity) {
        match entity {
            Entity::Chapter(c) => self.chapters.push(c),
            Entity::Character(c) => self.characters.push(c),
            Entity::Thread(t) => self.threads.push(t),
            Entity::Faction(f) => self.factions.push(f),
            Entity::Location(l) => self.locations.push(l),
        }
    }

    /// Record one file's parse-time diagnostics: appended to the global
    /// list and remembered in the per-file index for cache replay.
    pub fn push_file_diagnostics(&mut self, path: &str, diagnostics: Vec<Diagnostic>) {
        if diagnostics.is_empty() {
            return;
        }
        self.diagnostics.extend(diagnostics.clone());
        self.file_diagnostics.insert(path.to_string(), diagnostics);
    }

    pub fn push_global_diagnostics(&mut self, diagnostics: Vec<Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn factions(&self) -> &[Faction] {
        &self.factions
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Sort every list and produce the final Snapshot. Entity lists order
    /// by (collation key of the natural ID, source path); the file list
    /// orders by path. Stable across runs with unchanged input.
    pub fn assemble(
        mut self,
        root: String,
        entity_root: String,
        collation: Collation,
        mut stats: ScanStats,
    ) -> Snapshot {
        self.files
            .sort_by(|a, b| collation.compare(&a.path, &b.path));
        self.chapters.sort_by(|a, b| {
            collation
                .compare(&a.chapter_id, &b.chapter_id)
                .then_with(|| a.path.cmp(&b.path))
        });
        self.characters.sort_by(|a, b| {
            collation
                .compare(&a.id, &b.id)
                .then_with(|| a.path.cmp(&b.path))
        });
        self.threads.sort_by(|a, b| {
            collation
                .compare(&a.thread_id, &b.thread_id)
                .then_with(|| a.path.cmp(&b.path))
        });
        self.factions.sort_by(|a, b| {
            collation
                .compare(&a.id, &b.id)
                .then_with(|| a.path.cmp(&b.path))
        });
        self.locations.sort_by(|a, b| {
            collation
                .compare(&a.id, &b.id)
                .then_with(|| a.path.cmp(&b.path))
        });

        stats.files_scanned = self.files.len();
        stats.chapters = self.chapters.len();
        stats.characters = self.characters.len();
        stats.threads = self.threads.len();
        stats.factions = self.factions.len();
        stats.locations = self.locations.len();

        Snapshot {
            version: SNAPSHOT_VERSION,
            root,
            entity_root,
            generated_at: Utc::now(),
            stats,
            files: self.files,
            chapters: self.chapters,
            characters: self.characters,
            threads: self.threads,
            factions: self.factions,
            locations: self.locations,
            diagnostics: self.diagnostics,
            file_diagnostics: self.file_diagnostics,
        }
    }
}
