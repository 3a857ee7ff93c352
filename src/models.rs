//! Core data models for the scan engine.
//!
//! These types represent the files, entities, and statistics that flow
//! through discovery, extraction, validation, and snapshot assembly.

use serde::{Deserialize, Serialize};

/// The five entity kinds a manuscript corpus can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Chapter,
    Character,
    Thread,
    Faction,
    Location,
}

impl EntityKind {
    /// Scan order. Discovery, statistics, and snapshot lists all follow it.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Chapter,
        EntityKind::Character,
        EntityKind::Thread,
        EntityKind::Faction,
        EntityKind::Location,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Chapter => "chapter",
            EntityKind::Character => "character",
            EntityKind::Thread => "thread",
            EntityKind::Faction => "faction",
            EntityKind::Location => "location",
        }
    }

    /// Prefix used when building diagnostic codes for this kind.
    pub fn code_prefix(self) -> &'static str {
        match self {
            EntityKind::Chapter => "CHAPTER",
            EntityKind::Character => "CHARACTER",
            EntityKind::Thread => "THREAD",
            EntityKind::Faction => "FACTION",
            EntityKind::Location => "LOCATION",
        }
    }

    /// Name of the required identifier field in the document header.
    pub fn id_field(self) -> &'static str {
        match self {
            EntityKind::Chapter => "chapter_id",
            EntityKind::Thread => "thread_id",
            EntityKind::Character | EntityKind::Faction | EntityKind::Location => "id",
        }
    }
}

/// One scanned file: corpus-relative path (forward-slash normalized), stat
/// values, and content hash. Rebuilt every run, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub mtime_ms: i64,
    pub size_bytes: u64,
    pub content_hash: String,
}

/// In-story timeline placement declared by a chapter header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
}

/// Structural beat descriptor (e.g. "midpoint", act 2). Parsed only when
/// the `beats` feature is enabled in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beat {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub act: Option<String>,
}

/// One scene sub-record of a chapter. Parsed only when the `scenes`
/// feature is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pov: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub factions: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub threads: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat: Option<Beat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<Scene>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Tagged union over the five entity structs. A parsed file contributes at
/// most one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Chapter(Chapter),
    Character(Character),
    Thread(Thread),
    Faction(Faction),
    Location(Location),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Chapter(_) => EntityKind::Chapter,
            Entity::Character(_) => EntityKind::Character,
            Entity::Thread(_) => EntityKind::Thread,
            Entity::Faction(_) => EntityKind::Faction,
            Entity::Location(_) => EntityKind::Location,
        }
    }

    /// The kind-specific natural identifier.
    pub fn id(&self) -> &str {
        match self {
            Entity::Chapter(c) => &c.chapter_id,
            Entity::Character(c) => &c.id,
            Entity::Thread(t) => &t.thread_id,
            Entity::Faction(f) => &f.id,
            Entity::Location(l) => &l.id,
        }
    }

    /// Corpus-relative source path.
    pub fn path(&self) -> &str {
        match self {
            Entity::Chapter(c) => &c.path,
            Entity::Character(c) => &c.path,
            Entity::Thread(t) => &t.path,
            Entity::Faction(f) => &f.path,
            Entity::Location(l) => &l.path,
        }
    }
}

/// Aggregate counters for one scan run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub chapters: usize,
    pub characters: usize,
    pub threads: usize,
    pub factions: usize,
    pub locations: usize,
    pub fast_hits: usize,
    pub hash_hits: usize,
    pub misses: usize,
    pub duration_ms: u64,
}

impl ScanStats {
    pub fn entity_count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Chapter => self.chapters,
            EntityKind::Character => self.characters,
            EntityKind::Thread => self.threads,
            EntityKind::Faction => self.factions,
            EntityKind::Location => self.locations,
        }
    }

    pub fn total_entities(&self) -> usize {
        self.chapters + self.characters + self.threads + self.factions + self.locations
    }
}
