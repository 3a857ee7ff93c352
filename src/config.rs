//! TOML configuration for the scan engine.
//!
//! The engine treats configuration as opaque input: naming patterns, enabled
//! optional features, collation mode, directory names, and the cache file
//! name all come from here. Invocation-level inputs (root path, entity root,
//! scan mode, strict mode, cache writing) are CLI arguments, not config.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::Path;

use crate::models::EntityKind;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub collation: CollationConfig,
    #[serde(default)]
    pub patterns: PatternsConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Document extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Glob patterns excluded during discovery, relative to the entity root.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub directories: DirectoriesConfig,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        CorpusConfig {
            extension: default_extension(),
            exclude_globs: Vec::new(),
            directories: DirectoriesConfig::default(),
        }
    }
}

fn default_extension() -> String {
    "md".to_string()
}

/// Entity-kind → subdirectory name map under the entity root.
#[derive(Debug, Deserialize, Clone)]
pub struct DirectoriesConfig {
    #[serde(default = "default_chapters_dir")]
    pub chapters: String,
    #[serde(default = "default_characters_dir")]
    pub characters: String,
    #[serde(default = "default_threads_dir")]
    pub threads: String,
    #[serde(default = "default_factions_dir")]
    pub factions: String,
    #[serde(default = "default_locations_dir")]
    pub locations: String,
}

impl Default for DirectoriesConfig {
    fn default() -> Self {
        DirectoriesConfig {
            chapters: default_chapters_dir(),
            characters: default_characters_dir(),
            threads: default_threads_dir(),
            factions: default_factions_dir(),
            locations: default_locations_dir(),
        }
    }
}

impl DirectoriesConfig {
    pub fn dir_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Chapter => &self.chapters,
            EntityKind::Character => &self.characters,
            EntityKind::Thread => &self.threads,
            EntityKind::Faction => &self.factions,
            EntityKind::Location => &self.locations,
        }
    }
}

fn default_chapters_dir() -> String {
    "chapters".to_string()
}
fn default_characters_dir() -> String {
    "characters".to_string()
}
fn default_threads_dir() -> String {
    "threads".to_string()
}
fn default_factions_dir() -> String {
    "factions".to_string()
}
fn default_locations_dir() -> String {
    "locations".to_string()
}

/// Ordering applied to file lists and entity lists. Both modes are
/// deterministic across platforms, which snapshot diffing depends on.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Collation {
    /// Unicode-lowercase sort key, raw string as tiebreaker.
    #[default]
    CaseInsensitive,
    /// Plain code-point ordering.
    Codepoint,
}

impl Collation {
    pub fn key(self, s: &str) -> String {
        match self {
            Collation::CaseInsensitive => s.chars().flat_map(char::to_lowercase).collect(),
            Collation::Codepoint => s.to_string(),
        }
    }

    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Collation::CaseInsensitive => self.key(a).cmp(&self.key(b)).then_with(|| a.cmp(b)),
            Collation::Codepoint => a.cmp(b),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CollationConfig {
    #[serde(default)]
    pub mode: Collation,
}

/// Per-kind ID naming patterns (anchored regular expressions).
#[derive(Debug, Deserialize, Clone)]
pub struct PatternsConfig {
    #[serde(default = "default_chapter_pattern")]
    pub chapter: String,
    #[serde(default = "default_character_pattern")]
    pub character: String,
    #[serde(default = "default_thread_pattern")]
    pub thread: String,
    #[serde(default = "default_faction_pattern")]
    pub faction: String,
    #[serde(default = "default_location_pattern")]
    pub location: String,
}

impl Default for PatternsConfig {
    fn default() -> Self {
        PatternsConfig {
            chapter: default_chapter_pattern(),
            character: default_character_pattern(),
            thread: default_thread_pattern(),
            faction: default_faction_pattern(),
            location: default_location_pattern(),
        }
    }
}

impl PatternsConfig {
    pub fn pattern_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Chapter => &self.chapter,
            EntityKind::Character => &self.character,
            EntityKind::Thread => &self.thread,
            EntityKind::Faction => &self.faction,
            EntityKind::Location => &self.location,
        }
    }
}

fn default_chapter_pattern() -> String {
    "^ch-[0-9]{3}$".to_string()
}
fn default_character_pattern() -> String {
    "^char-[a-z0-9-]+$".to_string()
}
fn default_thread_pattern() -> String {
    "^thr-[a-z0-9-]+$".to_string()
}
fn default_faction_pattern() -> String {
    "^fac-[a-z0-9-]+$".to_string()
}
fn default_location_pattern() -> String {
    "^loc-[a-z0-9-]+$".to_string()
}

/// Optional structural sub-record parsing. When a feature is disabled the
/// corresponding raw header values are ignored entirely, with no diagnostics.
#[derive(Debug, Deserialize, Clone)]
pub struct FeaturesConfig {
    #[serde(default = "default_true")]
    pub beats: bool,
    #[serde(default = "default_true")]
    pub scenes: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        FeaturesConfig {
            beats: true,
            scenes: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ValidationConfig {
    #[serde(default)]
    pub reference_severity: ReferenceSeverityConfig,
}

/// Default severity per reference kind for unresolved chapter references.
/// Accepted values: "error", "warn", "info". Warn is escalated under strict
/// mode like any other warning.
#[derive(Debug, Deserialize, Clone)]
pub struct ReferenceSeverityConfig {
    #[serde(default = "default_warn")]
    pub characters: String,
    #[serde(default = "default_warn")]
    pub threads: String,
    #[serde(default = "default_info")]
    pub factions: String,
    #[serde(default = "default_info")]
    pub locations: String,
}

impl Default for ReferenceSeverityConfig {
    fn default() -> Self {
        ReferenceSeverityConfig {
            characters: default_warn(),
            threads: default_warn(),
            factions: default_info(),
            locations: default_info(),
        }
    }
}

impl ReferenceSeverityConfig {
    pub fn severity_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Character => &self.characters,
            EntityKind::Thread => &self.threads,
            EntityKind::Faction => &self.factions,
            EntityKind::Location => &self.locations,
            // Chapters are never reference targets.
            EntityKind::Chapter => "warn",
        }
    }
}

fn default_warn() -> String {
    "warn".to_string()
}
fn default_info() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Cache artifact file name, created under the manuscript root. The
    /// artifact is derived output; hand edits are overwritten wholesale.
    #[serde(default = "default_cache_file")]
    pub file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            file: default_cache_file(),
        }
    }
}

fn default_cache_file() -> String {
    ".lore-cache.json".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    if config.corpus.extension.is_empty() || config.corpus.extension.starts_with('.') {
        anyhow::bail!("corpus.extension must be a bare extension, e.g. \"md\"");
    }

    for kind in EntityKind::ALL {
        if config.corpus.directories.dir_for(kind).is_empty() {
            anyhow::bail!("corpus.directories.{}s must not be empty", kind.label());
        }
    }

    for field in [
        &config.validation.reference_severity.characters,
        &config.validation.reference_severity.threads,
        &config.validation.reference_severity.factions,
        &config.validation.reference_severity.locations,
    ] {
        match field.as_str() {
            "error" | "warn" | "info" => {}
            other => anyhow::bail!(
                "Unknown reference severity: '{}'. Must be error, warn, or info.",
                other
            ),
        }
    }

    if config.cache.file.is_empty() {
        anyhow::bail!("cache.file must not be empty");
    }

    Ok(())
}
