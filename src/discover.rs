//! File discovery and ordering.
//!
//! Walks the five entity subdirectories under `<root>/<entity_root>`,
//! recursively, skipping hidden directories and configured exclude globs,
//! and returns per-kind file lists sorted with the configured collation.
//! Discovery has no side effects; stray directories under the entity root
//! are reported as informational diagnostics, never errors.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::diagnostics::{codes, Diagnostic};
use crate::models::EntityKind;

/// Result of one discovery pass: per-kind relative paths (entity-root
/// relative, forward-slash normalized, collation-sorted) plus any
/// informational findings.
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<(EntityKind, Vec<String>)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Discovery {
    pub fn file_count(&self) -> usize {
        self.files.iter().map(|(_, paths)| paths.len()).sum()
    }
}

pub fn discover(root: &Path, entity_root: &str, config: &Config) -> Result<Discovery> {
    let base = root.join(entity_root);
    if !base.is_dir() {
        bail!(
            "Entity root does not exist or is not a directory: {}",
            base.display()
        );
    }

    let exclude_set = build_globset(&config.corpus.exclude_globs)?;
    let mut discovery = Discovery::default();

    report_stray_directories(&base, config, &mut discovery.diagnostics)?;

    for kind in EntityKind::ALL {
        let dir_name = config.corpus.directories.dir_for(kind);
        let kind_dir = base.join(dir_name);
        let mut paths = Vec::new();

        if kind_dir.is_dir() {
            let walker = WalkDir::new(&kind_dir)
                .into_iter()
                .filter_entry(|e| !is_hidden_dir(e));
            for entry in walker {
                let entry = entry
                    .with_context(|| format!("Failed to walk directory: {}", kind_dir.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if !has_extension(path, &config.corpus.extension) {
                    continue;
                }

                let relative = path.strip_prefix(&base).unwrap_or(path);
                let rel_str = normalize_separators(relative);
                if exclude_set.is_match(&rel_str) {
                    continue;
                }
                paths.push(rel_str);
            }
        }

        // Sort for deterministic, reproducible snapshot output.
        let collation = config.collation.mode;
        paths.sort_by(|a, b| collation.compare(a, b));
        discovery.files.push((kind, paths));
    }

    Ok(discovery)
}

/// Directories under the entity root that match none of the five configured
/// names get one informational diagnostic each, so stray content is noticed
/// without blocking the scan.
fn report_stray_directories(
    base: &Path,
    config: &Config,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    let expected: Vec<&str> = EntityKind::ALL
        .iter()
        .map(|kind| config.corpus.directories.dir_for(*kind))
        .collect();

    let entries = std::fs::read_dir(base)
        .with_context(|| format!("Failed to read entity root: {}", base.display()))?;
    let mut strays = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || expected.contains(&name.as_str()) {
            continue;
        }
        strays.push(name);
    }

    strays.sort();
    for name in strays {
        diagnostics.push(
            Diagnostic::info(
                codes::STRAY_DIRECTORY,
                format!(
                    "directory '{}' under the entity root matches no entity kind and was not scanned",
                    name
                ),
            )
            .with_file(name),
        );
    }
    Ok(())
}

fn is_hidden_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == extension)
        .unwrap_or(false)
}

/// Forward-slash normalize a relative path so snapshots diff identically
/// across platforms.
fn normalize_separators(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_string_lossy().to_string());
        }
    }
    parts.join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            Glob::new(pattern).with_context(|| format!("Invalid exclude glob: {}", pattern))?,
        );
    }
    Ok(builder.build()?)
}

/// Absolute on-disk path for an entity-root-relative file.
pub fn absolute_path(root: &Path, entity_root: &str, rel_path: &str) -> PathBuf {
    let mut abs = root.join(entity_root);
    for part in rel_path.split('/') {
        abs.push(part);
    }
    abs
}
