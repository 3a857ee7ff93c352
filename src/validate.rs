//! Cross-entity validation.
//!
//! Runs once, after every file has been collected, over the full entity
//! lists. Three checks: ID naming-pattern conformance, per-kind ID
//! uniqueness, and chapter reference resolution. Findings are diagnostics
//! only; no entity or reference is ever dropped or rewritten here.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::Config;
use crate::diagnostics::{
    dup_id_code, id_pattern_code, pattern_invalid_code, ref_unresolved_code, Diagnostic, Severity,
};
use crate::models::EntityKind;
use crate::snapshot::SnapshotBuilder;

/// Validate the collected entities and return the global diagnostics.
pub fn validate(builder: &SnapshotBuilder, config: &Config, strict: bool) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_patterns(builder, config, strict, &mut diagnostics);
    check_uniqueness(builder, strict, &mut diagnostics);
    check_references(builder, config, strict, &mut diagnostics);
    diagnostics
}

/// (id, path) pairs for one kind, in collection order.
fn ids_for(builder: &SnapshotBuilder, kind: EntityKind) -> Vec<(&str, &str)> {
    match kind {
        EntityKind::Chapter => builder
            .chapters()
            .iter()
            .map(|c| (c.chapter_id.as_str(), c.path.as_str()))
            .collect(),
        EntityKind::Character => builder
            .characters()
            .iter()
            .map(|c| (c.id.as_str(), c.path.as_str()))
            .collect(),
        EntityKind::Thread => builder
            .threads()
            .iter()
            .map(|t| (t.thread_id.as_str(), t.path.as_str()))
            .collect(),
        EntityKind::Faction => builder
            .factions()
            .iter()
            .map(|f| (f.id.as_str(), f.path.as_str()))
            .collect(),
        EntityKind::Location => builder
            .locations()
            .iter()
            .map(|l| (l.id.as_str(), l.path.as_str()))
            .collect(),
    }
}

/// Each kind's configured ID pattern must compile and match every declared
/// ID. A pattern that fails to compile disables that kind's check for the
/// run with a single diagnostic instead of aborting the scan.
fn check_patterns(
    builder: &SnapshotBuilder,
    config: &Config,
    strict: bool,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for kind in EntityKind::ALL {
        let pattern = config.patterns.pattern_for(kind);
        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(err) => {
                diagnostics.push(
                    Diagnostic::warn(
                        pattern_invalid_code(kind),
                        format!(
                            "{} ID pattern failed to compile; conformance not checked this run: {}",
                            kind.label(),
                            err
                        ),
                        strict,
                    )
                    .with_evidence(pattern.to_string()),
                );
                continue;
            }
        };

        for (id, path) in ids_for(builder, kind) {
            if !regex.is_match(id) {
                diagnostics.push(
                    Diagnostic::warn(
                        id_pattern_code(kind),
                        format!("{} ID '{}' does not match pattern {}", kind.label(), id, pattern),
                        strict,
                    )
                    .with_file(path.to_string())
                    .with_evidence(id.to_string()),
                );
            }
        }
    }
}

/// Within each kind an ID may appear on only one file. Every re-declaration
/// gets its own diagnostic naming both files; none of the entities are
/// removed from the result lists.
fn check_uniqueness(builder: &SnapshotBuilder, strict: bool, diagnostics: &mut Vec<Diagnostic>) {
    for kind in EntityKind::ALL {
        let mut first_seen: BTreeMap<&str, &str> = BTreeMap::new();
        for (id, path) in ids_for(builder, kind) {
            match first_seen.get(id) {
                None => {
                    first_seen.insert(id, path);
                }
                Some(first_path) => {
                    diagnostics.push(
                        Diagnostic::warn(
                            dup_id_code(kind),
                            format!("{} ID '{}' declared by more than one file", kind.label(), id),
                            strict,
                        )
                        .with_file(path.to_string())
                        .with_evidence(format!("first declared in {}, also in {}", first_path, path)),
                    );
                }
            }
        }
    }
}

/// Every ID a chapter references must be declared by an entity of the
/// referenced kind. Severity is tiered per reference kind from config;
/// warn-tier findings escalate under strict mode, info-tier never does.
fn check_references(
    builder: &SnapshotBuilder,
    config: &Config,
    strict: bool,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let targets = [
        EntityKind::Character,
        EntityKind::Faction,
        EntityKind::Location,
        EntityKind::Thread,
    ];
    let defined: BTreeMap<EntityKind, BTreeSet<&str>> = targets
        .iter()
        .map(|kind| {
            let ids = ids_for(builder, *kind).into_iter().map(|(id, _)| id).collect();
            (*kind, ids)
        })
        .collect();

    for chapter in builder.chapters() {
        let refs = [
            (EntityKind::Character, &chapter.characters),
            (EntityKind::Faction, &chapter.factions),
            (EntityKind::Location, &chapter.locations),
            (EntityKind::Thread, &chapter.threads),
        ];
        for (kind, ids) in refs {
            let severity = reference_severity(config, kind).escalate(strict);
            for id in ids {
                if defined[&kind].contains(id.as_str()) {
                    continue;
                }
                diagnostics.push(
                    Diagnostic::new(
                        severity,
                        ref_unresolved_code(kind),
                        format!(
                            "chapter '{}' references undefined {} '{}'",
                            chapter.chapter_id,
                            kind.label(),
                            id
                        ),
                    )
                    .with_file(chapter.path.clone())
                    .with_evidence(id.clone()),
                );
            }
        }
    }
}

fn reference_severity(config: &Config, kind: EntityKind) -> Severity {
    match config.validation.reference_severity.severity_for(kind) {
        "error" => Severity::Error,
        "info" => Severity::Info,
        // Config validation already rejected anything else.
        _ => Severity::Warn,
    }
}
