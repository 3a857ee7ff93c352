//! Metadata extraction from document headers.
//!
//! Each document starts with a YAML frontmatter block (`---` fences)
//! followed by free-form body text. The header is mapped into one of the
//! five typed entities. Field coercion is deliberately forgiving: an absent
//! optional field is simply "not present"; a present-but-ill-typed optional
//! field is omitted with a `FIELD_TYPE_INVALID` diagnostic. Only a missing
//! or ill-typed required ID skips the file's entity contribution outright.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::diagnostics::{codes, id_missing_code, Diagnostic};
use crate::models::{
    Beat, Chapter, Character, Entity, EntityKind, Faction, Location, Scene, Thread, Timeline,
};

/// Outcome of parsing one document: at most one entity, plus the parse-time
/// diagnostics that the cache must be able to replay on a future hit.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    pub entity: Option<Entity>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of splitting the frontmatter header from the body.
#[derive(Debug)]
enum HeaderSplit {
    /// No opening fence, or an unterminated/empty block.
    Absent,
    /// A fenced block was found but is not a valid YAML mapping.
    Invalid(String),
    Present {
        fields: BTreeMap<String, Value>,
        end_line: u32,
    },
}

/// Split YAML frontmatter from document content.
///
/// The first line must be `---` (an optional BOM is tolerated); the block
/// ends at the next `---` or `...` line. Field values are converted to
/// `serde_json::Value` for uniform downstream coercion.
fn split_header(content: &str) -> HeaderSplit {
    let mut lines = content.lines();
    let Some(first) = lines.next() else {
        return HeaderSplit::Absent;
    };
    if first.trim_start_matches('\u{feff}').trim_end() != "---" {
        return HeaderSplit::Absent;
    }

    let mut yaml_lines: Vec<&str> = Vec::new();
    let mut end_line: u32 = 1;
    let mut terminated = false;
    for line in lines {
        end_line += 1;
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            terminated = true;
            break;
        }
        yaml_lines.push(line);
    }

    if !terminated || yaml_lines.is_empty() {
        return HeaderSplit::Absent;
    }

    let raw_yaml = yaml_lines.join("\n");
    let yaml_value: serde_yaml::Value = match serde_yaml::from_str(&raw_yaml) {
        Ok(value) => value,
        Err(err) => return HeaderSplit::Invalid(format!("invalid YAML: {}", err)),
    };
    let json_value: Value = match serde_json::to_value(yaml_value) {
        Ok(value) => value,
        Err(err) => return HeaderSplit::Invalid(format!("unrepresentable header value: {}", err)),
    };
    match json_value {
        Value::Object(map) => HeaderSplit::Present {
            fields: map.into_iter().collect(),
            end_line,
        },
        other => HeaderSplit::Invalid(format!(
            "header must be a mapping, got {}",
            value_type_name(&other)
        )),
    }
}

/// Parse one document's content into its kind-specific entity.
pub fn extract_entity(
    kind: EntityKind,
    rel_path: &str,
    content: &str,
    config: &Config,
    strict: bool,
) -> ParsedDocument {
    let mut doc = ParsedDocument::default();

    let (fields, _end_line) = match split_header(content) {
        HeaderSplit::Absent => {
            doc.diagnostics.push(
                Diagnostic::warn(
                    codes::HEADER_MISSING,
                    format!("no frontmatter header found in {} document", kind.label()),
                    strict,
                )
                .with_file(rel_path)
                .with_line(1)
                .with_fix("start the file with a `---` fenced YAML block"),
            );
            return doc;
        }
        HeaderSplit::Invalid(reason) => {
            doc.diagnostics.push(
                Diagnostic::warn(codes::HEADER_INVALID, reason, strict)
                    .with_file(rel_path)
                    .with_line(1),
            );
            return doc;
        }
        HeaderSplit::Present { fields, end_line } => (fields, end_line),
    };

    let id_field = kind.id_field();
    let Some(id) = fields.get(id_field).and_then(Value::as_str) else {
        let detail = match fields.get(id_field) {
            None => "missing".to_string(),
            Some(other) => format!("not a string (got {})", value_type_name(other)),
        };
        doc.diagnostics.push(
            Diagnostic::error(
                id_missing_code(kind),
                format!("required field `{}` is {}", id_field, detail),
            )
            .with_file(rel_path)
            .with_fix(format!("declare `{}` as a string in the header", id_field)),
        );
        return doc;
    };
    let id = id.to_string();

    let mut coercion = FieldCoercion {
        rel_path,
        strict,
        diagnostics: &mut doc.diagnostics,
    };

    let entity = match kind {
        EntityKind::Chapter => Entity::Chapter(Chapter {
            chapter_id: id,
            path: rel_path.to_string(),
            title: coercion.opt_string(&fields, "title"),
            pov: coercion.opt_string(&fields, "pov"),
            timeline: coercion.timeline(&fields),
            characters: coercion.string_list(&fields, "characters"),
            factions: coercion.string_list(&fields, "factions"),
            locations: coercion.string_list(&fields, "locations"),
            threads: coercion.string_list(&fields, "threads"),
            summary: coercion.opt_string(&fields, "summary"),
            beat: if config.features.beats {
                coercion.beat(&fields)
            } else {
                None
            },
            scenes: if config.features.scenes {
                coercion.scenes(&fields)
            } else {
                None
            },
        }),
        EntityKind::Character => Entity::Character(Character {
            id,
            path: rel_path.to_string(),
            name: coercion.opt_string(&fields, "name"),
            aliases: coercion.string_list(&fields, "aliases"),
            faction: coercion.opt_string(&fields, "faction"),
            summary: coercion.opt_string(&fields, "summary"),
        }),
        EntityKind::Thread => Entity::Thread(Thread {
            thread_id: id,
            path: rel_path.to_string(),
            title: coercion.opt_string(&fields, "title"),
            status: coercion.opt_string(&fields, "status"),
            summary: coercion.opt_string(&fields, "summary"),
        }),
        EntityKind::Faction => Entity::Faction(Faction {
            id,
            path: rel_path.to_string(),
            name: coercion.opt_string(&fields, "name"),
            summary: coercion.opt_string(&fields, "summary"),
        }),
        EntityKind::Location => Entity::Location(Location {
            id,
            path: rel_path.to_string(),
            name: coercion.opt_string(&fields, "name"),
            region: coercion.opt_string(&fields, "region"),
            summary: coercion.opt_string(&fields, "summary"),
        }),
    };

    doc.entity = Some(entity);
    doc
}

/// Typed field coercion over the header mapping. All helpers share the
/// same policy: absent means `None`/empty, wrong type means omitted plus
/// one `FIELD_TYPE_INVALID` diagnostic.
struct FieldCoercion<'a> {
    rel_path: &'a str,
    strict: bool,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl FieldCoercion<'_> {
    fn type_invalid(&mut self, field: &str, expected: &str, got: &Value) {
        self.diagnostics.push(
            Diagnostic::warn(
                codes::FIELD_TYPE_INVALID,
                format!(
                    "field `{}` should be {}, got {}; value omitted",
                    field,
                    expected,
                    value_type_name(got)
                ),
                self.strict,
            )
            .with_file(self.rel_path),
        );
    }

    fn opt_string(&mut self, fields: &BTreeMap<String, Value>, key: &str) -> Option<String> {
        match fields.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.type_invalid(key, "a string", other);
                None
            }
        }
    }

    fn string_list(&mut self, fields: &BTreeMap<String, Value>, key: &str) -> Vec<String> {
        let items = match fields.get(key) {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.type_invalid(key, "a list of strings", other);
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        let mut dropped = 0usize;
        for item in items {
            match item {
                Value::String(s) => out.push(s.clone()),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            self.diagnostics.push(
                Diagnostic::warn(
                    codes::FIELD_TYPE_INVALID,
                    format!(
                        "field `{}` contains {} non-string item(s); they were omitted",
                        key, dropped
                    ),
                    self.strict,
                )
                .with_file(self.rel_path),
            );
        }
        out
    }

    fn timeline(&mut self, fields: &BTreeMap<String, Value>) -> Option<Timeline> {
        let map = match fields.get("timeline") {
            None | Some(Value::Null) => return None,
            Some(Value::Object(map)) => map,
            Some(other) => {
                self.type_invalid("timeline", "a mapping", other);
                return None;
            }
        };

        Some(Timeline {
            start: self.sub_string(map, "timeline", "start"),
            end: self.sub_string(map, "timeline", "end"),
            era: self.sub_string(map, "timeline", "era"),
        })
    }

    /// Beat accepts either a bare string label or a `{ label, act }` mapping.
    fn beat(&mut self, fields: &BTreeMap<String, Value>) -> Option<Beat> {
        match fields.get("beat") {
            None | Some(Value::Null) => None,
            Some(Value::String(label)) => Some(Beat {
                label: label.clone(),
                act: None,
            }),
            Some(Value::Object(map)) => {
                let Some(label) = map.get("label").and_then(Value::as_str) else {
                    self.diagnostics.push(
                        Diagnostic::warn(
                            codes::FIELD_TYPE_INVALID,
                            "field `beat` mapping lacks a string `label`; value omitted",
                            self.strict,
                        )
                        .with_file(self.rel_path),
                    );
                    return None;
                };
                Some(Beat {
                    label: label.to_string(),
                    act: self.sub_string(map, "beat", "act"),
                })
            }
            Some(other) => {
                self.type_invalid("beat", "a string or a mapping", other);
                None
            }
        }
    }

    fn scenes(&mut self, fields: &BTreeMap<String, Value>) -> Option<Vec<Scene>> {
        let items = match fields.get("scenes") {
            None | Some(Value::Null) => return None,
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.type_invalid("scenes", "a list of mappings", other);
                return None;
            }
        };

        let mut scenes = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let Value::Object(map) = item else {
                self.diagnostics.push(
                    Diagnostic::warn(
                        codes::FIELD_TYPE_INVALID,
                        format!(
                            "field `scenes[{}]` should be a mapping, got {}; entry omitted",
                            index,
                            value_type_name(item)
                        ),
                        self.strict,
                    )
                    .with_file(self.rel_path),
                );
                continue;
            };
            let prefix = format!("scenes[{}]", index);
            scenes.push(Scene {
                title: self.sub_string(map, &prefix, "title"),
                location: self.sub_string(map, &prefix, "location"),
                summary: self.sub_string(map, &prefix, "summary"),
            });
        }
        Some(scenes)
    }

    fn sub_string(
        &mut self,
        map: &serde_json::Map<String, Value>,
        parent: &str,
        key: &str,
    ) -> Option<String> {
        match map.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.type_invalid(&format!("{}.{}", parent, key), "a string", other);
                None
            }
        }
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
