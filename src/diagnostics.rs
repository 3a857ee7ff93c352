//! Diagnostic types emitted by the scan engine.
//!
//! Diagnostics are data, not errors: a malformed header, a duplicate ID, or
//! an unresolved reference never aborts a run. Parse-time diagnostics are
//! attached per file (and replayed on cache hits); validation diagnostics
//! are attached globally after all files are collected.

use serde::{Deserialize, Serialize};

use crate::models::EntityKind;

/// Diagnostic severity. Strict mode escalates `Warn` to `Error` at the
/// point of emission; `Info` is never escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl Severity {
    /// Apply the strict-mode escalation policy.
    pub fn escalate(self, strict: bool) -> Severity {
        if strict && self == Severity::Warn {
            Severity::Error
        } else {
            self
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
        }
    }
}

/// A single finding produced during parsing or validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            code: code.into(),
            message: message.into(),
            file: None,
            line: None,
            evidence: None,
            suggested_fix: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Create a warning, pre-escalated under strict mode.
    pub fn warn(code: impl Into<String>, message: impl Into<String>, strict: bool) -> Self {
        Self::new(Severity::Warn.escalate(strict), code, message)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity.label(), self.code, self.message)?;
        if let Some(file) = &self.file {
            write!(f, " ({})", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
            }
        }
        Ok(())
    }
}

/// Diagnostic codes shared across modules. Kind-specific codes (`*_ID_MISSING`,
/// `*_DUP_ID`, ...) are built with the helpers below so the prefix always
/// matches the entity kind that raised them.
pub mod codes {
    pub const HEADER_MISSING: &str = "HEADER_MISSING";
    pub const HEADER_INVALID: &str = "HEADER_INVALID";
    pub const FIELD_TYPE_INVALID: &str = "FIELD_TYPE_INVALID";
    pub const STRAY_DIRECTORY: &str = "STRAY_DIRECTORY";
}

/// `CHAPTER_ID_MISSING`, `CHARACTER_ID_MISSING`, ...
pub fn id_missing_code(kind: EntityKind) -> String {
    format!("{}_ID_MISSING", kind.code_prefix())
}

/// `CHAPTER_DUP_ID`, `CHARACTER_DUP_ID`, ...
pub fn dup_id_code(kind: EntityKind) -> String {
    format!("{}_DUP_ID", kind.code_prefix())
}

/// `CHAPTER_ID_PATTERN`, ...
pub fn id_pattern_code(kind: EntityKind) -> String {
    format!("{}_ID_PATTERN", kind.code_prefix())
}

/// `CHAPTER_PATTERN_INVALID`, ... — the configured regex itself failed to compile.
pub fn pattern_invalid_code(kind: EntityKind) -> String {
    format!("{}_PATTERN_INVALID", kind.code_prefix())
}

/// `CHARACTER_REF_UNRESOLVED`, ... — a chapter reference that resolves to nothing.
pub fn ref_unresolved_code(kind: EntityKind) -> String {
    format!("{}_REF_UNRESOLVED", kind.code_prefix())
}
