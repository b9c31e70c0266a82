//! Core types for diagnostics and check results.

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail a check.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// The document violates its schema.
    SchemaViolation,
    /// The document is not well-formed JSON.
    SyntaxError,
    /// The validator did not finish in time.
    ValidatorTimeout,
}

impl DiagnosticKind {
    /// Short code (e.g., "SL001").
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::SchemaViolation => "SL001",
            Self::SyntaxError => "SL002",
            Self::ValidatorTimeout => "SL003",
        }
    }

    /// Kebab-case name (e.g., "schema-violation").
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::SchemaViolation => "schema-violation",
            Self::SyntaxError => "syntax-error",
            Self::ValidatorTimeout => "validator-timeout",
        }
    }
}

/// Source location of a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File the diagnostic is attached to.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
}

impl Location {
    /// Creates a new location. Line 0 is clamped to 1.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: line.max(1),
        }
    }
}

/// A problem reported against a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What produced this diagnostic.
    pub kind: DiagnosticKind,
    /// Severity of this diagnostic.
    pub severity: Severity,
    /// Where the problem is.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
    /// JSON Pointer the validator blamed, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    #[must_use]
    pub fn new(
        kind: DiagnosticKind,
        severity: Severity,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            location,
            message: message.into(),
            pointer: None,
        }
    }

    /// Attaches the JSON Pointer this diagnostic was resolved from.
    #[must_use]
    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = Some(pointer.into());
        self
    }

    /// Formats the diagnostic for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!(
            "{} {} at {}:{}\n",
            self.kind.code(),
            self.kind.name(),
            self.location.file.display(),
            self.location.line,
        );
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        if let Some(pointer) = &self.pointer {
            let _ = writeln!(output, "  = pointer: {pointer:?}");
        }
        output
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.location.file.display(),
            self.location.line,
            self.severity,
            self.kind.code(),
            self.message
        )
    }
}

/// A [`Diagnostic`] bound to its document text for rich rendering.
#[derive(Debug, thiserror::Error, MietteDiagnostic)]
#[error("[{code}] {message}")]
pub struct SourceDiagnostic {
    code: &'static str,
    message: String,
    #[source_code]
    source_code: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    label: String,
}

impl SourceDiagnostic {
    /// Binds `diagnostic` to `content`, labelling the whole reported line.
    #[must_use]
    pub fn new(diagnostic: &Diagnostic, content: String) -> Self {
        let (offset, length) = line_span(&content, diagnostic.location.line);
        let label = diagnostic
            .pointer
            .as_deref()
            .filter(|p| !p.is_empty())
            .map_or_else(|| diagnostic.kind.name().to_string(), str::to_string);
        Self {
            code: diagnostic.kind.code(),
            message: diagnostic.message.clone(),
            source_code: NamedSource::new(diagnostic.location.file.display().to_string(), content),
            span: SourceSpan::from((offset, length)),
            label,
        }
    }
}

/// Byte offset and length of `line` (1-indexed) in `content`.
///
/// Lines past the end resolve to an empty span at the end of the text.
#[must_use]
pub fn line_span(content: &str, line: usize) -> (usize, usize) {
    let mut offset = 0;
    for (i, line_content) in content.split('\n').enumerate() {
        if i + 1 == line.max(1) {
            return (offset, line_content.trim_end_matches('\r').len());
        }
        offset += line_content.len() + 1;
    }
    (content.len(), 0)
}

/// Result of checking a set of documents.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CheckReport {
    /// All diagnostics found.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of files checked.
    pub files_checked: usize,
    /// Files that could not be validated, with the reason.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<(PathBuf, String)>,
}

impl CheckReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Counts diagnostics by severity: `(errors, warnings, infos)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let count = |s: Severity| self.diagnostics.iter().filter(|d| d.severity == s).count();
        (
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info),
        )
    }

    /// Sorts diagnostics by file, then line.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            a.location
                .file
                .cmp(&b.location.file)
                .then(a.location.line.cmp(&b.location.line))
        });
    }
}
