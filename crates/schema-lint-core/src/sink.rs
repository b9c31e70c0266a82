//! Diagnostic sinks: where findings are attached to resources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use crate::types::{CheckReport, Diagnostic};

/// Marker kind under which this crate files its diagnostics.
pub const MARKER_KIND: &str = "schema-lint.json-problem";

/// Failure to update a sink.
#[derive(Debug, Error)]
#[error("diagnostic sink error for {resource}: {message}")]
pub struct SinkError {
    /// Resource being updated.
    pub resource: PathBuf,
    /// What went wrong.
    pub message: String,
}

/// Receives diagnostics for resources.
///
/// `marker_kind` scopes entries so that clearing one producer's findings
/// never removes another producer's.
pub trait DiagnosticSink: Send + Sync {
    /// Attaches `diagnostic` to `resource` under `marker_kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the update.
    fn add(
        &self,
        resource: &Path,
        marker_kind: &str,
        diagnostic: Diagnostic,
    ) -> Result<(), SinkError>;

    /// Removes every diagnostic of `marker_kind` from `resource`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the update.
    fn clear_all(&self, resource: &Path, marker_kind: &str) -> Result<(), SinkError>;

    /// Swaps the `marker_kind` diagnostics on `resource` for `diagnostics`.
    ///
    /// The default clears and then adds one by one. Readers of such a sink
    /// may observe the cleared state in between.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the update.
    fn replace(
        &self,
        resource: &Path,
        marker_kind: &str,
        diagnostics: Vec<Diagnostic>,
    ) -> Result<(), SinkError> {
        self.clear_all(resource, marker_kind)?;
        for diagnostic in diagnostics {
            self.add(resource, marker_kind, diagnostic)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Marker {
    kind: String,
    diagnostic: Diagnostic,
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    markers: Mutex<BTreeMap<PathBuf, Vec<Marker>>>,
}

impl DiagnosticStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics on `resource`, in insertion order.
    #[must_use]
    pub fn diagnostics_for(&self, resource: &Path) -> Vec<Diagnostic> {
        self.markers.lock()
            .get(resource)
            .map(|markers| markers.iter().map(|m| m.diagnostic.clone()).collect())
            .unwrap_or_default()
    }

    /// Diagnostics of one marker kind on `resource`.
    #[must_use]
    pub fn diagnostics_of_kind(&self, resource: &Path, marker_kind: &str) -> Vec<Diagnostic> {
        self.markers.lock()
            .get(resource)
            .map(|markers| {
                markers
                    .iter()
                    .filter(|m| m.kind == marker_kind)
                    .map(|m| m.diagnostic.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.lock().values().map(Vec::len).sum()
    }

    /// Returns `true` if no diagnostic is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collects every stored diagnostic into a sorted report.
    #[must_use]
    pub fn report(&self, files_checked: usize) -> CheckReport {
        let mut report = CheckReport::new();
        report.files_checked = files_checked;
        report.diagnostics = self
            .markers
            .lock()
            .values()
            .flatten()
            .map(|m| m.diagnostic.clone())
            .collect();
        report.sort();
        report
    }
}

impl DiagnosticSink for DiagnosticStore {
    fn add(
        &self,
        resource: &Path,
        marker_kind: &str,
        diagnostic: Diagnostic,
    ) -> Result<(), SinkError> {
        tracing::debug!(
            "New marker: line {} for {}, msg={}",
            diagnostic.location.line,
            resource.display(),
            diagnostic.message
        );
        self.markers.lock()
            .entry(resource.to_path_buf())
            .or_default()
            .push(Marker {
                kind: marker_kind.to_string(),
                diagnostic,
            });
        Ok(())
    }

    fn clear_all(&self, resource: &Path, marker_kind: &str) -> Result<(), SinkError> {
        let mut markers = self.markers.lock();
        if let Some(list) = markers.get_mut(resource) {
            let before = list.len();
            list.retain(|m| m.kind != marker_kind);
            tracing::debug!("Removing old markers: {}", before - list.len());
            if list.is_empty() {
                markers.remove(resource);
            }
        }
        Ok(())
    }

    fn replace(
        &self,
        resource: &Path,
        marker_kind: &str,
        diagnostics: Vec<Diagnostic>,
    ) -> Result<(), SinkError> {
        let mut markers = self.markers.lock();
        let list = markers.entry(resource.to_path_buf()).or_default();
        list.retain(|m| m.kind != marker_kind);
        list.extend(diagnostics.into_iter().map(|diagnostic| Marker {
            kind: marker_kind.to_string(),
            diagnostic,
        }));
        tracing::debug!("{} marker(s) on {}", list.len(), resource.display());
        if list.is_empty() {
            markers.remove(resource);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiagnosticKind, Location, Severity};

    fn diag(file: &str, line: usize) -> Diagnostic {
        Diagnostic::new(
            DiagnosticKind::SchemaViolation,
            Severity::Error,
            Location::new(file, line),
            "bad",
        )
    }

    #[test]
    fn clear_only_touches_own_kind() {
        let store = DiagnosticStore::new();
        let file = Path::new("a.json");
        store.add(file, MARKER_KIND, diag("a.json", 1)).unwrap();
        store.add(file, "other.tool", diag("a.json", 2)).unwrap();

        store.clear_all(file, MARKER_KIND).unwrap();

        assert!(store.diagnostics_of_kind(file, MARKER_KIND).is_empty());
        assert_eq!(store.diagnostics_of_kind(file, "other.tool").len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_unknown_resource_is_noop() {
        let store = DiagnosticStore::new();
        store.clear_all(Path::new("x.json"), MARKER_KIND).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn replace_swaps_own_kind_only() {
        let store = DiagnosticStore::new();
        let file = Path::new("a.json");
        store.add(file, MARKER_KIND, diag("a.json", 1)).unwrap();
        store.add(file, "other.tool", diag("a.json", 2)).unwrap();

        store
            .replace(file, MARKER_KIND, vec![diag("a.json", 5), diag("a.json", 6)])
            .unwrap();
        let lines: Vec<usize> = store
            .diagnostics_of_kind(file, MARKER_KIND)
            .iter()
            .map(|d| d.location.line)
            .collect();
        assert_eq!(lines, vec![5, 6]);
        assert_eq!(store.diagnostics_of_kind(file, "other.tool").len(), 1);

        store.replace(file, MARKER_KIND, Vec::new()).unwrap();
        store.clear_all(file, "other.tool").unwrap();
        assert!(store.is_empty());
        assert!(store.report(1).diagnostics.is_empty());
    }

    #[test]
    fn report_is_sorted() {
        let store = DiagnosticStore::new();
        store.add(Path::new("b.json"), MARKER_KIND, diag("b.json", 1)).unwrap();
        store.add(Path::new("a.json"), MARKER_KIND, diag("a.json", 7)).unwrap();
        store.add(Path::new("a.json"), MARKER_KIND, diag("a.json", 2)).unwrap();

        let report = store.report(2);
        let lines: Vec<(String, usize)> = report
            .diagnostics
            .iter()
            .map(|d| (d.location.file.display().to_string(), d.location.line))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("a.json".to_string(), 2),
                ("a.json".to_string(), 7),
                ("b.json".to_string(), 1)
            ]
        );
        assert_eq!(report.files_checked, 2);
    }
}
