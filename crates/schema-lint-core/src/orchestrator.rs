//! Validation orchestration.
//!
//! Turns "resource changed" and "resource removed" events into validation
//! passes: resolves the schema by naming convention, keeps the dependency
//! index current, runs the validator and files positioned diagnostics.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ValidationConfig};
use crate::dependency::SharedSchemaIndex;
use crate::pointer;
use crate::positions::{self, PositionMap};
use crate::project::ProjectSettings;
use crate::resolve;
use crate::sink::{DiagnosticSink, SinkError, MARKER_KIND};
use crate::store::{ResourceStore, StoreError};
use crate::types::{Diagnostic, DiagnosticKind, Location, Severity};
use crate::validator::{self, JsonSchemaValidator, SchemaValidator, ValidatorError};

/// Errors that abort validation of one resource.
///
/// Prior diagnostics of the resource are left untouched when these occur.
#[derive(Debug, Error)]
pub enum ValidateError {
    /// Reading a document or listing its folder failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The schema document is not usable.
    #[error("schema {path}: {reason}")]
    Schema {
        /// The schema resource.
        path: PathBuf,
        /// Why it cannot be used.
        reason: String,
    },

    /// The validator failed.
    #[error("validator failed for {path}: {source}")]
    Validator {
        /// The data resource.
        path: PathBuf,
        /// Underlying failure.
        source: ValidatorError,
    },

    /// The diagnostic sink rejected an update.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Construction is missing a collaborator.
    #[error("orchestrator needs a {0}")]
    Missing(&'static str),
}

impl ValidateError {
    /// Returns `true` if the resource disappeared mid-operation.
    #[must_use]
    pub fn is_vanished(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

/// Result of validating one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The resource disappeared before it could be read. Nothing changed.
    Vanished,
    /// Diagnostics of the resource were replaced by these.
    Reported(Vec<Diagnostic>),
}

impl Validation {
    /// The diagnostics filed, empty for [`Validation::Vanished`].
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Vanished => &[],
            Self::Reported(diagnostics) => diagnostics,
        }
    }
}

/// A dependent whose re-validation failed during a cascade.
#[derive(Debug)]
pub struct CascadeFailure {
    /// The resource that failed.
    pub resource: PathBuf,
    /// Why.
    pub error: ValidateError,
}

/// Result of re-validating every dependent of a schema.
#[derive(Debug, Default)]
pub struct CascadeOutcome {
    /// Resources validated successfully, in index order.
    pub validated: Vec<PathBuf>,
    /// Resources whose validation failed. They did not stop the cascade.
    pub failures: Vec<CascadeFailure>,
}

impl CascadeOutcome {
    fn settle(&mut self, resource: &Path, result: Result<(), ValidateError>) {
        match result {
            Ok(()) => self.validated.push(resource.to_path_buf()),
            Err(e) if e.is_vanished() => {
                debug!("{} vanished during re-validation", resource.display());
                self.validated.push(resource.to_path_buf());
            }
            Err(e) => {
                error!("Re-validation of {} failed: {e}", resource.display());
                self.failures.push(CascadeFailure {
                    resource: resource.to_path_buf(),
                    error: e,
                });
            }
        }
    }
}

/// What [`Orchestrator::on_resource_changed`] did.
#[derive(Debug)]
pub enum ChangeOutcome {
    /// Not a JSON document, or it no longer exists.
    Skipped,
    /// The resource was validated, against `schema` if one was found.
    Validated {
        /// The schema used.
        schema: Option<PathBuf>,
        /// The diagnostics filed.
        diagnostics: Vec<Diagnostic>,
    },
    /// The resource is a schema; its dependents were re-validated.
    Cascade(CascadeOutcome),
}

/// What [`Orchestrator::on_resource_removed`] did.
#[derive(Debug)]
pub enum RemoveOutcome {
    /// A schema with dependents was removed and they were re-checked.
    SchemaRemoved(CascadeOutcome),
    /// The resource was dropped from the schema it depended on, if any.
    DataRemoved {
        /// The schema that listed it.
        schema: Option<PathBuf>,
    },
}

/// Builder for configuring an [`Orchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    store: Option<Arc<dyn ResourceStore>>,
    sink: Option<Arc<dyn DiagnosticSink>>,
    settings: Option<Arc<dyn ProjectSettings>>,
    validator: Option<Arc<dyn SchemaValidator>>,
    index: Option<SharedSchemaIndex>,
    timeout: Option<Duration>,
    severity: Option<Severity>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource store (required).
    #[must_use]
    pub fn store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the diagnostic sink (required).
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the project settings (default: nothing externally checked).
    #[must_use]
    pub fn settings(mut self, settings: Arc<dyn ProjectSettings>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the validator (default: [`JsonSchemaValidator`]).
    #[must_use]
    pub fn validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Shares an existing dependency index (default: a new one).
    #[must_use]
    pub fn index(mut self, index: SharedSchemaIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Bounds each validator call (default: unbounded).
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Severity of filed diagnostics (default: error).
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Applies the `[validation]` section of a configuration.
    #[must_use]
    pub fn config(self, config: &Config) -> Self {
        let validation: &ValidationConfig = &config.validation;
        self.settings(Arc::new(validation.clone()))
            .timeout(validation.timeout())
            .severity(validation.severity)
    }

    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::Missing`] without a store or a sink.
    pub fn build(self) -> Result<Orchestrator, ValidateError> {
        Ok(Orchestrator {
            store: self.store.ok_or(ValidateError::Missing("resource store"))?,
            sink: self.sink.ok_or(ValidateError::Missing("diagnostic sink"))?,
            settings: self
                .settings
                .unwrap_or_else(|| Arc::new(ValidationConfig::default())),
            validator: self
                .validator
                .unwrap_or_else(|| Arc::new(JsonSchemaValidator::new())),
            index: self.index.unwrap_or_default(),
            timeout: self.timeout,
            severity: self.severity.unwrap_or(Severity::Error),
            sink_updates: Mutex::new(()),
        })
    }
}

/// Drives validation for resource events.
///
/// Use [`Orchestrator::builder()`] to construct an instance. Each handler
/// runs to completion on the calling thread; the dependency index is shared
/// behind a lock and cascades iterate a snapshot of it. Sink updates are
/// serialized, so concurrent events for one resource leave exactly one
/// validation's diagnostics behind.
pub struct Orchestrator {
    store: Arc<dyn ResourceStore>,
    sink: Arc<dyn DiagnosticSink>,
    settings: Arc<dyn ProjectSettings>,
    validator: Arc<dyn SchemaValidator>,
    index: SharedSchemaIndex,
    timeout: Option<Duration>,
    severity: Severity,
    sink_updates: Mutex<()>,
}

impl Orchestrator {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// The dependency index.
    #[must_use]
    pub fn index(&self) -> &SharedSchemaIndex {
        &self.index
    }

    /// The resource store.
    #[must_use]
    pub fn store(&self) -> &dyn ResourceStore {
        self.store.as_ref()
    }

    /// Handles a created or modified resource.
    ///
    /// A data document is validated against its schema. A schema with
    /// dependents re-validates each of them. Anything else gets a syntax
    /// check only.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource itself could not be validated.
    /// Failures of individual dependents are collected in the cascade.
    pub fn on_resource_changed(&self, resource: &Path) -> Result<ChangeOutcome, ValidateError> {
        if self.store.extension_of(resource).as_deref() != Some("json") {
            return Ok(ChangeOutcome::Skipped);
        }
        if !self.store.exists(resource) {
            debug!("File removed: {}", resource.display());
            return Ok(ChangeOutcome::Skipped);
        }

        let schema = match resolve::find_schema(self.store.as_ref(), resource) {
            Ok(schema) => schema,
            Err(e) if e.is_not_found() => return Ok(ChangeOutcome::Skipped),
            Err(e) => return Err(e.into()),
        };

        if let Some(schema) = schema {
            self.index.record(&schema, resource);
            return Ok(match self.validate(resource, Some(&schema))? {
                Validation::Vanished => ChangeOutcome::Skipped,
                Validation::Reported(diagnostics) => ChangeOutcome::Validated {
                    schema: Some(schema),
                    diagnostics,
                },
            });
        }

        let dependents = self.index.dependents_of(resource);
        if !dependents.is_empty() {
            return Ok(ChangeOutcome::Cascade(self.cascade(resource, &dependents)));
        }

        debug!("No schema for {}", resource.display());
        Ok(match self.validate(resource, None)? {
            Validation::Vanished => ChangeOutcome::Skipped,
            Validation::Reported(diagnostics) => ChangeOutcome::Validated {
                schema: None,
                diagnostics,
            },
        })
    }

    /// Syntax-checks `schema` itself, then re-validates `dependents` against it.
    fn cascade(&self, schema: &Path, dependents: &[PathBuf]) -> CascadeOutcome {
        let mut outcome = CascadeOutcome::default();

        if let Err(e) = self.validate(schema, None) {
            error!("Syntax check of schema {} failed: {e}", schema.display());
        }

        for data in dependents {
            debug!(
                "{} status affected by schema {}",
                data.display(),
                schema.display()
            );
            let result = self.validate(data, Some(schema)).map(|_| ());
            outcome.settle(data, result);
        }
        outcome
    }

    /// Handles a deleted resource.
    ///
    /// Removing a schema drops its index entry and re-resolves every former
    /// dependent. Removing a data document drops it from its schema's list.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink refuses to clear the removed resource.
    pub fn on_resource_removed(&self, resource: &Path) -> Result<RemoveOutcome, ValidateError> {
        self.sink_updates_locked(|| self.sink.clear_all(resource, MARKER_KIND))?;

        let dependents = self.index.remove_schema(resource);
        if dependents.is_empty() {
            let schema = self.index.remove_data(resource);
            if let Some(schema) = &schema {
                debug!(
                    "{} no longer depends on {}",
                    resource.display(),
                    schema.display()
                );
            }
            return Ok(RemoveOutcome::DataRemoved { schema });
        }

        info!(
            "Schema {} removed, re-checking {} dependent(s)",
            resource.display(),
            dependents.len()
        );
        let mut outcome = CascadeOutcome::default();
        for data in &dependents {
            let result = self.on_resource_changed(data).map(|_| ());
            outcome.settle(data, result);
        }
        Ok(RemoveOutcome::SchemaRemoved(outcome))
    }

    /// Checks a batch of files, data documents first, then schemas.
    ///
    /// Data documents go through [`Self::on_resource_changed`] so the index
    /// is filled before schemas are reached; schemas only get a syntax
    /// check since their dependents were just validated.
    #[must_use]
    pub fn check_all(&self, files: &[PathBuf]) -> CascadeOutcome {
        let (schemas, data): (Vec<&PathBuf>, Vec<&PathBuf>) = files
            .iter()
            .partition(|f| resolve::is_schema_name(&self.store.name_of(f)));

        let mut outcome = CascadeOutcome::default();
        for file in data {
            let result = self.on_resource_changed(file).map(|_| ());
            outcome.settle(file, result);
        }
        for file in schemas {
            let result = self.validate(file, None).map(|_| ());
            outcome.settle(file, result);
        }
        info!(
            "Checked {} file(s), {} failure(s)",
            outcome.validated.len(),
            outcome.failures.len()
        );
        outcome
    }

    /// Validates `data` against `schema`, or syntax-checks it without one.
    ///
    /// The resource's previous diagnostics are replaced only once the new
    /// set is complete, so a failure leaves them in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be read, the schema is unusable,
    /// the validator fails, or the sink rejects the update.
    pub fn validate(&self, data: &Path, schema: Option<&Path>) -> Result<Validation, ValidateError> {
        let bytes = match self.store.read(data) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                debug!("File removed before validation: {}", data.display());
                return Ok(Validation::Vanished);
            }
            Err(e) => return Err(e.into()),
        };
        let content = String::from_utf8_lossy(&bytes);
        let positions = positions::index(&content);

        let document: Value = match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                let diagnostics = self.syntax_diagnostics(data, &e);
                self.replace(data, &diagnostics)?;
                return Ok(Validation::Reported(diagnostics));
            }
        };

        let schema_json = match schema {
            Some(schema) => match self.load_schema(schema)? {
                Some(schema_json) => schema_json,
                None => {
                    debug!("Schema removed before validation: {}", schema.display());
                    return Ok(Validation::Vanished);
                }
            },
            None => Value::Object(serde_json::Map::new()),
        };

        let context = format!(
            " ({}. Schema: {})",
            self.store.name_of(data),
            schema.map_or_else(|| "(none)".to_string(), |s| self.store.name_of(s)),
        );

        let diagnostics =
            match validator::run_bounded(&self.validator, schema_json, document, self.timeout) {
                Ok(messages) => messages
                    .into_iter()
                    .map(|m| {
                        debug!("{}{context}", m.message);
                        self.position(data, &positions, m.pointer, m.message)
                    })
                    .collect(),
                Err(ValidatorError::Timeout { millis }) => {
                    warn!("Validation timed out{context}");
                    vec![Diagnostic::new(
                        DiagnosticKind::ValidatorTimeout,
                        self.severity,
                        Location::new(data, 1),
                        format!("validation timed out after {millis} ms"),
                    )]
                }
                Err(source) => {
                    error!("Validator failed{context}: {source}");
                    return Err(ValidateError::Validator {
                        path: data.to_path_buf(),
                        source,
                    });
                }
            };

        self.replace(data, &diagnostics)?;
        Ok(Validation::Reported(diagnostics))
    }

    fn syntax_diagnostics(&self, data: &Path, e: &serde_json::Error) -> Vec<Diagnostic> {
        let project = self.store.project_of(data);
        if self.settings.is_externally_syntax_checked(&project) {
            info!(
                "No marker for {} since {} is syntax-checked elsewhere",
                data.display(),
                project.display()
            );
            return Vec::new();
        }

        let full = e.to_string();
        let suffix = format!(" at line {} column {}", e.line(), e.column());
        let message = full.strip_suffix(&suffix).unwrap_or(&full);
        vec![Diagnostic::new(
            DiagnosticKind::SyntaxError,
            self.severity,
            Location::new(data, e.line()),
            message,
        )]
    }

    /// Reads and parses `schema`. `None` if it no longer exists; its own
    /// removal event re-resolves the dependents.
    fn load_schema(&self, schema: &Path) -> Result<Option<Value>, ValidateError> {
        let unusable = |reason: String| ValidateError::Schema {
            path: schema.to_path_buf(),
            reason,
        };
        let bytes = match self.store.read(schema) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(unusable(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| unusable(e.to_string()))
    }

    /// Places one validator message on a line of `data`.
    fn position(
        &self,
        data: &Path,
        positions: &PositionMap,
        structured: Option<String>,
        message: String,
    ) -> Diagnostic {
        let pointer = structured.or_else(|| pointer::extract_from_message(&message).map(String::from));

        let line = match &pointer {
            Some(p) => positions.line_of(p).unwrap_or_else(|| {
                warn!("Unknown line number of {p:?}");
                1
            }),
            None => {
                warn!("No pointer in message: {message:?}");
                positions.line_of("").unwrap_or(1)
            }
        };

        let diagnostic = Diagnostic::new(
            DiagnosticKind::SchemaViolation,
            self.severity,
            Location::new(data, line),
            message,
        );
        match pointer {
            Some(p) => diagnostic.with_pointer(p),
            None => diagnostic,
        }
    }

    fn replace(&self, data: &Path, diagnostics: &[Diagnostic]) -> Result<(), ValidateError> {
        self.sink_updates_locked(|| self.sink.replace(data, MARKER_KIND, diagnostics.to_vec()))?;
        Ok(())
    }

    fn sink_updates_locked<T>(&self, update: impl FnOnce() -> T) -> T {
        let _guard = self.sink_updates.lock();
        update()
    }
}
