//! # schema-lint-core
//!
//! Core of schema-lint: JSON Schema validation with diagnostics placed on
//! the line of the offending JSON value.
//!
//! This crate provides:
//!
//! - [`positions::index`] mapping every JSON Pointer of a document to the
//!   line where its value starts
//! - [`SchemaIndex`] tracking which data documents depend on which schema
//! - [`Orchestrator`] turning resource events into validation passes
//! - [`ResourceStore`], [`DiagnosticSink`] and [`SchemaValidator`] seams
//!   for hosting it
//!
//! ## Example
//!
//! ```
//! use std::path::Path;
//! use std::sync::Arc;
//! use schema_lint_core::{DiagnosticStore, MemoryStore, Orchestrator};
//!
//! let store = Arc::new(MemoryStore::new());
//! store.insert("data/Products.json", "{\n  \"Products\": [\n    { \"Name\": 1 }\n  ]\n}\n");
//! store.insert(
//!     "data/ProductsSchema.json",
//!     r#"{"properties": {"Products": {"items": {"properties": {"Name": {"type": "string"}}}}}}"#,
//! );
//! let sink = Arc::new(DiagnosticStore::new());
//!
//! let orchestrator = Orchestrator::builder()
//!     .store(store)
//!     .sink(sink.clone())
//!     .build()?;
//! orchestrator.on_resource_changed(Path::new("data/Products.json"))?;
//!
//! let diagnostics = sink.diagnostics_for(Path::new("data/Products.json"));
//! assert_eq!(diagnostics[0].location.line, 3);
//! # Ok::<(), schema_lint_core::ValidateError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dependency;
mod discover;
mod orchestrator;
mod project;
mod resolve;
mod sink;
mod store;
mod types;
mod validator;

pub mod pointer;
pub mod positions;

pub use config::{AnalyzerConfig, Config, ConfigError, ValidationConfig, WatchConfig};
pub use dependency::{SchemaIndex, SharedSchemaIndex};
pub use discover::{discover_json_files, DiscoverError, Excludes};
pub use orchestrator::{
    CascadeFailure, CascadeOutcome, ChangeOutcome, Orchestrator, OrchestratorBuilder,
    RemoveOutcome, ValidateError, Validation,
};
pub use positions::PositionMap;
pub use project::ProjectSettings;
pub use resolve::{candidate_names, find_schema, is_json_name, is_schema_name};
pub use sink::{DiagnosticSink, DiagnosticStore, SinkError, MARKER_KIND};
pub use store::{FsStore, MemoryStore, ResourceStore, StoreError};
pub use types::{
    line_span, CheckReport, Diagnostic, DiagnosticKind, Location, Severity, SourceDiagnostic,
};
pub use validator::{
    run_bounded, CompiledSchema, JsonSchemaValidator, SchemaValidator, ValidatorError,
    ValidatorMessage,
};
