//! Check command implementation.

use anyhow::{Context, Result};
use schema_lint_core::{discover_json_files, CheckReport, DiagnosticStore, FsStore, Orchestrator};
use std::sync::Arc;

use crate::config_resolver::Resolved;
use crate::OutputFormat;

/// Runs the check command.
pub fn run(resolved: Resolved, format: OutputFormat, exclude: Vec<String>) -> Result<()> {
    let Resolved {
        mut config, root, ..
    } = resolved;
    config.analyzer.exclude.extend(exclude);

    let files = discover_json_files(&root, &config.analyzer)
        .with_context(|| format!("Failed to discover JSON files under {}", root.display()))?;

    let sink = Arc::new(DiagnosticStore::new());
    let orchestrator = Orchestrator::builder()
        .store(Arc::new(FsStore::new(&root)))
        .sink(sink.clone())
        .config(&config)
        .build()
        .context("Failed to build orchestrator")?;

    tracing::info!("Checking {} JSON file(s) under {}", files.len(), root.display());

    let outcome = orchestrator.check_all(&files);
    let report = collect(&sink, files.len(), outcome.failures);

    super::output::print(&report, format)?;

    // Exit with error code if there are errors
    if report.has_errors() || !report.failures.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

/// Builds the report from the sink plus the files that could not be checked.
fn collect(
    sink: &DiagnosticStore,
    files_checked: usize,
    failures: Vec<schema_lint_core::CascadeFailure>,
) -> CheckReport {
    let mut report = sink.report(files_checked);
    report.failures = failures
        .into_iter()
        .map(|f| (f.resource, f.error.to_string()))
        .collect();
    report
}
