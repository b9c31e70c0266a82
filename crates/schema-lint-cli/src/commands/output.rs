//! Shared output formatting for check results.

use anyhow::Result;
use schema_lint_core::{CheckReport, Severity, SourceDiagnostic};

use crate::OutputFormat;

/// Print check results in the specified format.
pub fn print(report: &CheckReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(report),
        OutputFormat::Json => return print_json(report),
        OutputFormat::Compact => print_compact(report),
        OutputFormat::Pretty => print_pretty(report),
    }
    Ok(())
}

fn print_text(report: &CheckReport) {
    for diagnostic in &report.diagnostics {
        let severity_indicator = match diagnostic.severity {
            Severity::Error => "\x1b[31merror\x1b[0m",
            Severity::Warning => "\x1b[33mwarning\x1b[0m",
            Severity::Info => "\x1b[34minfo\x1b[0m",
        };

        println!(
            "{} {} at {}:{}",
            diagnostic.kind.code(),
            diagnostic.kind.name(),
            diagnostic.location.file.display(),
            diagnostic.location.line,
        );
        println!("  {}: {}", severity_indicator, diagnostic.message);
        if let Some(pointer) = diagnostic.pointer.as_deref().filter(|p| !p.is_empty()) {
            println!("  = pointer: {pointer}");
        }
        println!();
    }
    print_failures(report);
    print_summary(report);
}

fn print_failures(report: &CheckReport) {
    for (file, reason) in &report.failures {
        println!("\x1b[31mfailed\x1b[0m {}: {reason}", file.display());
    }
}

fn print_summary(report: &CheckReport) {
    let (errors, warnings, infos) = report.count_by_severity();

    let summary_color = if errors > 0 || !report.failures.is_empty() {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    println!(
        "{}Found {} error(s), {} warning(s), {} info(s) in {} file(s)\x1b[0m",
        summary_color, errors, warnings, infos, report.files_checked
    );
}

fn print_json(report: &CheckReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

/// Prints one `file:line: severity [code] message` line per diagnostic.
pub fn print_compact(report: &CheckReport) {
    for diagnostic in &report.diagnostics {
        println!("{diagnostic}");
    }
    for (file, reason) in &report.failures {
        println!("{}: failed: {reason}", file.display());
    }
}

fn print_pretty(report: &CheckReport) {
    for diagnostic in &report.diagnostics {
        let content = match std::fs::read_to_string(&diagnostic.location.file) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(
                    "Cannot re-read {} for display: {e}",
                    diagnostic.location.file.display()
                );
                String::new()
            }
        };
        let rendered = miette::Report::new(SourceDiagnostic::new(diagnostic, content));
        println!("{rendered:?}");
    }
    print_failures(report);
    print_summary(report);
}
