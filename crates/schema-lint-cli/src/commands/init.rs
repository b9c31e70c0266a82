//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config_resolver::PROJECT_CONFIG_NAMES;

const DEFAULT_CONFIG: &str = r#"# schema-lint configuration
#
# Each data file `Foo.json` is validated against the first of
# `FooSchema.json`, `Foo.schema.json` or `schema.json` found next to it.

[analyzer]
# Root directory to check, relative to the checked path
# root = "data"

# Glob patterns to exclude
exclude = [
    "**/node_modules/**",
    "**/target/**",
]

# Respect .gitignore files
respect_gitignore = true

[validation]
# Set when another tool already reports JSON syntax errors
externally_syntax_checked = false

# Upper bound for one validation in milliseconds (0 disables it)
validator_timeout_ms = 5000

# Severity of reported problems: "error", "warning" or "info"
severity = "error"

[watch]
# Events within this many milliseconds are handled as one batch by `schema-lint watch`
debounce_ms = 200
"#;

/// Runs the init command in the current directory.
pub fn run(force: bool) -> Result<()> {
    write_config(Path::new(PROJECT_CONFIG_NAMES[0]), force)?;

    println!("Created {}", PROJECT_CONFIG_NAMES[0]);
    println!("\nNext steps:");
    println!("  1. Edit {} to adjust validation", PROJECT_CONFIG_NAMES[0]);
    println!("  2. Run: schema-lint check");

    Ok(())
}

fn write_config(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_lint_core::{Config, Severity};
    use tempfile::TempDir;

    #[test]
    fn default_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.validation.validator_timeout_ms, 5000);
        assert_eq!(config.validation.severity, Severity::Error);
        assert_eq!(config.watch.debounce_ms, 200);
        assert!(config.analyzer.respect_gitignore);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("schema-lint.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(write_config(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        write_config(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }
}
