//! Configuration lookup for the `check` and `watch` commands.
//!
//! The first hit wins:
//!
//! 1. `--config` flag (explicit path)
//! 2. `schema-lint.toml` or `.schema-lint.toml` in the checked directory,
//!    or in the nearest ancestor that has one
//! 3. `config.toml` in `$SCHEMA_LINT_CONFIG_DIR` or `~/.schema-lint/`
//! 4. Built-in defaults
//!
//! The loaded `[analyzer] root` then narrows the directory that is checked.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use schema_lint_core::Config;

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly specified via `--config` flag.
    Explicit(PathBuf),
    /// Found next to the checked documents.
    Project(PathBuf),
    /// Loaded from the global config directory.
    Global(PathBuf),
    /// No config found; defaults are used.
    Default,
}

impl ConfigSource {
    fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(p) => write!(f, "config {}", p.display()),
            Self::Project(p) => write!(f, "project config {}", p.display()),
            Self::Global(p) => write!(f, "global config {}", p.display()),
            Self::Default => write!(f, "default config"),
        }
    }
}

/// Configuration ready for a command.
#[derive(Debug)]
pub struct Resolved {
    /// The loaded configuration.
    pub config: Config,
    /// Where it came from.
    pub source: ConfigSource,
    /// Directory whose documents are validated.
    pub root: PathBuf,
}

/// Project-level config file names, checked in order.
pub const PROJECT_CONFIG_NAMES: &[&str] = &["schema-lint.toml", ".schema-lint.toml"];

const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Finds and loads the configuration for checking `path`.
///
/// # Errors
///
/// Returns an error if the chosen file cannot be read or parsed. An
/// explicit path that does not exist is an error, not a fallback.
pub fn resolve(path: &Path, explicit: Option<&Path>) -> Result<Resolved> {
    resolve_in(path, explicit, global_config_dir())
}

/// Takes `global_dir` as a parameter so tests need no env vars.
fn resolve_in(path: &Path, explicit: Option<&Path>, global_dir: Option<PathBuf>) -> Result<Resolved> {
    let source = locate(path, explicit, global_dir);
    let config = match source.path() {
        Some(file) => Config::from_file(file)
            .with_context(|| format!("Failed to load config: {}", file.display()))?,
        None => Config::default(),
    };
    tracing::info!("Using {source}");

    let root = checked_root(path, &config);
    Ok(Resolved {
        config,
        source,
        root,
    })
}

fn locate(path: &Path, explicit: Option<&Path>, global_dir: Option<PathBuf>) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    let start = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    for dir in start.ancestors() {
        for name in PROJECT_CONFIG_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                tracing::debug!("Found project config: {}", candidate.display());
                return ConfigSource::Project(candidate);
            }
        }
    }

    if let Some(dir) = global_dir {
        let candidate = dir.join(GLOBAL_CONFIG_NAME);
        if candidate.is_file() {
            tracing::debug!("Found global config: {}", candidate.display());
            return ConfigSource::Global(candidate);
        }
    }

    ConfigSource::Default
}

/// `path`, narrowed by `[analyzer] root`.
fn checked_root(path: &Path, config: &Config) -> PathBuf {
    let root = &config.analyzer.root;
    if root.as_os_str().is_empty() || root == Path::new(".") {
        path.to_path_buf()
    } else {
        path.join(root)
    }
}

/// `$SCHEMA_LINT_CONFIG_DIR`, else `~/.schema-lint/`.
fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SCHEMA_LINT_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".schema-lint"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_lint_core::Severity;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn explicit_takes_priority_over_project() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("custom.toml");
        fs::write(&explicit, "[validation]\nseverity = \"warning\"\n").unwrap();
        fs::write(tmp.path().join("schema-lint.toml"), "").unwrap();

        let resolved = resolve_in(tmp.path(), Some(&explicit), None).unwrap();
        assert_eq!(resolved.source, ConfigSource::Explicit(explicit));
        assert_eq!(resolved.config.validation.severity, Severity::Warning);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_in(tmp.path(), Some(&tmp.path().join("nope.toml")), None).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("schema-lint.toml"), "[validation\n").unwrap();
        assert!(resolve_in(tmp.path(), None, None).is_err());
    }

    #[test]
    fn plain_name_preferred_over_dot_prefix() {
        let tmp = TempDir::new().unwrap();
        let dir = fs::canonicalize(tmp.path()).unwrap();
        fs::write(dir.join(".schema-lint.toml"), "").unwrap();
        assert_eq!(
            locate(&dir, None, None),
            ConfigSource::Project(dir.join(".schema-lint.toml"))
        );

        fs::write(dir.join("schema-lint.toml"), "").unwrap();
        assert_eq!(
            locate(&dir, None, None),
            ConfigSource::Project(dir.join("schema-lint.toml"))
        );
    }

    #[test]
    fn project_config_found_in_ancestor() {
        let tmp = TempDir::new().unwrap();
        let project = fs::canonicalize(tmp.path()).unwrap();
        let nested = project.join("data/orders");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            project.join("schema-lint.toml"),
            "[validation]\nexternally_syntax_checked = true\n",
        )
        .unwrap();

        let resolved = resolve_in(&nested, None, None).unwrap();
        assert_eq!(
            resolved.source,
            ConfigSource::Project(project.join("schema-lint.toml"))
        );
        assert!(resolved.config.validation.externally_syntax_checked);
        assert_eq!(resolved.root, nested);
    }

    #[test]
    fn global_fallback_applies_its_sections() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        fs::write(
            global.path().join("config.toml"),
            "[validation]\nvalidator_timeout_ms = 0\n\n[watch]\ndebounce_ms = 50\n",
        )
        .unwrap();

        let resolved =
            resolve_in(project.path(), None, Some(global.path().to_path_buf())).unwrap();
        assert_eq!(
            resolved.source,
            ConfigSource::Global(global.path().join("config.toml"))
        );
        assert_eq!(resolved.config.validation.timeout(), None);
        assert_eq!(resolved.config.watch.debounce(), Duration::from_millis(50));
    }

    #[test]
    fn global_skipped_when_project_config_exists() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("schema-lint.toml"), "").unwrap();
        let global = TempDir::new().unwrap();
        fs::write(global.path().join("config.toml"), "").unwrap();

        let source = locate(project.path(), None, Some(global.path().to_path_buf()));
        assert!(matches!(source, ConfigSource::Project(_)));
    }

    #[test]
    fn no_config_anywhere_uses_defaults() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();

        let resolved =
            resolve_in(project.path(), None, Some(global.path().to_path_buf())).unwrap();
        assert_eq!(resolved.source, ConfigSource::Default);
        assert!(!resolved.config.validation.externally_syntax_checked);
        assert_eq!(resolved.config.validation.severity, Severity::Error);
        assert_eq!(resolved.root, project.path());
    }

    #[test]
    fn analyzer_root_narrows_the_checked_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("schema-lint.toml"),
            "[analyzer]\nroot = \"data\"\n",
        )
        .unwrap();

        let resolved = resolve_in(tmp.path(), None, None).unwrap();
        assert_eq!(resolved.root, tmp.path().join("data"));
        assert_eq!(checked_root(Path::new("proj"), &Config::default()), PathBuf::from("proj"));
    }

    #[test]
    fn source_display_names_the_file() {
        let source = ConfigSource::Global(PathBuf::from("/home/u/.schema-lint/config.toml"));
        assert_eq!(
            source.to_string(),
            "global config /home/u/.schema-lint/config.toml"
        );
        assert_eq!(ConfigSource::Default.to_string(), "default config");
    }
}
