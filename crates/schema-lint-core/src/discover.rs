//! JSON file discovery for whole-project checks.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::resolve;

/// Errors that can occur while walking a project.
#[derive(Debug, Error)]
pub enum DiscoverError {
    /// Walking the directory tree failed.
    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// An exclude pattern is not a valid glob.
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

/// Compiled exclude patterns.
#[derive(Debug, Clone, Default)]
pub struct Excludes {
    patterns: Vec<(glob::Pattern, String)>,
}

impl Excludes {
    /// Compiles `patterns`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn new<I, S>(patterns: I) -> Result<Self, DiscoverError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                let fragment = p.replace("**/", "").replace("/**", "");
                Ok((glob::Pattern::new(p)?, fragment))
            })
            .collect::<Result<_, glob::PatternError>>()?;
        Ok(Self { patterns })
    }

    /// Checks if a path should be excluded.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.patterns.iter().any(|(glob, fragment)| {
            // Fragments catch "**/target/**" on relative paths too.
            glob.matches(&path_str) || (!fragment.is_empty() && path_str.contains(fragment.as_str()))
        })
    }
}

/// Finds every `.json` file under `root`, sorted.
///
/// # Errors
///
/// Returns an error if an exclude pattern is invalid or the walk fails.
pub fn discover_json_files(root: &Path, config: &AnalyzerConfig) -> Result<Vec<PathBuf>, DiscoverError> {
    let excludes = Excludes::new(&config.exclude)?;

    let mut builder = ignore::WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(config.respect_gitignore)
        .filter_entry(|entry| entry.file_name() != ".git");

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() || !resolve::is_json_name(&path.to_string_lossy()) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        if excludes.matches(relative) {
            debug!("Excluding: {}", path.display());
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    debug!("Discovered {} JSON file(s) under {}", files.len(), root.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_excludes() {
        let excludes = Excludes::new(["**/target/**", "vendor/**"]).unwrap();
        assert!(excludes.matches(Path::new("/foo/target/debug/a.json")));
        assert!(excludes.matches(Path::new("target/a.json")));
        assert!(excludes.matches(Path::new("vendor/lib.json")));
        assert!(!excludes.matches(Path::new("src/a.json")));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(Excludes::new(["a[b"]), Err(DiscoverError::Glob(_))));
    }

    #[test]
    fn test_discover_json_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("data/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("data/a.json"), "{}").unwrap();
        fs::write(root.join("data/nested/b.json"), "{}").unwrap();
        fs::write(root.join("data/notes.txt"), "x").unwrap();
        fs::write(root.join("node_modules/pkg/package.json"), "{}").unwrap();

        let files = discover_json_files(root, &AnalyzerConfig::default()).unwrap();
        let relative: Vec<PathBuf> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("data/a.json"), PathBuf::from("data/nested/b.json")]
        );
    }
}
