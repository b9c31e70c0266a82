//! Project-level settings consulted during validation.

use std::path::Path;

use crate::config::{Config, ValidationConfig};

/// Per-project switches.
pub trait ProjectSettings: Send + Sync {
    /// Returns `true` if another tool already reports JSON syntax errors
    /// for `project`, in which case parse failures are not reported here.
    fn is_externally_syntax_checked(&self, project: &Path) -> bool;
}

impl ProjectSettings for ValidationConfig {
    fn is_externally_syntax_checked(&self, _project: &Path) -> bool {
        self.externally_syntax_checked
    }
}

impl ProjectSettings for Config {
    fn is_externally_syntax_checked(&self, project: &Path) -> bool {
        self.validation.is_externally_syntax_checked(project)
    }
}
