//! `[paths]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! source = "src"     # Input tree
//! output = "dist"    # Output tree, removed by `clean`
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Source and output roots, relative to the project root until loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub source: PathBuf,
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: "src".into(),
            output: "dist".into(),
        }
    }
}

impl PathsConfig {
    const OUTPUT: FieldPath = FieldPath::new("paths.output");

    /// The output tree is deleted on every run, so it must not contain the
    /// project root or the source tree.
    pub fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        if self.output.as_os_str().is_empty() || root.starts_with(&self.output) {
            diag.error_with_hint(
                Self::OUTPUT,
                format!("`{}` would remove the project root", self.output.display()),
                "use a dedicated directory such as \"dist\"",
            );
        } else if self.source.starts_with(&self.output) {
            diag.error(
                Self::OUTPUT,
                format!(
                    "`{}` contains the source tree `{}`",
                    self.output.display(),
                    self.source.display()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigDiagnostics, test_parse_config};
    use std::path::{Path, PathBuf};

    #[test]
    fn test_paths_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.paths.source, PathBuf::from("src"));
        assert_eq!(config.paths.output, PathBuf::from("dist"));
    }

    #[test]
    fn test_output_must_not_be_root() {
        let mut config = test_parse_config("[paths]\noutput = \".\"");
        config.finalize(Path::new("/site"));

        let mut diag = ConfigDiagnostics::new();
        config.paths.validate(&config.root, &mut diag);
        assert!(diag.has_errors());
    }

    #[test]
    fn test_output_must_not_contain_source() {
        let mut config = test_parse_config("[paths]\nsource = \"dist/src\"");
        config.finalize(Path::new("/site"));

        let mut diag = ConfigDiagnostics::new();
        config.paths.validate(&config.root, &mut diag);
        assert!(diag.has_errors());
    }
}
