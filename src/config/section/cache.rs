//! `[cache]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [cache]
//! extensions = ["css", "js", "svg", "png", "jpg", "jpeg", "woff2", "woff"]
//! hash_length = 10
//! manifest = "rev.json"
//! entries = ["index.html"]
//! ```

use serde::{Deserialize, Serialize};

use super::strings;
use crate::config::{ConfigDiagnostics, FieldPath};

/// Cache-busting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Extensions of fingerprinted assets (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Hex characters of the content hash embedded in file names.
    pub hash_length: usize,
    /// Manifest file name under the output root.
    pub manifest: String,
    /// Documents rewritten to reference fingerprinted names.
    pub entries: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            extensions: strings(&["css", "js", "svg", "png", "jpg", "jpeg", "woff2", "woff"]),
            hash_length: 10,
            manifest: "rev.json".into(),
            entries: strings(&["index.html"]),
        }
    }
}

impl CacheConfig {
    const HASH_LENGTH: FieldPath = FieldPath::new("cache.hash_length");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !(4..=64).contains(&self.hash_length) {
            diag.error_with_hint(
                Self::HASH_LENGTH,
                format!("{} is out of range", self.hash_length),
                "use a value between 4 and 64",
            );
        }
        if self.manifest.is_empty() || self.manifest.contains(['/', '\\']) {
            diag.error(
                FieldPath::new("cache.manifest"),
                format!("`{}` is not a plain file name", self.manifest),
            );
        }
        if self
            .extensions
            .iter()
            .any(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            diag.error_with_hint(
                FieldPath::new("cache.extensions"),
                "extensions must be non-empty and written without a leading dot",
                "e.g. extensions = [\"css\", \"js\"]",
            );
        }
    }

    /// Whether a file extension is selected for fingerprinting.
    pub fn selects(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_cache_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.cache.hash_length, 10);
        assert_eq!(config.cache.manifest, "rev.json");
        assert_eq!(config.cache.entries, vec!["index.html"]);
        assert!(config.cache.selects("woff2"));
        assert!(config.cache.selects("PNG"));
        assert!(!config.cache.selects("html"));
    }

    #[test]
    fn test_hash_length_range() {
        let config = test_parse_config("[cache]\nhash_length = 2");
        let mut diag = ConfigDiagnostics::new();
        config.cache.validate(&mut diag);
        assert!(diag.has_errors());
    }

    #[test]
    fn test_dotted_extension_rejected() {
        let config = test_parse_config("[cache]\nextensions = [\".css\"]");
        let mut diag = ConfigDiagnostics::new();
        config.cache.validate(&mut diag);
        assert!(diag.has_errors());
    }
}
