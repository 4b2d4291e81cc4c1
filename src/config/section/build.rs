//! `[build]` section configuration.
//!
//! ```toml
//! [build]
//! strict = false   # abort the production pipeline on the first failed stage
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Abort a production build when a stage reports failures.
    ///
    /// Development always keeps going so the watch loop can pick up fixes.
    pub strict: bool,
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_strict_default_off() {
        assert!(!test_parse_config("").build.strict);
        assert!(test_parse_config("[build]\nstrict = true").build.strict);
    }
}
