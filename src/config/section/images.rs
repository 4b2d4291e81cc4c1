//! `[images]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [images]
//! input = ["img/**/*.{jpg,jpeg,png,webp}"]
//! sprite_input = ["img/**/*.svg"]
//! api_key_env = "TINIFY_KEY"     # production recompression key
//! ```

use serde::{Deserialize, Serialize};

use super::{strings, validate_globs};
use crate::config::{ConfigDiagnostics, FieldPath};

/// Raster images, the SVG icon sprite and production recompression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub input: Vec<String>,
    pub watch: Vec<String>,
    pub output: String,

    /// Icons stacked into the sprite.
    pub sprite_input: Vec<String>,
    pub sprite_watch: Vec<String>,
    /// Sprite file name, written into `output`.
    pub sprite_name: String,

    /// Recompress raster images in production builds.
    pub recompress: bool,
    /// Tinify API key. Prefer `api_key_env` to keep it out of the repo.
    pub api_key: Option<String>,
    /// Environment variable holding the Tinify API key.
    pub api_key_env: String,
    /// Tinify endpoint, overridable for proxies.
    pub api_url: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            input: strings(&["img/**/*.{jpg,jpeg,png,webp}"]),
            watch: strings(&["img/**/*.{jpg,jpeg,png,webp}"]),
            output: "img".into(),
            sprite_input: strings(&["img/**/*.svg"]),
            sprite_watch: strings(&["img/**/*.svg"]),
            sprite_name: "sprite.svg".into(),
            recompress: true,
            api_key: None,
            api_key_env: "TINIFY_KEY".into(),
            api_url: "https://api.tinify.com/shrink".into(),
        }
    }
}

impl ImagesConfig {
    /// Resolve the recompression key: explicit value first, then environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        validate_globs(FieldPath::new("images.input"), &self.input, diag);
        validate_globs(FieldPath::new("images.watch"), &self.watch, diag);
        validate_globs(FieldPath::new("images.sprite_input"), &self.sprite_input, diag);
        validate_globs(FieldPath::new("images.sprite_watch"), &self.sprite_watch, diag);

        if self.sprite_name.contains(['/', '\\']) || !self.sprite_name.ends_with(".svg") {
            diag.error_with_hint(
                FieldPath::new("images.sprite_name"),
                format!("`{}` is not a plain .svg file name", self.sprite_name),
                "e.g. sprite_name = \"sprite.svg\"",
            );
        }
    }
}
