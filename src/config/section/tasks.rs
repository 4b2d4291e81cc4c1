//! Per-task sections: `[layout]`, `[styles]`, `[scripts]`, `[fonts]`, `[resources]`.
//!
//! Globs are relative to `paths.source`, `output` is relative to
//! `paths.output`. Commands are argument arrays; `$GILD_*` variables are
//! substituted before running (see `task::transform::command`).
//!
//! # Example
//!
//! ```toml
//! [styles]
//! input = ["scss/**/*.scss"]
//! command = ["sass", "--stdin", "--load-path=$GILD_INPUT_DIR"]
//! dev_args = ["--embed-source-map"]
//!
//! [styles.targets]
//! safari = "13"
//!
//! [scripts]
//! command = ["esbuild", "$GILD_INPUT", "--bundle", "--target=es2017"]
//! ```

use serde::{Deserialize, Serialize};

use super::{strings, validate_command, validate_globs};
use crate::config::{ConfigDiagnostics, FieldPath};

// ============================================================================
// [layout]
// ============================================================================

/// Markup templates compiled by an external template compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub input: Vec<String>,
    pub watch: Vec<String>,
    pub output: String,
    pub command: Vec<String>,
    /// Extra arguments in development (pretty output).
    pub dev_args: Vec<String>,
    /// Extra arguments in production.
    pub build_args: Vec<String>,
    /// Extension of the compiled files.
    pub extension: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            input: strings(&["index.pug"]),
            watch: strings(&["**/*.pug"]),
            output: String::new(),
            command: strings(&["pug"]),
            dev_args: strings(&["--pretty"]),
            build_args: Vec::new(),
            extension: "html".into(),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        validate_globs(FieldPath::new("layout.input"), &self.input, diag);
        validate_globs(FieldPath::new("layout.watch"), &self.watch, diag);
        validate_command(FieldPath::new("layout.command"), &self.command, diag);
    }
}

// ============================================================================
// [styles]
// ============================================================================

/// Stylesheets: external preprocessor, then built-in prefixing/minification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    pub input: Vec<String>,
    pub watch: Vec<String>,
    pub output: String,
    pub command: Vec<String>,
    pub dev_args: Vec<String>,
    pub build_args: Vec<String>,
    /// Minimum browser versions for vendor prefixing.
    pub targets: BrowserTargets,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            input: strings(&["scss/**/*.scss"]),
            watch: strings(&["scss/**/*.scss"]),
            output: "css".into(),
            command: strings(&["sass", "--stdin", "--load-path=$GILD_INPUT_DIR"]),
            dev_args: strings(&["--embed-source-map"]),
            build_args: strings(&["--no-source-map"]),
            targets: BrowserTargets::default(),
        }
    }
}

impl StylesConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        validate_globs(FieldPath::new("styles.input"), &self.input, diag);
        validate_globs(FieldPath::new("styles.watch"), &self.watch, diag);
        validate_command(FieldPath::new("styles.command"), &self.command, diag);
        self.targets.validate(diag);
    }
}

/// Browser versions as `"major[.minor[.patch]]"` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserTargets {
    pub chrome: Option<String>,
    pub edge: Option<String>,
    pub firefox: Option<String>,
    pub safari: Option<String>,
    pub ios_saf: Option<String>,
    pub samsung: Option<String>,
    pub android: Option<String>,
    pub opera: Option<String>,
}

impl Default for BrowserTargets {
    fn default() -> Self {
        Self {
            chrome: Some("90".into()),
            edge: Some("90".into()),
            firefox: Some("88".into()),
            safari: Some("13".into()),
            ios_saf: Some("13".into()),
            samsung: Some("14".into()),
            android: Some("90".into()),
            opera: Some("76".into()),
        }
    }
}

impl BrowserTargets {
    /// Encode a version string the way lightningcss expects
    /// (`major << 16 | minor << 8 | patch`).
    pub fn encode(version: &str) -> Option<u32> {
        let mut parts = version.trim().split('.');
        let major: u32 = parts.next()?.parse().ok()?;
        let minor: u32 = parts.next().map_or(Some(0), |p| p.parse().ok())?;
        let patch: u32 = parts.next().map_or(Some(0), |p| p.parse().ok())?;
        if parts.next().is_some() || major > 255 || minor > 255 || patch > 255 {
            return None;
        }
        Some((major << 16) | (minor << 8) | patch)
    }

    /// All configured browsers with their versions.
    pub fn entries(&self) -> [(&'static str, Option<&str>); 8] {
        [
            ("chrome", self.chrome.as_deref()),
            ("edge", self.edge.as_deref()),
            ("firefox", self.firefox.as_deref()),
            ("safari", self.safari.as_deref()),
            ("ios_saf", self.ios_saf.as_deref()),
            ("samsung", self.samsung.as_deref()),
            ("android", self.android.as_deref()),
            ("opera", self.opera.as_deref()),
        ]
    }

    fn validate(&self, diag: &mut ConfigDiagnostics) {
        for (name, version) in self.entries() {
            if let Some(version) = version
                && Self::encode(version).is_none()
            {
                diag.error(
                    FieldPath::new("styles.targets"),
                    format!("invalid version `{version}` for {name}"),
                );
            }
        }
    }
}

// ============================================================================
// [scripts]
// ============================================================================

/// Scripts: external bundler (fail-soft), then built-in minification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Bundle entry points.
    pub input: Vec<String>,
    pub watch: Vec<String>,
    pub output: String,
    pub command: Vec<String>,
    pub dev_args: Vec<String>,
    pub build_args: Vec<String>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            input: strings(&["js/main.js"]),
            watch: strings(&["js/**/*.js"]),
            output: "js".into(),
            command: strings(&["esbuild", "$GILD_INPUT", "--bundle", "--target=es2017"]),
            dev_args: strings(&["--sourcemap=inline"]),
            build_args: Vec::new(),
        }
    }
}

impl ScriptsConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        validate_globs(FieldPath::new("scripts.input"), &self.input, diag);
        validate_globs(FieldPath::new("scripts.watch"), &self.watch, diag);
        validate_command(FieldPath::new("scripts.command"), &self.command, diag);
    }
}

// ============================================================================
// [fonts]
// ============================================================================

/// TrueType fonts converted to both web formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    pub input: Vec<String>,
    pub watch: Vec<String>,
    pub output: String,
    /// TTF to WOFF converter.
    pub woff: Vec<String>,
    /// TTF to WOFF2 converter.
    pub woff2: Vec<String>,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            input: strings(&["fonts/**/*.ttf"]),
            watch: strings(&["fonts/**/*.ttf"]),
            output: "fonts".into(),
            woff: strings(&["ttf2woff", "$GILD_INPUT", "$GILD_OUTPUT"]),
            woff2: strings(&["ttf2woff2"]),
        }
    }
}

impl FontsConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        validate_globs(FieldPath::new("fonts.input"), &self.input, diag);
        validate_globs(FieldPath::new("fonts.watch"), &self.watch, diag);
        validate_command(FieldPath::new("fonts.woff"), &self.woff, diag);
        validate_command(FieldPath::new("fonts.woff2"), &self.woff2, diag);
    }
}

// ============================================================================
// [resources]
// ============================================================================

/// Files copied verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    pub input: Vec<String>,
    pub watch: Vec<String>,
    pub output: String,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            input: strings(&["resources/**"]),
            watch: strings(&["resources/**"]),
            output: "resources".into(),
        }
    }
}

impl ResourcesConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        validate_globs(FieldPath::new("resources.input"), &self.input, diag);
        validate_globs(FieldPath::new("resources.watch"), &self.watch, diag);
    }
}
