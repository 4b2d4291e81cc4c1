//! Project configuration management for `gild.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! ├── types/         # ConfigError, ConfigDiagnostics, FieldPath
//! ├── util.rs        # Config file discovery
//! └── mod.rs         # SiteConfig (this file)
//! ```
//!
//! Every section is optional; a project without `gild.toml` runs on the
//! defaults, which mirror the conventional `src/` → `dist/` layout.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{
    BrowserTargets, BuildConfig, CacheConfig, DeployConfig, FontsConfig, ImagesConfig,
    LayoutConfig, PathsConfig, ResourcesConfig, ScriptsConfig, ServeConfig, StylesConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{Cli, Commands, ServeArgs},
    log,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing gild.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub styles: StylesConfig,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub fonts: FontsConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub resources: ResourcesConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub deploy: DeployConfig,
}

impl SiteConfig {
    /// Load configuration for the given CLI invocation.
    ///
    /// Searches upward from cwd for the config file. When none exists the
    /// defaults apply and the current directory is the project root.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, config_path) = match find_config_file(&cwd, &cli.config) {
            Some(path) => (Self::from_path(&path)?, path),
            None => {
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                (Self::default(), cwd.join(&cli.config))
            }
        };

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());
        config.config_path = config_path;
        config.finalize(&root);
        config.apply_command_options(&cli.command());
        config.validate(&cli.command())?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Anchor every relative path at `root`.
    pub(crate) fn finalize(&mut self, root: &Path) {
        use crate::utils::path::normalize_path;

        self.root = normalize_path(root);
        self.paths.source = normalize_path(&self.root.join(&self.paths.source));
        self.paths.output = normalize_path(&self.root.join(&self.paths.output));

        if let Some(path) = self.deploy.password_path.take() {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            self.deploy.password_path = Some(normalize_path(&self.root.join(expanded)));
        }
    }

    /// Absolute source root.
    pub fn source_dir(&self) -> &Path {
        &self.paths.source
    }

    /// Absolute output root.
    pub fn output_dir(&self) -> &Path {
        &self.paths.output
    }

    /// Path relative to the project root, for display.
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, command: &Commands) {
        match command {
            Commands::Dev { serve } => self.apply_serve_options(serve),
            Commands::Build { strict } => self.build.strict |= *strict,
            Commands::Deploy { parallel } => {
                Self::update_option(&mut self.deploy.parallel, parallel.as_ref());
            }
            _ => {}
        }
    }

    fn apply_serve_options(&mut self, args: &ServeArgs) {
        Self::update_option(&mut self.serve.interface, args.interface.as_ref());
        Self::update_option(&mut self.serve.port, args.port.as_ref());
        Self::update_option(&mut self.serve.watch, args.watch.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration for the current command.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self, command: &Commands) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.paths.validate(&self.root, &mut diag);
        self.layout.validate(&mut diag);
        self.styles.validate(&mut diag);
        self.scripts.validate(&mut diag);
        self.fonts.validate(&mut diag);
        self.images.validate(&mut diag);
        self.resources.validate(&mut diag);
        self.cache.validate(&mut diag);
        self.deploy.validate(&mut diag);

        if matches!(command, Commands::Deploy { .. }) {
            self.deploy.validate_endpoint(&mut diag);
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Parsed config anchored at `root` (usually a `TempDir`).
#[cfg(test)]
pub fn test_config_at(root: &Path, content: &str) -> SiteConfig {
    let mut config = test_parse_config(content);
    config.finalize(root);
    config
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = SiteConfig::parse_with_ignored("[paths\nsource = \"src\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_finalize_anchors_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = test_config_at(dir.path(), "[paths]\nsource = \"assets\"");

        assert!(config.source_dir().is_absolute());
        assert!(config.source_dir().ends_with("assets"));
        assert!(config.output_dir().ends_with("dist"));
        assert!(config.output_dir().starts_with(&config.root));
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[paths]\nsource = \"src\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = SiteConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.paths.source, PathBuf::from("src"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let (_, ignored) = SiteConfig::parse_with_ignored("[build]\nstrict = true").unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = test_parse_config("[serve]\nport = 4000\n[deploy]\nparallel = 3");

        config.apply_command_options(&Commands::Dev {
            serve: ServeArgs {
                port: Some(9000),
                ..ServeArgs::default()
            },
        });
        assert_eq!(config.serve.port, 9000);

        config.apply_command_options(&Commands::Deploy { parallel: None });
        assert_eq!(config.deploy.parallel, 3);

        config.apply_command_options(&Commands::Build { strict: true });
        assert!(config.build.strict);
    }

    #[test]
    fn test_deploy_endpoint_only_for_deploy() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = test_config_at(dir.path(), "");

        assert!(config.validate(&Commands::Clean).is_ok());
        assert!(config.validate(&Commands::Deploy { parallel: None }).is_err());
    }

    #[test]
    fn test_password_path_expanded() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = test_config_at(dir.path(), "[deploy]\npassword_path = \"secrets/ftp\"");
        let path = config.deploy.password_path.unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("secrets/ftp"));
    }
}
