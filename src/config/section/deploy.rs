//! `[deploy]` section configuration.
//!
//! Uploads the output tree to a single FTP endpoint.
//!
//! # Example
//!
//! ```toml
//! [deploy]
//! host = "ftp.example.com"
//! user = "site"
//! password_env = "GILD_FTP_PASSWORD"   # or password_path = "~/.ftp-password"
//! remote_dir = "public_html"
//! parallel = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ConfigDiagnostics, FieldPath};

/// FTP deployment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub host: String,
    pub port: u16,
    pub user: String,

    /// Inline password. Prefer `password_env` or `password_path`.
    pub password: Option<String>,
    /// Environment variable holding the password.
    pub password_env: Option<String>,
    /// File containing the password (tilde expanded).
    ///
    /// # Security
    /// - Store outside the repository
    /// - Never commit credentials to version control!
    pub password_path: Option<PathBuf>,

    /// Remote directory relative to the login directory.
    pub remote_dir: String,

    /// Concurrent FTP sessions.
    pub parallel: usize,

    /// Connect and transfer timeout in seconds.
    pub timeout: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            user: "anonymous".into(),
            password: None,
            password_env: None,
            password_path: None,
            remote_dir: String::new(),
            parallel: 10,
            timeout: 30,
        }
    }
}

impl DeployConfig {
    const HOST: FieldPath = FieldPath::new("deploy.host");
    const PARALLEL: FieldPath = FieldPath::new("deploy.parallel");
    const PASSWORD_PATH: FieldPath = FieldPath::new("deploy.password_path");

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    /// Checks that apply to every command.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.parallel == 0 {
            diag.error_with_hint(
                Self::PARALLEL,
                "at least one session is required",
                "e.g. parallel = 10",
            );
        }
    }

    /// Checks that only matter when actually deploying.
    pub fn validate_endpoint(&self, diag: &mut ConfigDiagnostics) {
        if self.host.trim().is_empty() {
            diag.error_with_hint(
                Self::HOST,
                "no FTP host configured",
                "set host = \"ftp.example.com\" in [deploy]",
            );
        }
        if let Some(path) = &self.password_path {
            if !path.exists() {
                diag.error(
                    Self::PASSWORD_PATH,
                    format!("file not found: {}", path.display()),
                );
            } else if !path.is_file() {
                diag.error(
                    Self::PASSWORD_PATH,
                    format!("not a file: {}", path.display()),
                );
            }
        }
    }

    /// Resolve the password: inline, then environment, then file.
    ///
    /// Anonymous logins without any configured source get an empty password.
    pub fn resolve_password(&self) -> anyhow::Result<String> {
        use anyhow::Context;

        if let Some(password) = &self.password {
            return Ok(password.clone());
        }
        if let Some(var) = &self.password_env {
            return std::env::var(var)
                .with_context(|| format!("environment variable `{var}` is not set"));
        }
        if let Some(path) = &self.password_path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            return Ok(content.trim_end_matches(['\r', '\n']).to_string());
        }
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_deploy_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.deploy.port, 21);
        assert_eq!(config.deploy.parallel, 10);
        assert!(config.deploy.remote_dir.is_empty());
    }

    #[test]
    fn test_missing_host_reported() {
        let config = test_parse_config("");
        let mut diag = ConfigDiagnostics::new();
        config.deploy.validate_endpoint(&mut diag);
        assert!(diag.has_errors());
    }

    #[test]
    fn test_zero_parallel_rejected() {
        let config = test_parse_config("[deploy]\nparallel = 0");
        let mut diag = ConfigDiagnostics::new();
        config.deploy.validate(&mut diag);
        assert!(diag.has_errors());
    }

    #[test]
    fn test_password_sources() {
        let inline = test_parse_config("[deploy]\npassword = \"secret\"");
        assert_eq!(inline.deploy.resolve_password().unwrap(), "secret");

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("pw");
        fs::write(&file, "from-file\n").unwrap();
        let config = DeployConfig {
            password_path: Some(file),
            ..DeployConfig::default()
        };
        assert_eq!(config.resolve_password().unwrap(), "from-file");

        let unset = DeployConfig {
            password_env: Some("GILD_TEST_UNSET_FTP_PASSWORD".into()),
            ..DeployConfig::default()
        };
        assert!(unset.resolve_password().is_err());
    }
}
