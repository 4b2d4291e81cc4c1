//! Remote side of a deploy.
//!
//! [`Connector`] opens sessions, one per worker; [`RemoteSession`] is the
//! three operations a sync needs. [`FtpConnector`] is the real thing.

use std::fs::File;
use std::io::BufReader;
use std::net::ToSocketAddrs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDateTime;
use rustc_hash::FxHashSet;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Status};

use super::DeployError;
use crate::config::DeployConfig;

pub trait Connector: Sync {
    type Session: RemoteSession;

    fn connect(&self) -> Result<Self::Session, DeployError>;
}

pub trait RemoteSession {
    /// Remote modification time (UTC), `None` when the file does not exist.
    fn modified(&mut self, path: &str) -> Result<Option<NaiveDateTime>, DeployError>;

    /// Create `dir` and its parents if needed.
    fn ensure_dir(&mut self, dir: &str) -> Result<(), DeployError>;

    fn upload(&mut self, path: &str, local: &Path) -> Result<(), DeployError>;
}

// ============================================================================
// FTP
// ============================================================================

pub struct FtpConnector {
    host: String,
    port: u16,
    user: String,
    password: String,
    timeout: Duration,
}

impl FtpConnector {
    pub fn new(deploy: &DeployConfig) -> anyhow::Result<Self> {
        let password = deploy
            .resolve_password()
            .context("failed to resolve deploy password")?;
        Ok(Self {
            host: deploy.host.clone(),
            port: deploy.port,
            user: deploy.user.clone(),
            password,
            timeout: deploy.timeout(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn open(&self) -> Result<FtpStream, FtpError> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(FtpError::ConnectionError)?
            .next()
            .ok_or_else(|| {
                FtpError::ConnectionError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "host did not resolve",
                ))
            })?;

        let stream = FtpStream::connect_timeout(addr, self.timeout)?;
        stream
            .get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(FtpError::ConnectionError)?;
        Ok(stream)
    }
}

impl Connector for FtpConnector {
    type Session = FtpSession;

    fn connect(&self) -> Result<FtpSession, DeployError> {
        let mut stream = self.open().map_err(|source| DeployError::Connect {
            endpoint: self.endpoint(),
            source,
        })?;
        stream
            .login(&self.user, &self.password)
            .map_err(|source| DeployError::Login {
                user: self.user.clone(),
                source,
            })?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|source| DeployError::remote("TYPE", "", source))?;

        Ok(FtpSession {
            stream,
            dirs: FxHashSet::default(),
        })
    }
}

pub struct FtpSession {
    stream: FtpStream,
    /// Directories known to exist, so each is created at most once per session.
    dirs: FxHashSet<String>,
}

impl RemoteSession for FtpSession {
    fn modified(&mut self, path: &str) -> Result<Option<NaiveDateTime>, DeployError> {
        match self.stream.mdtm(path) {
            Ok(time) => Ok(Some(time)),
            Err(e) if is_missing(&e) => Ok(None),
            Err(source) => Err(DeployError::remote("MDTM", path, source)),
        }
    }

    fn ensure_dir(&mut self, dir: &str) -> Result<(), DeployError> {
        for prefix in dir_prefixes(dir) {
            if self.dirs.contains(&prefix) {
                continue;
            }
            match self.stream.mkdir(&prefix) {
                // already there
                Ok(()) | Err(FtpError::UnexpectedResponse(_)) => {}
                Err(source) => return Err(DeployError::remote("MKD", &prefix, source)),
            }
            self.dirs.insert(prefix);
        }
        Ok(())
    }

    fn upload(&mut self, path: &str, local: &Path) -> Result<(), DeployError> {
        let file = File::open(local).map_err(|source| DeployError::Io {
            path: local.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        self.stream
            .put_file(path, &mut reader)
            .map_err(|source| DeployError::remote("STOR", path, source))?;
        Ok(())
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        let _ = self.stream.quit();
    }
}

/// 550 is the only answer that means "no such file"; 500/502 mean the
/// server cannot tell.
fn is_missing(error: &FtpError) -> bool {
    matches!(error, FtpError::UnexpectedResponse(r) if r.status == Status::FileUnavailable)
}

/// `a/b/c` → `a`, `a/b`, `a/b/c` (a leading `/` is kept).
fn dir_prefixes(dir: &str) -> Vec<String> {
    let absolute = dir.starts_with('/');
    let mut current = String::new();
    let mut prefixes = Vec::new();
    for part in dir.split('/').filter(|p| !p.is_empty()) {
        if !current.is_empty() || absolute {
            current.push('/');
        }
        current.push_str(part);
        prefixes.push(current.clone());
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_prefixes() {
        assert_eq!(dir_prefixes("img/icons"), vec!["img", "img/icons"]);
        assert_eq!(dir_prefixes("/www/css"), vec!["/www", "/www/css"]);
        assert_eq!(dir_prefixes("a//b/"), vec!["a", "a/b"]);
        assert!(dir_prefixes("").is_empty());
    }

    #[test]
    fn test_only_file_unavailable_means_missing() {
        use suppaftp::types::Response;

        let reply = |status| FtpError::UnexpectedResponse(Response::new(status, Vec::new()));
        assert!(is_missing(&reply(Status::FileUnavailable)));
        assert!(!is_missing(&reply(Status::NotImplemented)));
        assert!(!is_missing(&reply(Status::BadCommand)));
        assert!(!is_missing(&FtpError::BadResponse));
    }

    #[test]
    fn test_connector_resolves_password() {
        let deploy = DeployConfig {
            host: "ftp.example.com".into(),
            password: Some("secret".into()),
            ..DeployConfig::default()
        };
        let connector = FtpConnector::new(&deploy).unwrap();
        assert_eq!(connector.endpoint(), "ftp.example.com:21");
        assert_eq!(connector.password, "secret");
    }

    #[test]
    fn test_unreachable_host_fails_to_connect() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let deploy = DeployConfig {
            host: "127.0.0.1".into(),
            port,
            timeout: 2,
            ..DeployConfig::default()
        };
        let connector = FtpConnector::new(&deploy).unwrap();
        let err = connector.connect().err().unwrap();
        assert!(matches!(err, DeployError::Connect { .. }));
    }
}
