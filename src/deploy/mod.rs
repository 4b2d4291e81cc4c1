//! Deploy: mirror the output tree to an FTP server.
//!
//! Every file under the output root is compared against its remote copy
//! and sent only when the local modification time is newer (whole
//! seconds). Up to `deploy.parallel` sessions work through one shared
//! queue. There is no retry: the first failure stops the queue, transfers
//! already running finish, then the deploy fails with that error.

mod remote;

pub use remote::{Connector, FtpConnector, RemoteSession};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Instant, SystemTime};

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use crossbeam::channel::{self, Receiver};
use jwalk::{Parallelism, WalkDir};
use parking_lot::Mutex;
use suppaftp::FtpError;
use thiserror::Error;

use crate::config::SiteConfig;
use crate::logger::ProgressLine;
use crate::utils::path::to_slash;
use crate::utils::plural_count;
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("output directory `{}` does not exist, build first", .0.display())]
    NoOutput(PathBuf),

    #[error("cannot connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: FtpError,
    },

    #[error("login as `{user}` failed: {source}")]
    Login {
        user: String,
        #[source]
        source: FtpError,
    },

    #[error("{command} {path} failed: {source}")]
    Remote {
        command: &'static str,
        path: String,
        #[source]
        source: FtpError,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeployError {
    pub(crate) fn remote(command: &'static str, path: &str, source: FtpError) -> Self {
        Self::Remote {
            command,
            path: path.to_string(),
            source,
        }
    }
}

/// What a sync did.
#[derive(Debug, Default)]
pub struct DeployStats {
    /// Remote paths that were sent, sorted.
    pub uploaded: Vec<String>,
    pub skipped: usize,
}

/// Upload everything newer than the remote copy.
pub fn run(config: &SiteConfig) -> Result<DeployStats> {
    let started = Instant::now();
    let deploy = &config.deploy;
    let connector = FtpConnector::new(deploy)?;
    log!("deploy"; "syncing to {}", connector.endpoint());

    let stats = sync(config.output_dir(), &deploy.remote_dir, deploy.parallel, &connector)?;

    log!(
        "deploy";
        "{} uploaded, {} up to date in {:.2?}",
        plural_count(stats.uploaded.len(), "file"),
        stats.skipped,
        started.elapsed()
    );
    Ok(stats)
}

/// Sync `output` into `remote_dir` using up to `parallel` sessions.
pub fn sync<C: Connector>(
    output: &Path,
    remote_dir: &str,
    parallel: usize,
    connector: &C,
) -> Result<DeployStats, DeployError> {
    let files = local_files(output)?;
    if files.is_empty() {
        log!("deploy"; "nothing to deploy in {}", output.display());
        return Ok(DeployStats::default());
    }

    let (tx, rx) = channel::unbounded();
    for file in &files {
        let _ = tx.send(file);
    }
    drop(tx);

    let workers = parallel.clamp(1, files.len());
    debug!("deploy"; "{} across {}", plural_count(files.len(), "file"), plural_count(workers, "session"));

    let shared = Shared {
        remote_dir,
        progress: ProgressLine::new("deploy", &[("sync", files.len())]),
        stop: AtomicBool::new(false),
        error: Mutex::new(None),
        uploaded: Mutex::new(Vec::new()),
        skipped: AtomicUsize::new(0),
    };

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let rx = rx.clone();
            let shared = &shared;
            scope.spawn(move || worker(connector, &rx, shared));
        }
    });

    let Shared {
        progress,
        error,
        uploaded,
        skipped,
        ..
    } = shared;
    progress.finish();

    if let Some(error) = error.into_inner() {
        return Err(error);
    }
    let mut uploaded = uploaded.into_inner();
    uploaded.sort();
    Ok(DeployStats {
        uploaded,
        skipped: skipped.into_inner(),
    })
}

struct LocalFile {
    path: PathBuf,
    /// Output-relative, `/` separated.
    relative: String,
    modified: SystemTime,
}

struct Shared<'a> {
    remote_dir: &'a str,
    progress: ProgressLine,
    /// Set on the first failure; workers stop taking new files.
    stop: AtomicBool,
    error: Mutex<Option<DeployError>>,
    uploaded: Mutex<Vec<String>>,
    skipped: AtomicUsize,
}

impl Shared<'_> {
    fn fail(&self, error: DeployError) {
        self.stop.store(true, Ordering::SeqCst);
        let mut slot = self.error.lock();
        if slot.is_none() {
            *slot = Some(error);
        }
    }
}

fn worker<C: Connector>(connector: &C, jobs: &Receiver<&LocalFile>, shared: &Shared<'_>) {
    let mut session = match connector.connect() {
        Ok(session) => session,
        Err(e) => return shared.fail(e),
    };

    while !shared.stop.load(Ordering::SeqCst) {
        let Ok(file) = jobs.recv() else {
            break;
        };
        match sync_file(&mut session, file, shared.remote_dir) {
            Ok(Some(remote)) => {
                debug!("deploy"; "sent {}", remote);
                shared.uploaded.lock().push(remote);
            }
            Ok(None) => {
                shared.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => return shared.fail(e),
        }
        shared.progress.inc("sync");
    }
}

/// Upload `file` if it is newer; returns the remote path when sent.
fn sync_file<S: RemoteSession>(
    session: &mut S,
    file: &LocalFile,
    remote_dir: &str,
) -> Result<Option<String>, DeployError> {
    let remote = remote_path(remote_dir, &file.relative);
    if !is_newer(file.modified, session.modified(&remote)?) {
        return Ok(None);
    }
    if let Some((dir, _)) = remote.rsplit_once('/')
        && !dir.is_empty()
    {
        session.ensure_dir(dir)?;
    }
    session.upload(&remote, &file.path)?;
    Ok(Some(remote))
}

/// Newer at whole-second granularity; a missing remote file always is.
fn is_newer(local: SystemTime, remote: Option<NaiveDateTime>) -> bool {
    match remote {
        None => true,
        Some(remote) => DateTime::<Utc>::from(local).timestamp() > remote.and_utc().timestamp(),
    }
}

fn remote_path(remote_dir: &str, relative: &str) -> String {
    let dir = remote_dir.trim_end_matches('/');
    if dir.is_empty() {
        relative.to_string()
    } else {
        format!("{dir}/{relative}")
    }
}

fn local_files(output: &Path) -> Result<Vec<LocalFile>, DeployError> {
    if !output.is_dir() {
        return Err(DeployError::NoOutput(output.to_path_buf()));
    }

    let mut files = Vec::new();
    let walk = WalkDir::new(output)
        .sort(true)
        .skip_hidden(false)
        .parallelism(Parallelism::Serial);
    for entry in walk {
        let entry = entry.map_err(|e| DeployError::Io {
            path: e.path().map_or_else(|| output.to_path_buf(), Path::to_path_buf),
            source: io::Error::other(e.to_string()),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let modified = path
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|source| DeployError::Io {
                path: path.clone(),
                source,
            })?;
        let Ok(relative) = path.strip_prefix(output) else {
            continue;
        };
        files.push(LocalFile {
            relative: to_slash(relative),
            path,
            modified,
        });
    }
    Ok(files)
}
