//! Transform tasks.
//!
//! A task selects files by glob under the source root, pushes each one
//! through an ordered chain of transforms in memory and writes whatever
//! comes out into its output directory.
//!
//! ```text
//! src/scss/**/*.scss ──▶ [sass] ──▶ [.css] ──▶ [.min] ──▶ [lightningcss] ──▶ dist/css/
//! ```
//!
//! A failing file is reported through the notifier and dropped; the
//! remaining files still go through. The run then ends as
//! [`TaskOutcome::Failed`] with whatever was written.

mod asset;
pub mod catalog;
pub mod glob;
pub mod transform;

pub use asset::Asset;
pub use glob::GlobSelector;
pub use transform::{Transform, TransformEnv};

use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;

use crate::core::{BuildContext, BuildMode};
use crate::{debug, utils::plural_count};

/// Why a single file could not be transformed.
#[derive(Debug, Error)]
pub enum TransformError {
    /// External command missing or exited unsuccessfully.
    #[error("{0:#}")]
    Command(anyhow::Error),

    /// Built-in parser rejected the input.
    #[error("{kind} parse error: {message}")]
    Parse { kind: &'static str, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Remote service refused or failed the request.
    #[error("remote service: {0}")]
    Remote(String),

    #[error("{0}")]
    Invalid(String),
}

/// A transform failure tied to the file it happened on.
#[derive(Debug, Error)]
#[error("{file}: {error}")]
pub struct FileError {
    pub file: String,
    #[source]
    pub error: TransformError,
}

impl FileError {
    pub fn new(file: impl Into<String>, error: impl Into<TransformError>) -> Self {
        Self {
            file: file.into(),
            error: error.into(),
        }
    }
}

/// How a task run ended.
#[derive(Debug)]
pub enum TaskOutcome {
    /// Every selected file made it through. Holds the written paths.
    Done(Vec<PathBuf>),
    /// Some files failed; `partial` lists what was written anyway.
    Failed {
        errors: Vec<FileError>,
        partial: Vec<PathBuf>,
    },
}

impl TaskOutcome {
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Paths written by the run, successful or not.
    pub fn written(&self) -> &[PathBuf] {
        match self {
            Self::Done(paths) => paths,
            Self::Failed { partial, .. } => partial,
        }
    }

    /// One-line summary for logs and the watch status line.
    pub fn summary(&self) -> String {
        match self {
            Self::Done(paths) => plural_count(paths.len(), "file"),
            Self::Failed { errors, partial } => format!(
                "{}, {} written",
                plural_count(errors.len(), "error"),
                plural_count(partial.len(), "file")
            ),
        }
    }
}

/// A named unit of work.
pub struct Task {
    pub name: &'static str,
    /// Selects inputs relative to the source root.
    pub inputs: GlobSelector,
    /// Changes matching these re-run the task in watch mode.
    pub watch: GlobSelector,
    /// Absolute output directory.
    pub output: PathBuf,
    pub chain: Vec<Box<dyn Transform>>,
    pub mode: BuildMode,
}

impl Task {
    /// Run once against the current source tree.
    pub fn run(&self, ctx: &BuildContext) -> TaskOutcome {
        let started = Instant::now();
        let config = &ctx.config;
        let env = TransformEnv {
            task: self.name,
            mode: self.mode,
            root: &config.root,
            source: config.source_dir(),
            output: &self.output,
        };

        let selection = self.inputs.select(config.source_dir());
        let mut errors: Vec<FileError> = selection
            .errors
            .into_iter()
            .map(|(path, e)| FileError::new(config.root_relative(&path).display().to_string(), e))
            .collect();
        let mut assets = Vec::new();
        for selected in selection.files {
            match Asset::read(&selected.path, &selected.relative, config.source_dir()) {
                Ok(asset) => assets.push(asset),
                Err(e) => errors.push(FileError::new(
                    config.root_relative(&selected.path).display().to_string(),
                    e,
                )),
            }
        }
        debug!(self.name; "{} selected", plural_count(assets.len(), "file"));

        let (assets, chain_errors) = transform::run_chain(&self.chain, assets, &env);
        errors.extend(chain_errors);

        let mut written = Vec::with_capacity(assets.len());
        for asset in assets {
            match asset.write_to(&self.output) {
                Ok(path) => written.push(path),
                Err(e) => errors.push(FileError::new(asset.origin.clone(), e)),
            }
        }

        ctx.notifier.settle(self.name, &errors);

        let outcome = if errors.is_empty() {
            TaskOutcome::Done(written)
        } else {
            TaskOutcome::Failed {
                errors,
                partial: written,
            }
        };
        debug!(self.name; "{} in {:?}", outcome.summary(), started.elapsed());
        outcome
    }

    /// Whether a change to `relative` (source-relative, `/` separated) concerns this task.
    pub fn watches(&self, relative: &str) -> bool {
        self.watch.matches(relative)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("output", &self.output)
            .field("chain", &self.chain.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{context, write};
    use super::*;
    use crate::task::transform::Passthrough;
    use std::fs;
    use tempfile::TempDir;

    /// Fails on any file whose contents contain `!error`.
    struct RejectMarked;

    impl Transform for RejectMarked {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn apply(&self, asset: Asset, _env: &TransformEnv<'_>) -> Result<Vec<Asset>, TransformError> {
            if asset.text()?.contains("!error") {
                return Err(TransformError::Parse {
                    kind: "test",
                    message: "marked file".into(),
                });
            }
            Ok(vec![asset])
        }
    }

    fn task(config: &crate::config::SiteConfig, chain: Vec<Box<dyn Transform>>) -> Task {
        Task {
            name: "resources",
            inputs: GlobSelector::new(&["resources/**"]).unwrap(),
            watch: GlobSelector::new(&["resources/**"]).unwrap(),
            output: config.output_dir().join("resources"),
            chain,
            mode: BuildMode::DEVELOPMENT,
        }
    }

    #[test]
    fn test_copy_task() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/resources/robots.txt", "User-agent: *");
        write(dir.path(), "src/resources/docs/a.pdf", "pdf");
        let (ctx, config) = context(dir.path(), "", BuildMode::DEVELOPMENT);

        let outcome = task(&config, vec![Box::new(Passthrough)]).run(&ctx);

        assert!(!outcome.is_failed());
        assert_eq!(outcome.written().len(), 2);
        let out = config.output_dir().join("resources");
        assert_eq!(fs::read_to_string(out.join("robots.txt")).unwrap(), "User-agent: *");
        assert!(out.join("docs/a.pdf").is_file());
    }

    #[test]
    fn test_failure_keeps_other_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/resources/bad.txt", "!error");
        write(dir.path(), "src/resources/good.txt", "fine");
        let (ctx, config) = context(dir.path(), "", BuildMode::DEVELOPMENT);

        let outcome = task(&config, vec![Box::new(RejectMarked)]).run(&ctx);

        match outcome {
            TaskOutcome::Failed { errors, partial } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].file, "resources/bad.txt");
                assert_eq!(partial.len(), 1);
                assert!(partial[0].ends_with("good.txt"));
            }
            TaskOutcome::Done(_) => panic!("expected a failed outcome"),
        }
        let notices = ctx.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].task, "resources");
    }

    #[test]
    fn test_rerun_replaces_notices() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/resources/bad.txt", "!error");
        let (ctx, config) = context(dir.path(), "", BuildMode::DEVELOPMENT);
        let task = task(&config, vec![Box::new(RejectMarked)]);

        task.run(&ctx);
        task.run(&ctx);
        assert_eq!(ctx.notifier.notices().len(), 1);

        write(dir.path(), "src/resources/bad.txt", "fixed");
        assert!(!task.run(&ctx).is_failed());
        assert!(ctx.notifier.notices().is_empty());
    }

    #[test]
    fn test_watches() {
        let dir = TempDir::new().unwrap();
        let (_, config) = context(dir.path(), "", BuildMode::DEVELOPMENT);
        let task = task(&config, Vec::new());
        assert!(task.watches("resources/fonts/readme.txt"));
        assert!(!task.watches("scss/main.scss"));
    }

    #[test]
    fn test_summary() {
        assert_eq!(TaskOutcome::Done(vec![PathBuf::from("a")]).summary(), "1 file");
        let failed = TaskOutcome::Failed {
            errors: vec![FileError::new("a.scss", TransformError::Invalid("bad".into()))],
            partial: Vec::new(),
        };
        assert_eq!(failed.summary(), "1 error, 0 files written");
    }
}
