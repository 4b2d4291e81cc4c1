//! Build context and failure notifications.

use std::sync::Arc;

use parking_lot::Mutex;

use super::BuildMode;
use crate::config::SiteConfig;
use crate::reload::{ReloadHub, ReloadMessage};
use crate::task::FileError;

/// Everything a task run needs, passed explicitly.
#[derive(Clone)]
pub struct BuildContext {
    pub config: Arc<SiteConfig>,
    pub mode: BuildMode,
    pub notifier: Notifier,
    /// Present only while the dev server runs.
    pub hub: Option<ReloadHub>,
}

impl BuildContext {
    pub fn new(config: Arc<SiteConfig>, mode: BuildMode) -> Self {
        Self {
            config,
            mode,
            notifier: Notifier::new(None),
            hub: None,
        }
    }

    /// Attach a reload hub; failures are then pushed to the browser too.
    pub fn with_hub(mut self, hub: ReloadHub) -> Self {
        self.notifier = Notifier::new(Some(hub.clone()));
        self.hub = Some(hub);
        self
    }
}

/// A recorded transform failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub task: String,
    pub file: String,
    pub message: String,
}

/// Side-channel for per-file failures.
///
/// A report is printed, pushed to connected browsers (dev only) and kept
/// so the caller can inspect what went wrong after the run.
#[derive(Clone, Default)]
pub struct Notifier {
    notices: Arc<Mutex<Vec<Notice>>>,
    hub: Option<ReloadHub>,
}

impl Notifier {
    pub fn new(hub: Option<ReloadHub>) -> Self {
        Self {
            notices: Arc::default(),
            hub,
        }
    }

    /// Record the failures of one run of `task`.
    ///
    /// Replaces whatever the previous run of `task` left behind. A clean
    /// run after a failing one drops the browser error overlay.
    pub fn settle(&self, task: &str, errors: &[FileError]) {
        for error in errors {
            self.report(task, error);
        }

        let had_errors = {
            let mut notices = self.notices.lock();
            let before = notices.len();
            notices.retain(|n| n.task != task);
            let had_errors = before != notices.len();
            notices.extend(errors.iter().map(|error| Notice {
                task: task.to_string(),
                file: error.file.clone(),
                message: error.error.to_string(),
            }));
            had_errors
        };

        if errors.is_empty()
            && had_errors
            && let Some(hub) = &self.hub
        {
            hub.send(ReloadMessage::ClearError);
        }
    }

    fn report(&self, task: &str, error: &FileError) {
        crate::log!("error"; "[{}] {}", task, error);

        if let Some(hub) = &self.hub {
            hub.send(ReloadMessage::Error {
                task: task.to_string(),
                message: error.to_string(),
            });
        }
    }

    /// Snapshot of every outstanding report.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TransformError;

    fn failure(file: &str) -> FileError {
        FileError {
            file: file.to_string(),
            error: TransformError::Parse {
                kind: "scss",
                message: "expected \"}\"".to_string(),
            },
        }
    }

    #[test]
    fn test_settle_records_notice() {
        let notifier = Notifier::default();
        notifier.settle("styles", &[failure("a.scss")]);

        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].task, "styles");
        assert_eq!(notices[0].file, "a.scss");
        assert!(notices[0].message.contains("expected"));
    }

    #[test]
    fn test_clean_run_clears_only_that_task() {
        let notifier = Notifier::default();
        notifier.settle("styles", &[failure("a.scss")]);
        notifier.settle("layout", &[failure("index.pug")]);

        notifier.settle("styles", &[]);

        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].task, "layout");
    }

    #[test]
    fn test_repeated_failures_replace_earlier_notices() {
        let notifier = Notifier::default();
        notifier.settle("styles", &[failure("a.scss"), failure("b.scss")]);
        notifier.settle("styles", &[failure("b.scss")]);
        notifier.settle("styles", &[failure("b.scss")]);

        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].file, "b.scss");
    }

    #[test]
    fn test_clones_share_notices() {
        let notifier = Notifier::default();
        let clone = notifier.clone();
        clone.settle("fonts", &[failure("a.ttf")]);
        assert_eq!(notifier.notices().len(), 1);
    }
}
