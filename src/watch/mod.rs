//! Watch loop.
//!
//! ```text
//! notify ─▶ bridge thread ─▶ async channel ─▶ filter ─▶ Runner (one per task) ─▶ reload hub
//! ```
//!
//! Runs until the process is interrupted.

mod filter;
mod runner;

use std::path::Path;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::core::BuildContext;
use crate::task::Task;
use crate::utils::plural_count;
use crate::{debug, log};
use runner::Runner;

/// Re-run each of `tasks` whenever a file matching its watch globs changes.
pub fn run(ctx: BuildContext, tasks: Vec<Task>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("gild-watch")
        .build()
        .context("failed to start watch runtime")?;

    runtime.block_on(watch(ctx, tasks))
}

async fn watch(ctx: BuildContext, tasks: Vec<Task>) -> Result<()> {
    let source = ctx.config.source_dir().to_path_buf();
    let (_watcher, mut events) = start_watcher(&source)?;

    let runners: Vec<Runner> = tasks
        .into_iter()
        .map(|task| Runner::spawn(task, ctx.clone()))
        .collect();
    log!(
        "watch";
        "watching {} for {}",
        ctx.config.root_relative(&source).display(),
        plural_count(runners.len(), "task")
    );

    while let Some(event) = events.recv().await {
        for relative in filter::changed_paths(&event, &source) {
            for runner in runners.iter().filter(|r| r.watches(&relative)) {
                debug!("watch"; "{} -> {}", relative, runner.name());
                runner.trigger();
            }
        }
    }

    Ok(())
}

/// Watch `source` recursively; the watcher must outlive the receiver.
fn start_watcher(source: &Path) -> Result<(RecommendedWatcher, mpsc::Receiver<notify::Event>)> {
    // notify calls back on its own thread, bridge into the runtime
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })
    .context("failed to create file watcher")?;
    watcher
        .watch(source, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", source.display()))?;

    let (async_tx, async_rx) = mpsc::channel::<notify::Event>(64);
    std::thread::spawn(move || {
        while let Ok(result) = notify_rx.recv() {
            match result {
                Ok(event) => {
                    if async_tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Err(e) => log!("watch"; "notify error: {}", e),
            }
        }
    });

    Ok((watcher, async_rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_watcher_reports_changes() {
        let dir = TempDir::new().unwrap();
        let source = crate::utils::path::normalize_path(dir.path());
        std::fs::create_dir_all(source.join("scss")).unwrap();
        let (_watcher, mut events) = start_watcher(&source).unwrap();

        std::fs::write(source.join("scss/main.scss"), "a{}").unwrap();

        let found = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = events.recv().await {
                if filter::changed_paths(&event, &source)
                    .iter()
                    .any(|p| p == "scss/main.scss")
                {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false);
        assert!(found);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = start_watcher(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("failed to watch"));
    }
}
