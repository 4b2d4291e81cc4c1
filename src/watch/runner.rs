//! Per-task re-run loop.
//!
//! Each watched task owns one runner. A trigger while the task is idle
//! starts a run; triggers while it runs collapse into a single pending
//! re-run, so a burst of saves costs at most one extra run and the last
//! change is always built.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Notify;

use crate::core::BuildContext;
use crate::logger::{status_error, status_success};
use crate::reload::ReloadMessage;
use crate::task::{Task, TaskOutcome};

pub(super) struct Runner {
    task: Arc<Task>,
    pending: Arc<Notify>,
}

impl Runner {
    /// Spawn the loop for `task` on the current runtime.
    pub(super) fn spawn(task: Task, ctx: BuildContext) -> Self {
        let task = Arc::new(task);
        let job = {
            let task = Arc::clone(&task);
            move || rerun(&task, &ctx)
        };
        Self {
            pending: serialize(task.name, job),
            task,
        }
    }

    pub(super) fn name(&self) -> &'static str {
        self.task.name
    }

    pub(super) fn watches(&self, relative: &str) -> bool {
        self.task.watches(relative)
    }

    pub(super) fn trigger(&self) {
        self.pending.notify_one();
    }
}

/// Run `job` on the blocking pool once per wake-up, never two at a time.
///
/// `Notify` stores at most one permit, which is the pending slot.
fn serialize<F>(name: &'static str, job: F) -> Arc<Notify>
where
    F: Fn() + Send + Sync + 'static,
{
    let pending = Arc::new(Notify::new());
    let waiter = Arc::clone(&pending);
    let job = Arc::new(job);

    tokio::spawn(async move {
        loop {
            waiter.notified().await;
            let job = Arc::clone(&job);
            if let Err(e) = tokio::task::spawn_blocking(move || (*job)()).await {
                crate::log!("watch"; "{} run aborted: {}", name, e);
            }
        }
    });

    pending
}

fn rerun(task: &Task, ctx: &BuildContext) {
    let started = Instant::now();
    let outcome = task.run(ctx);

    match &outcome {
        TaskOutcome::Done(_) => status_success(&format!(
            "{}: {} in {:.2?}",
            task.name,
            outcome.summary(),
            started.elapsed()
        )),
        TaskOutcome::Failed { errors, .. } => {
            let detail = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            status_error(&format!("{} failed", task.name), &detail);
        }
    }

    if let Some(hub) = &ctx.hub {
        hub.send(ReloadMessage::for_task(task.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts runs and the highest number of overlapping runs.
    #[derive(Default)]
    struct RunCounter {
        runs: AtomicUsize,
        active: AtomicUsize,
        overlap: AtomicUsize,
    }

    fn counting_job(counter: &Arc<RunCounter>, hold: Duration) -> impl Fn() + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            let active = counter.active.fetch_add(1, Ordering::SeqCst) + 1;
            counter.overlap.fetch_max(active, Ordering::SeqCst);
            std::thread::sleep(hold);
            counter.runs.fetch_add(1, Ordering::SeqCst);
            counter.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_burst_coalesces_into_one_rerun() {
        let counter = Arc::new(RunCounter::default());
        let pending = serialize("counter", counting_job(&counter, Duration::from_millis(200)));

        pending.notify_one();
        tokio::time::sleep(Duration::from_millis(60)).await;
        for _ in 0..5 {
            pending.notify_one();
        }
        tokio::time::sleep(Duration::from_millis(800)).await;

        assert_eq!(counter.runs.load(Ordering::SeqCst), 2);
        assert_eq!(counter.overlap.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_idle_triggers_each_run() {
        let counter = Arc::new(RunCounter::default());
        let pending = serialize("counter", counting_job(&counter, Duration::from_millis(10)));

        for _ in 0..3 {
            pending.notify_one();
            tokio::time::sleep(Duration::from_millis(150)).await;
        }

        assert_eq!(counter.runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_rerun_with_hub_writes_output() {
        use crate::core::BuildMode;
        use crate::reload::ReloadHub;
        use crate::task::catalog;
        use crate::task::testing::{context, write};

        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "src/resources/robots.txt", "User-agent: *");
        let (ctx, config) = context(dir.path(), "", BuildMode::DEVELOPMENT);
        let ctx = ctx.with_hub(ReloadHub::new());

        let task = catalog::task("resources", &config, BuildMode::DEVELOPMENT).unwrap();
        rerun(&task, &ctx);

        assert!(config.output_dir().join("resources/robots.txt").is_file());
    }
}
