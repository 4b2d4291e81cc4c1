//! Core types shared by every task run.
//!
//! - `BuildMode`: development / production flag table
//! - `BuildContext`: what a task run gets to see (config, mode, notifier, reload hub)
//! - `Notifier`: side-channel for per-file transform failures
//! - shutdown handling (Ctrl+C)

mod context;
mod driver;
mod state;

pub use context::{BuildContext, Notice, Notifier};
pub use driver::{BuildMode, MinifyLevel};
pub use state::setup_shutdown_handler;
