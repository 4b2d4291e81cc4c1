//! Live reload for the dev server.
//!
//! ```text
//! task run ──▶ ReloadHub::send ──▶ WebSocket ──▶ livereload.js ──▶ reload / css refresh / overlay
//! ```
//!
//! The hub is an explicit value carried in `BuildContext`; the notifier
//! pushes failures through it too.

mod hub;
mod message;

pub use hub::ReloadHub;
pub use message::ReloadMessage;
