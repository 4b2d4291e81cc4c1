//! Process-wide Ctrl+C handling.
//!
//! The watch loop has nothing to flush, so an interrupt exits right away.

use std::sync::atomic::{AtomicBool, Ordering};

/// Set once the handler has fired (a second Ctrl+C while exiting is ignored).
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Setup the global Ctrl+C handler. Call once at program start.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if SHUTDOWN.swap(true, Ordering::SeqCst) {
            return;
        }
        crate::log!("serve"; "stopped");
        std::process::exit(0);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}
