//! Shutdown signal handling

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Install a Ctrl-C handler and return a flag which is `true` while the
/// executable should keep running.
pub fn shutdown_flag() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received Ctrl-C, shutting down");
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Convenience accessor for the running flag.
pub fn is_running(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}
