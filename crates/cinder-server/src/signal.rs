//! SIGINT handling for graceful shutdown.
//!
//! The handler only performs an atomic store into the shared stop flag;
//! the reactor notices it on its next poll cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use nix::libc::c_int;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

static STOP_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_sigint(_: c_int) {
    if let Some(flag) = STOP_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Installs a SIGINT handler that sets `flag`. Call once at startup.
pub fn install_sigint(flag: Arc<AtomicBool>) -> nix::Result<()> {
    let _ = STOP_FLAG.set(flag);
    let action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handler is async-signal-safe, it only stores an atomic
    unsafe { sigaction(Signal::SIGINT, &action) }?;
    Ok(())
}
