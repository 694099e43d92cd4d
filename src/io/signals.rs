//! Process shutdown signals.
//!
//! SIGTERM, SIGHUP and SIGINT only raise a flag; the event loop polls it and
//! cancels the app's token, so the terminal is restored and UI state saved on
//! the normal quit path.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_shutdown(_signal: nix::libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
pub fn install_shutdown_handler() -> nix::Result<()> {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    let action = SigAction::new(
        SigHandler::Handler(on_shutdown),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for signal in [Signal::SIGTERM, Signal::SIGHUP, Signal::SIGINT] {
        // SAFETY: the handler does nothing but store to an atomic.
        unsafe { sigaction(signal, &action) }?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install_shutdown_handler() -> std::io::Result<()> {
    Ok(())
}

/// True once any shutdown signal has arrived.
pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use nix::sys::signal::{Signal, raise};

    #[test]
    fn hangup_sets_the_flag() {
        install_shutdown_handler().unwrap();
        raise(Signal::SIGHUP).unwrap();
        assert!(shutdown_requested());
    }
}
