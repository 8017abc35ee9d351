//! Signal handling: SIGTERM/SIGINT request a clean shutdown.
//!
//! Uses the `signal-hook` crate for safe signal registration. The event loop
//! polls the flag between channel waits rather than blocking on signals, so
//! a signal is observed within one poll interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Thread-safe shutdown flag shared between the signal handler and the
/// event loop.
///
/// `Ordering::Relaxed` throughout: the loop polls every iteration and no
/// ordering with other atomics is required.
#[derive(Clone)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::unregistered()
    }
}

impl ShutdownSignal {
    /// Create a flag and register SIGTERM/SIGINT hooks for it.
    ///
    /// Registration is best-effort; a failure is logged to stderr and the
    /// daemon simply becomes kill-only.
    #[must_use]
    pub fn new() -> Self {
        let signal = Self::unregistered();
        for sig in [SIGTERM, SIGINT] {
            if let Err(e) = signal_hook::flag::register(sig, Arc::clone(&signal.flag)) {
                eprintln!("[DCP-SIGNAL] failed to register signal {sig}: {e}");
            }
        }
        signal
    }

    /// Create a flag with no OS hooks; used by tests and embedders that
    /// drive shutdown programmatically.
    #[must_use]
    pub fn unregistered() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a shutdown has been requested.
    #[must_use]
    pub fn should_shutdown(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Programmatically request shutdown.
    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unset_and_latches() {
        let signal = ShutdownSignal::unregistered();
        assert!(!signal.should_shutdown());
        signal.request();
        assert!(signal.should_shutdown());
        assert!(signal.should_shutdown(), "flag must latch, not clear on read");
    }

    #[test]
    fn clones_share_the_flag() {
        let signal = ShutdownSignal::unregistered();
        let clone = signal.clone();
        clone.request();
        assert!(signal.should_shutdown());
    }
}
