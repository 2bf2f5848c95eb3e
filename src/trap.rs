//! Raw-delivery phase.
//!
//! A `Trap` is what runs inside the signal handler. It records that a
//! notification happened and wakes the dispatch thread; nothing more.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use signal_hook::consts::signal::SIGWINCH;
use signal_hook::SigId;

use crate::error::RegisterError;
use crate::wakeup::WakeupSender;

#[derive(Clone)]
pub struct Trap {
    pending: Arc<AtomicBool>,
    signals: Arc<AtomicUsize>,
    wakeup: WakeupSender,
}

impl Trap {
    pub(crate) fn new(
        pending: Arc<AtomicBool>,
        signals: Arc<AtomicUsize>,
        wakeup: WakeupSender,
    ) -> Self {
        Self {
            pending,
            signals,
            wakeup,
        }
    }

    /// Async-signal-safe: two lock-free atomic ops and one `write(2)`.
    pub fn fire(&self) {
        self.signals.fetch_add(1, Ordering::Relaxed);
        self.pending.store(true, Ordering::Release);
        self.wakeup.wake();
    }
}

/// Installs a `Trap` as the process handler for the resize notification.
///
/// A backend holds at most one installation: `install` replaces whatever it
/// installed before.
pub trait SignalBackend: Send + Sync + 'static {
    fn install(&self, trap: Trap) -> Result<(), RegisterError>;
    fn uninstall(&self);
}

/// POSIX `SIGWINCH` through `signal-hook`.
#[derive(Default)]
pub struct SigwinchBackend {
    installed: Mutex<Option<SigId>>,
}

impl SignalBackend for SigwinchBackend {
    fn install(&self, trap: Trap) -> Result<(), RegisterError> {
        let mut installed = self
            .installed
            .lock()
            .map_err(|_| RegisterError::denied("backend state poisoned"))?;

        // SAFETY: the action only touches atomics and writes to a
        // non-blocking pipe, all of which are async-signal-safe.
        let id = unsafe { signal_hook::low_level::register(SIGWINCH, move || trap.fire()) }
            .map_err(RegisterError::denied)?;

        if let Some(previous) = installed.replace(id) {
            signal_hook::low_level::unregister(previous);
        }
        tracing::debug!(signal = SIGWINCH, "resize trap installed");
        Ok(())
    }

    fn uninstall(&self) {
        let Ok(mut installed) = self.installed.lock() else {
            return;
        };
        if let Some(id) = installed.take() {
            signal_hook::low_level::unregister(id);
            tracing::debug!(signal = SIGWINCH, "resize trap removed");
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/trap.rs"]
mod tests;
