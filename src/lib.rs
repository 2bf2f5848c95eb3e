//! winch-bridge: run a callback whenever the controlling terminal is resized.
//!
//! The OS signal is caught by a minimal trap that only flags pending work and
//! wakes a dispatch thread; the callback runs on that thread. Rapid resizes
//! coalesce into fewer callback runs.
//!
//! ```no_run
//! let _registration = winch_bridge::register(|| {
//!     // recompute widths and redraw
//! });
//! ```

pub mod config;
pub mod error;
#[cfg(unix)]
pub mod notifier;
#[cfg(unix)]
pub mod trap;
#[cfg(not(unix))]
mod unsupported;
#[cfg(unix)]
mod wakeup;

pub use config::NotifierConfig;
pub use error::RegisterError;
#[cfg(unix)]
pub use notifier::{NotifierStats, Registration, ResizeNotifier};
#[cfg(unix)]
pub use trap::{SignalBackend, SigwinchBackend, Trap};
#[cfg(not(unix))]
pub use unsupported::Registration;

/// Register `callback` with the process-wide notifier, replacing the
/// previous one. Headless processes register fine; the callback just never
/// runs.
#[cfg(unix)]
pub fn register<F>(callback: F) -> Result<Registration, RegisterError>
where
    F: FnMut() + Send + 'static,
{
    ResizeNotifier::global().register(callback)
}

/// Terminal resize notifications do not exist on this platform.
#[cfg(not(unix))]
pub fn register<F>(_callback: F) -> Result<Registration, RegisterError>
where
    F: FnMut() + Send + 'static,
{
    Err(RegisterError::PlatformUnsupported)
}
