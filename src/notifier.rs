//! Process-scoped resize notifier.
//!
//! One callback slot per notifier. The first `register` installs the trap and
//! starts the dispatch thread; later calls swap the callback in place. The
//! trap only flags pending work, and the dispatch thread runs the callback,
//! so user code never executes inside the signal handler.
//!
//! Bursts coalesce: every notification observed before the dispatch thread
//! drains the pipe collapses into one invocation, and a notification that
//! lands while the callback runs schedules exactly one more.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};

use crate::config::NotifierConfig;
use crate::error::RegisterError;
use crate::trap::{SigwinchBackend, SignalBackend, Trap};
use crate::wakeup::{wakeup_pipe, WakeupReceiver, WakeupSender};

type Callback = Arc<Mutex<Box<dyn FnMut() + Send>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotifierStats {
    /// Notifications seen by the trap.
    pub signals: usize,
    /// Callback runs, panicking ones included.
    pub invocations: usize,
    pub panics: usize,
}

#[derive(Clone)]
pub struct ResizeNotifier {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn SignalBackend>,
    config: NotifierConfig,
    registry: Mutex<Registry>,
    slot: Arc<Slot>,
    signals: Arc<AtomicUsize>,
}

#[derive(Default)]
struct Registry {
    generation: u64,
    active: Option<Active>,
}

struct Active {
    generation: u64,
    worker: Worker,
}

/// Shared between registering threads and the dispatch thread.
#[derive(Default)]
struct Slot {
    callback: Mutex<Option<Callback>>,
    invocations: AtomicUsize,
    panics: AtomicUsize,
}

struct Worker {
    shutdown: Arc<AtomicBool>,
    wakeup: WakeupSender,
    thread: ThreadId,
    handle: Option<JoinHandle<()>>,
}

/// Handle returned by `register`. Dropping it leaves the callback installed.
pub struct Registration {
    inner: Arc<Inner>,
    generation: u64,
}

static GLOBAL: OnceLock<ResizeNotifier> = OnceLock::new();

impl ResizeNotifier {
    /// The process-wide notifier bound to `SIGWINCH`.
    pub fn global() -> &'static ResizeNotifier {
        GLOBAL.get_or_init(|| {
            Self::with_backend(Arc::new(SigwinchBackend::default()), NotifierConfig::from_env())
        })
    }

    pub fn with_backend(backend: Arc<dyn SignalBackend>, config: NotifierConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                registry: Mutex::new(Registry::default()),
                slot: Arc::new(Slot::default()),
                signals: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Make `callback` the action run after every terminal resize,
    /// replacing any callback registered before.
    ///
    /// The callback runs on the dispatch thread, never on the caller's
    /// thread and never inside the signal handler. On error nothing is
    /// installed and a previous registration, if any, stays in effect.
    ///
    /// When replacing a callback that is mid-run, this waits for that run to
    /// finish, so the replaced callback never starts once `register` returns.
    /// Called from inside the callback, it returns immediately.
    pub fn register<F>(&self, callback: F) -> Result<Registration, RegisterError>
    where
        F: FnMut() + Send + 'static,
    {
        if !self.inner.config.enabled {
            tracing::debug!("resize notifier disabled by configuration");
            return Err(RegisterError::PlatformUnsupported);
        }

        let callback: Box<dyn FnMut() + Send> = Box::new(callback);
        let callback: Callback = Arc::new(Mutex::new(callback));
        let mut registry = self.inner.lock_registry();
        let generation = registry.generation + 1;

        let mut replaced = None;
        match registry.active.as_mut() {
            Some(active) => {
                let previous = self.inner.slot.lock_callback().replace(callback);
                active.generation = generation;
                if active.worker.thread != thread::current().id() {
                    replaced = previous;
                }
                tracing::debug!(generation, "resize callback replaced");
            }
            None => {
                *self.inner.slot.lock_callback() = Some(callback);
                match self.inner.start() {
                    Ok(worker) => {
                        registry.active = Some(Active { generation, worker });
                        tracing::debug!(generation, "resize callback registered");
                    }
                    Err(err) => {
                        *self.inner.slot.lock_callback() = None;
                        tracing::debug!(%err, "resize callback registration failed");
                        return Err(err);
                    }
                }
            }
        }

        registry.generation = generation;
        drop(registry);

        if let Some(previous) = replaced {
            // Dispatch holds this lock from its slot re-check to the end of the run.
            drop(previous.lock());
        }

        Ok(Registration {
            inner: Arc::clone(&self.inner),
            generation,
        })
    }

    pub fn is_registered(&self) -> bool {
        self.inner.lock_registry().active.is_some()
    }

    pub fn stats(&self) -> NotifierStats {
        NotifierStats {
            signals: self.inner.signals.load(Ordering::Relaxed),
            invocations: self.inner.slot.invocations.load(Ordering::Relaxed),
            panics: self.inner.slot.panics.load(Ordering::Relaxed),
        }
    }
}

impl Registration {
    /// Whether this is still the callback that runs on resize.
    pub fn is_active(&self) -> bool {
        self.inner
            .lock_registry()
            .active
            .as_ref()
            .is_some_and(|active| active.generation == self.generation)
    }

    /// Remove the callback and the trap. Returns `false`, doing nothing,
    /// when a later `register` already replaced this registration.
    ///
    /// May be called from inside the callback itself.
    pub fn unregister(self) -> bool {
        let active = {
            let mut registry = self.inner.lock_registry();
            let Some(active) = (match registry.active.as_ref() {
                Some(active) if active.generation == self.generation => registry.active.take(),
                _ => None,
            }) else {
                return false;
            };
            // Torn down under the registry lock: a concurrent `register` must
            // not install its trap before this uninstall runs.
            self.inner.detach(&active.worker);
            active
        };

        active.worker.join();
        tracing::debug!(generation = self.generation, "resize callback unregistered");
        true
    }
}

impl Inner {
    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Spawn the dispatch thread, then install the trap that feeds it.
    fn start(&self) -> Result<Worker, RegisterError> {
        let (wakeup, rx) = wakeup_pipe().map_err(RegisterError::denied)?;
        let pending = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let pending = Arc::clone(&pending);
            let shutdown = Arc::clone(&shutdown);
            let slot = Arc::clone(&self.slot);
            thread::Builder::new()
                .name(self.config.thread_name.clone())
                .spawn(move || dispatch_loop(rx, pending, shutdown, slot))
                .map_err(RegisterError::denied)?
        };

        let worker = Worker {
            shutdown,
            wakeup: wakeup.clone(),
            thread: handle.thread().id(),
            handle: Some(handle),
        };

        let trap = Trap::new(pending, Arc::clone(&self.signals), wakeup);
        if let Err(err) = self.backend.install(trap) {
            worker.signal_stop();
            worker.join();
            return Err(err);
        }
        Ok(worker)
    }

    /// Remove the trap and callback and tell the worker to exit. Callers
    /// hold the registry lock and join the worker after releasing it.
    fn detach(&self, worker: &Worker) {
        self.backend.uninstall();
        *self.slot.lock_callback() = None;
        worker.signal_stop();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let active = self
            .registry
            .get_mut()
            .unwrap_or_else(|p| p.into_inner())
            .active
            .take();
        if let Some(active) = active {
            self.detach(&active.worker);
            active.worker.join();
        }
    }
}

impl Slot {
    fn lock_callback(&self) -> MutexGuard<'_, Option<Callback>> {
        self.callback.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Runs whichever callback is current. The slot is re-checked after the
    /// callback's own lock is taken; a callback replaced in between is
    /// skipped and the notification goes to its replacement.
    fn dispatch(&self) {
        loop {
            // Cloned out so the slot lock is never held across a run.
            let Some(callback) = self.lock_callback().clone() else {
                return;
            };
            let Ok(mut run) = callback.lock() else {
                return;
            };
            let current = self
                .lock_callback()
                .as_ref()
                .is_some_and(|c| Arc::ptr_eq(c, &callback));
            if !current {
                continue;
            }

            self.invocations.fetch_add(1, Ordering::Relaxed);
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (*run)())) {
                self.panics.fetch_add(1, Ordering::Relaxed);
                tracing::error!(panic = panic_message(&*payload), "resize callback panicked");
            }
            return;
        }
    }
}

impl Worker {
    fn signal_stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wakeup.wake();
    }

    /// Waits for the dispatch thread to exit unless called from it.
    fn join(mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.thread == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::error!("resize dispatch thread panicked");
        }
    }
}

fn dispatch_loop(
    rx: WakeupReceiver,
    pending: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    slot: Arc<Slot>,
) {
    loop {
        match rx.wait(None) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                tracing::error!(%err, "resize dispatch wait failed");
                return;
            }
        }

        let wakeups = rx.drain();
        if shutdown.load(Ordering::Acquire) {
            return;
        }
        if !pending.swap(false, Ordering::AcqRel) {
            continue;
        }

        tracing::trace!(wakeups, "dispatching resize");
        slot.dispatch();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[path = "../tests/unit/notifier.rs"]
mod tests;
