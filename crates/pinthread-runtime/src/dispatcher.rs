//! Dispatcher engine: spawn, submit, TLS access, terminate
//!
//! A [`Dispatcher`] owns one worker thread for its whole life. All
//! submission paths funnel through the same [`Mailbox`], which is what gives
//! per-caller FIFO: a caller's second submission cannot enter the queue
//! before its first.

use crate::config::DispatcherConfig;
use crate::mailbox::{IdlePolicy, Invocation, Mailbox};
use crate::tls::{self, TlsCell};
use crate::worker;
use pinthread_core::completion::{completion, Outcome};
use pinthread_core::error::{PinError, PinResult};
use pinthread_core::id::OsThreadId;
use pinthread_core::state::{AtomicState, DispatcherState};
use pinthread_core::{kdebug, ktrace};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

/// State shared between a dispatcher handle and its worker
pub(crate) struct Shared {
    pub(crate) serial: u64,
    pub(crate) mailbox: Mailbox,
    pub(crate) state: AtomicState,
    pub(crate) tls: TlsCell,
    id: OnceLock<OsThreadId>,
}

impl Shared {
    fn new() -> Self {
        Shared {
            serial: tls::next_serial(),
            mailbox: Mailbox::new(),
            state: AtomicState::new(),
            tls: TlsCell::new(),
            id: OnceLock::new(),
        }
    }

    pub(crate) fn publish_id(&self, id: OsThreadId) {
        let _ = self.id.set(id);
    }

    /// Mark terminated and close the mailbox. Idempotent, never blocks.
    pub(crate) fn shutdown(&self) {
        if self.state.mark_terminated() {
            kdebug!("dispatcher {} terminating", self.serial);
        }
        let dropped = self.mailbox.close();
        if dropped > 0 {
            ktrace!("dispatcher {} dropped {} pending call(s)", self.serial, dropped);
        }
    }

    #[inline]
    fn on_worker(&self) -> bool {
        tls::is_worker_of(self.serial)
    }

    /// Run `f` on the worker with access to the TLS cell.
    ///
    /// Inline when already on the worker, otherwise as a synchronous
    /// dispatch. `None` if the dispatcher is terminated.
    fn with_tls<T, F>(self: &Arc<Self>, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&TlsCell) -> T + Send + 'static,
    {
        if self.state.is_terminated() {
            return None;
        }
        if self.on_worker() {
            return Some(f(&self.tls));
        }
        let shared = Arc::clone(self);
        dispatch_sync(self, move || f(&shared.tls))
    }
}

/// Enqueue `f` and wait for it. Caller must not be on the worker.
fn dispatch_sync<T, F>(shared: &Shared, f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = completion::<T>();
    let inv = Invocation::new(move || {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(v) => Outcome::Done(v),
            Err(payload) => Outcome::Panicked(payload),
        };
        tx.complete(outcome);
    });
    if !shared.mailbox.push(inv) {
        ktrace!("dispatcher {} closed, call dropped", shared.serial);
        return None;
    }
    rx.wait().into_value()
}

/// A dedicated OS thread that runs submitted closures one at a time
///
/// Dropping the dispatcher terminates it without waiting. Use
/// [`Dispatcher::join`] to wait for the worker to exit.
pub struct Dispatcher {
    shared: Arc<Shared>,
    id: OsThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawn the worker and wait until it reports its OS identity
    pub fn spawn(config: &DispatcherConfig) -> PinResult<Self> {
        config.validate()?;

        let shared = Arc::new(Shared::new());
        let idle = IdlePolicy {
            spins: config.idle_spins,
            park_timeout: config.park_timeout,
        };
        let (ready_tx, ready_rx) = completion::<OsThreadId>();

        let mut builder = thread::Builder::new().name(config.thread_name(shared.serial));
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }
        let worker_shared = Arc::clone(&shared);
        let handle = builder.spawn(move || worker::run(worker_shared, idle, ready_tx))?;

        let id = match ready_rx.wait_timeout(config.spawn_timeout) {
            Ok(Outcome::Done(id)) => id,
            Ok(_) => {
                shared.shutdown();
                return Err(PinError::WorkerExited);
            }
            Err(_) => {
                shared.shutdown();
                return Err(PinError::SpawnTimeout);
            }
        };
        kdebug!("dispatcher {} bound to os thread {}", shared.serial, id);

        Ok(Dispatcher {
            shared,
            id,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// OS identity of the worker thread
    #[inline]
    pub fn id(&self) -> OsThreadId {
        self.id
    }

    /// Process-unique serial of this dispatcher (also part of the thread name)
    #[inline]
    pub fn serial(&self) -> u64 {
        self.shared.serial
    }

    #[inline]
    pub fn state(&self) -> DispatcherState {
        self.shared.state.load()
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.shared.state.is_terminated()
    }

    /// Check if the caller is running on this dispatcher's worker
    #[inline]
    pub fn is_current(&self) -> bool {
        self.shared.on_worker()
    }

    /// Invocations currently queued (a snapshot)
    pub fn pending(&self) -> usize {
        self.shared.mailbox.len()
    }

    /// Invocations dropped by termination so far
    pub fn discarded(&self) -> u64 {
        self.shared.mailbox.discarded()
    }

    /// Run `f` on the worker and wait for it to finish.
    ///
    /// Returns immediately without running `f` if the dispatcher is
    /// terminated. A panic in `f` is re-raised here.
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let _ = self.call_v(f);
    }

    /// Run `f` on the worker and return its value.
    ///
    /// `None` if `f` did not run because the dispatcher was or became
    /// terminated. Called from the worker itself, `f` runs inline.
    pub fn call_v<T, F>(&self, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.is_terminated() {
            ktrace!("dispatcher {} terminated, call dropped", self.shared.serial);
            return None;
        }
        if self.is_current() {
            return Some(f());
        }
        dispatch_sync(&self.shared, f)
    }

    /// Queue `f` for the worker and return without waiting
    pub fn call_non_block<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_terminated() {
            ktrace!("dispatcher {} terminated, call dropped", self.shared.serial);
            return;
        }
        self.shared.mailbox.push(Invocation::new(f));
    }

    /// Store `v` in the TLS cell, replacing any previous value
    pub fn set_tls<T>(&self, v: T)
    where
        T: Any + Send,
    {
        let v: Box<dyn Any + Send> = Box::new(v);
        // SAFETY: with_tls only hands out the cell on the worker.
        let _ = self.shared.with_tls(move |cell| drop(unsafe { cell.replace(Some(v)) }));
    }

    /// Clone of the stored value, `None` if empty or not a `T`
    pub fn get_tls<T>(&self) -> Option<T>
    where
        T: Any + Clone + Send,
    {
        // SAFETY: with_tls only hands out the cell on the worker.
        self.shared
            .with_tls(|cell| unsafe { cell.get_cloned::<T>() })
            .flatten()
    }

    /// Move the stored value out if it is a `T`
    pub fn take_tls<T>(&self) -> Option<T>
    where
        T: Any + Send,
    {
        // SAFETY: with_tls only hands out the cell on the worker.
        self.shared
            .with_tls(|cell| unsafe { cell.take::<T>() })
            .flatten()
    }

    /// Drop whatever is stored
    pub fn clear_tls(&self) {
        // SAFETY: with_tls only hands out the cell on the worker.
        let _ = self.shared.with_tls(|cell| drop(unsafe { cell.replace(None) }));
    }

    /// Stop the worker. Queued calls are discarded, a running body finishes.
    ///
    /// Idempotent and non-blocking.
    pub fn terminate(&self) {
        self.shared.shutdown();
    }

    /// Terminate and wait for the worker thread to exit.
    ///
    /// From the worker itself this only terminates; a thread cannot join
    /// itself.
    pub fn join(&self) {
        self.terminate();
        if self.is_current() {
            return;
        }
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // The join handle is dropped with us, detaching the worker.
        self.shared.shutdown();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("serial", &self.shared.serial)
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn spawn() -> Dispatcher {
        Dispatcher::spawn(&DispatcherConfig::defaults()).unwrap()
    }

    #[test]
    fn test_spawn_publishes_worker_identity() {
        let d = spawn();
        assert!(d.id().is_some());
        assert_eq!(d.state(), DispatcherState::Running);
        assert_eq!(d.call_v(tls::current_os_tid), Some(d.id()));
        assert_ne!(d.id(), tls::current_os_tid());
    }

    #[test]
    fn test_spawn_rejects_bad_config() {
        let cfg = DispatcherConfig::defaults().name("");
        assert!(matches!(Dispatcher::spawn(&cfg), Err(PinError::Config(_))));
    }

    #[test]
    fn test_worker_thread_is_named() {
        let d = spawn();
        let name = d.call_v(|| thread::current().name().map(str::to_string));
        assert_eq!(name, Some(Some(format!("pinthread-{}", d.serial()))));
    }

    #[test]
    fn test_call_side_effects_visible() {
        let d = spawn();
        let hit = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hit);
        d.call(move || {
            h.store(42, Ordering::Relaxed);
        });
        assert_eq!(hit.load(Ordering::Relaxed), 42);
    }

    #[test]
    fn test_non_block_runs_before_following_call() {
        let d = spawn();
        let (tx, rx) = mpsc::channel();
        let tx2 = tx.clone();
        d.call_non_block(move || {
            thread::sleep(Duration::from_millis(20));
            tx.send(1).unwrap();
        });
        d.call(move || tx2.send(2).unwrap());
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_reentrant_call_runs_inline() {
        let d = Arc::new(spawn());
        let inner = Arc::clone(&d);
        let v = d.call_v(move || {
            let outer = tls::current_os_tid();
            let nested = inner.call_v(tls::current_os_tid);
            nested == Some(outer)
        });
        assert_eq!(v, Some(true));
    }

    #[test]
    fn test_panic_propagates_to_caller_and_worker_survives() {
        let d = spawn();
        let r = panic::catch_unwind(AssertUnwindSafe(|| {
            d.call(|| panic!("body failed"));
        }));
        let payload = r.unwrap_err();
        assert_eq!(worker::panic_message(payload.as_ref()), "body failed");
        assert_eq!(d.call_v(|| 5), Some(5));
    }

    #[test]
    fn test_non_block_panic_is_contained() {
        pinthread_core::kprint::set_log_level(pinthread_core::kprint::LogLevel::Off);
        let d = spawn();
        d.call_non_block(|| panic!("background failure"));
        assert_eq!(d.call_v(|| "alive"), Some("alive"));
    }

    #[test]
    fn test_tls_roundtrip_and_clear() {
        let d = spawn();
        assert_eq!(d.get_tls::<u32>(), None);
        d.set_tls(9u32);
        assert_eq!(d.get_tls::<u32>(), Some(9));
        assert_eq!(d.get_tls::<String>(), None);
        assert_eq!(d.take_tls::<u32>(), Some(9));
        assert_eq!(d.get_tls::<u32>(), None);
        d.set_tls(String::from("x"));
        d.clear_tls();
        assert_eq!(d.get_tls::<String>(), None);
    }

    #[test]
    fn test_terminate_is_idempotent_and_stops_work() {
        let d = spawn();
        d.terminate();
        d.terminate();
        assert!(d.is_terminated());

        let ran = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&ran);
        d.call(move || r.store(true, Ordering::SeqCst));
        let r = Arc::clone(&ran);
        d.call_non_block(move || r.store(true, Ordering::SeqCst));
        assert_eq!(d.call_v(|| 1), None);
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(d.get_tls::<u32>(), None);
    }

    #[test]
    fn test_terminate_discards_queued_and_releases_waiters() {
        let d = Arc::new(spawn());
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        d.call_non_block(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv();
        });
        started_rx.recv().unwrap();

        // Queued behind the blocked body; must come back once terminated.
        let waiter = {
            let d = Arc::clone(&d);
            thread::spawn(move || d.call_v(|| "ran"))
        };
        while d.pending() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        d.terminate();
        assert_eq!(waiter.join().unwrap(), None);
        assert!(d.discarded() >= 1);
        release_tx.send(()).unwrap();
        d.join();
    }

    #[test]
    fn test_terminate_from_inside_body() {
        let d = Arc::new(spawn());
        let inner = Arc::clone(&d);
        d.call(move || inner.terminate());
        assert!(d.is_terminated());
        assert_eq!(d.call_v(|| 1), None);
    }

    #[test]
    fn test_join_waits_for_worker_exit() {
        let d = spawn();
        d.join();
        d.join();
        assert!(d.is_terminated());
    }

    #[test]
    fn test_tls_value_dropped_on_worker() {
        struct Probe(Arc<Mutex<Option<OsThreadId>>>);
        impl Drop for Probe {
            fn drop(&mut self) {
                *self.0.lock().unwrap() = Some(tls::current_os_tid());
            }
        }

        let d = spawn();
        let seen = Arc::new(Mutex::new(None));
        d.set_tls(Probe(Arc::clone(&seen)));
        d.join();
        assert_eq!(*seen.lock().unwrap(), Some(d.id()));
    }
}
