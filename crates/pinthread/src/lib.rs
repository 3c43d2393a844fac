//! # pinthread - run closures on one dedicated OS thread
//!
//! Some APIs only work when every call comes from the same OS thread:
//! GUI toolkits, OpenGL contexts, COM apartments, thread-bound handles.
//! A [`Thread`] owns exactly one OS thread for its whole life and lets any
//! number of callers run work there.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pinthread::Thread;
//!
//! let th = Thread::new();
//!
//! // Blocking call, side effects visible afterwards
//! th.call(|| println!("on the worker"));
//!
//! // Fire and forget; still ordered before the next call from this caller
//! th.call_non_block(|| init_context());
//!
//! // Blocking call with a return value
//! let tid = th.call_v(pinthread::current_os_tid);
//! assert_eq!(tid, Some(th.id()));
//!
//! // A storage slot that belongs to this dispatcher
//! let inner = th.clone();
//! th.call(move || inner.set_tls(String::from("ctx")));
//! assert_eq!(th.get_tls::<String>().as_deref(), Some("ctx"));
//!
//! th.terminate();
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   caller   caller   caller          (any threads)
//!      │        │        │
//!      └────────┼────────┘  call / call_v / call_non_block
//!               ▼
//!   ┌───────────────────────┐
//!   │ Mailbox (MPSC, close) │
//!   └───────────────────────┘
//!               │ one at a time
//!               ▼
//!   ┌───────────────────────┐
//!   │ Worker loop           │ ── TLS cell (owned by the dispatcher)
//!   │ one OS thread, fixed  │
//!   └───────────────────────┘
//! ```
//!
//! ## Termination
//!
//! [`Thread::terminate`] is idempotent and never blocks. Calls queued but
//! not yet started are dropped; afterwards every submission is silently
//! ignored and [`Thread::call_v`] returns `None`. Dropping the last clone
//! of a `Thread` terminates it as well. Storing a clone of a `Thread` in its
//! own TLS cell keeps the worker alive until `terminate` is called.

// Re-export core types
pub use pinthread_core::{
    ConfigError,
    DispatcherState,
    OsThreadId,
    PinError,
    PinResult,
};

// Re-export kprint macros for debug logging
pub use pinthread_core::{kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use pinthread_core::kprint::{
    LogLevel,
    init as init_logging,
    set_log_level,
    set_flush_enabled,
    set_thread_tag_enabled,
};

// Re-export env utilities
pub use pinthread_core::{env_get, env_get_bool, env_get_millis, env_get_opt, env_get_str, env_is_set};

// Re-export runtime types
pub use pinthread_runtime::{DispatcherConfig, Dispatcher};

use std::any::Any;
use std::sync::Arc;

/// Handle to a dispatcher bound to one OS thread
///
/// Cheap to clone; all clones drive the same worker. The worker is
/// terminated when the last clone is dropped.
#[derive(Clone, Debug)]
pub struct Thread {
    inner: Arc<Dispatcher>,
}

impl Thread {
    /// Spawn a dispatcher with the default configuration
    ///
    /// # Panics
    ///
    /// If the OS cannot spawn the worker thread, like `std::thread::spawn`.
    /// Use [`Thread::with_config`] to handle that case.
    pub fn new() -> Self {
        match Self::with_config(DispatcherConfig::default()) {
            Ok(th) => th,
            Err(e) => panic!("pinthread: {}", e),
        }
    }

    /// Spawn a dispatcher with an explicit configuration
    pub fn with_config(config: DispatcherConfig) -> PinResult<Self> {
        let inner = Dispatcher::spawn(&config)?;
        Ok(Thread { inner: Arc::new(inner) })
    }

    /// Identity of the bound OS thread
    #[inline]
    pub fn id(&self) -> OsThreadId {
        self.inner.id()
    }

    #[inline]
    pub fn state(&self) -> DispatcherState {
        self.inner.state()
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }

    /// True when called from inside a body running on this thread
    #[inline]
    pub fn is_current(&self) -> bool {
        self.inner.is_current()
    }

    /// Run `f` on the thread and block until it has finished
    ///
    /// Everything `f` did is visible once this returns. Returns at once,
    /// without running `f`, if the thread is terminated. From inside a body
    /// on this same thread `f` runs inline.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from `f` on the calling thread.
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.call(f)
    }

    /// Queue `f` and return immediately
    ///
    /// `f` still runs before anything this caller submits afterwards.
    /// Dropped silently if the thread is terminated.
    pub fn call_non_block<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.call_non_block(f)
    }

    /// Run `f` on the thread and return its value
    ///
    /// `None` when `f` did not run because the thread was, or became,
    /// terminated before `f` started.
    pub fn call_v<T, F>(&self, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.inner.call_v(f)
    }

    /// Store `v` in this thread's TLS cell
    ///
    /// Meant to be called from a body running on this thread. Called from
    /// anywhere else it is performed through a blocking call, so it is
    /// ordered with the caller's other submissions.
    pub fn set_tls<T>(&self, v: T)
    where
        T: Any + Send,
    {
        self.inner.set_tls(v)
    }

    /// Clone of the value stored in the TLS cell
    ///
    /// `None` if nothing is stored, if the value is not a `T`, or if the
    /// thread is terminated.
    pub fn get_tls<T>(&self) -> Option<T>
    where
        T: Any + Clone + Send,
    {
        self.inner.get_tls()
    }

    /// Move the value out of the TLS cell if it is a `T`
    pub fn take_tls<T>(&self) -> Option<T>
    where
        T: Any + Send,
    {
        self.inner.take_tls()
    }

    /// Drop the value stored in the TLS cell
    pub fn clear_tls(&self) {
        self.inner.clear_tls()
    }

    /// Stop the thread without waiting
    ///
    /// Safe to call any number of times from anywhere, including from a body
    /// running on this thread.
    pub fn terminate(&self) {
        self.inner.terminate()
    }

    /// Terminate, then wait for the OS thread to exit
    pub fn join(&self) {
        self.inner.join()
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of the calling OS thread, comparable with [`Thread::id`]
#[inline]
pub fn current_os_tid() -> OsThreadId {
    pinthread_runtime::current_os_tid()
}
