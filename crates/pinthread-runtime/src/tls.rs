//! Worker-side thread state and the per-dispatcher TLS cell
//!
//! Two different things live here:
//!
//! - OS-level `thread_local!` markers: the calling thread's cached OS id and
//!   the serial of the dispatcher whose worker loop is running on it. These
//!   answer "am I on that dispatcher's worker?".
//! - [`TlsCell`], the storage slot exposed as `set_tls`/`get_tls`. It is a
//!   plain field of the dispatcher, not a `thread_local!`, so it belongs to
//!   the dispatcher rather than to whatever OS thread touches it.

use pinthread_core::id::OsThreadId;
use std::any::Any;
use std::cell::{Cell, UnsafeCell};
use std::sync::atomic::{AtomicU64, Ordering};

/// No dispatcher serial
const NO_DISPATCHER: u64 = 0;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Cached OS id of this thread
    static OS_TID: Cell<u64> = const { Cell::new(u64::MAX) };

    /// Serial of the dispatcher whose worker loop runs on this thread
    static CURRENT_DISPATCHER: Cell<u64> = const { Cell::new(NO_DISPATCHER) };
}

/// Allocate a process-unique dispatcher serial (never reused, never 0)
#[inline]
pub fn next_serial() -> u64 {
    NEXT_SERIAL.fetch_add(1, Ordering::Relaxed)
}

/// OS identity of the calling thread, read once and cached
#[inline]
pub fn current_os_tid() -> OsThreadId {
    OS_TID.with(|cell| {
        let mut tid = cell.get();
        if tid == u64::MAX {
            tid = crate::platform::raw_os_tid();
            cell.set(tid);
        }
        OsThreadId::new(tid)
    })
}

/// Mark this thread as the worker of dispatcher `serial`
#[inline]
pub fn enter_worker(serial: u64) {
    CURRENT_DISPATCHER.with(|cell| cell.set(serial));
}

/// Clear the worker mark (worker loop exiting)
#[inline]
pub fn leave_worker() {
    CURRENT_DISPATCHER.with(|cell| cell.set(NO_DISPATCHER));
}

/// Serial of the dispatcher running on this thread, if any
#[inline]
pub fn current_dispatcher() -> Option<u64> {
    let serial = CURRENT_DISPATCHER.with(|cell| cell.get());
    if serial == NO_DISPATCHER {
        None
    } else {
        Some(serial)
    }
}

/// Check if the calling thread is the worker of dispatcher `serial`
#[inline]
pub fn is_worker_of(serial: u64) -> bool {
    current_dispatcher() == Some(serial)
}

type Value = Box<dyn Any + Send>;

/// Single-slot storage owned by one dispatcher's worker
///
/// Not synchronized. Every accessor is `unsafe` with the same contract:
/// the caller must be running on the owning dispatcher's worker thread.
/// The worker executes one body at a time, so that alone rules out
/// concurrent access.
///
/// Old values are always dropped after the slot has been updated, so a
/// `Drop` impl that touches the cell again sees a consistent state.
pub struct TlsCell {
    value: UnsafeCell<Option<Value>>,
}

// SAFETY: the contents are `Send`, and all access is confined to the owning
// worker thread by the `unsafe` accessor contract.
unsafe impl Sync for TlsCell {}

impl TlsCell {
    pub const fn new() -> Self {
        TlsCell {
            value: UnsafeCell::new(None),
        }
    }

    /// Replace the stored value, returning the previous one
    ///
    /// # Safety
    /// Must be called on the owning worker thread.
    pub unsafe fn replace(&self, v: Option<Value>) -> Option<Value> {
        std::mem::replace(&mut *self.value.get(), v)
    }

    /// Clone out the stored value if it is a `T`
    ///
    /// The value is moved out of the slot while `T::clone` runs and put
    /// back afterwards, unless the clone itself stored something new.
    ///
    /// # Safety
    /// Must be called on the owning worker thread.
    pub unsafe fn get_cloned<T: Any + Clone>(&self) -> Option<T> {
        let taken = self.replace(None)?;
        let restore = Restore { cell: self, value: Some(taken) };
        let out = restore.value.as_ref().and_then(|v| v.downcast_ref::<T>()).cloned();
        out
    }

    /// Take the stored value if it is a `T`; other types stay in place
    ///
    /// # Safety
    /// Must be called on the owning worker thread.
    pub unsafe fn take<T: Any>(&self) -> Option<T> {
        let taken = self.replace(None)?;
        match taken.downcast::<T>() {
            Ok(v) => Some(*v),
            Err(other) => {
                drop(self.replace(Some(other)));
                None
            }
        }
    }

    /// Check if a value is stored
    ///
    /// # Safety
    /// Must be called on the owning worker thread.
    pub unsafe fn is_set(&self) -> bool {
        (*self.value.get()).is_some()
    }
}

impl Default for TlsCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Puts a moved-out value back on scope exit, including on unwind
struct Restore<'a> {
    cell: &'a TlsCell,
    value: Option<Value>,
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        let value = self.value.take();
        // SAFETY: a Restore only exists inside a TlsCell accessor, which
        // carries the same on-worker contract.
        unsafe {
            if !self.cell.is_set() {
                self.cell.replace(value);
            }
        }
    }
}
