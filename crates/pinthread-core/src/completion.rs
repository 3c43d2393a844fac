//! One-shot completion signal
//!
//! Every synchronous dispatch carries a [`Completer`] into the mailbox while
//! the caller holds the matching [`Waiter`]. The worker resolves the
//! completer after the body returns. If the invocation is dropped without
//! running (terminated dispatcher, discarded mailbox), the completer's
//! `Drop` resolves it as [`Outcome::Abandoned`], so a waiter can never be
//! stranded.
//!
//! Built on `Mutex` + `Condvar`; the lock is held only to move the outcome
//! in or out, never while user code runs.

use std::any::Any;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// How an invocation ended
pub enum Outcome<T> {
    /// Body ran to completion and produced a value
    Done(T),

    /// Body panicked; payload as returned by `catch_unwind`
    Panicked(Box<dyn Any + Send + 'static>),

    /// Body never ran
    Abandoned,
}

impl<T> Outcome<T> {
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    #[inline]
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Outcome::Abandoned)
    }

    /// Value if the body completed; re-raises a captured panic on the
    /// current thread; `None` if it never ran.
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::Panicked(payload) => std::panic::resume_unwind(payload),
            Outcome::Abandoned => None,
        }
    }
}

impl<T> core::fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Outcome::Done(_) => write!(f, "Outcome::Done(..)"),
            Outcome::Panicked(_) => write!(f, "Outcome::Panicked(..)"),
            Outcome::Abandoned => write!(f, "Outcome::Abandoned"),
        }
    }
}

enum Slot<T> {
    Pending,
    Ready(Outcome<T>),
    Taken,
}

struct Inner<T> {
    slot: Mutex<Slot<T>>,
    cond: Condvar,
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, outcome: Outcome<T>) {
        {
            let mut slot = self.lock();
            if matches!(*slot, Slot::Pending) {
                *slot = Slot::Ready(outcome);
            }
        }
        self.cond.notify_all();
    }
}

/// Producer half; resolves exactly once (explicitly or on drop)
pub struct Completer<T> {
    inner: Option<Arc<Inner<T>>>,
}

/// Consumer half; blocks until the completer resolves
pub struct Waiter<T> {
    inner: Arc<Inner<T>>,
}

/// Create a linked completer/waiter pair
pub fn completion<T>() -> (Completer<T>, Waiter<T>) {
    let inner = Arc::new(Inner {
        slot: Mutex::new(Slot::Pending),
        cond: Condvar::new(),
    });
    (
        Completer { inner: Some(Arc::clone(&inner)) },
        Waiter { inner },
    )
}

impl<T> Completer<T> {
    /// Resolve with the given outcome
    pub fn complete(mut self, outcome: Outcome<T>) {
        if let Some(inner) = self.inner.take() {
            inner.resolve(outcome);
        }
    }

    /// Resolve with a value
    #[inline]
    pub fn send(self, value: T) {
        self.complete(Outcome::Done(value));
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.resolve(Outcome::Abandoned);
        }
    }
}

impl<T> Waiter<T> {
    /// Non-blocking readiness check
    pub fn is_ready(&self) -> bool {
        matches!(*self.inner.lock(), Slot::Ready(_))
    }

    /// Block until resolved
    pub fn wait(self) -> Outcome<T> {
        let mut slot = self.inner.lock();
        while matches!(*slot, Slot::Pending) {
            slot = self
                .inner
                .cond
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
        take(&mut slot)
    }

    /// Block until resolved or `timeout` elapses; gives the waiter back on
    /// timeout so the caller can keep waiting.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Outcome<T>, Waiter<T>> {
        let deadline = Instant::now() + timeout;
        {
            let mut slot = self.inner.lock();
            loop {
                if !matches!(*slot, Slot::Pending) {
                    return Ok(take(&mut slot));
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let (guard, _) = self
                    .inner
                    .cond
                    .wait_timeout(slot, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner);
                slot = guard;
            }
        }
        Err(self)
    }
}

fn take<T>(slot: &mut Slot<T>) -> Outcome<T> {
    match std::mem::replace(slot, Slot::Taken) {
        Slot::Ready(outcome) => outcome,
        // A waiter is consumed by `wait`, so the slot is read at most once.
        Slot::Pending | Slot::Taken => Outcome::Abandoned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_send_then_wait() {
        let (tx, rx) = completion();
        tx.send(5);
        assert!(rx.is_ready());
        assert_eq!(rx.wait().into_value(), Some(5));
    }

    #[test]
    fn test_wait_across_threads() {
        let (tx, rx) = completion::<String>();
        let h = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            tx.send("done".to_string());
        });
        assert_eq!(rx.wait().into_value().as_deref(), Some("done"));
        h.join().unwrap();
    }

    #[test]
    fn test_drop_resolves_abandoned() {
        let (tx, rx) = completion::<u32>();
        drop(tx);
        let outcome = rx.wait();
        assert!(outcome.is_abandoned());
        assert_eq!(outcome.into_value(), None);
    }

    #[test]
    fn test_drop_on_other_thread_wakes_waiter() {
        let (tx, rx) = completion::<()>();
        let h = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            drop(tx);
        });
        assert!(rx.wait().is_abandoned());
        h.join().unwrap();
    }

    #[test]
    fn test_wait_timeout() {
        let (tx, rx) = completion::<u8>();
        let rx = match rx.wait_timeout(Duration::from_millis(10)) {
            Ok(_) => panic!("resolved without a sender"),
            Err(rx) => rx,
        };
        tx.send(1);
        let outcome = rx.wait_timeout(Duration::from_secs(1)).ok().unwrap();
        assert!(outcome.is_done());
    }

    #[test]
    fn test_panicked_outcome_resumes() {
        let (tx, rx) = completion::<()>();
        tx.complete(Outcome::Panicked(Box::new("boom")));
        let outcome = rx.wait();
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            outcome.into_value();
        }));
        let payload = caught.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
    }
}
