//! Dispatcher lifecycle state

use core::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a dispatcher
///
/// Transitions only move forward: `Created -> Running -> Terminated`.
/// A dispatcher may also go straight from `Created` to `Terminated`
/// if it is torn down before the worker has published its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum DispatcherState {
    /// Worker spawned, identity not yet published
    Created = 0,

    /// Worker is serving the mailbox
    Running = 1,

    /// Mailbox closed; nothing executes from here on
    Terminated = 2,
}

impl DispatcherState {
    /// Check if submissions are still accepted in this state
    #[inline]
    pub const fn accepts_work(&self) -> bool {
        !matches!(self, DispatcherState::Terminated)
    }

    /// Check if this is the terminal state
    #[inline]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, DispatcherState::Terminated)
    }
}

impl From<u8> for DispatcherState {
    fn from(v: u8) -> Self {
        match v {
            0 => DispatcherState::Created,
            1 => DispatcherState::Running,
            _ => DispatcherState::Terminated,
        }
    }
}

impl From<DispatcherState> for u8 {
    fn from(state: DispatcherState) -> u8 {
        state as u8
    }
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatcherState::Created => write!(f, "CREATED"),
            DispatcherState::Running => write!(f, "RUNNING"),
            DispatcherState::Terminated => write!(f, "TERMINATED"),
        }
    }
}

/// Atomic, monotonic holder for a [`DispatcherState`]
///
/// Every transition is a forward-only CAS, so concurrent terminators
/// agree on exactly one winner.
#[derive(Debug)]
pub struct AtomicState(AtomicU8);

impl AtomicState {
    pub const fn new() -> Self {
        AtomicState(AtomicU8::new(DispatcherState::Created as u8))
    }

    #[inline]
    pub fn load(&self) -> DispatcherState {
        DispatcherState::from(self.0.load(Ordering::SeqCst))
    }

    /// Created -> Running. Returns false if the state already moved on.
    pub fn mark_running(&self) -> bool {
        self.0
            .compare_exchange(
                DispatcherState::Created as u8,
                DispatcherState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Move to Terminated. Returns true only for the call that made the
    /// transition; every later call observes it was already done.
    pub fn mark_terminated(&self) -> bool {
        self.0.swap(DispatcherState::Terminated as u8, Ordering::SeqCst)
            != DispatcherState::Terminated as u8
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.load().is_terminated()
    }
}

impl Default for AtomicState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(DispatcherState::Created.accepts_work());
        assert!(DispatcherState::Running.accepts_work());
        assert!(!DispatcherState::Terminated.accepts_work());

        assert!(DispatcherState::Terminated.is_terminated());
        assert!(!DispatcherState::Running.is_terminated());
    }

    #[test]
    fn test_state_ordering() {
        assert!(DispatcherState::Created < DispatcherState::Running);
        assert!(DispatcherState::Running < DispatcherState::Terminated);
    }

    #[test]
    fn test_state_from_u8() {
        assert_eq!(DispatcherState::from(0), DispatcherState::Created);
        assert_eq!(DispatcherState::from(1), DispatcherState::Running);
        assert_eq!(DispatcherState::from(2), DispatcherState::Terminated);
        assert_eq!(DispatcherState::from(200), DispatcherState::Terminated);
    }

    #[test]
    fn test_atomic_state_is_monotonic() {
        let s = AtomicState::new();
        assert_eq!(s.load(), DispatcherState::Created);

        assert!(s.mark_running());
        assert!(!s.mark_running());
        assert_eq!(s.load(), DispatcherState::Running);

        assert!(s.mark_terminated());
        assert!(!s.mark_terminated());
        assert!(!s.mark_running());
        assert_eq!(s.load(), DispatcherState::Terminated);
    }

    #[test]
    fn test_terminate_before_running() {
        let s = AtomicState::new();
        assert!(s.mark_terminated());
        assert!(!s.mark_running());
        assert!(s.is_terminated());
    }

    #[test]
    fn test_concurrent_terminate_has_one_winner() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Arc;

        let s = Arc::new(AtomicState::new());
        let wins = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&s);
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    if s.mark_terminated() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
