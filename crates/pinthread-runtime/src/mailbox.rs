//! Dispatcher mailbox: unbounded MPSC queue with close
//!
//! Producers push from any thread; the single consumer is the worker loop.
//! Built on `crossbeam_queue::SegQueue`, whose pushes are linearizable, so
//! two pushes from one thread are always popped in that order.
//!
//! # Idle protocol
//!
//! The consumer spins for a bounded number of empty polls, then publishes
//! `sleeping = true`, re-checks the queue, and parks. A producer pushes,
//! then swaps `sleeping` to false and unparks the consumer if it was set.
//! Both sides put a SeqCst fence between their write and their read, so at
//! least one of them sees the other: either the consumer finds the item, or
//! the producer finds the sleeper. `std::thread::park` keeps the unpark
//! token if it arrives before the consumer actually blocks.
//!
//! # Close protocol
//!
//! `close` sets `closed` and discards the queue. A producer that races with
//! close re-checks `closed` after its push (again behind a SeqCst fence) and
//! discards on its own if it lost. Discarding drops each [`Invocation`],
//! which resolves any attached completion as abandoned.

use crossbeam_queue::SegQueue;
use std::sync::atomic::{fence, AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread::{self, Thread};
use std::time::Duration;

/// One unit of work on its way to the worker
///
/// Completion signalling, if any, is captured inside the body. Dropping an
/// unrun invocation drops the body and everything it captured.
pub struct Invocation {
    body: Box<dyn FnOnce() + Send + 'static>,
}

impl Invocation {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Invocation { body: Box::new(f) }
    }

    /// Run the body; consumes the invocation so it can run at most once
    #[inline]
    pub fn run(self) {
        (self.body)()
    }
}

/// Idle behaviour of the consumer
#[derive(Debug, Clone, Copy)]
pub struct IdlePolicy {
    pub spins: u32,
    pub park_timeout: Duration,
}

/// Multi-producer, single-consumer closable queue of invocations
pub struct Mailbox {
    queue: SegQueue<Invocation>,
    closed: AtomicBool,
    sleeping: AtomicBool,
    consumer: OnceLock<Thread>,
    /// Invocations dropped without running
    discarded: AtomicU64,
}

impl Mailbox {
    pub fn new() -> Self {
        Mailbox {
            queue: SegQueue::new(),
            closed: AtomicBool::new(false),
            sleeping: AtomicBool::new(false),
            consumer: OnceLock::new(),
            discarded: AtomicU64::new(0),
        }
    }

    /// Register the calling thread as the consumer. First call wins.
    pub fn bind_consumer(&self) {
        let _ = self.consumer.set(thread::current());
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Pending invocations (a snapshot)
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total invocations discarded by close
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Enqueue an invocation.
    ///
    /// Returns false if the mailbox was already closed; the invocation is
    /// dropped in that case. A true return does not promise the invocation
    /// will run, only that it entered the queue; close may still discard it.
    pub fn push(&self, inv: Invocation) -> bool {
        if self.is_closed() {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.queue.push(inv);
        fence(Ordering::SeqCst);
        if self.is_closed() {
            self.discard();
            return true;
        }
        self.wake();
        true
    }

    fn wake(&self) {
        if self.sleeping.swap(false, Ordering::SeqCst) {
            if let Some(consumer) = self.consumer.get() {
                consumer.unpark();
            }
        }
    }

    /// Next invocation, or `None` once the mailbox is closed.
    ///
    /// Consumer side only.
    pub fn recv(&self, idle: IdlePolicy) -> Option<Invocation> {
        let mut spins = 0u32;
        loop {
            if self.is_closed() {
                return None;
            }
            if let Some(inv) = self.queue.pop() {
                return Some(inv);
            }
            if spins < idle.spins {
                spins += 1;
                std::hint::spin_loop();
                continue;
            }

            self.sleeping.store(true, Ordering::SeqCst);
            fence(Ordering::SeqCst);
            if !self.queue.is_empty() || self.is_closed() {
                self.sleeping.store(false, Ordering::SeqCst);
                continue;
            }
            thread::park_timeout(idle.park_timeout);
            self.sleeping.store(false, Ordering::SeqCst);
            spins = 0;
        }
    }

    /// Close the mailbox and discard whatever is queued.
    ///
    /// Idempotent. Returns how many invocations this call discarded.
    pub fn close(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        fence(Ordering::SeqCst);
        if let Some(consumer) = self.consumer.get() {
            consumer.unpark();
        }
        self.discard()
    }

    /// Drop every queued invocation. Safe from any thread.
    pub fn discard(&self) -> usize {
        let mut n = 0;
        while let Some(inv) = self.queue.pop() {
            drop(inv);
            n += 1;
        }
        if n > 0 {
            self.discarded.fetch_add(n as u64, Ordering::Relaxed);
        }
        n
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    fn idle() -> IdlePolicy {
        IdlePolicy {
            spins: 4,
            park_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_fifo_single_producer() {
        let mb = Mailbox::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let log = Arc::clone(&log);
            assert!(mb.push(Invocation::new(move || log.lock().unwrap().push(i))));
        }
        assert_eq!(mb.len(), 10);
        for _ in 0..10 {
            mb.recv(idle()).unwrap().run();
        }
        assert_eq!(*log.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_push_after_close_is_rejected() {
        let mb = Mailbox::new();
        assert_eq!(mb.close(), 0);
        assert_eq!(mb.close(), 0);
        let ran = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&ran);
        assert!(!mb.push(Invocation::new(move || r.store(true, Ordering::SeqCst))));
        assert!(mb.is_empty());
        assert!(mb.recv(idle()).is_none());
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(mb.discarded(), 1);
    }

    #[test]
    fn test_close_discards_pending() {
        let mb = Mailbox::new();
        let dropped = Arc::new(AtomicUsize::new(0));

        struct Guard(Arc<AtomicUsize>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        for _ in 0..3 {
            let g = Guard(Arc::clone(&dropped));
            mb.push(Invocation::new(move || drop(g)));
        }
        assert_eq!(mb.close(), 3);
        assert_eq!(dropped.load(Ordering::SeqCst), 3);
        assert_eq!(mb.discarded(), 3);
        assert!(mb.is_empty());
    }

    #[test]
    fn test_parked_consumer_is_woken() {
        let mb = Arc::new(Mailbox::new());
        let consumer = {
            let mb = Arc::clone(&mb);
            thread::spawn(move || {
                mb.bind_consumer();
                let idle = IdlePolicy {
                    spins: 0,
                    park_timeout: Duration::from_secs(30),
                };
                let mut seen = 0;
                while let Some(inv) = mb.recv(idle) {
                    inv.run();
                    seen += 1;
                }
                seen
            })
        };

        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let c = Arc::clone(&count);
            mb.push(Invocation::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
            thread::sleep(Duration::from_micros(200));
        }
        while count.load(Ordering::SeqCst) < 100 {
            thread::sleep(Duration::from_millis(1));
        }
        mb.close();
        assert_eq!(consumer.join().unwrap(), 100);
    }

    #[test]
    fn test_many_producers_no_loss() {
        let mb = Arc::new(Mailbox::new());
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let mb = Arc::clone(&mb);
                thread::spawn(move || {
                    for i in 0..250 {
                        mb.push(Invocation::new(move || {
                            let _ = (p, i);
                        }));
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        assert_eq!(mb.len(), 1000);
        let mut n = 0;
        while n < 1000 {
            mb.recv(idle()).unwrap().run();
            n += 1;
        }
        assert!(mb.is_empty());
    }
}
