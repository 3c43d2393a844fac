//! Basic pinthread example
//!
//! Walks through every operation on one dispatcher: blocking call,
//! non-blocking call, call with a value, the TLS cell, and termination.
//!
//! # Environment Variables
//!
//! - `PIN_LOG_LEVEL=debug` - Show worker start/exit and termination
//! - `PIN_FLUSH_EPRINT=1` - Flush debug output immediately
// PIN_LOG_LEVEL=debug cargo run -p pinthread-basic

use pinthread::{current_os_tid, kdebug, kinfo, Thread};

fn main() {
    println!("=== pinthread Basic Example ===\n");

    let th = Thread::new();
    println!("main thread:   {}", current_os_tid());
    println!("worker thread: {}", th.id());

    th.call(|| kinfo!("hello from the worker ({})", current_os_tid()));

    // Queued without waiting, but ordered before the call_v below.
    let inner = th.clone();
    th.call_non_block(move || {
        kdebug!("setting TLS");
        inner.set_tls(String::from("context #1"));
    });

    let inner = th.clone();
    let (tid, tls) = th
        .call_v(move || (current_os_tid(), inner.get_tls::<String>()))
        .unwrap_or_default();
    println!("call_v ran on {} and saw TLS {:?}", tid, tls);
    assert_eq!(tid, th.id());

    th.terminate();
    th.terminate();
    let after = th.call_v(|| "unreachable");
    println!("call_v after terminate: {:?}", after);

    th.join();
    println!("\n=== Example Complete ===");
}
