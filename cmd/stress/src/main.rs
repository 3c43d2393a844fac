//! Stress test - many callers, one dispatcher
//!
//! Hammers a single dispatcher from several OS threads with a mix of
//! blocking and non-blocking calls, then checks every body ran on the
//! worker and nothing was lost.

use pinthread::{current_os_tid, Thread};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

fn main() {
    println!("=== pinthread Stress Test ===\n");

    let calls_per_caller: u64 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(100_000);
    let callers: u64 = std::env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(8);

    println!("{} callers x {} calls", callers, calls_per_caller);

    let th = Thread::new();
    let worker = th.id();
    let executed = Arc::new(AtomicU64::new(0));
    let misplaced = Arc::new(AtomicU64::new(0));

    let start = Instant::now();
    let handles: Vec<_> = (0..callers)
        .map(|c| {
            let th = th.clone();
            let executed = Arc::clone(&executed);
            let misplaced = Arc::clone(&misplaced);
            std::thread::spawn(move || {
                for i in 0..calls_per_caller {
                    let executed = Arc::clone(&executed);
                    let misplaced = Arc::clone(&misplaced);
                    let body = move || {
                        if current_os_tid() != worker {
                            misplaced.fetch_add(1, Ordering::Relaxed);
                        }
                        executed.fetch_add(1, Ordering::Relaxed);
                    };
                    if (i + c) % 4 == 0 {
                        th.call(body);
                    } else {
                        th.call_non_block(body);
                    }
                }
            })
        })
        .collect();

    for h in handles {
        let _ = h.join();
    }
    // Every caller's non-blocking calls are ahead of this one.
    th.call(|| {});
    let elapsed = start.elapsed();

    let total = callers * calls_per_caller;
    let done = executed.load(Ordering::Relaxed);
    println!("\nExecuted:  {}/{}", done, total);
    println!("Misplaced: {}", misplaced.load(Ordering::Relaxed));
    println!("Time:      {:?}", elapsed);
    println!("Rate:      {:.0} calls/sec", done as f64 / elapsed.as_secs_f64());

    th.join();

    if done != total || misplaced.load(Ordering::Relaxed) != 0 {
        println!("\nFAILED");
        std::process::exit(1);
    }
    println!("\n=== Stress Test Complete ===");
}
