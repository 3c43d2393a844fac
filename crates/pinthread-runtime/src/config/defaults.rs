//! Library defaults for [`DispatcherConfig`](super::DispatcherConfig)

/// Worker thread name prefix; the dispatcher serial is appended
pub const THREAD_NAME: &str = "pinthread";

/// Worker stack size in bytes, 0 = platform default
pub const STACK_SIZE: usize = 0;

/// Smallest explicit stack size accepted
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Empty mailbox polls before the worker parks
pub const IDLE_SPINS: u32 = 64;

/// Upper bound on one park; a missed wake costs at most this much latency
pub const PARK_TIMEOUT_MS: u64 = 100;

/// How long construction waits for the worker to report its identity
pub const SPAWN_TIMEOUT_MS: u64 = 5_000;
