//! # pinthread-runtime
//!
//! Platform-specific runtime for pinthread.
//!
//! This crate provides:
//! - The dispatcher mailbox (lock-free MPSC queue with close)
//! - The worker loop bound to one OS thread
//! - The per-dispatcher TLS cell and worker-side thread markers
//! - OS thread identity lookup
//! - Configuration with environment overrides

pub mod config;
pub mod mailbox;
pub mod tls;
pub mod worker;
pub mod dispatcher;

// Re-exports
pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use mailbox::{IdlePolicy, Invocation, Mailbox};
pub use tls::current_os_tid;

// Platform detection
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        #[path = "platform_linux.rs"]
        mod platform;
    } else if #[cfg(unix)] {
        #[path = "platform_unix.rs"]
        mod platform;
    } else {
        #[path = "platform_other.rs"]
        mod platform;
    }
}
