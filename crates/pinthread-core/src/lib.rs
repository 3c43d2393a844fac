//! # pinthread-core
//!
//! Core types for pinthread, the dedicated-thread call dispatcher.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Thread spawning, identity lookup and the worker loop live in
//! `pinthread-runtime`.
//!
//! ## Modules
//!
//! - `id` - OS thread identity token
//! - `state` - Dispatcher lifecycle state
//! - `completion` - One-shot completion signal for synchronous calls
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod completion;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::OsThreadId;
pub use state::{AtomicState, DispatcherState};
pub use completion::{completion, Completer, Outcome, Waiter};
pub use error::{ConfigError, PinError, PinResult};
pub use env::{env_get, env_get_bool, env_get_millis, env_get_opt, env_get_str, env_is_set};
