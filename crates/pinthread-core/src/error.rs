//! Error types for pinthread
//!
//! Dispatch itself never fails: submitting to a terminated dispatcher is
//! silently ignored. Errors only come out of construction, either because
//! the configuration is unusable or because the OS would not give us the
//! worker thread.

use core::fmt;
use std::io;

/// Result type for dispatcher construction
pub type PinResult<T> = Result<T, PinError>;

/// Errors that can occur while bringing up a dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    /// The OS refused to spawn the worker thread
    SpawnFailed(io::ErrorKind),

    /// The worker did not publish its identity within the spawn timeout
    SpawnTimeout,

    /// The worker exited before it published its identity
    WorkerExited,

    /// Configuration rejected by validation
    Config(ConfigError),
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinError::SpawnFailed(kind) => write!(f, "failed to spawn worker thread: {}", kind),
            PinError::SpawnTimeout => write!(f, "worker thread did not start in time"),
            PinError::WorkerExited => write!(f, "worker thread exited during startup"),
            PinError::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for PinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PinError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PinError {
    fn from(e: io::Error) -> Self {
        PinError::SpawnFailed(e.kind())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Thread name prefix is empty
    EmptyName,

    /// Thread name contains an interior NUL byte
    NameContainsNul,

    /// Requested stack is smaller than the platform minimum we accept
    StackTooSmall(usize),

    /// Park timeout of zero would turn the idle worker into a busy loop
    ZeroParkTimeout,

    /// Spawn timeout of zero can never be satisfied
    ZeroSpawnTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyName => write!(f, "thread name must not be empty"),
            ConfigError::NameContainsNul => write!(f, "thread name must not contain NUL"),
            ConfigError::StackTooSmall(n) => write!(f, "stack size {} is too small", n),
            ConfigError::ZeroParkTimeout => write!(f, "park timeout must be non-zero"),
            ConfigError::ZeroSpawnTimeout => write!(f, "spawn timeout must be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for PinError {
    fn from(e: ConfigError) -> Self {
        PinError::Config(e)
    }
}
