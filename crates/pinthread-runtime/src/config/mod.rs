//! Dispatcher configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls on the config value
//! 2. Environment variables
//! 3. Library defaults (`config::defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use pinthread_runtime::config::DispatcherConfig;
//!
//! let config = DispatcherConfig::from_env()
//!     .name("gl-context")
//!     .idle_spins(0);
//! ```

pub mod defaults;

use pinthread_core::env::{env_get, env_get_millis, env_get_str};
use pinthread_core::error::ConfigError;
use std::time::Duration;

/// Dispatcher configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Worker thread name prefix
    pub name: String,
    /// Worker stack size; `None` leaves it to the platform
    pub stack_size: Option<usize>,
    /// Empty polls before parking
    pub idle_spins: u32,
    /// Longest single park while idle
    pub park_timeout: Duration,
    /// Construction gives up after this long
    pub spawn_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DispatcherConfig {
    /// Library defaults only, ignoring the environment
    pub fn defaults() -> Self {
        Self {
            name: defaults::THREAD_NAME.to_string(),
            stack_size: None,
            idle_spins: defaults::IDLE_SPINS,
            park_timeout: Duration::from_millis(defaults::PARK_TIMEOUT_MS),
            spawn_timeout: Duration::from_millis(defaults::SPAWN_TIMEOUT_MS),
        }
    }

    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `PIN_THREAD_NAME` - Worker thread name prefix
    /// - `PIN_STACK_SIZE` - Worker stack size in bytes (0 = platform default)
    /// - `PIN_IDLE_SPINS` - Empty mailbox polls before parking
    /// - `PIN_PARK_TIMEOUT_MS` - Park timeout in milliseconds
    /// - `PIN_SPAWN_TIMEOUT_MS` - Startup timeout in milliseconds
    pub fn from_env() -> Self {
        let stack = env_get("PIN_STACK_SIZE", defaults::STACK_SIZE);
        Self {
            name: env_get_str("PIN_THREAD_NAME", defaults::THREAD_NAME),
            stack_size: if stack == 0 { None } else { Some(stack) },
            idle_spins: env_get("PIN_IDLE_SPINS", defaults::IDLE_SPINS),
            park_timeout: env_get_millis("PIN_PARK_TIMEOUT_MS", defaults::PARK_TIMEOUT_MS),
            spawn_timeout: env_get_millis("PIN_SPAWN_TIMEOUT_MS", defaults::SPAWN_TIMEOUT_MS),
        }
    }

    /// Set worker thread name prefix
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set worker stack size in bytes
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Set empty polls before parking
    pub fn idle_spins(mut self, spins: u32) -> Self {
        self.idle_spins = spins;
        self
    }

    /// Set longest single park
    pub fn park_timeout(mut self, d: Duration) -> Self {
        self.park_timeout = d;
        self
    }

    /// Set startup timeout
    pub fn spawn_timeout(mut self, d: Duration) -> Self {
        self.spawn_timeout = d;
        self
    }

    /// Full OS thread name for the dispatcher with the given serial
    pub fn thread_name(&self, serial: u64) -> String {
        format!("{}-{}", self.name, serial)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.name.contains('\0') {
            return Err(ConfigError::NameContainsNul);
        }
        if let Some(n) = self.stack_size {
            if n < defaults::MIN_STACK_SIZE {
                return Err(ConfigError::StackTooSmall(n));
            }
        }
        if self.park_timeout.is_zero() {
            return Err(ConfigError::ZeroParkTimeout);
        }
        if self.spawn_timeout.is_zero() {
            return Err(ConfigError::ZeroSpawnTimeout);
        }
        Ok(())
    }
}
