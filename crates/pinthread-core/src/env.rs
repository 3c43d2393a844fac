//! Environment variable utilities
//!
//! Every knob in pinthread can be overridden from the environment. Values
//! are trimmed before parsing, and a variable set to the empty string is
//! treated as unset, so `PIN_IDLE_SPINS= cargo run` falls back to the default.
//!
//! ```ignore
//! use pinthread_core::env::{env_get, env_get_bool, env_get_millis};
//!
//! let spins: u32 = env_get("PIN_IDLE_SPINS", 64);
//! let park = env_get_millis("PIN_PARK_TIMEOUT_MS", 100);
//! let flush = env_get_bool("PIN_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Raw value of `key`, trimmed, or `None` when unset or blank
fn raw(key: &str) -> Option<String> {
    let val = std::env::var(key).ok()?;
    let val = val.trim();
    if val.is_empty() {
        None
    } else {
        Some(val.to_string())
    }
}

/// Get environment variable parsed as type T, or return default
///
/// Unparseable values fall back to `default` as well.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable parsed as type T, `None` if unset or unparseable
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    raw(key).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
///
/// "1", "true", "yes", "on" (any case) are true; "0", "false", "no", "off"
/// are false; anything else, including unset, yields `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match raw(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Get environment variable as a millisecond duration
#[inline]
pub fn env_get_millis(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_get(key, default_ms))
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    raw(key).unwrap_or_else(|| default.to_string())
}

/// Check if environment variable is set to a non-blank value
#[inline]
pub fn env_is_set(key: &str) -> bool {
    raw(key).is_some()
}
