//! OS thread identity type

use core::fmt;

/// Identity of the OS thread a dispatcher is bound to
///
/// On Linux this is the kernel thread id (`gettid`), elsewhere it is
/// whatever the platform layer can read from inside the thread itself.
/// The value is only meaningful for comparison; treat it as opaque.
///
/// The maximum value (u64::MAX) is reserved as a sentinel for "no thread".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct OsThreadId(u64);

impl OsThreadId {
    /// Sentinel value indicating no thread
    pub const NONE: OsThreadId = OsThreadId(u64::MAX);

    /// Create a new OsThreadId from a raw value
    #[inline]
    pub const fn new(id: u64) -> Self {
        OsThreadId(id)
    }

    /// Get the raw u64 value
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u64::MAX
    }

    /// Check if this refers to a real thread
    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != u64::MAX
    }

    /// Convert to Option
    #[inline]
    pub const fn to_option(self) -> Option<OsThreadId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<u64> for OsThreadId {
    #[inline]
    fn from(id: u64) -> Self {
        OsThreadId(id)
    }
}

impl From<OsThreadId> for u64 {
    #[inline]
    fn from(id: OsThreadId) -> Self {
        id.0
    }
}

impl fmt::Debug for OsThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "OsThreadId(NONE)")
        } else {
            write!(f, "OsThreadId({})", self.0)
        }
    }
}

impl fmt::Display for OsThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for OsThreadId {
    fn default() -> Self {
        OsThreadId::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_thread_id_basics() {
        let id = OsThreadId::new(4242);
        assert_eq!(id.as_u64(), 4242);
        assert!(!id.is_none());
        assert!(id.is_some());
        assert_eq!(id.to_option(), Some(id));
    }

    #[test]
    fn test_os_thread_id_none() {
        let none = OsThreadId::NONE;
        assert!(none.is_none());
        assert!(!none.is_some());
        assert_eq!(none.to_option(), None);
        assert_eq!(OsThreadId::default(), OsThreadId::NONE);
    }

    #[test]
    fn test_os_thread_id_formatting() {
        assert_eq!(format!("{}", OsThreadId::new(7)), "7");
        assert_eq!(format!("{:?}", OsThreadId::new(7)), "OsThreadId(7)");
        assert_eq!(format!("{}", OsThreadId::NONE), "none");
    }

    #[test]
    fn test_os_thread_id_conversions() {
        let id: OsThreadId = 100u64.into();
        let raw: u64 = id.into();
        assert_eq!(raw, 100);
    }
}
