//! Fallback thread identity for targets without a native tid we can read

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TID: AtomicU64 = AtomicU64::new(1);

/// Process-wide serial assigned to the calling thread on first use
#[inline]
pub fn raw_os_tid() -> u64 {
    NEXT_TID.fetch_add(1, Ordering::Relaxed)
}
