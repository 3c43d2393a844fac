//! Non-Linux Unix thread identity: `pthread_self`
//!
//! A `pthread_t` can be recycled once its thread has been joined or has
//! exited detached, same as a Linux tid.

/// `pthread_self` of the calling thread, widened to u64
#[inline]
pub fn raw_os_tid() -> u64 {
    nix::sys::pthread::pthread_self() as usize as u64
}
