//! Linux thread identity: the kernel tid

/// Kernel thread id of the calling thread
#[inline]
pub fn raw_os_tid() -> u64 {
    // SAFETY: gettid takes no arguments and cannot fail.
    let tid = unsafe { libc::syscall(libc::SYS_gettid) };
    tid as u64
}
