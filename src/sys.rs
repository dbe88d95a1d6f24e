//! Safe wrappers for the few libc calls the crate needs.
//!
//! Every `unsafe` block lives here.

/// Real user ID of the calling process.
pub fn current_uid() -> u32 {
    // SAFETY: getuid is a read-only POSIX syscall with no preconditions.
    unsafe { libc::getuid() }
}
