//! Object-handle to path resolution.

use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::PathBuf;

/// Resolve an event's object descriptor to an absolute path through the
/// process's own fd table.
///
/// The caller releases the descriptor right after this returns, whether it
/// succeeded or not; resolution never takes ownership.
pub fn event_path(fd: BorrowedFd<'_>) -> std::io::Result<PathBuf> {
    let link = format!("/proc/self/fd/{}", fd.as_raw_fd());
    std::fs::read_link(link)
}
