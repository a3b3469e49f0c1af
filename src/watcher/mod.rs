//! Kernel file-access event source.
//!
//! fanotify delivers, per accessed object, a readable file descriptor plus
//! the pid of the process that touched it. The watcher owns the notification
//! group; `decode` turns the raw record stream into [`RawEvent`]s; `resolve`
//! maps an event's descriptor back to an absolute path.

pub mod decode;
mod fanotify_watcher;
pub mod resolve;

pub use decode::{Batch, DecodeError};
pub use fanotify_watcher::{FanotifyWatcher, WatcherError};

use std::os::fd::OwnedFd;
use std::path::PathBuf;

use nix::sys::fanotify::MaskFlags;

/// One kernel event record, decoded but not yet resolved to a path.
///
/// The object handle is owned here: whichever way processing goes
/// (self-filtered, unresolvable, matched or not), the descriptor is closed
/// exactly once when the handle is dropped.
#[derive(Debug)]
pub struct RawEvent {
    /// Event-kind bitmask (open, modify, ...).
    pub mask: MaskFlags,
    /// Pid of the process that triggered the event.
    pub pid: i32,
    handle: Option<OwnedFd>,
}

impl RawEvent {
    pub fn new(mask: MaskFlags, pid: i32, handle: Option<OwnedFd>) -> Self {
        Self { mask, pid, handle }
    }

    /// Detach the object handle from the event. Returns `None` when the
    /// kernel reported the queue-overflow "no fd" sentinel or the handle
    /// was already taken.
    pub fn take_handle(&mut self) -> Option<OwnedFd> {
        self.handle.take()
    }
}

/// An event resolved to a concrete path, ready for matching.
#[derive(Debug)]
pub struct DecodedAccess {
    pub path: PathBuf,
    pub mask: MaskFlags,
    pub pid: i32,
}

/// The access kinds the monitor reacts to. A single kernel record can carry
/// both bits and is then handled once per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Open,
    Modify,
}

impl AccessKind {
    /// The kinds present in an event mask, in a fixed order.
    pub fn from_mask(mask: MaskFlags) -> impl Iterator<Item = AccessKind> {
        [
            (MaskFlags::FAN_OPEN, AccessKind::Open),
            (MaskFlags::FAN_MODIFY, AccessKind::Modify),
        ]
        .into_iter()
        .filter_map(move |(bit, kind)| mask.contains(bit).then_some(kind))
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccessKind::Open => "OPEN",
            AccessKind::Modify => "MODIFY",
        }
    }
}
