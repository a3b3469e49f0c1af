//! fanotify notification group: registration, bounded waiting, batch reads.
//!
//! The group is opened in content class so every event carries a readable
//! descriptor for the accessed object; that descriptor is what the resolver
//! and the entropy engine work from.

use std::os::fd::{AsFd, AsRawFd};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::fanotify::{EventFFlags, Fanotify, InitFlags, MarkFlags, MaskFlags};
use tracing::warn;

use super::decode::{self, Batch};

/// One read drains whatever the kernel queued; records never straddle reads.
const EVENT_BUFFER_SIZE: usize = 8192;

#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("fanotify init failed: {0}")]
    Init(#[source] Errno),

    #[error("fanotify mark failed for {path}: {source}")]
    Mark { path: PathBuf, source: Errno },

    #[error("wait on notification descriptor failed: {0}")]
    Wait(#[source] Errno),

    #[error("read from notification descriptor failed: {0}")]
    Read(#[source] Errno),
}

/// Owns the fanotify descriptor and the set of marked directories.
pub struct FanotifyWatcher {
    fan: Fanotify,
    marked: Vec<PathBuf>,
}

fn interest_mask() -> MaskFlags {
    MaskFlags::FAN_OPEN | MaskFlags::FAN_MODIFY | MaskFlags::FAN_EVENT_ON_CHILD
}

impl FanotifyWatcher {
    /// Open the notification group. Requires CAP_SYS_ADMIN; without the
    /// group nothing can be watched, so failure here is fatal to startup.
    pub fn new() -> Result<Self, WatcherError> {
        let fan = Fanotify::init(
            InitFlags::FAN_CLASS_CONTENT | InitFlags::FAN_CLOEXEC | InitFlags::FAN_NONBLOCK,
            EventFFlags::O_RDONLY | EventFFlags::O_CLOEXEC | EventFFlags::O_LARGEFILE,
        )
        .map_err(WatcherError::Init)?;

        Ok(Self {
            fan,
            marked: Vec::new(),
        })
    }

    /// Register interest in opens and modifications under `dir`. The
    /// on-child flag makes a single directory mark report events for the
    /// files inside it, not just the directory object.
    pub fn watch(&mut self, dir: &Path) -> Result<(), WatcherError> {
        self.fan
            .mark(MarkFlags::FAN_MARK_ADD, interest_mask(), None, Some(dir))
            .map_err(|source| WatcherError::Mark {
                path: dir.to_path_buf(),
                source,
            })?;

        self.marked.push(dir.to_path_buf());
        Ok(())
    }

    /// Block on the notification descriptor for up to `timeout_ms`.
    /// Returns whether events are ready; a signal-interrupted wait is
    /// retried transparently.
    pub fn wait(&self, timeout_ms: u16) -> Result<bool, WatcherError> {
        loop {
            let mut fds = [PollFd::new(self.fan.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(timeout_ms)) {
                Ok(0) => return Ok(false),
                Ok(_) => return Ok(true),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(WatcherError::Wait(e)),
            }
        }
    }

    /// Read and decode whatever the kernel has queued. A wait/read race
    /// (`EAGAIN`) or an interrupted read yields an empty batch, not an
    /// error; the outer loop simply polls again.
    pub fn read_batch(&self) -> Result<Batch, WatcherError> {
        let mut buf = [0u8; EVENT_BUFFER_SIZE];
        match nix::unistd::read(self.fan.as_fd().as_raw_fd(), &mut buf) {
            Ok(len) => Ok(decode::decode_batch(&buf[..len])),
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => Ok(Batch::default()),
            Err(e) => Err(WatcherError::Read(e)),
        }
    }

    /// Remove every mark. Dropping the watcher afterwards closes the
    /// notification descriptor.
    pub fn unwatch_all(&mut self) {
        for dir in self.marked.drain(..) {
            if let Err(e) =
                self.fan
                    .mark(MarkFlags::FAN_MARK_REMOVE, interest_mask(), None, Some(&dir))
            {
                warn!("failed to remove mark on {}: {}", dir.display(), e);
            }
        }
    }

    pub fn marked_paths(&self) -> &[PathBuf] {
        &self.marked
    }
}
