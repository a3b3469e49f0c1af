//! The monitoring loop.
//!
//! Each iteration: bounded wait on the notification descriptor, one batch
//! read, then per event: self-filter, resolve, match against the registry,
//! assess, emit. The loop owns every piece of mutable state; there is no
//! second thread to synchronize with beyond the shutdown flag.

use std::os::fd::AsFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::detector::{Detector, Finding};
use crate::registry::WatchRegistry;
use crate::watcher::{resolve, AccessKind, DecodedAccess, FanotifyWatcher, RawEvent};

/// Per-event processing stages, separate from the kernel loop so they can
/// be driven directly with synthetic events.
pub struct EventPipeline {
    registry: WatchRegistry,
    detector: Detector,
    self_pid: i32,
}

impl EventPipeline {
    pub fn new(registry: WatchRegistry, detector: Detector) -> Self {
        Self::with_self_pid(registry, detector, std::process::id() as i32)
    }

    /// Like [`EventPipeline::new`] with an explicit own-pid for the
    /// self-event filter.
    pub fn with_self_pid(registry: WatchRegistry, detector: Detector, self_pid: i32) -> Self {
        Self {
            registry,
            detector,
            self_pid,
        }
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Run one raw event through filter, resolve, match and assess.
    ///
    /// The event's object handle is released on every path out of here:
    /// taken and dropped after the resolution attempt, or dropped with the
    /// event itself when filtering discards it first.
    pub fn process(&mut self, mut event: RawEvent) -> Vec<Finding> {
        let handle = event.take_handle();

        // Our own entropy reads raise OPEN events on the very files being
        // watched; reacting to those would loop forever.
        if event.pid == self.self_pid {
            return Vec::new();
        }

        // Queue overflow: the kernel delivered the event without a handle.
        let Some(handle) = handle else {
            return Vec::new();
        };

        let resolved = resolve::event_path(handle.as_fd());
        drop(handle);

        let path = match resolved {
            Ok(p) => p,
            Err(e) => {
                debug!("could not resolve event descriptor: {}", e);
                return Vec::new();
            }
        };

        let access = DecodedAccess {
            path,
            mask: event.mask,
            pid: event.pid,
        };
        self.dispatch(&access)
    }

    fn dispatch(&mut self, access: &DecodedAccess) -> Vec<Finding> {
        let mut findings = Vec::new();
        for kind in AccessKind::from_mask(access.mask) {
            for target in self.registry.matches_mut(&access.path) {
                findings.extend(self.detector.assess(target, &access.path, kind));
            }
        }
        findings
    }
}

/// Owns the watcher, the pipeline and the shutdown flag for the daemon's
/// lifetime.
pub struct Monitor {
    watcher: FanotifyWatcher,
    pipeline: EventPipeline,
    shutdown: Arc<AtomicBool>,
    poll_interval_ms: u16,
}

impl Monitor {
    /// Build the registry, open the notification group and register every
    /// watch directory. A missing notification group is fatal; individual
    /// mark failures are warnings and the remaining paths still register.
    pub fn new(
        config: &Config,
        paths: &[PathBuf],
        shutdown: Arc<AtomicBool>,
    ) -> anyhow::Result<Self> {
        let registry = WatchRegistry::from_paths(paths);
        let mut watcher =
            FanotifyWatcher::new().context("cannot create fanotify notification group")?;

        for target in registry.targets() {
            match watcher.watch(&target.watch_path) {
                Ok(()) => match &target.target_path {
                    Some(file) => info!(
                        "Monitoring directory {} for file {}",
                        target.watch_path.display(),
                        file.display()
                    ),
                    None => info!("Monitoring directory {}", target.watch_path.display()),
                },
                Err(e) => warn!("{}", e),
            }
        }

        let detector = Detector::new(config.detection.clone());

        Ok(Self {
            watcher,
            pipeline: EventPipeline::new(registry, detector),
            shutdown,
            poll_interval_ms: config.monitor.poll_interval_ms,
        })
    }

    /// Run until the shutdown flag is raised.
    ///
    /// Once running, nothing the loop encounters exits the process with a
    /// failure: decode and entropy problems are skip-and-continue, and a
    /// hard descriptor error ends the loop cleanly after being logged.
    pub fn run(&mut self) {
        info!("Monitoring {} targets.", self.pipeline.registry().len());

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.watcher.wait(self.poll_interval_ms) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    error!("{}", e);
                    break;
                }
            }

            let batch = match self.watcher.read_batch() {
                Ok(batch) => batch,
                Err(e) => {
                    error!("{}", e);
                    break;
                }
            };

            if let Some(err) = &batch.error {
                warn!("{}; dropping the rest of the batch", err);
            }

            for event in batch.events {
                for finding in self.pipeline.process(event) {
                    finding.emit();
                }
            }
        }

        if self.shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested by signal.");
        }

        self.watcher.unwatch_all();
        info!("Monitoring stopped.");
    }
}
