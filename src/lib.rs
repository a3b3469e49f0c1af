//! entroguard - host-based file entropy anomaly monitoring for Linux
//!
//! Watches files and directories through fanotify and flags files whose
//! byte-distribution entropy jumps sharply or becomes very high — a cheap,
//! content-level heuristic for in-place encryption (ransomware) and
//! obfuscated payload writes.
//!
//! # How it works
//!
//! - A fanotify group in content class delivers, per open/modify, a
//!   readable descriptor and the originating pid.
//! - Each event descriptor is resolved back to a path, matched against the
//!   registered watch targets, and for file targets the file's Shannon
//!   entropy is recomputed.
//! - A move of more than 1.0 bits against the previous reading, or an
//!   absolute reading above 7.0 bits, raises an alert record in the log.
//!
//! # Example
//!
//! ```rust,no_run
//! use entroguard::{Config, Monitor};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let shutdown = Arc::new(AtomicBool::new(false));
//!     let config = Config::default();
//!
//!     let mut monitor = Monitor::new(&config, &["/srv/data".into()], shutdown)?;
//!     monitor.run();
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod daemon;
pub mod detector;
pub mod logging;
pub mod monitor;
pub mod registry;
pub mod watcher;

pub use config::Config;
pub use detector::{entropy, Detector, Finding};
pub use monitor::{EventPipeline, Monitor};
pub use registry::{WatchRegistry, WatchTarget};
pub use watcher::FanotifyWatcher;
