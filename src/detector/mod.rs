//! Entropy-based anomaly detection.
//!
//! The detector holds the threshold rules and applies them to one watch
//! target at a time. It returns findings instead of logging them itself, so
//! the rules can be exercised without a log sink.

pub mod entropy;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::DetectionConfig;
use crate::registry::WatchTarget;
use crate::watcher::AccessKind;

/// One record produced by assessing an event against a watch target.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// Open/modify seen under a directory watch. No entropy heuristic is
    /// applied to directory targets; they are observation-only.
    DirectoryAccess { kind: AccessKind, path: PathBuf },

    /// Open/modify of a watched file, with the entropy reading taken for
    /// it. `previous` is `None` when no baseline existed yet.
    FileAccess {
        kind: AccessKind,
        path: PathBuf,
        previous: Option<f64>,
        entropy: f64,
    },

    /// The entropy moved by more than the configured jump threshold.
    EntropyJump {
        path: PathBuf,
        previous: f64,
        entropy: f64,
    },

    /// The absolute entropy exceeds the configured ceiling; the content
    /// now looks encrypted or compressed.
    HighEntropy { path: PathBuf, entropy: f64 },
}

impl Finding {
    /// Write the finding to the log sink. Alerts carry an `ALERT:` prefix
    /// and warn severity.
    pub fn emit(&self) {
        match self {
            Finding::DirectoryAccess { kind, path } => {
                info!("{} (dir watch) => {}", kind.label(), path.display());
            }
            Finding::FileAccess {
                kind,
                path,
                previous,
                entropy,
            } => {
                let old = match previous {
                    Some(v) => format!("{v:.2}"),
                    None => "unknown".to_string(),
                };
                info!(
                    "{} => {} (old={} new={:.2})",
                    kind.label(),
                    path.display(),
                    old,
                    entropy
                );
            }
            Finding::EntropyJump {
                path,
                previous,
                entropy,
            } => {
                warn!(
                    "ALERT: Big entropy change on {} ({:.2} -> {:.2})",
                    path.display(),
                    previous,
                    entropy
                );
            }
            Finding::HighEntropy { path, entropy } => {
                warn!(
                    "ALERT: High entropy on {} ({:.2}) => possible crypto",
                    path.display(),
                    entropy
                );
            }
        }
    }
}

/// Threshold rules applied to entropy readings.
pub struct Detector {
    config: DetectionConfig,
}

impl Detector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Assess one access against one prefix-matched target, updating the
    /// target's baseline when a fresh reading succeeds.
    ///
    /// Directory targets only report the access. File targets react only
    /// when the event path is exactly the tracked file; a failed entropy
    /// read produces nothing and leaves the baseline untouched, so a
    /// transient unreadable window cannot corrupt it.
    pub fn assess(&self, target: &mut WatchTarget, path: &Path, kind: AccessKind) -> Vec<Finding> {
        if target.is_dir {
            return vec![Finding::DirectoryAccess {
                kind,
                path: path.to_path_buf(),
            }];
        }

        let Some(target_path) = target.target_path.as_deref() else {
            return Vec::new();
        };
        if path != target_path {
            return Vec::new();
        }

        let Ok(new_entropy) = entropy::calculate_file(path) else {
            return Vec::new();
        };

        let previous = target.last_entropy;
        target.last_entropy = Some(new_entropy);

        let mut findings = vec![Finding::FileAccess {
            kind,
            path: path.to_path_buf(),
            previous,
            entropy: new_entropy,
        }];

        if let Some(old) = previous {
            if (new_entropy - old).abs() > self.config.entropy_jump {
                findings.push(Finding::EntropyJump {
                    path: path.to_path_buf(),
                    previous: old,
                    entropy: new_entropy,
                });
            }
        }

        if new_entropy > self.config.entropy_high {
            findings.push(Finding::HighEntropy {
                path: path.to_path_buf(),
                entropy: new_entropy,
            });
        }

        findings
    }
}
