//! Configuration for the monitor daemon.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Detection thresholds
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Event-loop tuning
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Daemon configuration
    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Alert when a file's entropy moves by more than this many bits
    /// between readings.
    #[serde(default = "default_entropy_jump")]
    pub entropy_jump: f64,

    /// Alert when a file's absolute entropy exceeds this (0.0 - 8.0).
    #[serde(default = "default_entropy_high")]
    pub entropy_high: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            entropy_jump: default_entropy_jump(),
            entropy_high: default_entropy_high(),
        }
    }
}

/// Event-loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Bounded wait on the notification descriptor, in milliseconds. This
    /// is also how often the shutdown flag is observed.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u16,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// PID file path
    #[serde(default = "default_pid_path")]
    pub pid_file: PathBuf,

    /// Log file path
    #[serde(default = "default_log_path")]
    pub log_file: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            pid_file: default_pid_path(),
            log_file: default_log_path(),
        }
    }
}

// Default value functions for serde

fn default_entropy_jump() -> f64 {
    1.0
}

fn default_entropy_high() -> f64 {
    7.0
}

fn default_poll_interval_ms() -> u16 {
    500
}

fn default_pid_path() -> PathBuf {
    PathBuf::from("/run/entroguard.pid")
}

fn default_log_path() -> PathBuf {
    PathBuf::from("/var/log/entroguard/entroguard.log")
}
