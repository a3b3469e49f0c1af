//! Append-only log sink.
//!
//! All records go to one line-oriented file as
//! `[YYYY-MM-DD HH:MM:SS] <message>`. Once the daemon is running this is
//! its only output channel; stdout and stderr belong to the daemonizer,
//! which points them at /dev/null.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

struct WallClock;

impl FormatTime for WallClock {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Install the global subscriber writing to `log_file`, creating its parent
/// directory if needed. Level and target rendering are disabled so the
/// on-disk format stays exactly timestamp + message.
pub fn init(log_file: &Path, verbose: bool) -> anyhow::Result<()> {
    if let Some(dir) = log_file.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(WallClock)
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();

    Ok(())
}
