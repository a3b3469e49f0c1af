//! Process lifecycle: daemonization and the cooperative shutdown flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use daemonize::Daemonize;

use crate::config::DaemonConfig;

/// Detach from the controlling terminal: double fork, new session, working
/// directory `/`, pid file, standard streams to /dev/null.
pub fn daemonize(config: &DaemonConfig) -> anyhow::Result<()> {
    if let Some(dir) = config.pid_file.parent() {
        std::fs::create_dir_all(dir)?;
    }

    Daemonize::new()
        .pid_file(&config.pid_file)
        .working_directory("/")
        .start()?;

    Ok(())
}

/// Install SIGTERM/SIGINT handling and return the flag it raises.
///
/// The handler body is a single atomic store and nothing else; logging or
/// allocation do not belong on the signal path. The monitor loop reads the
/// flag once per wait cycle.
pub fn install_shutdown_flag() -> anyhow::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let raised = flag.clone();
    ctrlc::set_handler(move || raised.store(true, Ordering::SeqCst))?;
    Ok(flag)
}
