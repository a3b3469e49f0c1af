//! entroguard - file entropy anomaly monitor daemon
//!
//! # Usage
//!
//! ```bash
//! # Watch a directory and a specific file
//! sudo entroguard /srv/data /etc/passwd
//!
//! # Stay in the foreground with debug logging
//! sudo entroguard --foreground --verbose /srv/data
//! ```
//!
//! Requires CAP_SYS_ADMIN for the fanotify subscription.

use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use entroguard::config::Config;
use entroguard::{daemon, logging, registry, Monitor};

#[derive(Parser)]
#[command(name = "entroguard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Files or directories to monitor
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/entroguard/config.yaml")]
    config: PathBuf,

    /// Stay in the foreground (don't daemonize)
    #[arg(short, long)]
    foreground: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            if cli.config.exists() {
                eprintln!("failed to load config {}: {e:#}", cli.config.display());
                std::process::exit(1);
            }
            Config::default()
        }
    };

    // Absolutize inputs now: daemonization moves the working directory to /.
    let paths: Vec<PathBuf> = cli.paths.iter().map(|p| registry::normalize(p)).collect();

    if !cli.foreground {
        if let Err(e) = daemon::daemonize(&config.daemon) {
            eprintln!("failed to daemonize: {e:#}");
            std::process::exit(1);
        }
    }

    if let Err(e) = logging::init(&config.daemon.log_file, cli.verbose) {
        eprintln!("failed to open log sink: {e:#}");
        std::process::exit(1);
    }

    if !cli.config.exists() {
        info!("No config file at {}, using defaults.", cli.config.display());
    }

    let shutdown = match daemon::install_shutdown_flag() {
        Ok(flag) => flag,
        Err(e) => {
            error!("failed to install signal handlers: {e:#}");
            std::process::exit(1);
        }
    };

    let mut monitor = match Monitor::new(&config, &paths, shutdown) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    };

    info!("Daemon started with {} targets.", paths.len());
    monitor.run();
    info!("Daemon stopping.");
}
