//! Logging setup
//!
//! Logging is off unless TICKLIST_LOG is set. When enabled, events go to
//! a log file (config.log_file or {data_dir}/ticklist.log) so they never
//! mix with command output.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ticklist_core::Config;

/// Environment variable holding the log level
const LOG_ENV: &str = "TICKLIST_LOG";

/// Initialize file-based logging if TICKLIST_LOG is set
pub fn init(config: &Config) {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match open_log_file(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(&log_level))
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init();

    info!("logging initialized to {:?}", log_path);
}

/// Open the log file for appending, creating its directory first
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::new(format!("ticklist_core={0},ticklist_cli={0}", level.trim()))
}
