use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_DIR_NAME: &str = "logs";

/// One log file per day
pub fn log_file_name(date: NaiveDate) -> String {
    format!("snaptext_{}.log", date.format("%Y%m%d"))
}

fn open_log_file(log_dir: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let path = log_dir.join(log_file_name(chrono::Local::now().date_naive()));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    Ok((file, path))
}

/// Install the global subscriber: stdout plus a daily file under `log_dir`.
///
/// `RUST_LOG` overrides the default `info` level. Returns the log file path,
/// or `None` when only stdout logging could be set up.
pub fn init(log_dir: &Path) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stdout));

    let (file_layer, log_path, file_error) = match open_log_file(log_dir) {
        Ok((file, path)) => {
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        tracing::warn!("File logging disabled: {:#}", e);
    }

    log_path
}
