//! Logging system initialization
//!
//! Log output goes to `%APPDATA%\AppScout\app.log`. Each start shifts the
//! previous sessions down (`app.log` -> `app.log.1` -> ... -> `app.log.9`)
//! and the oldest one falls off.

use crate::error::{AppScoutError, Result, StringError};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Historical sessions kept next to the live log
const MAX_LOG_FILES: u8 = 9;

const LOG_FILE_NAME: &str = "app.log";

/// Directory holding the log files
pub fn log_dir() -> PathBuf {
    let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(appdata).join("AppScout")
}

/// Install the global file subscriber
///
/// Level defaults to INFO and can be overridden with `RUST_LOG`.
pub fn init_logging() -> Result<()> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    rotate_logs_on_startup(&dir.join(LOG_FILE_NAME))?;

    // Rotation is done above, once per session
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("app")
        .filename_suffix("log")
        .build(&dir)
        .map_err(|e| AppScoutError::LoggingError(Box::new(e)))?;

    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppScoutError::LoggingError(Box::new(e)))?;

    tracing::info!("AppScout v{} started", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn numbered(log_path: &Path, index: u8) -> Result<PathBuf> {
    let name = log_path
        .file_name()
        .ok_or_else(|| AppScoutError::LoggingError(StringError::new("Invalid log filename")))?
        .to_string_lossy();
    Ok(log_path.with_file_name(format!("{name}.{index}")))
}

/// Shift `app.log.N` to `app.log.N+1`, dropping the oldest, then move the
/// live log to `app.log.1`
fn rotate_logs_on_startup(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let oldest = numbered(log_path, MAX_LOG_FILES)?;
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }

    for index in (1..MAX_LOG_FILES).rev() {
        let from = numbered(log_path, index)?;
        if from.exists() {
            std::fs::rename(&from, numbered(log_path, index + 1)?)?;
        }
    }

    std::fs::rename(log_path, numbered(log_path, 1)?)?;
    Ok(())
}
