//! Logging for the `tvctl` binary.
//!
//! Command output owns stdout, so the console only gets warnings and errors
//! on stderr. The full record at [`FILE_LOG_LEVEL`] goes to `tvctl.log` in the
//! config directory.

use crate::error::TvctlError;

use common::ErrorLocation;

use std::io::stderr;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

/// Set on the first call, successful or not.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "tvctl.log";

const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

/// Target for records that only belong in the file, such as the final error
/// `main` already prints itself.
pub const FILE_ONLY_TARGET: &str = "tvctl::file";

const CONSOLE_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

#[cfg(debug_assertions)]
pub const FILE_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
pub const FILE_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Initialize the logger (stderr + `log_dir/tvctl.log`).
///
/// Safe to call more than once: later calls log a warning and return `Ok`.
///
/// # Errors
///
/// Returns [`TvctlError::Tvctl`] if the log file cannot be created or a
/// global logger is already installed by someone else.
pub fn initialize(log_dir: &Path) -> Result<(), TvctlError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(log_dir);
        if result.is_ok() {
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{FILE_LOG_LEVEL:?}");
        }
    });

    result
}

#[track_caller]
fn initialize_internal(log_dir: &Path) -> Result<(), TvctlError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let colors = ColoredLevelConfig::new().warn(Yellow).error(Red);

    let console_dispatch = Dispatch::new()
        .level(CONSOLE_LOG_LEVEL)
        .filter(|metadata| metadata.target() != FILE_ONLY_TARGET)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "tvctl: {level}: {message}",
                level = colors.color(record.level()),
                message = message,
            ))
        })
        .chain(stderr());

    let file_dispatch = Dispatch::new()
        .level(FILE_LOG_LEVEL)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{target}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                message = message,
                target = record.target(),
            ))
        })
        .chain(
            fern::log_file(&log_file_path).map_err(|e| TvctlError::Tvctl {
                message: format!("Failed to create log file {}: {e}", log_file_path.display()),
                location: ErrorLocation::from(Location::caller()),
            })?,
        );

    Dispatch::new()
        .level(FILE_LOG_LEVEL)
        .chain(console_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| TvctlError::Tvctl {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(())
}
