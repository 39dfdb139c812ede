// Logger initialization: idempotence and file placement.
// Everything runs in one test because the global logger can only be set once
// per process.

use crate::logger::{LOG_FILE_NAME, initialize};

use log::info;

/// **VALUE**: Repeat initialization is harmless and the log file lands in the
/// requested directory.
///
/// **WHY THIS MATTERS**: The runner initializes the logger once per command,
/// but tests (and any future subcommand chaining) call it again; fern panics
/// or errors if a second global logger is installed.
///
/// **BUG THIS CATCHES**: Removing the `Once`/`AtomicBool` guards, or writing
/// the log file somewhere other than the config directory.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok_and_file_exists() {
    // GIVEN: A fresh directory
    let temp_dir = tempfile::tempdir().unwrap();

    // WHEN: Calling initialize twice
    let first = initialize(temp_dir.path());
    let second = initialize(temp_dir.path());
    info!("logger test line");

    // THEN: Both succeed and the file exists
    assert!(first.is_ok(), "First initialization should succeed: {first:?}");
    assert!(second.is_ok(), "Second initialization should be a no-op");
    assert!(temp_dir.path().join(LOG_FILE_NAME).exists());
}
