// Unit tests for logger setup
// The global install is exercised once; the dispatch tree is tested directly

use crate::logger::{build_dispatch, initialize, level_for};

use std::path::PathBuf;

use log::LevelFilter;
use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Calling initialize() repeatedly never fails.
///
/// **BUG THIS CATCHES**: Would catch the Once or AtomicBool guards being
/// removed, which makes fern refuse to install a second global logger.
#[test]
#[serial]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A writable log directory
    let dir = TempDir::new().expect("tempdir");

    // WHEN: Initializing twice
    let first = initialize(Some(dir.path()), false);
    let second = initialize(Some(dir.path()), true);

    // THEN: Both succeed
    assert!(first.is_ok(), "First initialization should succeed: {first:?}");
    assert!(second.is_ok(), "Second initialization should be a no-op");
}

/// **VALUE**: An unwritable log directory is reported, not panicked on.
#[test]
fn given_invalid_log_dir_when_dispatch_built_then_returns_error() {
    // GIVEN: A path that can never hold a file
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    // WHEN: Building the dispatch
    let result = build_dispatch(Some(&invalid_dir), LevelFilter::Info);

    // THEN: An error naming the log file
    let message = match result {
        Err(e) => e.to_string(),
        Ok(_) => panic!("Should fail for an invalid log directory"),
    };
    assert!(message.contains("rewrite-remote.log"), "{message}");
}

#[test]
fn given_no_log_dir_when_dispatch_built_then_ok() {
    assert!(build_dispatch(None, LevelFilter::Debug).is_ok());
}

#[test]
fn given_verbose_flag_when_level_chosen_then_trace() {
    assert_eq!(level_for(true), LevelFilter::Trace);
    assert!(level_for(false) < LevelFilter::Trace);
}
