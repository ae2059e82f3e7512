use crate::helpers::{
    FakeWorker, MISSING_EXECUTABLE, Request, TestDoc, append, attach_client, fast_config,
    script_worker, socket_in_tempdir,
};

use remoting_core::supervisor::StartOutcome;
use remoting_core::supervisor::{EmbeddedWorker, WorkerExecutable};
use remoting_core::{DEFAULT_SOCKET_PATH, RemotingClient, RemotingClientBuilder, RemotingError};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serial_test::serial;
use tempfile::TempDir;

fn launching_client(executable: WorkerExecutable, socket: &Path) -> RemotingClient<TestDoc> {
    RemotingClientBuilder::default()
        .with_config(fast_config())
        .with_executable(executable)
        .with_socket_path(socket)
        .build()
        .expect("Failed to build client")
}

// ============================================================================
// ensure_started() against a worker that is already running
// ============================================================================

/// **VALUE**: A live worker is adopted with a single probe and never relaunched.
///
/// **WHY THIS MATTERS**: `ensure_started` runs before every call. Probing or
/// launching each time would double the cost of every operation.
///
/// **BUG THIS CATCHES**: Would catch the started flag not being set after
/// attaching, or a launch attempt despite a live socket (the configured
/// executable does not exist, so a launch would fail the test).
#[test]
fn given_live_worker_when_ensure_started_twice_then_one_probe_no_launch() {
    // GIVEN: A worker already listening
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);

    // WHEN: Ensuring started twice
    let first = client.ensure_started().expect("first ensure_started");
    let second = client.ensure_started().expect("second ensure_started");

    // THEN: Attached once, then the fast path, with exactly one hello
    assert_eq!(first, StartOutcome::Attached);
    assert_eq!(second, StartOutcome::AlreadyStarted);
    assert_eq!(worker.wait_for_requests(1), vec![Request::Hello]);
    assert_eq!(client.owned_worker_pid(), None);

    // The worker answers this load only after every earlier hello
    client.load_operation(&append("!")).expect("load");
    assert_eq!(worker.hellos(), 1);
}

// ============================================================================
// Launch failures
// ============================================================================

/// **VALUE**: A worker that never opens its socket fails startup after the
/// configured timeout instead of hanging.
///
/// **BUG THIS CATCHES**: Would catch an unbounded probe loop, or a timeout that
/// ignores the configured value.
#[test]
#[serial]
fn given_worker_never_listens_when_started_then_times_out() {
    // GIVEN: A script that just sleeps
    let (dir, socket) = socket_in_tempdir();
    let script = script_worker(dir.path(), "sleepy-worker", "exec sleep 30");
    let client = launching_client(WorkerExecutable::Path(script), &socket);

    // WHEN: Starting
    let started_at = Instant::now();
    let result = client.ensure_started();
    let elapsed = started_at.elapsed();

    // THEN: Startup error well before the script would have finished
    match result {
        Err(RemotingError::WorkerStartup { message, .. }) => {
            assert!(message.contains("did not become reachable"), "{message}");
        }
        other => panic!("Expected startup error, got {other:?}"),
    }
    assert!(elapsed >= Duration::from_millis(250), "Gave up too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "Took too long: {elapsed:?}");
    assert_eq!(client.owned_worker_pid(), None);
}

#[test]
#[serial]
fn given_worker_exits_immediately_when_started_then_reports_exit() {
    let (dir, socket) = socket_in_tempdir();
    let script = script_worker(dir.path(), "crashing-worker", "exit 3");
    let client = launching_client(WorkerExecutable::Path(script), &socket);

    let result = client.ensure_started();

    match result {
        Err(RemotingError::WorkerStartup { message, .. }) => {
            assert!(message.contains("exited"), "{message}");
        }
        other => panic!("Expected startup error, got {other:?}"),
    }
}

#[test]
fn given_missing_executable_when_started_then_launch_fails() {
    let (_dir, socket) = socket_in_tempdir();
    let client = attach_client(&socket);

    let result = client.ensure_started();

    match result {
        Err(RemotingError::WorkerStartup { message, .. }) => {
            assert!(message.contains(MISSING_EXECUTABLE), "{message}");
        }
        other => panic!("Expected startup error, got {other:?}"),
    }
}

/// **VALUE**: A socket file left behind by a dead worker is cleared before launching.
///
/// **BUG THIS CATCHES**: Would catch the new worker failing to bind because
/// the stale path still exists.
#[test]
#[serial]
fn given_stale_socket_file_when_started_then_file_removed_before_launch() {
    // GIVEN: A plain file where the socket should be
    let (dir, socket) = socket_in_tempdir();
    fs::write(&socket, b"").expect("write stale socket");
    let marker = dir.path().join("launched");
    let script = script_worker(
        dir.path(),
        "marker-worker",
        &format!("test -e \"$1\" || touch {}\nexit 1", marker.display()),
    );
    let client = launching_client(WorkerExecutable::Path(script), &socket);

    // WHEN: Starting
    let result = client.ensure_started();

    // THEN: Startup failed, but the worker ran with the stale path cleared
    assert!(result.is_err());
    assert!(!socket.exists(), "Stale socket should be removed");
    assert!(marker.exists(), "Worker saw a socket path that still existed");
}

/// **VALUE**: An embedded worker is materialized in the working directory before launch.
#[test]
#[serial]
fn given_embedded_worker_when_started_then_installed_into_working_directory() {
    // GIVEN: An embedded worker that exits right away
    let (_dir, socket) = socket_in_tempdir();
    let work = TempDir::new().expect("tempdir");
    let mut config = fast_config();
    config.worker.working_directory = Some(work.path().to_path_buf());
    let embedded = EmbeddedWorker::new("remoting-worker", b"#!/bin/sh\nexit 3\n");
    let installed: PathBuf = work.path().join(embedded.file_name());

    let client: RemotingClient<TestDoc> = RemotingClientBuilder::default()
        .with_config(config)
        .with_executable(WorkerExecutable::Embedded(embedded))
        .with_socket_path(&socket)
        .build()
        .expect("build");

    // WHEN: Starting
    let result = client.ensure_started();

    // THEN: The binary was written out and launched
    assert!(matches!(result, Err(RemotingError::WorkerStartup { .. })));
    assert!(installed.is_file());
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn given_no_executable_when_built_then_validation_error() {
    let result: Result<RemotingClient<TestDoc>, _> = RemotingClientBuilder::default().build();

    match result {
        Err(remoting_core::ConfigError::ValidationError { field, .. }) => {
            assert_eq!(field, "worker.executable");
        }
        Err(other) => panic!("Expected validation error, got {other:?}"),
        Ok(_) => panic!("Expected validation error, got a client"),
    }
}

#[test]
fn given_config_socket_when_built_then_used_verbatim() {
    let mut config = fast_config();
    config.worker.socket_path = Some(PathBuf::from("/tmp/configured-remoting.sock"));

    let client: RemotingClient<TestDoc> = RemotingClientBuilder::default()
        .with_config(config)
        .with_executable(WorkerExecutable::Path(PathBuf::from(MISSING_EXECUTABLE)))
        .build()
        .expect("build");

    assert_eq!(client.socket_path(), Path::new("/tmp/configured-remoting.sock"));
}

/// **VALUE**: Without a configured socket the well-known path is preferred, and a
/// random temp path is used when it is taken.
#[test]
#[serial]
fn given_no_socket_configured_when_built_then_well_known_or_random_path() {
    let client: RemotingClient<TestDoc> = RemotingClientBuilder::default()
        .with_executable(WorkerExecutable::Path(PathBuf::from(MISSING_EXECUTABLE)))
        .build()
        .expect("build");

    let path = client.socket_path();
    if Path::new(DEFAULT_SOCKET_PATH).exists() {
        assert_ne!(path, Path::new(DEFAULT_SOCKET_PATH));
        assert!(path.starts_with(std::env::temp_dir()), "{}", path.display());
    } else {
        assert_eq!(path, Path::new(DEFAULT_SOCKET_PATH));
    }
}
