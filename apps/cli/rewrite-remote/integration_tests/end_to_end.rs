use rewrite_remote::document::{TextDocument, run_text_operation};

use remoting_core::config::RemotingConfig;
use remoting_core::descriptor::OperationDescriptor;
use remoting_core::supervisor::{StartOutcome, WorkerExecutable};
use remoting_core::{RemotingClient, RemotingClientBuilder, RemotingError};

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

// ============================================================================
// The host library driving the real reference worker process
// ============================================================================

fn worker_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_remoting-worker"))
}

fn launching_client(socket: &Path) -> RemotingClient<TextDocument> {
    let mut config = RemotingConfig::default();
    config.timing.call_timeout_ms = Some(10_000);

    RemotingClientBuilder::default()
        .with_config(config)
        .with_executable(WorkerExecutable::Path(worker_binary()))
        .with_socket_path(socket)
        .build()
        .expect("Failed to build client")
}

fn is_alive(pid: u32) -> bool {
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn add_property(key: &str, value: &str) -> OperationDescriptor {
    OperationDescriptor::new("add-property")
        .with_param("key", key)
        .with_param("value", value)
}

/// **VALUE**: The complete flow against a real worker process: launch, register,
/// full send, incremental send, teardown.
///
/// **WHY THIS MATTERS**: The unit and fake-worker tests each cover one layer.
/// This is the only test where the launched binary, the socket handshake, the
/// CBOR framing and the text codec all have to agree.
///
/// **BUG THIS CATCHES**: Would catch the worker and host disagreeing on any
/// wire detail, the launched process not being reaped on drop, or the socket
/// file being left behind.
#[test]
fn given_real_worker_when_operations_run_then_full_then_incremental_then_torn_down() {
    // GIVEN: A session that will launch the reference worker
    let dir = TempDir::new().expect("tempdir");
    let socket = dir.path().join("worker.sock");
    let client = launching_client(&socket);

    // WHEN: Starting the worker
    let outcome = client.ensure_started().expect("worker should start");

    // THEN: This session owns a live process
    let StartOutcome::Launched { pid } = outcome else {
        panic!("Expected a launched worker, got {outcome:?}");
    };
    assert!(is_alive(pid));
    assert_eq!(client.owned_worker_pid(), Some(pid));

    // WHEN: Running add-property on D0, then again on the returned D1
    let d0 = TextDocument::new(1, "#settings\nexisting = value\n");
    let d1 = run_text_operation(&client, &add_property("x", "y"), &d0).expect("first run");
    let first = client.last_exchange().expect("stats");
    let d2 = run_text_operation(&client, &add_property("z", "w"), &d1).expect("second run");
    let second = client.last_exchange().expect("stats");

    // THEN: Both properties landed, the second send was incremental
    assert_eq!(d1.text(), "#settings\nexisting = value\nx = y\n");
    assert_eq!(d2.text(), "#settings\nexisting = value\nx = y\nz = w\n");
    assert!(!first.incremental);
    assert!(second.incremental);
    assert!(second.bytes_sent < first.bytes_sent);
    assert_eq!(client.registered_operations(), 2);

    // WHEN: The session ends
    drop(client);

    // THEN: The worker is gone and so is its socket
    assert!(!is_alive(pid), "Worker {pid} survived teardown");
    assert!(!socket.exists(), "Socket was left behind");
}

/// **VALUE**: A second session finding the first one's worker attaches instead
/// of launching, and leaves it running when done.
#[test]
fn given_worker_launched_by_other_session_when_new_session_starts_then_attaches() {
    // GIVEN: A worker launched by a first session
    let dir = TempDir::new().expect("tempdir");
    let socket = dir.path().join("worker.sock");
    let owner = launching_client(&socket);
    let StartOutcome::Launched { pid } = owner.ensure_started().expect("launch") else {
        panic!("First session should launch");
    };

    // WHEN: A second session on the same socket starts and finishes
    let guest = launching_client(&socket);
    let outcome = guest.ensure_started().expect("attach");
    let doc = TextDocument::new(1, "a = 1\n");
    let result = run_text_operation(&guest, &OperationDescriptor::new("echo"), &doc);
    drop(guest);

    // THEN: It attached, worked, and did not kill the owner's worker
    assert_eq!(outcome, StartOutcome::Attached);
    assert_eq!(result.expect("echo").text(), "a = 1\n");
    assert!(is_alive(pid));
    assert!(socket.exists());

    drop(owner);
    assert!(!is_alive(pid));
}

#[test]
fn given_unknown_operation_when_run_then_operation_load_error() {
    let dir = TempDir::new().expect("tempdir");
    let client = launching_client(&dir.path().join("worker.sock"));

    let result = run_text_operation(
        &client,
        &OperationDescriptor::new("rename"),
        &TextDocument::new(1, "x"),
    );

    assert!(
        matches!(result, Err(RemotingError::OperationLoad { .. })),
        "{result:?}"
    );
    assert!(
        client.owned_worker_pid().is_some(),
        "A rejected descriptor must not cost the worker"
    );
}
