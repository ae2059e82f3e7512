use crate::document::TextPayload;
use crate::error::RewriteRemoteError;
use crate::worker::WorkerServer;

use remoting_core::descriptor::ParamValue;
use remoting_core::protocol::{commands, read_item, write_item};

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;

use tempfile::TempDir;

/// Queue one request on a fresh connection, let the worker answer it, and
/// return whatever it wrote back.
fn exchange(server: &mut WorkerServer, request: &[u8]) -> Vec<u8> {
    let mut stream = UnixStream::connect(server.socket()).expect("connect");
    stream.write_all(request).expect("write");
    stream.shutdown(Shutdown::Write).expect("shutdown");

    server.serve_one().expect("serve_one");

    let mut response = Vec::new();
    stream.read_to_end(&mut response).expect("read");
    response
}

/// Hand one request straight to the connection handler and return its verdict.
fn handle(server: &mut WorkerServer, request: &[u8]) -> Result<(), RewriteRemoteError> {
    let (mut host, worker_side) = UnixStream::pair().expect("pair");
    host.write_all(request).expect("write");
    host.shutdown(Shutdown::Write).expect("shutdown");
    server.handle_connection(&worker_side)
}

fn load_request(name: &str, params: &[(&str, &str)]) -> Vec<u8> {
    let params: BTreeMap<&str, ParamValue> = params
        .iter()
        .map(|(k, v)| (*k, ParamValue::from(*v)))
        .collect();
    let mut buf = Vec::new();
    write_item(&mut buf, commands::LOAD_OPERATION).expect("write");
    write_item(&mut buf, name).expect("write");
    write_item(&mut buf, &params).expect("write");
    buf
}

fn run_request(handle: u32, payload: &TextPayload) -> Vec<u8> {
    let mut buf = Vec::new();
    write_item(&mut buf, commands::RUN_OPERATION).expect("write");
    write_item(&mut buf, &handle).expect("write");
    payload.write_to(&mut buf).expect("write");
    buf
}

fn single_item(command: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    write_item(&mut buf, command).expect("write");
    buf
}

fn decode<T: serde::de::DeserializeOwned>(response: Vec<u8>) -> T {
    read_item(Cursor::new(response)).expect("decode response")
}

/// **VALUE**: The worker assigns handles, applies operations and resolves
/// `unchanged` payloads from the result it stored.
///
/// **BUG THIS CATCHES**: Would catch the worker storing the input instead of
/// the result, which would make every incremental run start from stale text.
#[test]
fn given_loaded_operation_when_run_full_then_unchanged_then_result_reused() {
    // GIVEN: A worker with add-property loaded
    let dir = TempDir::new().expect("tempdir");
    let mut server = WorkerServer::bind(&dir.path().join("w.sock")).expect("bind");
    let handle: u32 = decode(exchange(
        &mut server,
        &load_request("add-property", &[("key", "x"), ("value", "y")]),
    ));
    assert_eq!(handle, 1);

    // WHEN: Running on a full document, then again on "unchanged"
    let first: String = decode(exchange(
        &mut server,
        &run_request(
            handle,
            &TextPayload::Full {
                id: 5,
                text: String::from("a = 1\n"),
            },
        ),
    ));
    let second: String = decode(exchange(
        &mut server,
        &run_request(handle, &TextPayload::Unchanged { id: 5 }),
    ));

    // THEN: The property was added once and the stored copy was reused
    assert_eq!(first, "a = 1\nx = y\n");
    assert_eq!(second, first);
}

#[test]
fn given_reset_when_running_old_handle_then_no_response() {
    let dir = TempDir::new().expect("tempdir");
    let mut server = WorkerServer::bind(&dir.path().join("w.sock")).expect("bind");
    let handle: u32 = decode(exchange(&mut server, &load_request("echo", &[])));

    assert!(exchange(&mut server, &single_item(commands::RESET)).is_empty());
    let response = exchange(
        &mut server,
        &run_request(
            handle,
            &TextPayload::Full {
                id: 1,
                text: String::from("x"),
            },
        ),
    );

    assert!(response.is_empty(), "A reset worker must not run old handles");
}

#[test]
fn given_unknown_document_when_unchanged_sent_then_no_response() {
    let dir = TempDir::new().expect("tempdir");
    let mut server = WorkerServer::bind(&dir.path().join("w.sock")).expect("bind");
    let handle: u32 = decode(exchange(&mut server, &load_request("echo", &[])));

    let response = exchange(
        &mut server,
        &run_request(handle, &TextPayload::Unchanged { id: 99 }),
    );

    assert!(response.is_empty());
}

#[test]
fn given_unknown_operation_when_loaded_then_no_handle_and_server_keeps_serving() {
    let dir = TempDir::new().expect("tempdir");
    let mut server = WorkerServer::bind(&dir.path().join("w.sock")).expect("bind");

    assert!(exchange(&mut server, &load_request("rename", &[])).is_empty());
    assert!(exchange(&mut server, &single_item(commands::HELLO)).is_empty());
    let handle: u32 = decode(exchange(&mut server, &load_request("echo", &[])));

    assert_eq!(handle, 1, "Rejected loads must not consume handles");
}

#[test]
fn given_bound_server_when_dropped_then_socket_removed() {
    let dir = TempDir::new().expect("tempdir");
    let socket = dir.path().join("w.sock");
    let server = WorkerServer::bind(&socket).expect("bind");
    assert!(socket.exists());

    drop(server);

    assert!(!socket.exists());
}

// ============================================================================
// Requests the worker cannot serve
// ============================================================================

/// **VALUE**: Wire requests the worker cannot serve are reported as worker
/// errors, not as command line mistakes.
///
/// **BUG THIS CATCHES**: Would catch a protocol failure being logged as if the
/// user had mistyped an argument.
#[test]
fn given_unservable_requests_when_handled_then_worker_errors() {
    // GIVEN: A worker with nothing loaded
    let dir = TempDir::new().expect("tempdir");
    let mut server = WorkerServer::bind(&dir.path().join("w.sock")).expect("bind");
    let full = TextPayload::Full {
        id: 1,
        text: String::from("x"),
    };

    // WHEN: Sending an unknown command, an unknown handle and an unknown operation
    let unknown_command = handle(&mut server, &single_item("shutdown"));
    let unknown_handle = handle(&mut server, &run_request(7, &full));
    let unknown_operation = handle(&mut server, &load_request("rename", &[]));

    // THEN: Each is a worker error
    for result in [unknown_command, unknown_handle, unknown_operation] {
        assert!(
            matches!(result, Err(RewriteRemoteError::Worker { .. })),
            "Expected worker error, got {result:?}"
        );
    }
}

/// **VALUE**: `reset` drops stored documents along with loaded operations.
///
/// **WHY THIS MATTERS**: A worker shared by many sessions would otherwise keep
/// every document it has ever seen.
///
/// **BUG THIS CATCHES**: Would catch an `unchanged` payload resolving against a
/// copy stored before the reset.
#[test]
fn given_stored_document_when_reset_then_unchanged_payload_rejected() {
    // GIVEN: A worker holding the result for document 3
    let dir = TempDir::new().expect("tempdir");
    let mut server = WorkerServer::bind(&dir.path().join("w.sock")).expect("bind");
    let handle_before: u32 = decode(exchange(&mut server, &load_request("echo", &[])));
    let stored: String = decode(exchange(
        &mut server,
        &run_request(
            handle_before,
            &TextPayload::Full {
                id: 3,
                text: String::from("kept"),
            },
        ),
    ));
    assert_eq!(stored, "kept");

    // WHEN: Resetting and asking for the stored copy under a fresh handle
    handle(&mut server, &single_item(commands::RESET)).expect("reset");
    let handle_after: u32 = decode(exchange(&mut server, &load_request("echo", &[])));
    let result = handle(
        &mut server,
        &run_request(handle_after, &TextPayload::Unchanged { id: 3 }),
    );

    // THEN: The document is gone
    match result {
        Err(RewriteRemoteError::Worker { message, .. }) => {
            assert!(message.contains("document 3"), "{message}");
        }
        other => panic!("Expected worker error, got {other:?}"),
    }
}
