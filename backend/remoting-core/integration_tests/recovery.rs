use crate::helpers::{
    FakeWorker, Request, TestDoc, append, attach_client, run, socket_in_tempdir,
};

use remoting_core::RemotingError;
use remoting_core::supervisor::StartOutcome;

// ============================================================================
// Losing and regaining the worker
// ============================================================================

/// **VALUE**: After the worker dies the session starts over against its
/// replacement: reset, re-register, full send.
///
/// **WHY THIS MATTERS**: A replacement worker holds no handles and no document
/// copies. Reusing either would make it run an unknown handle or diff against
/// nothing.
///
/// **BUG THIS CATCHES**: Would catch stale handles or snapshots surviving a
/// connection loss, or the started flag never being cleared.
#[test]
fn given_worker_lost_when_replacement_appears_then_session_starts_over() {
    // GIVEN: A session with a registered operation and tracked document
    let (_dir, socket) = socket_in_tempdir();
    let first_worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    let (d1, _) = run(&client, &append("!"), &TestDoc::new(1, "x"));
    let d1 = d1.expect("first run");

    // WHEN: The worker goes away mid-session
    first_worker.kill();
    let (lost, _) = run(&client, &append("!"), &d1);

    // THEN: Connection error and all remote state dropped
    assert!(matches!(lost, Err(RemotingError::Connection { .. })), "{lost:?}");
    assert_eq!(client.registered_operations(), 0);
    assert_eq!(client.tracked_snapshot(&1), None);

    // WHEN: A replacement worker appears at the same socket
    let second_worker = FakeWorker::start(&socket);
    let (recovered, prior) = run(&client, &append("!"), &d1);

    // THEN: Re-probed, reset, re-registered and sent in full
    assert_eq!(recovered.expect("recovered run").text, "x!!");
    assert_eq!(prior, None);
    assert_eq!(second_worker.hellos(), 1);
    assert_eq!(second_worker.resets(), 1);
    assert_eq!(second_worker.loads(), 1);
}

#[test]
fn given_attached_worker_when_client_shut_down_then_worker_keeps_running() {
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    client.ensure_started().expect("attach");

    client.shutdown();
    drop(client);

    assert!(socket.exists(), "An attached worker's socket must be left alone");
    let again = attach_client(&socket);
    assert_eq!(again.ensure_started().expect("reattach"), StartOutcome::Attached);
    assert_eq!(worker.wait_for_requests(2), vec![Request::Hello, Request::Hello]);
}
