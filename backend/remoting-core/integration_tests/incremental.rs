use crate::helpers::{FakeWorker, TestDoc, append, attach_client, run, socket_in_tempdir};

use remoting_core::descriptor::OperationDescriptor;

// ============================================================================
// Snapshot tracking across run-operation calls
// ============================================================================

/// **VALUE**: The full add-property round trip: register once, send in full, then
/// send incrementally against the returned snapshot.
///
/// **WHY THIS MATTERS**: This is the whole point of the session. A host editing
/// the same document repeatedly must not re-upload it on every call.
///
/// **BUG THIS CATCHES**: Would catch the tracker recording the input instead of
/// the result, a second `load-operation` for a cached descriptor, or the encoder
/// being handed the wrong prior.
#[test]
fn given_fresh_session_when_operation_run_twice_then_second_call_is_incremental() {
    // GIVEN: A fresh session, a descriptor and document D0
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    let descriptor = OperationDescriptor::new("add-property")
        .with_param("key", "x")
        .with_param("value", "y")
        .with_param("suffix", "\nx = y");
    let d0 = TestDoc::new(1, "a = 1");

    // WHEN: Running against D0
    let (d1, prior) = run(&client, &descriptor, &d0);
    let d1 = d1.expect("first run");

    // THEN: One load, a full send, and D1 comes back
    assert_eq!(prior, None);
    assert_eq!(d1, TestDoc::new(1, "a = 1\nx = y"));
    assert_eq!(worker.loads(), 1);
    let first_stats = client.last_exchange().expect("stats");
    assert!(!first_stats.incremental);

    // WHEN: Running again against D1
    let (d2, prior) = run(&client, &descriptor, &d1);
    let d2 = d2.expect("second run");

    // THEN: No new load, and the encoder saw D1 as the prior
    assert_eq!(worker.loads(), 1);
    assert_eq!(prior, Some(d1.clone()));
    assert_eq!(d2.text, "a = 1\nx = y\nx = y");
    assert_eq!(worker.runs().len(), 2);
    assert!(worker.runs()[1].1, "Worker should have seen an incremental payload");

    let second_stats = client.last_exchange().expect("stats");
    assert!(second_stats.incremental);
    assert!(second_stats.bytes_sent < first_stats.bytes_sent);
    assert_eq!(client.tracked_snapshot(&1), Some(d2));
}

/// **VALUE**: A document edited since the last result is sent in full again.
///
/// **BUG THIS CATCHES**: Would catch the tracker comparing only ids, which would
/// let the worker apply the operation to an outdated copy.
#[test]
fn given_document_edited_after_result_when_run_then_full_send() {
    // GIVEN: A document the worker already processed
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    let (d1, _) = run(&client, &append("!"), &TestDoc::new(1, "hello"));
    let d1 = d1.expect("first run");

    // WHEN: The host edits it and runs again
    let edited = TestDoc::new(1, &format!("{} world", d1.text));
    let (result, prior) = run(&client, &append("!"), &edited);

    // THEN: No prior was offered and the worker received the edit
    assert_eq!(prior, None);
    assert_eq!(result.expect("second run").text, "hello! world!");
    assert_eq!(worker.runs().iter().filter(|(_, inc)| *inc).count(), 0);
}

#[test]
fn given_two_documents_when_interleaved_then_each_tracked_separately() {
    let (_dir, socket) = socket_in_tempdir();
    let _worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    let op = append("+");

    let (a1, _) = run(&client, &op, &TestDoc::new(1, "a"));
    let (b1, _) = run(&client, &op, &TestDoc::new(2, "b"));
    let a1 = a1.expect("a1");
    let b1 = b1.expect("b1");

    let (a2, prior_a) = run(&client, &op, &a1);
    let (b2, prior_b) = run(&client, &op, &b1);

    assert_eq!(prior_a, Some(a1));
    assert_eq!(prior_b, Some(b1));
    assert_eq!(a2.expect("a2").text, "a++");
    assert_eq!(b2.expect("b2").text, "b++");
}

/// **VALUE**: A different operation on the same document can still go incremental.
#[test]
fn given_result_of_one_operation_when_other_operation_run_then_incremental() {
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);

    let (d1, _) = run(&client, &append("1"), &TestDoc::new(7, "v"));
    let (d2, prior) = run(&client, &append("2"), &d1.expect("d1"));

    assert!(prior.is_some());
    assert_eq!(d2.expect("d2").text, "v12");
    assert_eq!(worker.loads(), 2);
}

/// **VALUE**: An encoder failure leaves no stale snapshot behind.
///
/// **BUG THIS CATCHES**: Would catch the tracker keeping a snapshot for a
/// document whose payload only partially reached the worker.
#[test]
fn given_encoder_fails_when_run_then_codec_error_and_snapshot_forgotten() {
    use remoting_core::RemotingError;
    use std::io::{Error as IoError, ErrorKind};

    // GIVEN: A tracked document
    let (_dir, socket) = socket_in_tempdir();
    let _worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    let (d1, _) = run(&client, &append("!"), &TestDoc::new(3, "x"));
    let d1 = d1.expect("d1");
    assert!(client.tracked_snapshot(&3).is_some());

    // WHEN: The encoder fails on the next call
    let result = client.run_operation(
        &append("!"),
        &d1,
        |_, _| Err(IoError::new(ErrorKind::InvalidInput, "cannot encode")),
        |_| Ok(TestDoc::new(3, "unreachable")),
    );

    // THEN: Codec error, and the next call must send in full
    assert!(matches!(result, Err(RemotingError::Codec { .. })), "{result:?}");
    assert_eq!(client.tracked_snapshot(&3), None);
    assert_eq!(client.registered_operations(), 1, "Codec errors keep handles");
}
