use crate::helpers::{
    FakeWorker, GARBLED_OPERATION, REJECTED_OPERATION, Request, append, attach_client,
    socket_in_tempdir,
};

use remoting_core::RemotingError;
use remoting_core::descriptor::{OperationDescriptor, ParamValue};

use std::io::ErrorKind;

// ============================================================================
// Operation registration against a live worker
// ============================================================================

/// **VALUE**: Registering the same descriptor twice costs one wire exchange.
///
/// **WHY THIS MATTERS**: Every document edit goes through `load_operation`. If the
/// cache misses, each edit pays an extra round trip and the worker accumulates
/// duplicate operations.
///
/// **BUG THIS CATCHES**: Would catch a cache keyed by identity instead of by the
/// descriptor's name and parameters.
#[test]
fn given_equal_descriptors_when_loaded_twice_then_one_exchange_same_handle() {
    // GIVEN: A client attached to a fake worker
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);

    // WHEN: Loading two structurally equal descriptors
    let first = client.load_operation(&append("!")).expect("first load");
    let second = client.load_operation(&append("!")).expect("second load");

    // THEN: Same handle, one load-operation on the wire
    assert_eq!(first, second);
    assert_eq!(worker.loads(), 1);
    assert_eq!(client.registered_operations(), 1);
}

/// **VALUE**: Descriptors differing only in a parameter value get their own handles.
#[test]
fn given_different_param_values_when_loaded_then_two_handles() {
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);

    let a = client.load_operation(&append("a")).expect("load a");
    let b = client.load_operation(&append("b")).expect("load b");

    assert_ne!(a, b);
    assert_eq!(worker.loads(), 2);
}

/// **VALUE**: `reset` precedes the first registration and never repeats within a session.
///
/// **WHY THIS MATTERS**: A worker may survive from an earlier host session and
/// still hold handles the new session knows nothing about.
///
/// **BUG THIS CATCHES**: Would catch a reset on every load (wiping handles the
/// session already cached) or no reset at all.
#[test]
fn given_fresh_session_when_loading_then_reset_sent_once_before_first_load() {
    // GIVEN: A fresh session
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);

    // WHEN: Loading three different operations
    for suffix in ["1", "2", "3"] {
        client.load_operation(&append(suffix)).expect("load");
    }

    // THEN: Exactly one reset, ahead of the first load
    let requests: Vec<_> = worker
        .requests()
        .into_iter()
        .filter(|r| !matches!(r, Request::Hello))
        .collect();
    assert_eq!(worker.resets(), 1);
    assert_eq!(requests.first(), Some(&Request::Reset));
    assert!(matches!(requests.get(1), Some(Request::Load { .. })));
}

#[test]
fn given_explicit_reset_when_loading_again_then_reset_resent() {
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    client.load_operation(&append("x")).expect("load");

    client.reset();
    client.load_operation(&append("x")).expect("reload");

    assert_eq!(worker.resets(), 2);
    assert_eq!(worker.loads(), 2);
}

#[test]
fn given_descriptor_params_when_loaded_then_worker_receives_them() {
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    let descriptor = OperationDescriptor::new("add-property")
        .with_param("key", "x")
        .with_param("value", "y")
        .with_param("overwrite", false);

    client.load_operation(&descriptor).expect("load");

    let load = worker
        .requests()
        .into_iter()
        .find(|r| matches!(r, Request::Load { .. }));
    match load {
        Some(Request::Load { name, params, .. }) => {
            assert_eq!(name, "add-property");
            assert_eq!(params.get("key"), Some(&ParamValue::from("x")));
            assert_eq!(params.get("value"), Some(&ParamValue::from("y")));
            assert_eq!(params.get("overwrite"), Some(&ParamValue::Bool(false)));
        }
        other => panic!("Expected a load request, got {other:?}"),
    }
}

/// **VALUE**: A registration the worker hangs up on surfaces as an operation load error.
///
/// **BUG THIS CATCHES**: Would catch a rejected descriptor being cached, or the
/// failure being mistaken for a dead worker and wiping the session.
#[test]
fn given_worker_rejects_descriptor_when_loaded_then_operation_load_error() {
    // GIVEN: A session with one operation already registered
    let (_dir, socket) = socket_in_tempdir();
    let _worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    client.load_operation(&append("ok")).expect("load");

    // WHEN: Loading a descriptor the worker refuses
    let result = client.load_operation(&OperationDescriptor::new(REJECTED_OPERATION));

    // THEN: The error names the descriptor and the session keeps its handles
    match result {
        Err(RemotingError::OperationLoad { descriptor, .. }) => {
            assert_eq!(descriptor.name(), REJECTED_OPERATION);
        }
        other => panic!("Expected operation load error, got {other:?}"),
    }
    assert_eq!(client.registered_operations(), 1);
}

/// **VALUE**: A rejected first registration does not cause a second `reset`.
///
/// **BUG THIS CATCHES**: Would catch the reset decision being taken from an
/// empty handle map, which stays empty after a rejection and resets again.
#[test]
fn given_rejected_first_load_when_loading_again_then_reset_not_resent() {
    // GIVEN: A fresh session whose first registration is refused
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    let rejected = client.load_operation(&OperationDescriptor::new(REJECTED_OPERATION));
    assert!(matches!(rejected, Err(RemotingError::OperationLoad { .. })));

    // WHEN: Registering another descriptor
    client.load_operation(&append("x")).expect("load");

    // THEN: Still only the reset sent ahead of the first attempt
    assert_eq!(worker.resets(), 1);
    assert_eq!(worker.loads(), 1);
}

/// **VALUE**: A reply that is not a handle is a protocol error, and nothing is cached.
///
/// **WHY THIS MATTERS**: A worker speaking another protocol revision cannot be
/// negotiated with; caching its reply would hand out a meaningless handle.
///
/// **BUG THIS CATCHES**: Would catch malformed framing being reported as a
/// rejected descriptor, or the bad reply being stored in the registry.
#[test]
fn given_non_integer_handle_reply_when_loaded_then_protocol_error_and_not_cached() {
    // GIVEN: A session with one operation registered
    let (_dir, socket) = socket_in_tempdir();
    let _worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    client.load_operation(&append("ok")).expect("load");

    // WHEN: The worker answers a registration with a string
    let result = client.load_operation(&OperationDescriptor::new(GARBLED_OPERATION));

    // THEN: Protocol error naming the descriptor, registry unchanged
    match result {
        Err(RemotingError::Protocol { message, .. }) => {
            assert!(message.contains(GARBLED_OPERATION), "{message}");
        }
        other => panic!("Expected protocol error, got {other:?}"),
    }
    assert_eq!(client.registered_operations(), 1);
}

/// **VALUE**: A `reset` that cannot be delivered fails the load with the descriptor attached.
///
/// **BUG THIS CATCHES**: Would catch the failure surfacing without the
/// descriptor, or the session not noticing that the worker is gone.
#[test]
fn given_worker_gone_before_first_load_when_loading_then_operation_load_error() {
    // GIVEN: A session that attached to a worker which then went away
    let (_dir, socket) = socket_in_tempdir();
    let worker = FakeWorker::start(&socket);
    let client = attach_client(&socket);
    client.ensure_started().expect("attach");
    worker.kill();

    // WHEN: Registering the first operation
    let result = client.load_operation(&append("x"));

    // THEN: Operation load error carrying the descriptor and the missing socket
    match result {
        Err(RemotingError::OperationLoad {
            descriptor, source, ..
        }) => {
            assert_eq!(descriptor, append("x"));
            assert_eq!(source.kind(), ErrorKind::NotFound);
        }
        other => panic!("Expected operation load error, got {other:?}"),
    }

    // THEN: The worker is probed again, and this client cannot launch one
    assert!(matches!(
        client.ensure_started(),
        Err(RemotingError::WorkerStartup { .. })
    ));
}
