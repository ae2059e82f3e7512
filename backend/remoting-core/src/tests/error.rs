use crate::descriptor::OperationDescriptor;
use crate::error::RemotingError;

use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;

fn here() -> ErrorLocation {
    ErrorLocation::from(Location::caller())
}

fn load_error(kind: ErrorKind) -> RemotingError {
    RemotingError::OperationLoad {
        message: String::from("load failed"),
        descriptor: OperationDescriptor::new("echo"),
        location: here(),
        source: IoError::from(kind),
    }
}

/// **VALUE**: Only failures that mean the worker is unreachable trigger recovery.
///
/// **BUG THIS CATCHES**: Would catch a codec bug wiping every registered
/// operation, or a dead socket being treated as a one-off failure.
#[test]
fn given_error_variants_when_classified_then_only_lost_worker_counts() {
    let connection = RemotingError::Connection {
        message: String::from("refused"),
        location: here(),
        source: IoError::from(ErrorKind::ConnectionRefused),
    };
    let codec = RemotingError::Codec {
        message: String::from("bad payload"),
        location: here(),
        source: IoError::from(ErrorKind::InvalidData),
    };
    let protocol = RemotingError::Protocol {
        message: String::from("bad handle"),
        location: here(),
    };

    assert!(connection.is_connection_loss());
    assert!(load_error(ErrorKind::NotFound).is_connection_loss());
    assert!(load_error(ErrorKind::ConnectionRefused).is_connection_loss());
    assert!(!load_error(ErrorKind::UnexpectedEof).is_connection_loss());
    assert!(!codec.is_connection_loss());
    assert!(!protocol.is_connection_loss());
}

#[test]
fn given_startup_error_when_displayed_then_includes_message_and_location() {
    let error = RemotingError::WorkerStartup {
        message: String::from("worker exited"),
        location: here(),
    };

    let text = error.to_string();

    assert!(text.starts_with("Worker Startup Error: worker exited ["), "{text}");
    assert!(text.contains("error.rs:"), "{text}");
}
