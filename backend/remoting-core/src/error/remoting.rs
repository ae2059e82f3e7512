use crate::descriptor::OperationDescriptor;

use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Failures surfaced by the remoting client.
///
/// Only `Connection` failures during a liveness probe are recovered
/// internally; every other variant reaches the caller of
/// [`RemotingClient::run_operation`](crate::client::RemotingClient::run_operation).
#[derive(Debug, ThisError)]
pub enum RemotingError {
    #[error("Connection Error: {message} {location}")]
    Connection {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Worker Startup Error: {message} {location}")]
    WorkerStartup {
        message: String,
        location: ErrorLocation,
    },

    #[error("Operation Load Error: {message} {location}")]
    OperationLoad {
        message: String,
        descriptor: OperationDescriptor,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        location: ErrorLocation,
    },

    #[error("Codec Error: {message} {location}")]
    Codec {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Install Error: {message}: {path} {location}")]
    Install {
        message: String,
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },
}

impl RemotingError {
    /// Whether the failure means the worker can no longer be reached.
    ///
    /// A registration that fails because the socket is gone counts; one the
    /// worker refused mid-exchange does not.
    pub fn is_connection_loss(&self) -> bool {
        match self {
            RemotingError::Connection { .. } => true,
            RemotingError::OperationLoad { source, .. } => matches!(
                source.kind(),
                ErrorKind::NotFound | ErrorKind::ConnectionRefused
            ),
            _ => false,
        }
    }
}
