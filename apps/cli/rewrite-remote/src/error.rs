use common::ErrorLocation;

use remoting_core::{ConfigError, RemotingError};

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the host CLI and the reference worker.
#[derive(Debug, Error)]
pub enum RewriteRemoteError {
    /// Bad command line input
    #[error("Cli Error: {message} {location}")]
    Cli {
        message: String,
        location: ErrorLocation,
    },

    /// Request the worker could not serve (unknown command, handle,
    /// operation or document)
    #[error("Worker Error: {message} {location}")]
    Worker {
        message: String,
        location: ErrorLocation,
    },

    /// Error from remoting-core (startup, transport, registration, codec)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// Config file could not be loaded or was invalid
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },
}

impl From<RemotingError> for RewriteRemoteError {
    #[track_caller]
    fn from(error: RemotingError) -> Self {
        RewriteRemoteError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for RewriteRemoteError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        RewriteRemoteError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IoError> for RewriteRemoteError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        RewriteRemoteError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
