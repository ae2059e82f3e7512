//! Client side of the document-remoting channel.
//!
//! A host process hands documents to a long-lived worker process over a
//! Unix socket. This crate keeps that worker alive, registers operations with
//! it, and tracks which document versions the worker already holds so
//! repeated calls can send incremental payloads instead of whole documents.

pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod supervisor;
pub mod tracker;
pub mod transport;

#[cfg(test)]
mod tests;

pub use client::{RemotingClient, RemotingClientBuilder};
pub use descriptor::{OperationDescriptor, OperationHandle, ParamValue};
pub use error::{ConfigError, RemotingError};
pub use tracker::Snapshot;

pub const SOCKET_DIRECTORY: &str = "/tmp";
pub const SOCKET_FILE_PREFIX: &str = "rewrite-remote";
pub const DEFAULT_SOCKET_PATH: &str =
    const_format::concatcp!(SOCKET_DIRECTORY, "/", SOCKET_FILE_PREFIX, ".sock");
pub const WORKING_DIRECTORY_NAME: &str = "rewrite-remote";
