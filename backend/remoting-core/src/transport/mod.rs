//! One-connection-per-exchange transport to the worker socket.
//!
//! Every exchange opens a fresh Unix stream connection, writes one command,
//! optionally streams a payload, reads one response and drops the
//! connection. Nothing is pooled.

pub mod counting;

pub use counting::{CountingReader, CountingWriter, ExchangeStats};

use crate::descriptor::{OperationDescriptor, OperationHandle};
use crate::error::RemotingError;
use crate::protocol::{Command, read_item};

use common::ErrorLocation;

use std::io::{BufReader, BufWriter, Error as IoError, ErrorKind, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, trace};

/// Opens connections to the worker listening at a socket path.
#[derive(Debug, Clone)]
pub struct Transport {
    address: PathBuf,
    call_timeout: Option<Duration>,
}

/// An open connection carrying a single command.
pub struct Channel {
    stream: UnixStream,
}

impl Transport {
    /// Create a transport for `address`.
    ///
    /// `call_timeout` bounds every individual read and write on a connection;
    /// `None` blocks until the worker answers or the connection breaks.
    pub fn new(address: impl Into<PathBuf>, call_timeout: Option<Duration>) -> Self {
        Self {
            address: address.into(),
            call_timeout,
        }
    }

    pub fn address(&self) -> &Path {
        &self.address
    }

    /// Open a new connection to the worker.
    ///
    /// # Errors
    ///
    /// Returns [`RemotingError::Connection`] if the socket does not exist or
    /// refuses the connection.
    #[track_caller]
    pub fn connect(&self) -> Result<Channel, RemotingError> {
        self.open().map_err(|e| RemotingError::Connection {
            message: format!(
                "Failed to connect to worker at {}: {e}",
                self.address.display()
            ),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })
    }

    fn open(&self) -> Result<Channel, IoError> {
        let stream = UnixStream::connect(&self.address)?;
        stream.set_read_timeout(self.call_timeout)?;
        stream.set_write_timeout(self.call_timeout)?;
        Ok(Channel { stream })
    }

    /// Liveness probe: `true` if a `hello` could be written.
    ///
    /// Never fails; any transport problem just means "not reachable yet".
    pub fn hello(&self) -> bool {
        if !self.address.exists() {
            trace!("No socket at {}", self.address.display());
            return false;
        }

        match self.open().and_then(|mut channel| channel.send(Command::Hello)) {
            Ok(()) => true,
            Err(e) => {
                trace!("Worker at {} not reachable: {e}", self.address.display());
                false
            }
        }
    }

    /// Tell the worker to discard every operation it has loaded.
    ///
    /// Errors are returned raw, as for [`load_operation`](Self::load_operation).
    pub fn reset(&self) -> Result<(), IoError> {
        let mut channel = self.open()?;
        channel.send(Command::Reset)?;
        debug!("Sent reset to {}", self.address.display());
        Ok(())
    }

    /// Register `descriptor` and read back the handle the worker assigned.
    ///
    /// Errors are returned raw so the registry can attach the descriptor;
    /// framing problems carry [`ErrorKind::InvalidData`].
    pub fn load_operation(
        &self,
        descriptor: &OperationDescriptor,
    ) -> Result<OperationHandle, IoError> {
        let mut channel = self.open()?;
        channel.send(Command::LoadOperation(descriptor))?;
        read_item(BufReader::new(&channel.stream))
    }

    /// Run a registered operation, streaming the document through the
    /// caller's codec.
    ///
    /// The handle is written first, then `encode` receives the connection's
    /// write side together with the prior snapshot the worker is believed to
    /// hold. Once it returns the write side is shut down so the worker sees
    /// end of input, and `decode` reads the result from the read side.
    ///
    /// # Errors
    ///
    /// - [`RemotingError::Connection`] if the connection breaks in either
    ///   direction, including inside the codec.
    /// - [`RemotingError::Codec`] if `encode` or `decode` fail for any other
    ///   reason.
    #[track_caller]
    pub fn run_operation<D, E, F>(
        &self,
        handle: OperationHandle,
        previous: Option<&D>,
        encode: E,
        decode: F,
    ) -> Result<(D, ExchangeStats), RemotingError>
    where
        E: FnOnce(&mut dyn Write, Option<&D>) -> Result<(), IoError>,
        F: FnOnce(&mut dyn Read) -> Result<D, IoError>,
    {
        let location = ErrorLocation::from(Location::caller());
        let channel = self.connect()?;

        let mut writer = BufWriter::new(&channel.stream);
        Command::RunOperation(handle)
            .write_to(&mut writer)
            .map_err(|e| connection_error("Failed to send run-operation", e, location))?;

        let mut sink = CountingWriter::new(writer);
        encode(&mut sink, previous).map_err(|e| codec_error("Encoder failed", e, location))?;
        sink.flush()
            .map_err(|e| connection_error("Failed to flush payload", e, location))?;
        let bytes_sent = sink.count();
        drop(sink.into_inner());

        channel
            .stream
            .shutdown(Shutdown::Write)
            .map_err(|e| connection_error("Failed to close write side", e, location))?;

        let mut source = CountingReader::new(BufReader::new(&channel.stream));
        let result =
            decode(&mut source).map_err(|e| codec_error("Decoder failed", e, location))?;

        let stats = ExchangeStats {
            handle,
            incremental: previous.is_some(),
            bytes_sent,
            bytes_received: source.count(),
        };

        Ok((result, stats))
    }
}

impl Channel {
    /// Write one command and flush it.
    pub fn send(&mut self, command: Command<'_>) -> Result<(), IoError> {
        let mut writer = BufWriter::new(&self.stream);
        command.write_to(&mut writer)?;
        writer.flush()
    }
}

/// Error kinds that mean the peer went away or stopped answering.
fn is_transport_failure(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
            | ErrorKind::TimedOut
            | ErrorKind::WouldBlock
    )
}

fn connection_error(context: &str, error: IoError, location: ErrorLocation) -> RemotingError {
    RemotingError::Connection {
        message: format!("{context}: {error}"),
        location,
        source: error,
    }
}

fn codec_error(context: &str, error: IoError, location: ErrorLocation) -> RemotingError {
    if is_transport_failure(error.kind()) {
        return connection_error(context, error, location);
    }

    RemotingError::Codec {
        message: format!("{context}: {error}"),
        location,
        source: error,
    }
}
