//! Reference worker: serves the remoting protocol for plain-text documents.
//!
//! One command per connection, handled in arrival order on a single thread.
//! Loaded operations and the latest result for each document id live until
//! `reset`, so an `unchanged` payload can be resolved in between.

pub mod operation;

pub use operation::Operation;

use crate::document::TextPayload;
use crate::error::RewriteRemoteError;

use common::ErrorLocation;

use remoting_core::descriptor::ParamValue;
use remoting_core::protocol::{commands, read_item, write_item};

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{debug, info, trace, warn};

pub struct WorkerServer {
    listener: UnixListener,
    socket: PathBuf,
    operations: HashMap<u32, Operation>,
    documents: HashMap<u64, String>,
    next_handle: u32,
}

impl WorkerServer {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteRemoteError::Io`] if the path is taken or not
    /// writable.
    #[track_caller]
    pub fn bind(socket: &Path) -> Result<Self, RewriteRemoteError> {
        let listener = UnixListener::bind(socket).map_err(|e| RewriteRemoteError::Io {
            message: format!("Failed to bind {}: {e}", socket.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!("Worker listening on {}", socket.display());

        Ok(Self {
            listener,
            socket: socket.to_path_buf(),
            operations: HashMap::new(),
            documents: HashMap::new(),
            next_handle: 0,
        })
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Accept connections until the process is terminated.
    pub fn serve(mut self) -> Result<(), RewriteRemoteError> {
        loop {
            self.serve_one()?;
        }
    }

    /// Accept one connection and answer it.
    ///
    /// A failing connection is logged and dropped; only a failing listener
    /// is returned as an error.
    pub fn serve_one(&mut self) -> Result<(), RewriteRemoteError> {
        let (stream, _) = self.listener.accept()?;
        if let Err(e) = self.handle_connection(&stream) {
            warn!("Dropped connection: {e}");
        }
        Ok(())
    }

    /// Read one command from `stream` and answer it.
    ///
    /// Requests the worker cannot serve are returned as
    /// [`RewriteRemoteError::Worker`] without writing a response.
    pub(crate) fn handle_connection(
        &mut self,
        stream: &UnixStream,
    ) -> Result<(), RewriteRemoteError> {
        let mut reader = BufReader::new(stream);
        let command: String = read_item(&mut reader)?;

        match command.as_str() {
            commands::HELLO => trace!("hello"),
            commands::RESET => {
                debug!(
                    "Reset: dropping {} operation(s) and {} document(s)",
                    self.operations.len(),
                    self.documents.len()
                );
                self.operations.clear();
                self.documents.clear();
            }
            commands::LOAD_OPERATION => {
                let name: String = read_item(&mut reader)?;
                let params: BTreeMap<String, ParamValue> = read_item(&mut reader)?;
                let operation = Operation::from_request(&name, &params)?;

                self.next_handle += 1;
                let handle = self.next_handle;
                debug!("Loaded {name} as #{handle}");
                self.operations.insert(handle, operation);

                respond(stream, &handle)?;
            }
            commands::RUN_OPERATION => {
                let handle: u32 = read_item(&mut reader)?;
                let payload = TextPayload::read_from(&mut reader)?;
                let result = self.run(handle, payload)?;
                respond(stream, &result)?;
            }
            other => {
                return Err(RewriteRemoteError::Worker {
                    message: format!("Unknown command '{other}'"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        Ok(())
    }

    #[track_caller]
    fn run(&mut self, handle: u32, payload: TextPayload) -> Result<String, RewriteRemoteError> {
        let location = ErrorLocation::from(Location::caller());

        let Some(operation) = self.operations.get(&handle) else {
            return Err(RewriteRemoteError::Worker {
                message: format!("Unknown operation handle #{handle}"),
                location,
            });
        };

        let id = payload.id();
        let text = match payload {
            TextPayload::Full { text, .. } => text,
            TextPayload::Unchanged { id } => match self.documents.get(&id) {
                Some(text) => text.clone(),
                None => {
                    return Err(RewriteRemoteError::Worker {
                        message: format!("No stored copy of document {id}"),
                        location,
                    });
                }
            },
        };

        let result = operation.apply(&text);
        debug!(
            "Ran #{handle} on document {id}: {} -> {} bytes",
            text.len(),
            result.len()
        );
        self.documents.insert(id, result.clone());
        Ok(result)
    }
}

impl Drop for WorkerServer {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.socket);
    }
}

fn respond<T: serde::Serialize + ?Sized>(
    stream: &UnixStream,
    value: &T,
) -> Result<(), RewriteRemoteError> {
    let mut writer = BufWriter::new(stream);
    write_item(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
