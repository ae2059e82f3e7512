//! The remoting session facade.
//!
//! A [`RemotingClient`] binds one host to one worker. It is constructed once
//! and shared by reference with every call site; all mutable state (the
//! supervisor, the operation registry and the snapshot tracker) sits behind
//! a single mutex so calls are serialized.
//!
//! # Example
//!
//! ```no_run
//! use remoting_core::client::{RemotingClient, RemotingClientBuilder};
//! use remoting_core::descriptor::OperationDescriptor;
//! use remoting_core::supervisor::WorkerExecutable;
//! use remoting_core::tracker::Snapshot;
//! use std::io::{Read, Write};
//!
//! #[derive(Clone, PartialEq)]
//! struct Doc(u32, String);
//!
//! impl Snapshot for Doc {
//!     type Id = u32;
//!     fn snapshot_id(&self) -> u32 {
//!         self.0
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client: RemotingClient<Doc> = RemotingClientBuilder::default()
//!     .with_executable(WorkerExecutable::Path("./remoting-worker".into()))
//!     .build()?;
//!
//! let descriptor = OperationDescriptor::new("echo");
//! let doc = Doc(1, String::from("hello"));
//! let result = client.run_operation(
//!     &descriptor,
//!     &doc,
//!     |sink, _previous| sink.write_all(doc.1.as_bytes()),
//!     |source| {
//!         let mut text = String::new();
//!         source.read_to_string(&mut text)?;
//!         Ok(Doc(1, text))
//!     },
//! )?;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```

mod builder;

pub use builder::RemotingClientBuilder;

use crate::descriptor::{OperationDescriptor, OperationHandle};
use crate::error::RemotingError;
use crate::registry::OperationRegistry;
use crate::supervisor::{StartOutcome, WorkerSupervisor};
use crate::tracker::{Snapshot, StateTracker};
use crate::transport::{ExchangeStats, Transport};

use std::io::{Error as IoError, Read, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

struct SessionState<D: Snapshot> {
    supervisor: WorkerSupervisor,
    registry: OperationRegistry,
    tracker: StateTracker<D>,
    last_exchange: Option<ExchangeStats>,
}

/// Runs remote operations against documents of type `D`.
///
/// Dropping the client stops the worker it launched and removes the socket.
pub struct RemotingClient<D: Snapshot> {
    transport: Transport,
    state: Mutex<SessionState<D>>,
}

impl<D: Snapshot> RemotingClient<D> {
    pub(crate) fn from_parts(transport: Transport, supervisor: WorkerSupervisor) -> Self {
        Self {
            transport,
            state: Mutex::new(SessionState {
                supervisor,
                registry: OperationRegistry::new(),
                tracker: StateTracker::new(),
                last_exchange: None,
            }),
        }
    }

    pub fn socket_path(&self) -> &Path {
        self.transport.address()
    }

    /// Make sure the worker is reachable.
    #[track_caller]
    pub fn ensure_started(&self) -> Result<StartOutcome, RemotingError> {
        let mut state = self.lock();
        Self::start(&mut state)
    }

    /// Handle for `descriptor`, starting the worker and registering the
    /// operation as needed.
    #[track_caller]
    pub fn load_operation(
        &self,
        descriptor: &OperationDescriptor,
    ) -> Result<OperationHandle, RemotingError> {
        let mut state = self.lock();
        Self::start(&mut state)?;

        let loaded = state.registry.load_operation(&self.transport, descriptor);
        if let Err(e) = &loaded {
            Self::recover(&mut state, e);
        }
        loaded
    }

    /// Run `descriptor` against `document` in the worker.
    ///
    /// `encode` receives the connection's write side and the snapshot the
    /// worker already holds for this document, or `None` when the whole
    /// document must be sent. `decode` reads the result from the read side.
    /// The result becomes the tracked snapshot only after the full round
    /// trip succeeds.
    ///
    /// # Errors
    ///
    /// Any [`RemotingError`]. A failure that means the worker is gone also
    /// clears the registry and tracker and marks the worker for re-probing,
    /// so the next call starts over with a full transmission.
    #[track_caller]
    pub fn run_operation<E, F>(
        &self,
        descriptor: &OperationDescriptor,
        document: &D,
        encode: E,
        decode: F,
    ) -> Result<D, RemotingError>
    where
        E: FnOnce(&mut dyn Write, Option<&D>) -> Result<(), IoError>,
        F: FnOnce(&mut dyn Read) -> Result<D, IoError>,
    {
        let mut state = self.lock();
        Self::start(&mut state)?;

        let previous = state.tracker.prior_for(document);

        let handle = match state.registry.load_operation(&self.transport, descriptor) {
            Ok(handle) => handle,
            Err(e) => {
                Self::recover(&mut state, &e);
                return Err(e);
            }
        };

        match self
            .transport
            .run_operation(handle, previous.as_ref(), encode, decode)
        {
            Ok((result, stats)) => {
                debug!(
                    "Ran {descriptor} via {handle}: {} payload, {} bytes sent, {} bytes received",
                    if stats.incremental { "incremental" } else { "full" },
                    stats.bytes_sent,
                    stats.bytes_received
                );
                state.tracker.record(&result);
                state.last_exchange = Some(stats);
                Ok(result)
            }
            Err(e) => {
                // The payload may have reached the worker partially.
                state.tracker.forget(&document.snapshot_id());
                Self::recover(&mut state, &e);
                Err(e)
            }
        }
    }

    /// Discard every registered handle and tracked snapshot.
    ///
    /// The next registration re-sends `reset` to the worker.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.registry.invalidate();
        state.tracker.clear();
    }

    /// Stop the worker this session launched and forget all remote state.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.supervisor.shutdown();
        state.registry.invalidate();
        state.tracker.clear();
    }

    /// Statistics of the most recent successful `run-operation`.
    pub fn last_exchange(&self) -> Option<ExchangeStats> {
        self.lock().last_exchange
    }

    /// The snapshot currently believed to be held by the worker.
    pub fn tracked_snapshot(&self, id: &D::Id) -> Option<D> {
        self.lock().tracker.get(id).cloned()
    }

    pub fn registered_operations(&self) -> usize {
        self.lock().registry.len()
    }

    pub fn owned_worker_pid(&self) -> Option<u32> {
        self.lock().supervisor.owned_pid()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState<D>> {
        // Every mutation leaves the state consistent, so a panic elsewhere
        // does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[track_caller]
    fn start(state: &mut SessionState<D>) -> Result<StartOutcome, RemotingError> {
        let outcome = state.supervisor.ensure_started()?;
        if let StartOutcome::Launched { .. } = outcome {
            // A fresh process holds no operations and no documents.
            state.registry.invalidate();
            state.tracker.clear();
        }
        Ok(outcome)
    }

    fn recover(state: &mut SessionState<D>, error: &RemotingError) {
        if !error.is_connection_loss() {
            return;
        }

        warn!("Lost contact with worker: {error}");
        state.supervisor.mark_lost();
        state.registry.invalidate();
        state.tracker.clear();
    }
}
