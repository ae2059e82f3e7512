//! Cache of worker-side operation handles.

use crate::descriptor::{OperationDescriptor, OperationHandle};
use crate::error::RemotingError;
use crate::transport::Transport;

use common::ErrorLocation;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::panic::Location;

use log::{debug, info};

/// Maps descriptors to the handles the current worker issued for them.
///
/// Lookups are exact: descriptors that differ in any parameter value are
/// separate entries. The whole map is dropped whenever the worker's state is
/// known to be gone.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    handles: HashMap<OperationDescriptor, OperationHandle>,
    reset_sent: bool,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `descriptor`, registering it with the worker if needed.
    ///
    /// The first registration after construction or [`invalidate`](Self::invalidate)
    /// sends `reset` first, so a worker left over from an unrelated session
    /// starts from a clean slate. A registration the worker rejects does not
    /// cause a second `reset`.
    ///
    /// # Errors
    ///
    /// - [`RemotingError::OperationLoad`] if `reset` or the registration fail
    ///   in transit. Not retried: a descriptor the worker rejects will not
    ///   succeed on a second attempt.
    /// - [`RemotingError::Protocol`] if the worker's reply is not a handle.
    #[track_caller]
    pub fn load_operation(
        &mut self,
        transport: &Transport,
        descriptor: &OperationDescriptor,
    ) -> Result<OperationHandle, RemotingError> {
        if let Some(handle) = self.handles.get(descriptor) {
            return Ok(*handle);
        }

        let location = ErrorLocation::from(Location::caller());

        if !self.reset_sent {
            transport.reset().map_err(|e| RemotingError::OperationLoad {
                message: format!("Failed to reset worker before registering {descriptor}: {e}"),
                descriptor: descriptor.clone(),
                location,
                source: e,
            })?;
            self.reset_sent = true;
        }

        let handle = transport.load_operation(descriptor).map_err(|e| {
            if e.kind() == ErrorKind::InvalidData {
                RemotingError::Protocol {
                    message: format!("Malformed handle for {descriptor}: {e}"),
                    location,
                }
            } else {
                RemotingError::OperationLoad {
                    message: format!("Failed to register {descriptor}: {e}"),
                    descriptor: descriptor.clone(),
                    location,
                    source: e,
                }
            }
        })?;

        debug!("Registered {descriptor} as {handle}");
        self.handles.insert(descriptor.clone(), handle);
        Ok(handle)
    }

    pub fn get(&self, descriptor: &OperationDescriptor) -> Option<OperationHandle> {
        self.handles.get(descriptor).copied()
    }

    /// Drop every handle; the next load re-sends `reset`.
    pub fn invalidate(&mut self) {
        if !self.handles.is_empty() {
            info!("Discarding {} operation handle(s)", self.handles.len());
        }
        self.handles.clear();
        self.reset_sent = false;
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
