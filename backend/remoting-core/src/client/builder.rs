use crate::client::RemotingClient;
use crate::config::RemotingConfig;
use crate::error::config::ConfigError;
use crate::supervisor::endpoint::default_socket_path;
use crate::supervisor::{WorkerExecutable, WorkerSupervisor};
use crate::tracker::Snapshot;
use crate::transport::Transport;

use common::ErrorLocation;

use std::panic::Location;
use std::path::PathBuf;

/// Builder for a [`RemotingClient`] session.
///
/// Explicit `with_*` values take precedence over the corresponding
/// [`RemotingConfig`] fields.
#[derive(Debug, Default)]
pub struct RemotingClientBuilder {
    config: Option<RemotingConfig>,
    executable: Option<WorkerExecutable>,
    socket_path: Option<PathBuf>,
}

impl RemotingClientBuilder {
    pub fn with_config(mut self, config: RemotingConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_executable(mut self, executable: WorkerExecutable) -> Self {
        self.executable = Some(executable);
        self
    }

    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    /// Build the session. Nothing is launched or connected until first use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the config is invalid or
    /// no worker executable was given by either the builder or the config.
    #[track_caller]
    pub fn build<D: Snapshot>(self) -> Result<RemotingClient<D>, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let executable = self
            .executable
            .or_else(|| config.worker.executable.clone().map(WorkerExecutable::Path))
            .ok_or_else(|| ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                field: "worker.executable",
                reason: String::from("a worker executable is required"),
            })?;

        let socket_path = self
            .socket_path
            .or_else(|| config.worker.socket_path.clone())
            .unwrap_or_else(default_socket_path);

        let transport = Transport::new(socket_path, config.timing.call_timeout());
        let supervisor = WorkerSupervisor::new(
            transport.clone(),
            executable,
            config.working_directory(),
            &config.timing,
        );

        Ok(RemotingClient::from_parts(transport, supervisor))
    }
}
