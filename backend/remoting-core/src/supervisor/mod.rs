//! Worker lifecycle: resolving the executable, launching the process,
//! probing it until reachable, and tearing it down.
//!
//! The supervisor guarantees that a worker answers at the transport's socket
//! before any command is sent. Once a worker has been seen alive it is not
//! probed again until a failure marks it lost, trading a rare stale "started"
//! for a probe-free fast path on every call.

pub mod endpoint;
pub mod install;
pub mod process;

pub use endpoint::{EmbeddedWorker, WorkerExecutable};
pub use process::WorkerProcess;

use crate::config::TimingConfig;
use crate::error::RemotingError;
use crate::supervisor::install::install_executable;
use crate::transport::Transport;

use common::ErrorLocation;

use std::fs;
use std::io::ErrorKind;
use std::panic::Location;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, info, trace, warn};

/// How [`WorkerSupervisor::ensure_started`] satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Already marked started; nothing was probed.
    AlreadyStarted,

    /// A live worker was found at the socket and adopted without launching.
    Attached,

    /// A new worker process was launched and answered the probe.
    Launched { pid: u32 },
}

/// Keeps exactly one reachable worker behind a socket path.
#[derive(Debug)]
pub struct WorkerSupervisor {
    transport: Transport,
    executable: WorkerExecutable,
    working_directory: PathBuf,
    resolved_executable: Option<PathBuf>,
    process: Option<WorkerProcess>,
    started: bool,
    startup_timeout: Duration,
    probe_interval: Duration,
    shutdown_grace: Duration,
}

impl WorkerSupervisor {
    pub fn new(
        transport: Transport,
        executable: WorkerExecutable,
        working_directory: PathBuf,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            transport,
            executable,
            working_directory,
            resolved_executable: None,
            process: None,
            started: false,
            startup_timeout: timing.startup_timeout(),
            probe_interval: timing.probe_interval(),
            shutdown_grace: timing.shutdown_grace(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// PID of the worker this supervisor launched, if any.
    pub fn owned_pid(&self) -> Option<u32> {
        self.process.as_ref().map(WorkerProcess::pid)
    }

    /// Make sure a worker is reachable.
    ///
    /// 1. Already started: return immediately.
    /// 2. Socket exists and answers `hello`: adopt that worker.
    /// 3. Otherwise remove any stale socket, launch the executable with the
    ///    socket path as its argument, and probe until it answers.
    ///
    /// Probe failures while waiting are treated as "not ready yet".
    ///
    /// # Errors
    ///
    /// - [`RemotingError::WorkerStartup`] if the process cannot be launched,
    ///   exits before accepting connections, or is not reachable within the
    ///   startup timeout.
    /// - [`RemotingError::Install`] if an embedded executable cannot be
    ///   materialized.
    #[track_caller]
    pub fn ensure_started(&mut self) -> Result<StartOutcome, RemotingError> {
        if self.started {
            return Ok(StartOutcome::AlreadyStarted);
        }

        let socket = self.transport.address().to_path_buf();

        if socket.exists() {
            if self.transport.hello() {
                info!("Attached to running worker at {}", socket.display());
                self.started = true;
                return Ok(StartOutcome::Attached);
            }

            warn!("Removing stale worker socket {}", socket.display());
            if let Err(e) = fs::remove_file(&socket) {
                if e.kind() != ErrorKind::NotFound {
                    return Err(RemotingError::WorkerStartup {
                        message: format!(
                            "Failed to remove stale socket {}: {e}",
                            socket.display()
                        ),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }
        }

        // A worker we launched earlier but lost contact with.
        if let Some(previous) = self.process.take() {
            debug!("Retiring unreachable worker {}", previous.pid());
            previous.stop(self.shutdown_grace);
        }

        let executable = self.executable_path()?;
        let mut process = WorkerProcess::launch(&executable, &socket)?;

        if let Err(e) = self.wait_until_reachable(&mut process) {
            warn!(
                "Worker {} did not become reachable, killing it",
                process.pid()
            );
            process.kill();
            return Err(e);
        }

        let pid = process.pid();
        info!("Worker ready at {} (PID: {pid})", socket.display());
        self.process = Some(process);
        self.started = true;

        Ok(StartOutcome::Launched { pid })
    }

    /// Forget that the worker was reachable; the next
    /// [`ensure_started`](Self::ensure_started) probes again.
    pub fn mark_lost(&mut self) {
        if self.started {
            debug!("Marking worker at {} as lost", self.transport.address().display());
        }
        self.started = false;
    }

    /// Stop the owned worker and remove its socket.
    ///
    /// A worker that was attached to rather than launched is left running.
    /// Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.started = false;

        let Some(process) = self.process.take() else {
            return;
        };

        let pid = process.pid();
        if !process.stop(self.shutdown_grace) {
            warn!("Worker {pid} could not be reaped");
        }

        let socket = self.transport.address();
        match fs::remove_file(socket) {
            Ok(()) => debug!("Removed socket {}", socket.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove socket {}: {e}", socket.display()),
        }
    }

    /// Resolve the executable once per supervisor.
    #[track_caller]
    fn executable_path(&mut self) -> Result<PathBuf, RemotingError> {
        if let Some(path) = &self.resolved_executable {
            return Ok(path.clone());
        }

        let path = match &self.executable {
            WorkerExecutable::Path(path) => path.clone(),
            WorkerExecutable::Embedded(worker) => {
                install_executable(worker, &self.working_directory)?
            }
        };

        self.resolved_executable = Some(path.clone());
        Ok(path)
    }

    #[track_caller]
    fn wait_until_reachable(&self, process: &mut WorkerProcess) -> Result<(), RemotingError> {
        let mut backoff = ExponentialBackoff {
            current_interval: self.probe_interval,
            initial_interval: self.probe_interval,
            max_interval: self.probe_interval,
            randomization_factor: 0.0,
            multiplier: 1.0,
            max_elapsed_time: Some(self.startup_timeout),
            ..Default::default()
        };

        debug!(
            "Waiting up to {:?} for worker at {}",
            self.startup_timeout,
            self.transport.address().display()
        );

        loop {
            if self.transport.hello() {
                return Ok(());
            }

            if let Some(status) = process.exit_status() {
                return Err(RemotingError::WorkerStartup {
                    message: format!(
                        "Worker {} exited with {status} before accepting connections",
                        process.pid()
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            match backoff.next_backoff() {
                Some(duration) => {
                    trace!("Worker not ready, retrying after {duration:?}");
                    sleep(duration);
                }
                None => {
                    return Err(RemotingError::WorkerStartup {
                        message: format!(
                            "Worker at {} did not become reachable within {:?}",
                            self.transport.address().display(),
                            self.startup_timeout
                        ),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }
        }
    }
}

impl Drop for WorkerSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
