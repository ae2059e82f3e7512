use crate::error::RemotingError;

use common::ErrorLocation;

use std::io::{BufRead, BufReader};
use std::panic::Location;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, sleep};
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, info, trace, warn};
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};

const STOP_POLL_INITIAL: Duration = Duration::from_millis(10);
const STOP_POLL_MAX: Duration = Duration::from_millis(200);

/// A worker process this session launched and therefore owns.
#[derive(Debug)]
pub struct WorkerProcess {
    child: Child,
    pid: u32,
}

impl WorkerProcess {
    /// Start `<executable> <socket>`.
    ///
    /// The worker's stderr is forwarded to the log at trace level.
    #[track_caller]
    pub fn launch(executable: &Path, socket: &Path) -> Result<Self, RemotingError> {
        let mut child = Command::new(executable)
            .arg(socket)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RemotingError::WorkerStartup {
                message: format!("Failed to launch {}: {e}", executable.display()),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let pid = child.id();
        info!("Launched worker {} (PID: {pid})", executable.display());

        if let Some(stderr) = child.stderr.take() {
            let forwarder = thread::Builder::new()
                .name(format!("worker-{pid}-stderr"))
                .spawn(move || {
                    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                        trace!("Worker stderr: {line}");
                    }
                });
            if let Err(e) = forwarder {
                warn!("Failed to forward worker stderr: {e}");
            }
        }

        Ok(Self { child, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status if the process has already terminated.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                debug!("Failed to poll worker {}: {e}", self.pid);
                None
            }
        }
    }

    /// Kill immediately and reap.
    pub fn kill(mut self) {
        if let Err(e) = self.child.kill() {
            debug!("Kill of worker {} failed: {e}", self.pid);
        }
        let _ = self.child.wait();
    }

    /// Stop the worker, politely first.
    ///
    /// Sends SIGTERM and waits with exponential backoff for up to `grace`,
    /// then falls back to SIGKILL. Returns `true` once the process has been
    /// reaped.
    pub fn stop(mut self, grace: Duration) -> bool {
        let pid = self.pid;

        if let Some(status) = self.exit_status() {
            debug!("Worker {pid} already exited with {status}");
            return true;
        }

        if send_terminate(pid) {
            let mut backoff = ExponentialBackoff {
                current_interval: STOP_POLL_INITIAL,
                initial_interval: STOP_POLL_INITIAL,
                max_interval: STOP_POLL_MAX,
                max_elapsed_time: Some(grace),
                ..Default::default()
            };

            loop {
                if let Some(status) = self.exit_status() {
                    info!("Worker {pid} stopped with {status}");
                    return true;
                }

                match backoff.next_backoff() {
                    Some(duration) => {
                        trace!("Worker {pid} still alive, retrying after {duration:?}");
                        sleep(duration);
                    }
                    None => {
                        debug!("Worker {pid} still running after {grace:?}");
                        break;
                    }
                }
            }
        }

        warn!("Force killing worker {pid}");
        if let Err(e) = self.child.kill() {
            debug!("Kill of worker {pid} failed: {e}");
        }
        self.child.wait().is_ok()
    }
}

fn send_terminate(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    match sys.process(pid).and_then(|p| p.kill_with(Signal::Term)) {
        Some(sent) => {
            debug!("Sent SIGTERM to worker {pid}: success={sent}");
            sent
        }
        None => {
            debug!("SIGTERM unavailable for worker {pid}");
            false
        }
    }
}
