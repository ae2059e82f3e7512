//! Test helpers for remoting integration tests.
//!
//! - An in-process fake worker listening on a socket in a temp directory,
//!   recording every command it receives
//! - A small document type and codec the fake understands
//! - Shell-script workers for startup failure modes

use remoting_core::config::RemotingConfig;
use remoting_core::descriptor::{OperationDescriptor, ParamValue};
use remoting_core::protocol::{commands, read_item, write_item};
use remoting_core::supervisor::WorkerExecutable;
use remoting_core::tracker::Snapshot;
use remoting_core::{RemotingClient, RemotingClientBuilder, RemotingError};

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufReader, BufWriter, Result as IoResult, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

/// Executable that does not exist; used where launching must never happen.
pub const MISSING_EXECUTABLE: &str = "/nonexistent/remoting-worker";

/// Load names the fake answers without a usable handle.
pub const REJECTED_OPERATION: &str = "reject";
pub const GARBLED_OPERATION: &str = "garbled";

/// Upper bound for waiting on requests that get no reply.
const RECORD_TIMEOUT: Duration = Duration::from_secs(5);

/// What the fake worker saw, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Hello,
    Reset,
    Load {
        name: String,
        params: BTreeMap<String, ParamValue>,
        handle: u32,
    },
    Run {
        handle: u32,
        incremental: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestDoc {
    pub id: u32,
    pub text: String,
}

impl TestDoc {
    pub fn new(id: u32, text: &str) -> Self {
        Self {
            id,
            text: text.to_string(),
        }
    }
}

impl Snapshot for TestDoc {
    type Id = u32;

    fn snapshot_id(&self) -> u32 {
        self.id
    }
}

/// Payload the test codec writes after the handle.
#[derive(Debug, Serialize, Deserialize)]
pub enum Payload {
    Full { id: u32, text: String },
    Unchanged { id: u32 },
}

#[derive(Default)]
struct WorkerState {
    requests: Vec<Request>,
    operations: HashMap<u32, (String, BTreeMap<String, ParamValue>)>,
    documents: HashMap<u32, String>,
    next_handle: u32,
}

/// Worker state plus a signal raised whenever a request is handled.
#[derive(Default)]
struct Shared {
    state: Mutex<WorkerState>,
    handled: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, WorkerState> {
        self.state.lock().expect("fake worker state")
    }
}

/// A worker living on a background thread of the test process.
pub struct FakeWorker {
    socket: PathBuf,
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FakeWorker {
    /// Bind `socket` and start serving. The socket exists when this returns.
    pub fn start(socket: &Path) -> Self {
        let listener = UnixListener::bind(socket).expect("Failed to bind fake worker socket");
        let shared = Arc::new(Shared::default());
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let shared = Arc::clone(&shared);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Ok(stream) = stream {
                        let _ = serve(stream, &shared);
                        shared.handled.notify_all();
                    }
                }
            })
        };

        Self {
            socket: socket.to_path_buf(),
            shared,
            stop,
            thread: Some(thread),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.shared.lock().requests.clone()
    }

    /// Block until at least `count` requests were recorded.
    ///
    /// `hello` and `reset` get no reply, so the client returns before the
    /// fake has seen them.
    pub fn wait_for_requests(&self, count: usize) -> Vec<Request> {
        let (state, timeout) = self
            .shared
            .handled
            .wait_timeout_while(self.shared.lock(), RECORD_TIMEOUT, |state| {
                state.requests.len() < count
            })
            .expect("fake worker state");
        assert!(
            !timeout.timed_out(),
            "Fake worker saw {} request(s), expected {count}",
            state.requests.len()
        );
        state.requests.clone()
    }

    pub fn count(&self, predicate: fn(&Request) -> bool) -> usize {
        self.requests().iter().filter(|r| predicate(r)).count()
    }

    pub fn hellos(&self) -> usize {
        self.count(|r| matches!(r, Request::Hello))
    }

    pub fn resets(&self) -> usize {
        self.count(|r| matches!(r, Request::Reset))
    }

    pub fn loads(&self) -> usize {
        self.count(|r| matches!(r, Request::Load { .. }))
    }

    pub fn runs(&self) -> Vec<(u32, bool)> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Run {
                    handle,
                    incremental,
                } => Some((handle, incremental)),
                _ => None,
            })
            .collect()
    }

    /// Stop serving and remove the socket, as if the worker had crashed.
    pub fn kill(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Wake the accept loop.
        let _ = UnixStream::connect(&self.socket);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        let _ = fs::remove_file(&self.socket);
    }
}

impl Drop for FakeWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve(stream: UnixStream, shared: &Shared) -> IoResult<()> {
    let mut reader = BufReader::new(&stream);
    let command: String = read_item(&mut reader)?;
    let mut state = shared.lock();

    match command.as_str() {
        commands::HELLO => state.requests.push(Request::Hello),
        commands::RESET => {
            state.requests.push(Request::Reset);
            state.operations.clear();
        }
        commands::LOAD_OPERATION => {
            let name: String = read_item(&mut reader)?;
            let params: BTreeMap<String, ParamValue> = read_item(&mut reader)?;
            if name == REJECTED_OPERATION {
                // Hang up without a handle.
                return Ok(());
            }
            if name == GARBLED_OPERATION {
                let mut writer = BufWriter::new(&stream);
                write_item(&mut writer, "not-a-handle")?;
                return writer.flush();
            }

            state.next_handle += 1;
            let handle = state.next_handle;
            state.requests.push(Request::Load {
                name: name.clone(),
                params: params.clone(),
                handle,
            });
            state.operations.insert(handle, (name, params));

            let mut writer = BufWriter::new(&stream);
            write_item(&mut writer, &handle)?;
            writer.flush()?;
        }
        commands::RUN_OPERATION => {
            let handle: u32 = read_item(&mut reader)?;
            let payload: Payload = read_item(&mut reader)?;
            let Some((_, params)) = state.operations.get(&handle).cloned() else {
                return Ok(());
            };

            let (id, text, incremental) = match payload {
                Payload::Full { id, text } => (id, text, false),
                Payload::Unchanged { id } => match state.documents.get(&id) {
                    Some(text) => (id, text.clone(), true),
                    None => return Ok(()),
                },
            };
            state.requests.push(Request::Run {
                handle,
                incremental,
            });

            let result = match params.get("suffix") {
                Some(ParamValue::Text(suffix)) => format!("{text}{suffix}"),
                _ => text,
            };
            state.documents.insert(id, result.clone());

            let mut writer = BufWriter::new(&stream);
            write_item(&mut writer, &result)?;
            writer.flush()?;
        }
        _ => {}
    }

    Ok(())
}

/// Timing short enough for tests that expect startup to fail.
pub fn fast_config() -> RemotingConfig {
    let mut config = RemotingConfig::default();
    config.timing.startup_timeout_ms = 300;
    config.timing.probe_interval_ms = 10;
    config.timing.shutdown_grace_ms = 200;
    config.timing.call_timeout_ms = Some(5_000);
    config
}

/// A client bound to `socket` that can never launch a worker itself.
pub fn attach_client(socket: &Path) -> RemotingClient<TestDoc> {
    RemotingClientBuilder::default()
        .with_config(fast_config())
        .with_executable(WorkerExecutable::Path(PathBuf::from(MISSING_EXECUTABLE)))
        .with_socket_path(socket)
        .build()
        .expect("Failed to build client")
}

/// Temp dir plus a socket path inside it.
pub fn socket_in_tempdir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let socket = dir.path().join("worker.sock");
    (dir, socket)
}

pub fn append(suffix: &str) -> OperationDescriptor {
    OperationDescriptor::new("append").with_param("suffix", suffix)
}

/// Run `descriptor` through the test codec, recording whether the encoder
/// was handed a prior snapshot.
pub fn run(
    client: &RemotingClient<TestDoc>,
    descriptor: &OperationDescriptor,
    doc: &TestDoc,
) -> (Result<TestDoc, RemotingError>, Option<TestDoc>) {
    let id = doc.id;
    let mut seen_prior = None;

    let result = client.run_operation(
        descriptor,
        doc,
        |sink, previous| {
            seen_prior = previous.cloned();
            let payload = match previous {
                Some(_) => Payload::Unchanged { id },
                None => Payload::Full {
                    id,
                    text: doc.text.clone(),
                },
            };
            write_item(sink, &payload)
        },
        |source| {
            let text: String = read_item(source)?;
            Ok(TestDoc { id, text })
        },
    );

    (result, seen_prior)
}

/// Write an executable shell script into `dir`.
pub fn script_worker(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to mark script executable");
    path
}
