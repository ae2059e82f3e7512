//! The `run` command: one operation over a list of files, one session.

use crate::WORKER_BINARY_NAME;
use crate::document::{TextDocument, run_text_operation};
use crate::error::RewriteRemoteError;
use crate::params::parse_param;

use remoting_core::config::RemotingConfig;
use remoting_core::descriptor::{OperationDescriptor, ParamValue};
use remoting_core::supervisor::WorkerExecutable;
use remoting_core::{RemotingClient, RemotingClientBuilder};

use std::env::current_exe;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use log::{debug, info};

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Operation name, e.g. add-property
    #[arg(short, long)]
    pub operation: String,

    /// Operation parameter as key=value (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    pub params: Vec<(String, ParamValue)>,

    /// Files to run the operation on
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Worker executable (defaults to remoting-worker next to this binary)
    #[arg(long)]
    pub worker: Option<PathBuf>,

    /// Socket path to use instead of the default
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Directory holding remoting.json
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Also write logs to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Write results back instead of printing them
    #[arg(short, long)]
    pub write: bool,

    /// Log at trace level
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    pub fn descriptor(&self) -> OperationDescriptor {
        self.params
            .iter()
            .fold(OperationDescriptor::new(&self.operation), |descriptor, (key, value)| {
                descriptor.with_param(key.clone(), value.clone())
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub text: String,
    pub changed: bool,
}

/// Run the operation over every file. The worker this session launched is
/// stopped before returning.
pub fn run(args: &RunArgs) -> Result<Vec<FileOutcome>, RewriteRemoteError> {
    let config = match &args.config_dir {
        Some(dir) => RemotingConfig::load(dir)?,
        None => RemotingConfig::default(),
    };

    let mut builder = RemotingClientBuilder::default();
    if let Some(executable) = resolve_worker(args, &config)? {
        builder = builder.with_executable(WorkerExecutable::Path(executable));
    }
    if let Some(socket) = &args.socket {
        builder = builder.with_socket_path(socket);
    }
    let client: RemotingClient<TextDocument> = builder.with_config(config).build()?;

    let descriptor = args.descriptor();
    info!(
        "Running {descriptor} on {} file(s) via {}",
        args.files.len(),
        client.socket_path().display()
    );

    let mut outcomes = Vec::with_capacity(args.files.len());
    for (index, path) in args.files.iter().enumerate() {
        let original = fs::read_to_string(path)?;
        let document = TextDocument::new(index as u64, original.as_str());

        let result = run_text_operation(&client, &descriptor, &document)?;
        let changed = result.text() != original;
        debug!("{}: changed={changed}", path.display());

        if args.write && changed {
            fs::write(path, result.text())?;
            info!("Updated {}", path.display());
        }

        outcomes.push(FileOutcome {
            path: path.clone(),
            text: result.into_text(),
            changed,
        });
    }

    client.shutdown();
    Ok(outcomes)
}

/// `--worker`, then the config file, then the binary installed beside this
/// one. `None` leaves the choice to the config.
fn resolve_worker(
    args: &RunArgs,
    config: &RemotingConfig,
) -> Result<Option<PathBuf>, RewriteRemoteError> {
    if let Some(worker) = &args.worker {
        return Ok(Some(worker.clone()));
    }
    if config.worker.executable.is_some() {
        return Ok(None);
    }
    Ok(Some(current_exe()?.with_file_name(WORKER_BINARY_NAME)))
}
