//! Reference worker for rewrite-remote.
//!
//! Usage:
//!   remoting-worker <socket-path>

use rewrite_remote::logger::initialize as LoggerInitialize;
use rewrite_remote::worker::WorkerServer;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

#[derive(Parser)]
#[command(name = "remoting-worker")]
#[command(about = "Serve rewrite-remote operations on a Unix socket")]
#[command(version)]
struct WorkerCli {
    /// Socket path to listen on
    socket: PathBuf,

    /// Log at trace level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = WorkerCli::parse();

    if let Err(e) = LoggerInitialize(None, cli.verbose) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match WorkerServer::bind(&cli.socket).and_then(WorkerServer::serve) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
