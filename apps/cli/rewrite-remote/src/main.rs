//! rewrite-remote: run text operations in a long-lived worker process
//!
//! Usage:
//!   rewrite-remote run --operation <name> [--param key=value]... <FILE>...
//!
//! Examples:
//!   rewrite-remote run -o add-property -p key=color -p value=blue app.properties
//!   rewrite-remote run -o echo --worker ./remoting-worker --write notes.txt

use rewrite_remote::logger::initialize as LoggerInitialize;
use rewrite_remote::run::{RunArgs, run};

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;

#[derive(Parser)]
#[command(name = "rewrite-remote")]
#[command(about = "Run text operations in a long-lived worker process")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one operation over each file
    Run(RunArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(&args),
    }
}

fn cmd_run(args: &RunArgs) -> ExitCode {
    if let Err(e) = LoggerInitialize(args.log_dir.as_deref(), args.verbose) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(outcomes) => {
            if !args.write {
                for outcome in &outcomes {
                    print!("{}", outcome.text);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
