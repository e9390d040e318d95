mod cli;
mod commands;
mod config;
mod error;
mod jobs;
mod output;
mod providers;
mod transform;
mod vcs;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use error::{CitError, EXIT_FAILURE};
use log::info;

/// Exit code for a failed run; errors outside [`CitError`] map to a plain
/// failure.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CitError>()
        .map_or(EXIT_FAILURE, CitError::exit_code)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    info!("Starting cit - feature-branch jobs for Jenkins");
    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}
