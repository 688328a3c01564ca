//! `solorag` command-line entry point.

use std::process::ExitCode;

use clap::Parser;
use solorag_cli::{CliArgs, SoloragCli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    match SoloragCli::execute(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
