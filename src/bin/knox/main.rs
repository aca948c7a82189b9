// ABOUTME: Command-line entry point for the Knox client
// ABOUTME: Parses arguments, dispatches subcommands and maps errors to exit codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # knox
//!
//! ```bash
//! # Active and primary version ids of a key
//! knox versions db-password
//!
//! # Every version with its status
//! knox versions -s inactive -v db-password
//! ```
//!
//! Credentials come from `KNOX_USER_AUTH`, `KNOX_MACHINE_AUTH` (with
//! `KNOX_CERT_FILE`/`KNOX_KEY_FILE`), or the token cached by `knox login`.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use knox_client::errors::{AppError, AppResult};
use knox_client::logging;
use tokio::runtime::Builder as RuntimeBuilder;

#[derive(Parser)]
#[command(
    name = "knox",
    about = "Knox secret management client",
    long_about = "Command-line client for the Knox secret management service"
)]
struct Cli {
    /// Knox host and port, overrides KNOX_HOST
    #[arg(long, global = true)]
    host: Option<String>,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Gets the versions for a key
    #[command(
        long_about = "Lists the version ids of a key.\n\n\
                      This requires read access to the key and can use user or machine authentication."
    )]
    Versions {
        /// Minimum state of versions to return: inactive, active or primary [default: active]
        #[arg(short = 's', long = "status", value_name = "STATE")]
        status: Option<String>,

        /// Show the state of each version alongside its id
        #[arg(short = 'v', long)]
        verbose: bool,

        /// Key identifier
        #[arg(value_name = "KEY_IDENTIFIER")]
        key_ids: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("knox: {}: {e}", e.code);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let runtime = RuntimeBuilder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::internal(format!("failed to start runtime: {e}")))?;

    match cli.command {
        Command::Versions {
            status,
            verbose,
            key_ids,
        } => runtime.block_on(commands::versions::run(
            cli.host,
            status.as_deref(),
            verbose,
            &key_ids,
        )),
    }
}
