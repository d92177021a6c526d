// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stratum: deploy generated infrastructure code

mod color;
mod commands;
mod exit_error;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use stratum_engine::Config;
use tracing_subscriber::EnvFilter;

use commands::deploy::DeployArgs;
use commands::state::StateArgs;
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "stratum",
    version,
    about = "Plan and apply generated Terraform, Bicep and CloudFormation code",
    styles = color::styles()
)]
struct Cli {
    /// Config file (defaults to $STRATUM_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State store snapshot to load and save
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a deployment and wait for it to settle
    Deploy(DeployArgs),
    /// Inspect and edit saved infrastructure state
    State(StateArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STRATUM_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };
    let state_file = cli.state_file.as_deref();

    match command {
        Commands::Deploy(args) => {
            let config = Config::load(cli.config.as_deref())?;
            commands::deploy::handle(&args, &config, state_file, cli.output).await
        }
        Commands::State(args) => commands::state::handle(&args.command, state_file, cli.output),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        if let Some(exit) = e.downcast_ref::<ExitError>() {
            eprintln!("error: {}", exit.message);
            std::process::exit(exit.code);
        }
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
