// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Triage Orchestrator CLI
//!
//! The `triage` binary runs the incident workflow engine in-process.
//!
//! ## Commands
//!
//! - `triage run` - Trigger one or more incidents and watch them run
//! - `triage demo` - Two concurrent incidents, one of them cancelled mid-flight
//! - `triage config show|validate|generate` - Configuration management
//!
//! Logging goes to stderr so `--json` output on stdout stays machine-readable.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use triage_core::domain::node_config::OrchestratorConfigManifest;
use triage_orchestrator::commands::{self, ConfigCommand, DemoArgs, RunArgs};

/// Triage Orchestrator - Multi-agent incident response
#[derive(Parser)]
#[command(name = "triage")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "TRIAGE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (text, json). Defaults to the configured format.
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger incidents and follow them through the pipeline
    #[command(name = "run")]
    Run(RunArgs),

    /// Run the concurrent incident and cancellation walkthrough
    #[command(name = "demo")]
    Demo(DemoArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings come from the config file unless overridden on the
    // command line. A broken config is reported by the command itself.
    let logging = OrchestratorConfigManifest::load_or_default(cli.config.clone())
        .map(|c| c.logging())
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(logging.level);
    let format = cli.log_format.clone().unwrap_or(logging.format);
    init_logging(&level, &format)?;
    debug!(level = %level, format = %format, "Logging initialized");

    match cli.command {
        Some(Commands::Run(args)) => commands::run::execute(args, cli.config).await,
        Some(Commands::Demo(args)) => commands::demo::execute(args, cli.config).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
