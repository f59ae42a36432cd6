// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use triage_core::domain::agent::Stage;
use triage_core::domain::node_config::OrchestratorConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./triage-config.yaml)
        #[arg(short, long, default_value = "./triage-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config =
        OrchestratorConfigManifest::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. TRIAGE_CONFIG_PATH: {}",
            std::env::var("TRIAGE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./triage-config.yaml");
        println!("  4. ~/.triage/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Node Identity:".bold());
    println!("  Name: {}", config.metadata.name);
    if let Some(version) = &config.metadata.version {
        println!("  Version: {}", version);
    }
    println!();

    let workflow = &config.spec.workflow;
    println!("{}", "Workflow:".bold());
    println!("  Confidence threshold: {}", workflow.confidence_threshold);
    println!("  Default confidence: {}", workflow.default_confidence);
    println!("  Stage timeout: {:?}", workflow.stage_timeout);
    println!(
        "  Retry: {} attempt(s), {}ms initial backoff, x{} multiplier",
        workflow.retry.max_attempts, workflow.retry.initial_backoff_ms, workflow.retry.backoff_multiplier
    );
    println!("  Autofill incident scenario: {}", workflow.autofill_incident_scenario);
    println!(
        "  Simulated latency: {}-{}ms",
        workflow.simulated_latency.min_ms, workflow.simulated_latency.max_ms
    );
    println!();

    println!("{}", "Pipeline:".bold());
    for (index, stage) in Stage::PIPELINE.iter().enumerate() {
        println!("  {}. {} ({})", index + 1, stage.display_name(), stage.as_str());
    }
    println!();

    let logging = config.logging();
    println!("{}", "Observability:".bold());
    println!("  Event bus capacity: {}", config.spec.event_bus.capacity);
    println!("  Log level: {}", logging.level);
    println!("  Log format: {}", logging.format);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = OrchestratorConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    if with_examples {
        std::fs::write(output, include_str!("../../templates/config-with-examples.yaml"))
            .with_context(|| format!("Failed to write config to {:?}", output))?;
    } else {
        OrchestratorConfigManifest::default()
            .to_yaml_file(output)
            .with_context(|| format!("Failed to write config to {:?}", output))?;
    }

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}
