// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the triage CLI

pub mod config;
pub mod demo;
pub mod run;

pub use self::config::ConfigCommand;
pub use self::demo::DemoArgs;
pub use self::run::RunArgs;

use anyhow::{Context, Result};
use std::path::PathBuf;

use triage_core::application::WorkflowEngine;
use triage_core::domain::node_config::OrchestratorConfigManifest;

/// Load and validate configuration, letting `adjust` tweak it before the
/// engine is built.
pub(crate) fn build_engine(
    config_path: Option<PathBuf>,
    adjust: impl FnOnce(&mut OrchestratorConfigManifest),
) -> Result<WorkflowEngine> {
    let mut config = OrchestratorConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    adjust(&mut config);
    config
        .validate()
        .context("Configuration validation failed")?;
    WorkflowEngine::from_config(&config).context("Failed to start workflow engine")
}
