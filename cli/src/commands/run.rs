// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Trigger incidents and follow them through the pipeline
//!
//! With no incident fields given, each incident is drawn from the built-in
//! scenario catalog.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use futures::future::try_join_all;
use serde::Serialize;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use triage_core::application::{DashboardStats, WorkflowEngine};
use triage_core::domain::incident::{Incident, IncidentCategory, IncidentSpec, Severity};
use triage_core::domain::scenario::random_scenario;
use triage_core::infrastructure::{EventBusError, EventReceiver};

use super::build_engine;
use crate::output;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of incidents to trigger concurrently
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,

    /// Incident title
    #[arg(long)]
    pub title: Option<String>,

    /// Incident description
    #[arg(long)]
    pub description: Option<String>,

    /// Severity (low, medium, high, critical)
    #[arg(long)]
    pub severity: Option<Severity>,

    /// Category (database, security, network, container, api, infrastructure, application)
    #[arg(long)]
    pub category: Option<IncidentCategory>,

    /// Affected system (repeatable)
    #[arg(long = "system", value_name = "SYSTEM")]
    pub affected_systems: Vec<String>,

    /// Fill missing fields from the scenario catalog
    #[arg(long)]
    pub autofill: bool,

    /// Print final snapshots as JSON instead of a live event stream
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    fn has_incident_fields(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.severity.is_some() || self.category.is_some()
    }

    /// The trigger request for one incident.
    pub fn incident_spec(&self) -> IncidentSpec {
        if !self.has_incident_fields() {
            return random_scenario().to_spec();
        }
        IncidentSpec {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category,
            severity: self.severity,
            affected_systems: self.affected_systems.clone(),
        }
    }
}

#[derive(Serialize)]
struct RunReport {
    incidents: Vec<Incident>,
    dashboard: DashboardStats,
}

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    if args.count == 0 {
        anyhow::bail!("--count must be at least 1");
    }

    let engine = build_engine(config_path, |config| {
        if args.autofill {
            config.spec.workflow.autofill_incident_scenario = true;
        }
    })?;

    let printer = (!args.json).then(|| spawn_printer(engine.subscribe()));

    let mut ids = Vec::with_capacity(args.count);
    for _ in 0..args.count {
        let incident = engine
            .trigger(args.incident_spec())
            .await
            .context("Failed to trigger incident")?;
        info!(incident_id = %incident.id, "Incident queued");
        ids.push(incident.id);
    }

    let incidents = try_join_all(ids.iter().map(|id| engine.wait_for_incident(id)))
        .await
        .context("Failed to collect incident results")?;

    if let Some(printer) = printer {
        printer.abort();
    }
    report(&engine, incidents, args.json).await?;
    engine.shutdown().await;
    Ok(())
}

pub(crate) async fn report(engine: &WorkflowEngine, incidents: Vec<Incident>, json: bool) -> Result<()> {
    let dashboard = engine.dashboard().stats().await;
    if json {
        let report = RunReport { incidents, dashboard };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?
        );
        return Ok(());
    }

    for incident in &incidents {
        output::print_incident(incident);
    }
    output::print_dashboard(&dashboard);

    let failed = incidents.iter().filter(|i| !i.failed_stages.is_empty()).count();
    println!();
    if failed == 0 {
        println!("{}", "✓ All incidents processed".green());
    } else {
        println!("{}", format!("⚠ {failed} incident(s) had failing stages").yellow());
    }
    Ok(())
}

/// Print events as they arrive until the bus closes or the task is aborted.
pub(crate) fn spawn_printer(mut events: EventReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => output::print_event(&event),
                Err(EventBusError::Lagged(n)) => warn!("Event stream skipped {} events", n),
                Err(_) => break,
            }
        }
    })
}
