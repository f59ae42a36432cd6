// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Concurrent incident walkthrough
//!
//! Triggers a database and a security incident side by side, cancels the
//! second one once its root cause analysis completes, and prints both final
//! snapshots together with context and A2A statistics.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{info, warn};

use triage_core::domain::events::IncidentEvent;
use triage_core::domain::incident::IncidentCategory;
use triage_core::domain::node_config::LatencyConfig;
use triage_core::domain::scenario::scenario_for_category;
use triage_core::infrastructure::{DomainEvent, EventBusError};
use triage_core::swarm::AgentId;

use super::build_engine;
use super::run::{report, spawn_printer};

/// Latency applied when the configuration leaves stages instantaneous, so
/// the cancellation lands while the second incident is still running.
const DEMO_LATENCY: LatencyConfig = LatencyConfig { min_ms: 100, max_ms: 300 };

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Stage after which the second incident is cancelled
    #[arg(long, default_value = "rca")]
    pub cancel_after: String,

    /// Print final snapshots as JSON instead of a live event stream
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: DemoArgs, config_path: Option<PathBuf>) -> Result<()> {
    let engine = build_engine(config_path, |config| {
        if config.spec.workflow.simulated_latency.max_ms == 0 {
            config.spec.workflow.simulated_latency = DEMO_LATENCY;
        }
    })?;

    let cancel_after = AgentId::from(args.cancel_after.as_str());
    if !engine.pipeline().iter().any(|(id, _)| *id == cancel_after) {
        anyhow::bail!("'{}' is not a pipeline stage", args.cancel_after);
    }

    let database = scenario_for_category(IncidentCategory::Database).context("No database scenario available")?;
    let security = scenario_for_category(IncidentCategory::Security).context("No security scenario available")?;

    if !args.json {
        println!("{}", "Triggering two concurrent incidents...".bold());
    }
    let mut watcher = engine.subscribe();
    let printer = (!args.json).then(|| spawn_printer(engine.subscribe()));

    let (first, second) = tokio::try_join!(engine.trigger(database.to_spec()), engine.trigger(security.to_spec()))
        .context("Failed to trigger demo incidents")?;
    info!(first = %first.id, second = %second.id, "Demo incidents triggered");

    // Wait for the chosen stage of the second incident, then cancel it.
    loop {
        match watcher.recv().await {
            Ok(DomainEvent::Incident(IncidentEvent::StageCompleted {
                incident_id, agent_id, ..
            }))
            | Ok(DomainEvent::Incident(IncidentEvent::StageFailed {
                incident_id, agent_id, ..
            })) if incident_id == second.id && agent_id == cancel_after => {
                let cancelled = engine.cancel(&second.id).await.context("Failed to cancel incident")?;
                if !args.json {
                    println!(
                        "{}",
                        format!("Cancellation requested for {} (accepted: {cancelled})", second.id).yellow()
                    );
                }
                break;
            }
            Ok(DomainEvent::Incident(IncidentEvent::IncidentFinished { incident_id, .. })) if incident_id == second.id => {
                warn!(incident_id = %incident_id, "Incident finished before it could be cancelled");
                break;
            }
            Ok(_) | Err(EventBusError::Lagged(_)) => continue,
            Err(e) => return Err(e).context("Event stream ended unexpectedly"),
        }
    }

    let (first, second) = tokio::try_join!(
        engine.wait_for_incident(&first.id),
        engine.wait_for_incident(&second.id)
    )
    .context("Failed to collect incident results")?;

    if let Some(printer) = printer {
        printer.abort();
    }
    report(&engine, vec![first, second], args.json).await?;

    if !args.json {
        println!();
        println!("{}", "Contexts:".bold());
        for summary in engine.context_summaries() {
            println!(
                "  {} v{}  {} agents  {} patterns  {} knowledge keys",
                summary.incident_id, summary.version, summary.agent_count, summary.pattern_count, summary.knowledge_keys
            );
        }
        let stats = engine.message_statistics();
        println!();
        println!("{}", "A2A traffic by type:".bold());
        for (message_type, count) in &stats.by_type {
            println!("  {message_type:<24} {count}");
        }
    }

    engine.shutdown().await;
    Ok(())
}
