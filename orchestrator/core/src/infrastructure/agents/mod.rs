// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Standard Pipeline Agents
//
// Built-in implementations of the seven triage stages. They simulate their
// integrations (paging, ticketing, email) and produce deterministic lookups
// keyed by incident category and severity, with a configurable artificial
// delay standing in for real work.

pub mod email;
pub mod monitoring;
pub mod pager;
pub mod rca;
pub mod remediation;
pub mod ticketing;
pub mod validation;

pub use email::EmailAgent;
pub use monitoring::MonitoringAgent;
pub use pager::PagerAgent;
pub use rca::RcaAgent;
pub use remediation::RemediationAgent;
pub use ticketing::TicketingAgent;
pub use validation::ValidationAgent;

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::agent::Agent;
use crate::domain::incident::{IncidentCategory, Severity};
use crate::domain::node_config::WorkflowConfig;

/// The seven standard agents in pipeline order.
pub fn standard_pipeline(config: &WorkflowConfig) -> Vec<Arc<dyn Agent>> {
    let latency = config.simulated_latency;
    vec![
        Arc::new(MonitoringAgent::new(latency)),
        Arc::new(RcaAgent::new(latency)),
        Arc::new(PagerAgent::new(latency)),
        Arc::new(TicketingAgent::new(latency)),
        Arc::new(EmailAgent::new(latency)),
        Arc::new(RemediationAgent::new(latency)),
        Arc::new(ValidationAgent::new(latency, config.confidence_threshold)),
    ]
}

/// Sleep for a random duration within the configured latency window.
pub(crate) async fn simulate_work(latency: crate::domain::node_config::LatencyConfig) {
    if latency.max_ms == 0 {
        return;
    }
    let millis = if latency.min_ms >= latency.max_ms {
        latency.max_ms
    } else {
        rand::rng().random_range(latency.min_ms..=latency.max_ms)
    };
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

/// Owning team for a category, prefixed by seniority for urgent incidents.
pub(crate) fn escalation_team(category: IncidentCategory, severity: Severity) -> String {
    let team = match category {
        IncidentCategory::Database => "Database Engineering",
        IncidentCategory::Security => "Security Operations Center",
        IncidentCategory::Network => "Network Operations Team",
        IncidentCategory::Infrastructure => "Infrastructure Engineering",
        IncidentCategory::Container => "Platform Engineering",
        IncidentCategory::Api => "API Platform Team",
        IncidentCategory::Application => "General Operations",
    };
    match severity {
        Severity::Critical => format!("Senior {team} + Management"),
        Severity::High => format!("Senior {team}"),
        _ => team.to_string(),
    }
}

/// Last `n` characters of an incident id's random segment.
pub(crate) fn id_tail(short: &str, n: usize) -> &str {
    let count = short.chars().count();
    let start = short
        .char_indices()
        .nth(count.saturating_sub(n))
        .map_or(short.len(), |(i, _)| i);
    &short[start..]
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::agent::{IncidentBrief, Stage, StageInput, StageReporter};
    use crate::domain::incident::{Incident, IncidentCategory, Severity};
    use crate::domain::mcp::MCPContext;
    use serde_json::json;
    use triage_swarm::AgentId;

    /// Input for `stage` on a fresh incident, with `peers` already recorded
    /// in its context as `(agent, confidence)`.
    pub fn input(
        stage: Stage,
        category: IncidentCategory,
        severity: Severity,
        title: &str,
        peers: &[(&str, f64)],
    ) -> StageInput {
        let incident = Incident::new(title, "", category, severity, vec!["svc-a".into()]);
        let mut context = MCPContext::new(incident.id.clone());
        for (agent, confidence) in peers {
            context.update_insight(AgentId::from(*agent), json!({"from": agent}), *confidence);
        }
        StageInput {
            incident: IncidentBrief::from(&incident),
            context: context.insights_for(&stage.agent_id(), 0.7),
            inbox: vec![],
            attempt: 1,
        }
    }

    pub fn reporter(stage: Stage) -> StageReporter {
        StageReporter::detached(stage.agent_id())
    }
}
