// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Dashboard Query Service
//!
//! Read-only aggregates over the incident registry, context store and
//! message bus, shaped for a status page.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use triage_swarm::{AgentId, MessageBus, MessageStatistics};

use crate::domain::execution::ExecutionStatus;
use crate::domain::incident::{Incident, ResolutionStatus, WorkflowStatus};
use crate::infrastructure::context_store::ContextStore;
use crate::infrastructure::incident_registry::IncidentRegistry;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub executions: usize,
    pub successes: usize,
    pub failures: usize,
    pub skipped: usize,
    /// Successes over finished (success + error) executions.
    pub success_rate: f64,
    pub average_duration_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub active_incidents: usize,
    pub total_incidents: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub resolved: usize,
    pub partially_resolved: usize,
    pub unresolved: usize,
    /// Completed over finished (completed + failed) incidents.
    pub success_rate: f64,
    pub average_resolution_secs: f64,
    pub agents: BTreeMap<AgentId, AgentStats>,
    pub contexts: usize,
    pub average_context_confidence: f64,
    pub messages: MessageStatistics,
}

pub struct DashboardService {
    registry: Arc<IncidentRegistry>,
    contexts: Arc<ContextStore>,
    message_bus: Arc<MessageBus>,
}

impl DashboardService {
    pub fn new(registry: Arc<IncidentRegistry>, contexts: Arc<ContextStore>, message_bus: Arc<MessageBus>) -> Self {
        Self {
            registry,
            contexts,
            message_bus,
        }
    }

    pub async fn stats(&self) -> DashboardStats {
        let active = self.registry.active().await;
        let history = self.registry.history().await;

        let mut stats = DashboardStats {
            active_incidents: active.len(),
            total_incidents: active.len() + history.len(),
            completed: 0,
            failed: 0,
            cancelled: 0,
            resolved: 0,
            partially_resolved: 0,
            unresolved: 0,
            success_rate: 0.0,
            average_resolution_secs: 0.0,
            agents: BTreeMap::new(),
            contexts: 0,
            average_context_confidence: 0.0,
            messages: self.message_bus.statistics(),
        };

        let mut resolution_times = Vec::new();
        for incident in &history {
            match incident.workflow_status {
                WorkflowStatus::Completed => stats.completed += 1,
                WorkflowStatus::Failed => stats.failed += 1,
                WorkflowStatus::Cancelled => stats.cancelled += 1,
                WorkflowStatus::Pending | WorkflowStatus::Running => {}
            }
            match incident.resolution_status {
                ResolutionStatus::Resolved => stats.resolved += 1,
                ResolutionStatus::PartiallyResolved => stats.partially_resolved += 1,
                ResolutionStatus::Unresolved => stats.unresolved += 1,
                ResolutionStatus::Open | ResolutionStatus::Cancelled => {}
            }
            resolution_times.extend(incident.resolution_time_secs());
        }
        stats.success_rate = ratio(stats.completed, stats.completed + stats.failed);
        stats.average_resolution_secs = mean(&resolution_times);
        stats.agents = agent_stats(active.iter().chain(history.iter()));

        let summaries = self.contexts.list_summaries();
        stats.contexts = summaries.len();
        stats.average_context_confidence =
            mean(&summaries.iter().map(|s| s.average_confidence).collect::<Vec<_>>());

        stats
    }
}

fn agent_stats<'a>(incidents: impl Iterator<Item = &'a Incident>) -> BTreeMap<AgentId, AgentStats> {
    let mut agents: BTreeMap<AgentId, AgentStats> = BTreeMap::new();
    let mut durations: BTreeMap<AgentId, Vec<f64>> = BTreeMap::new();

    for execution in incidents.flat_map(|i| i.executions.iter()) {
        let entry = agents.entry(execution.agent_id.clone()).or_default();
        entry.executions += 1;
        match execution.status {
            ExecutionStatus::Success => entry.successes += 1,
            ExecutionStatus::Error => entry.failures += 1,
            ExecutionStatus::Skipped => entry.skipped += 1,
            ExecutionStatus::Idle | ExecutionStatus::Running => {}
        }
        if let Some(ms) = execution.duration_ms {
            durations.entry(execution.agent_id.clone()).or_default().push(ms as f64);
        }
    }

    for (agent_id, entry) in agents.iter_mut() {
        entry.success_rate = ratio(entry.successes, entry.successes + entry.failures);
        entry.average_duration_ms = durations.get(agent_id).map(|d| mean(d)).unwrap_or(0.0);
    }
    agents
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::incident::{IncidentCategory, Severity};
    use serde_json::json;

    async fn finished_incident(registry: &IncidentRegistry, fail_rca: bool) {
        let mut incident = Incident::new("t", "", IncidentCategory::Api, Severity::Low, vec![]);
        incident.start();
        for (agent, ok) in [("monitoring", true), ("rca", !fail_rca)] {
            let agent = AgentId::from(agent);
            incident.begin_stage(agent.clone(), agent.as_str(), json!({}));
            let execution = incident.execution_mut(&agent).unwrap();
            if ok {
                execution.succeed(json!({}), Some(0.9)).unwrap();
            } else {
                execution.fail("boom").unwrap();
            }
            incident.record_stage_outcome(&agent);
        }
        incident.finish(false);
        let id = incident.id.clone();
        registry.register(incident).await.unwrap();
        registry.archive(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_stats_aggregate_outcomes_and_agents() {
        let registry = Arc::new(IncidentRegistry::new());
        finished_incident(&registry, false).await;
        finished_incident(&registry, true).await;
        registry
            .register(Incident::new("live", "", IncidentCategory::Network, Severity::High, vec![]))
            .await
            .unwrap();

        let service = DashboardService::new(registry, Arc::new(ContextStore::default()), Arc::new(MessageBus::new()));
        let stats = service.stats().await;

        assert_eq!(stats.active_incidents, 1);
        assert_eq!(stats.total_incidents, 3);
        assert_eq!((stats.completed, stats.failed), (1, 1));
        assert_eq!((stats.resolved, stats.partially_resolved), (1, 1));
        assert!((stats.success_rate - 0.5).abs() < f64::EPSILON);

        let rca = &stats.agents[&AgentId::from("rca")];
        assert_eq!((rca.executions, rca.successes, rca.failures), (2, 1, 1));
        assert!((rca.success_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.agents[&AgentId::from("monitoring")].success_rate, 1.0);
    }

    #[tokio::test]
    async fn test_empty_dashboard() {
        let service = DashboardService::new(
            Arc::new(IncidentRegistry::new()),
            Arc::new(ContextStore::default()),
            Arc::new(MessageBus::new()),
        );
        let stats = service.stats().await;
        assert_eq!(stats.total_incidents, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert!(stats.agents.is_empty());
    }
}
