// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Root Cause Analysis Agent
//
// Names the root cause from the scenario catalog when the incident matches a
// known failure mode. Confidence rises when earlier stages left usable
// insights in the shared context. For incident classes with a clear
// containment path the findings are pushed straight to remediation,
// validation and paging.

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;

use triage_swarm::{AgentId, MessagePriority, MessageType};

use super::simulate_work;
use crate::domain::agent::{Agent, Stage, StageInput, StageOutput, StageReporter};
use crate::domain::error::StageFault;
use crate::domain::incident::{IncidentCategory, IncidentFindings};
use crate::domain::mcp::CorrelationPattern;
use crate::domain::node_config::LatencyConfig;
use crate::domain::scenario::{scenario_by_title, title_case};

const PEER_BOOST: f64 = 0.18;
const MAX_CONFIDENCE: f64 = 0.99;

pub struct RcaAgent {
    latency: LatencyConfig,
}

impl RcaAgent {
    pub fn new(latency: LatencyConfig) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Agent for RcaAgent {
    fn id(&self) -> AgentId {
        Stage::Rca.agent_id()
    }

    fn name(&self) -> String {
        Stage::Rca.display_name().to_string()
    }

    fn capabilities(&self) -> Vec<String> {
        Stage::Rca.capabilities().iter().map(|c| c.to_string()).collect()
    }

    async fn execute(&self, input: StageInput, reporter: StageReporter) -> Result<StageOutput, StageFault> {
        let incident = &input.incident;
        let peers: Vec<AgentId> = input.context.peer_insights.keys().cloned().collect();

        reporter.info("Correlating incident signals across peer insights").await;
        reporter.progress(20).await;
        simulate_work(self.latency).await;

        if !peers.is_empty() {
            reporter
                .info(format!("Using insights from {} peer stage(s)", peers.len()))
                .await;
            reporter.progress(40).await;
        }

        let root_cause = match scenario_by_title(&incident.title) {
            Some(scenario) => scenario.root_cause.to_string(),
            None => format!(
                "{} issue requiring comprehensive investigation",
                title_case(incident.category.as_str())
            ),
        };
        let confidence = analysis_confidence(!peers.is_empty());

        let mut output = StageOutput::new(json!({
            "root_cause": root_cause,
            "confidence": confidence,
            "analysis_depth": "comprehensive",
            "used_peer_insights": !peers.is_empty(),
            "context_confidence": input.context.aggregate_confidence,
        }))
        .with_confidence(confidence)
        .with_findings(IncidentFindings {
            root_cause: Some(root_cause.clone()),
            ..Default::default()
        });

        if !peers.is_empty() {
            let mut contributors = peers;
            contributors.push(self.id());
            output = output.pattern(CorrelationPattern::new(
                format!("{}_root_cause_correlation", incident.category),
                root_cause.clone(),
                contributors,
                confidence,
            ));
        }

        if shares_findings(incident.category) {
            let findings = json!({
                "root_cause_summary": root_cause,
                "confidence_score": confidence,
                "priority_actions": ["immediate_containment", "system_stabilization", "performance_optimization"],
            });
            for receiver in [Stage::Remediation, Stage::Validation, Stage::Pager] {
                output = output.send(
                    receiver.agent_id(),
                    MessageType::DataShare,
                    json!({ "data": findings.clone(), "confidence": confidence }),
                    MessagePriority::High,
                );
            }
        }

        reporter
            .info(format!("Root cause identified with {:.1}% confidence", confidence * 100.0))
            .await;
        Ok(output)
    }
}

fn analysis_confidence(with_peers: bool) -> f64 {
    let base = rand::rng().random_range(0.87..0.97);
    let boost = if with_peers { PEER_BOOST } else { 0.0 };
    (base + boost).min(MAX_CONFIDENCE)
}

fn shares_findings(category: IncidentCategory) -> bool {
    matches!(
        category,
        IncidentCategory::Security | IncidentCategory::Database | IncidentCategory::Network | IncidentCategory::Container
    )
}
