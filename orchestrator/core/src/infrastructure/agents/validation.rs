// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Validation Agent - Post-Remediation Verification
//
// Last stage. Decides whether the incident is resolved from what the run
// actually produced: it is resolved only when no earlier stage failed and the
// aggregate context confidence reaches the resolution threshold.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use triage_swarm::{AgentId, MessageType};

use super::simulate_work;
use crate::domain::agent::{Agent, Stage, StageInput, StageOutput, StageReporter};
use crate::domain::error::StageFault;
use crate::domain::incident::{IncidentCategory, IncidentFindings};
use crate::domain::node_config::LatencyConfig;
use crate::domain::scenario::title_case;

const CONFIDENCE: f64 = 0.96;

pub struct ValidationAgent {
    latency: LatencyConfig,
    resolution_threshold: f64,
}

impl ValidationAgent {
    pub fn new(latency: LatencyConfig, resolution_threshold: f64) -> Self {
        Self {
            latency,
            resolution_threshold,
        }
    }
}

#[async_trait]
impl Agent for ValidationAgent {
    fn id(&self) -> AgentId {
        Stage::Validation.agent_id()
    }

    fn name(&self) -> String {
        Stage::Validation.display_name().to_string()
    }

    fn capabilities(&self) -> Vec<String> {
        Stage::Validation.capabilities().iter().map(|c| c.to_string()).collect()
    }

    async fn execute(&self, input: StageInput, reporter: StageReporter) -> Result<StageOutput, StageFault> {
        let incident = &input.incident;
        let overall_confidence = input.context.aggregate_confidence;

        reporter
            .info(format!(
                "Validating with context from {} peer stage(s)",
                input.context.peer_insights.len()
            ))
            .await;
        reporter.progress(25).await;
        simulate_work(self.latency).await;

        reporter
            .info(format!("Running {} health verification checks", incident.category))
            .await;
        reporter.progress(75).await;

        let upstream_failures: Vec<&str> = incident.failed_stages.iter().map(|a| a.as_str()).collect();
        let resolved = upstream_failures.is_empty() && overall_confidence >= self.resolution_threshold;
        let remediation_verified = input
            .inbox_of_type(MessageType::CollaborationRequest)
            .any(|m| m.sender == Stage::Remediation.agent_id());

        let kind = title_case(incident.category.as_str());
        let resolution = if resolved {
            format!(
                "{kind} fully resolved with {:.1}% system confidence. Validation passed.",
                overall_confidence * 100.0
            )
        } else {
            format!(
                "{kind} partially resolved, continued monitoring required. System confidence {:.1}%.",
                overall_confidence * 100.0
            )
        };

        let output = StageOutput::new(json!({
            "health_checks": health_checks(incident.category, resolved),
            "incident_resolved": resolved,
            "validation_score": overall_confidence,
            "upstream_failures": upstream_failures,
            "remediation_verified": remediation_verified,
            "resolution_threshold": self.resolution_threshold,
        }))
        .with_confidence(CONFIDENCE)
        .share(
            "final_resolution",
            json!({
                "status": if resolved { "resolved" } else { "partially_resolved" },
                "overall_confidence": overall_confidence,
                "validated_at": Utc::now().to_rfc3339(),
            }),
        )
        .with_findings(IncidentFindings {
            resolution: Some(resolution),
            ..Default::default()
        });

        reporter
            .info(if resolved {
                "Incident fully resolved"
            } else {
                "Incident partially resolved"
            })
            .await;
        Ok(output)
    }
}

fn health_checks(category: IncidentCategory, resolved: bool) -> Value {
    match (category, resolved) {
        (IncidentCategory::Database, true) => json!({
            "connection_pool": "Optimal (420/500 connections)",
            "query_performance": "Baseline restored (<45ms avg)",
            "cpu_utilization": "Normal (42%)",
            "memory_usage": "Stable (58%)",
        }),
        (IncidentCategory::Database, false) => json!({
            "connection_pool": "Elevated usage (465/500)",
            "query_performance": "Improved but monitoring (85ms avg)",
            "cpu_utilization": "Moderate (68%)",
            "memory_usage": "Elevated (74%)",
        }),
        (IncidentCategory::Security, true) => json!({
            "threat_level": "Green (Low Risk)",
            "access_controls": "Active and Verified",
            "monitoring_systems": "Enhanced and Operational",
            "compliance_status": "Compliant",
        }),
        (IncidentCategory::Security, false) => json!({
            "threat_level": "Yellow (Elevated)",
            "access_controls": "Active with Enhanced Monitoring",
            "monitoring_systems": "Enhanced with Continuous Review",
            "compliance_status": "Under Review",
        }),
        (IncidentCategory::Network, true) => json!({
            "latency": "Optimal (6ms avg)",
            "packet_loss": "None (0%)",
            "bandwidth_utilization": "Normal (65%)",
            "redundancy_status": "Active",
        }),
        (IncidentCategory::Container, true) => json!({
            "pod_status": "All Pods Running and Ready",
            "resource_utilization": "Optimal",
            "cluster_health": "Healthy",
            "service_mesh": "Operational",
        }),
        (_, resolved) => json!({
            "overall_status": if resolved { "Healthy" } else { "Monitoring" },
            "performance": if resolved { "Optimal" } else { "Improved" },
        }),
    }
}
