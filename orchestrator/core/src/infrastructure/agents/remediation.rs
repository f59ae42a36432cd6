// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Remediation Agent - Automated Recovery
//
// Applies the runbook for the incident category, extended with the priority
// actions RCA shared over A2A, and asks validation to verify the result.

use async_trait::async_trait;
use serde_json::json;

use triage_swarm::AgentId;

use super::simulate_work;
use crate::domain::agent::{Agent, Stage, StageInput, StageOutput, StageReporter};
use crate::domain::error::StageFault;
use crate::domain::incident::{IncidentCategory, IncidentFindings};
use crate::domain::node_config::LatencyConfig;

const CONFIDENCE: f64 = 0.89;
const FALLBACK_INTELLIGENCE_CONFIDENCE: f64 = 0.8;
/// Upper bound on RCA-suggested actions appended to the runbook.
const MAX_SHARED_ACTIONS: usize = 3;

pub struct RemediationAgent {
    latency: LatencyConfig,
}

impl RemediationAgent {
    pub fn new(latency: LatencyConfig) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Agent for RemediationAgent {
    fn id(&self) -> AgentId {
        Stage::Remediation.agent_id()
    }

    fn name(&self) -> String {
        Stage::Remediation.display_name().to_string()
    }

    fn capabilities(&self) -> Vec<String> {
        Stage::Remediation.capabilities().iter().map(|c| c.to_string()).collect()
    }

    async fn execute(&self, input: StageInput, reporter: StageReporter) -> Result<StageOutput, StageFault> {
        let incident = &input.incident;
        reporter.info("Planning remediation from analysis results").await;
        reporter.progress(20).await;

        let mut actions: Vec<String> = runbook(incident.category).iter().map(|a| a.to_string()).collect();
        let shared_actions: Vec<String> = input
            .context
            .knowledge("shared.rca")
            .and_then(|shared| shared.pointer("/data/priority_actions"))
            .and_then(|v| v.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.as_str().map(str::to_string))
                    .take(MAX_SHARED_ACTIONS)
                    .collect()
            })
            .unwrap_or_default();
        let rca_enhanced = !shared_actions.is_empty();
        for action in shared_actions {
            if !actions.contains(&action) {
                actions.push(action);
            }
        }

        reporter
            .info(format!("Executing {} remediation procedures", actions.len()))
            .await;
        reporter.progress(50).await;
        simulate_work(self.latency).await;

        let intelligence_confidence = input
            .context
            .peer("rca")
            .map(|insight| insight.confidence)
            .unwrap_or(FALLBACK_INTELLIGENCE_CONFIDENCE);

        let output = StageOutput::new(json!({
            "actions_performed": actions,
            "remediation_strategy": strategy(incident.category),
            "automation_level": automation_level(incident.category),
            "rca_enhanced": rca_enhanced,
            "validation_requested": true,
            "intelligence_confidence": intelligence_confidence,
        }))
        .with_confidence(CONFIDENCE)
        .with_findings(IncidentFindings {
            remediation_actions: actions.clone(),
            ..Default::default()
        })
        .collaborate(
            [Stage::Validation.agent_id()],
            "comprehensive_remediation_validation",
            json!({
                "actions_applied": actions,
                "incident_context": {
                    "type": incident.category,
                    "severity": incident.severity,
                    "affected_systems": incident.affected_systems,
                },
                "root_cause": incident.findings.root_cause,
            }),
        );

        Ok(output)
    }
}

fn runbook(category: IncidentCategory) -> &'static [&'static str] {
    match category {
        IncidentCategory::Database => &[
            "connection_pool_scaling_and_optimization",
            "query_performance_analysis_and_tuning",
            "database_replica_failover_activation",
            "connection_cleanup_and_monitoring",
        ],
        IncidentCategory::Security => &[
            "immediate_system_isolation_and_containment",
            "credential_rotation_and_access_review",
            "security_patch_deployment_and_hardening",
            "threat_monitoring_enhancement",
        ],
        IncidentCategory::Network => &[
            "traffic_rerouting_and_load_distribution",
            "redundant_path_activation",
            "network_hardware_replacement",
            "routing_table_optimization",
        ],
        IncidentCategory::Container => &[
            "pod_restart_and_rescheduling",
            "resource_limit_increase_and_optimization",
            "kubernetes_node_scaling",
            "container_image_update_and_security_scan",
        ],
        _ => &[
            "service_restart_and_health_verification",
            "resource_scaling_and_optimization",
            "configuration_review_and_reset",
            "monitoring_enhancement_and_alerting",
        ],
    }
}

fn strategy(category: IncidentCategory) -> &'static str {
    match category {
        IncidentCategory::Database => "Database-first approach with connection optimization and query tuning",
        IncidentCategory::Security => "Security-first containment with immediate isolation and threat mitigation",
        IncidentCategory::Network => "Network-centric approach with traffic rerouting and redundancy activation",
        IncidentCategory::Container => "Container orchestration optimization with resource scaling and health tuning",
        IncidentCategory::Infrastructure => "Infrastructure-wide approach with resource optimization and service recovery",
        _ => "Comprehensive system recovery with monitoring enhancement",
    }
}

fn automation_level(category: IncidentCategory) -> &'static str {
    match category {
        IncidentCategory::Container | IncidentCategory::Api => "high",
        // Security and network changes need an operator in the loop.
        IncidentCategory::Network | IncidentCategory::Security => "low",
        _ => "medium",
    }
}
