// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Ticketing Agent - Service Desk Classification

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use triage_swarm::AgentId;

use super::{escalation_team, id_tail, simulate_work};
use crate::domain::agent::{Agent, Stage, StageInput, StageOutput, StageReporter};
use crate::domain::error::StageFault;
use crate::domain::incident::{IncidentCategory, IncidentFindings, Severity};
use crate::domain::node_config::LatencyConfig;

pub struct TicketingAgent {
    latency: LatencyConfig,
}

impl TicketingAgent {
    pub fn new(latency: LatencyConfig) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Agent for TicketingAgent {
    fn id(&self) -> AgentId {
        Stage::Ticketing.agent_id()
    }

    fn name(&self) -> String {
        Stage::Ticketing.display_name().to_string()
    }

    fn capabilities(&self) -> Vec<String> {
        Stage::Ticketing.capabilities().iter().map(|c| c.to_string()).collect()
    }

    async fn execute(&self, input: StageInput, reporter: StageReporter) -> Result<StageOutput, StageFault> {
        let incident = &input.incident;
        reporter.info("Classifying incident for the service desk").await;
        reporter.progress(35).await;
        simulate_work(self.latency).await;

        let priority = ticket_priority(incident.severity);
        let (category, subcategory) = classification(incident.category);
        reporter
            .info(format!("Classified as {priority} {category} / {subcategory}"))
            .await;
        reporter.progress(80).await;

        let ticket_id = format!(
            "EMCP-{}{}{}",
            incident.category.as_str().to_uppercase(),
            Utc::now().format("%Y%m%d"),
            id_tail(incident.id.short(), 4)
        );

        let output = StageOutput::new(json!({
            "ticket_id": ticket_id,
            "priority": priority,
            "category": category,
            "subcategory": subcategory,
            "assigned_team": escalation_team(incident.category, incident.severity),
            "estimated_resolution": resolution_estimate(incident.category, incident.severity),
            "page_ref": incident.findings.page_ref,
        }))
        .with_findings(IncidentFindings {
            ticket_ref: Some(ticket_id.clone()),
            ..Default::default()
        });

        reporter.info(format!("Ticket {ticket_id} created and assigned")).await;
        Ok(output)
    }
}

fn ticket_priority(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "0 - Emergency",
        Severity::High => "1 - Critical",
        Severity::Medium => "2 - High",
        Severity::Low => "3 - Medium",
    }
}

fn classification(category: IncidentCategory) -> (&'static str, &'static str) {
    match category {
        IncidentCategory::Database => ("Database Services", "Performance Degradation"),
        IncidentCategory::Security => ("Security Incident", "Threat Response"),
        IncidentCategory::Network => ("Network Infrastructure", "Connectivity Issues"),
        IncidentCategory::Infrastructure => ("Infrastructure", "System Outage"),
        IncidentCategory::Container => ("Platform Services", "Container Orchestration"),
        IncidentCategory::Api => ("Application Services", "API Gateway"),
        IncidentCategory::Application => ("General Services", "System Issue"),
    }
}

fn resolution_estimate(category: IncidentCategory, severity: Severity) -> String {
    let base = match category {
        IncidentCategory::Database | IncidentCategory::Application => "2-4 hours",
        IncidentCategory::Security => "1-6 hours (depends on scope)",
        IncidentCategory::Network => "1-3 hours",
        IncidentCategory::Infrastructure => "2-6 hours",
        IncidentCategory::Container | IncidentCategory::Api => "1-2 hours",
    };
    if severity == Severity::Critical {
        format!("{base} (expedited with senior engineers)")
    } else {
        base.to_string()
    }
}
