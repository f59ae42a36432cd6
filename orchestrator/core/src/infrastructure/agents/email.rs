// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Email Agent - Stakeholder Communication
//
// Builds the notification list from category and severity. When the pager
// stage invited it into a coordinated notification, the escalation details
// from that invitation are echoed in the outgoing plan.

use async_trait::async_trait;
use serde_json::{json, Value};

use triage_swarm::{AgentId, MessageType};

use super::simulate_work;
use crate::domain::agent::{Agent, IncidentBrief, Stage, StageInput, StageOutput, StageReporter};
use crate::domain::error::StageFault;
use crate::domain::incident::{IncidentCategory, Severity};
use crate::domain::node_config::LatencyConfig;

pub struct EmailAgent {
    latency: LatencyConfig,
}

impl EmailAgent {
    pub fn new(latency: LatencyConfig) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Agent for EmailAgent {
    fn id(&self) -> AgentId {
        Stage::Email.agent_id()
    }

    fn name(&self) -> String {
        Stage::Email.display_name().to_string()
    }

    fn capabilities(&self) -> Vec<String> {
        Stage::Email.capabilities().iter().map(|c| c.to_string()).collect()
    }

    async fn execute(&self, input: StageInput, reporter: StageReporter) -> Result<StageOutput, StageFault> {
        let incident = &input.incident;
        reporter
            .info(format!("Planning stakeholder communication for {} incident", incident.category))
            .await;
        reporter.progress(25).await;
        simulate_work(self.latency).await;

        let recipients = stakeholders(incident);
        let strategy = communication_strategy(incident.category, incident.severity);
        let coordination: Option<Value> = input
            .inbox_of_type(MessageType::CollaborationRequest)
            .find(|m| m.sender == Stage::Pager.agent_id())
            .map(|m| m.content.get("context").cloned().unwrap_or(Value::Null));

        reporter
            .info(format!("Notifying {} stakeholder groups", recipients.len()))
            .await;
        reporter.progress(65).await;

        let urgent = incident.severity >= Severity::High;
        Ok(StageOutput::new(json!({
            "emails_sent": recipients,
            "communication_strategy": strategy,
            "notification_types": {
                "executive_summary": urgent,
                "technical_details": true,
                "status_updates": true,
                "resolution_timeline": true,
            },
            "coordinated_with_pager": coordination.is_some(),
            "escalation": coordination,
        })))
    }
}

/// Recipients in notification order, without duplicates.
fn stakeholders(incident: &IncidentBrief) -> Vec<String> {
    let mut list = vec![
        format!("{}-team@company.com", incident.category),
        "it-operations@company.com".to_string(),
    ];
    if incident.severity >= Severity::High {
        list.push("management@company.com".into());
        list.push("incident-commander@company.com".into());
    }
    if incident.severity == Severity::Critical {
        list.push("cto@company.com".into());
        list.push("executive-team@company.com".into());
    }
    let by_category: &[&str] = match incident.category {
        IncidentCategory::Security => &["security-team@company.com", "compliance@company.com", "legal@company.com"],
        IncidentCategory::Database => &["dba-team@company.com", "backend-developers@company.com"],
        IncidentCategory::Network => &["network-ops@company.com", "telecom@company.com"],
        IncidentCategory::Container => &["platform-team@company.com", "devops@company.com", "sre@company.com"],
        _ => &[],
    };
    for address in by_category {
        if !list.iter().any(|a| a == address) {
            list.push(address.to_string());
        }
    }
    list
}

fn communication_strategy(category: IncidentCategory, severity: Severity) -> String {
    let base = match category {
        IncidentCategory::Security => "Security incident communication protocol with legal and compliance review",
        IncidentCategory::Database => "Database incident communication with application teams and business stakeholders",
        IncidentCategory::Network => "Network outage communication with all affected teams and external partners",
        IncidentCategory::Infrastructure => "Infrastructure incident communication with service owners and customers",
        IncidentCategory::Container => "Container platform communication with development teams and product owners",
        IncidentCategory::Api | IncidentCategory::Application => "Standard incident communication protocol",
    };
    if severity == Severity::Critical {
        format!("Crisis {base} with executive briefings")
    } else {
        base.to_string()
    }
}
