// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Pager Agent - Escalation Routing
//
// Picks the escalation team and on-call engineer, raises a page, and opens a
// notification collaboration with the email stage so paging and stakeholder
// mail go out with the same details.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use serde_json::json;

use triage_swarm::AgentId;

use super::{escalation_team, id_tail, simulate_work};
use crate::domain::agent::{Agent, Stage, StageInput, StageOutput, StageReporter};
use crate::domain::error::StageFault;
use crate::domain::incident::{IncidentCategory, IncidentFindings, Severity};
use crate::domain::node_config::LatencyConfig;

pub struct PagerAgent {
    latency: LatencyConfig,
}

impl PagerAgent {
    pub fn new(latency: LatencyConfig) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Agent for PagerAgent {
    fn id(&self) -> AgentId {
        Stage::Pager.agent_id()
    }

    fn name(&self) -> String {
        Stage::Pager.display_name().to_string()
    }

    fn capabilities(&self) -> Vec<String> {
        Stage::Pager.capabilities().iter().map(|c| c.to_string()).collect()
    }

    async fn execute(&self, input: StageInput, reporter: StageReporter) -> Result<StageOutput, StageFault> {
        let incident = &input.incident;
        reporter
            .info(format!("Evaluating escalation policy for {} incident", incident.category))
            .await;
        reporter.progress(30).await;
        simulate_work(self.latency).await;

        let team = escalation_team(incident.category, incident.severity);
        let engineer = on_call_engineer(incident.category, incident.severity);
        reporter
            .info(format!("Escalating to {team}, assigning {engineer}"))
            .await;
        reporter.progress(70).await;

        let page_id = format!(
            "PD-{}-{}",
            incident.category.as_str().to_uppercase(),
            id_tail(incident.id.short(), 6)
        );
        let rca_briefed = input.context.knowledge("shared.rca").is_some();

        let output = StageOutput::new(json!({
            "page_id": page_id,
            "escalated_to": team,
            "assigned_engineer": engineer,
            "notification_channels": ["PagerDuty", "Email", "Slack", "SMS"],
            "escalation_policy": format!("{}_escalation_v2", incident.category),
            "rca_briefed": rca_briefed,
        }))
        .with_findings(IncidentFindings {
            page_ref: Some(page_id.clone()),
            ..Default::default()
        })
        .collaborate(
            [Stage::Email.agent_id()],
            "coordinated_stakeholder_notification",
            json!({
                "escalation_team": team,
                "assigned_engineer": engineer,
                "incident_details": {
                    "type": incident.category,
                    "severity": incident.severity,
                    "title": incident.title,
                    "affected_systems": incident.affected_systems,
                },
            }),
        );

        reporter.info(format!("Page {page_id} raised")).await;
        Ok(output)
    }
}

fn on_call_engineer(category: IncidentCategory, severity: Severity) -> String {
    let roster: &[&str] = match category {
        IncidentCategory::Database => &["Sarah Chen (DB Architect)", "Marcus Rodriguez (Sr. DBA)", "Priya Patel (DB Performance)"],
        IncidentCategory::Security => &["Alex Thompson (Security Lead)", "Jordan Kim (Incident Response)", "Riley Foster (Threat Analysis)"],
        IncidentCategory::Network => &["David Wilson (Network Architect)", "Maya Singh (Sr. Network Engineer)", "Chris Anderson (NOC Lead)"],
        IncidentCategory::Infrastructure => &["Sam Parker (Infrastructure Lead)", "Jessica Liu (Cloud Architect)", "Tyler Brown (SRE)"],
        IncidentCategory::Container => &["Morgan Davis (K8s Expert)", "Casey Johnson (Platform Lead)", "Avery Taylor (DevOps)"],
        IncidentCategory::Api | IncidentCategory::Application => {
            &["Jamie Smith (Sr. Engineer)", "Taylor Jones (Operations)", "Cameron Lee (Specialist)"]
        }
    };
    let engineer = roster.choose(&mut rand::rng()).copied().unwrap_or("On-call Engineer");
    if severity == Severity::Critical {
        format!("{engineer} + Backup Engineer")
    } else {
        engineer.to_string()
    }
}
