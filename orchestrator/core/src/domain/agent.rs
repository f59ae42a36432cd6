// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Capability
//!
//! A pipeline stage is anything implementing [`Agent`]. Agents are pure with
//! respect to orchestrator state: they read a [`StageInput`] and return a
//! [`StageOutput`] describing the effects they want (context insight, shared
//! knowledge, A2A messages, collaborations, incident findings). The workflow
//! engine applies those effects after the stage succeeds.
//!
//! The only side channel is the [`StageReporter`], which streams progress and
//! log lines into the stage's execution record while it runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

use triage_swarm::{A2AMessage, AgentId, MessagePriority, MessageType};

use crate::domain::error::StageFault;
use crate::domain::execution::LogLevel;
use crate::domain::incident::{
    Incident, IncidentCategory, IncidentFindings, IncidentHandle, IncidentId, Severity,
};
use crate::domain::mcp::{ContextInsights, CorrelationPattern};

// ============================================================================
// Stage catalog
// ============================================================================

/// The seven standard stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Monitoring,
    Rca,
    Pager,
    Ticketing,
    Email,
    Remediation,
    Validation,
}

impl Stage {
    pub const PIPELINE: [Stage; 7] = [
        Self::Monitoring,
        Self::Rca,
        Self::Pager,
        Self::Ticketing,
        Self::Email,
        Self::Remediation,
        Self::Validation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monitoring => "monitoring",
            Self::Rca => "rca",
            Self::Pager => "pager",
            Self::Ticketing => "ticketing",
            Self::Email => "email",
            Self::Remediation => "remediation",
            Self::Validation => "validation",
        }
    }

    pub fn agent_id(&self) -> AgentId {
        AgentId::from(self.as_str())
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Monitoring => "Monitoring Agent",
            Self::Rca => "Root Cause Analysis Agent",
            Self::Pager => "Pager Agent",
            Self::Ticketing => "Ticketing Agent",
            Self::Email => "Email Agent",
            Self::Remediation => "Remediation Agent",
            Self::Validation => "Validation Agent",
        }
    }

    /// Capability tags advertised for A2A discovery.
    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            Self::Monitoring => &["metric_analysis", "anomaly_detection", "system_health_check", "performance_baseline"],
            Self::Rca => &["root_cause_analysis", "pattern_correlation", "dependency_mapping", "failure_prediction"],
            Self::Pager => &["escalation_routing", "stakeholder_notification", "team_coordination", "priority_assessment"],
            Self::Ticketing => &["ticket_classification", "priority_assignment", "workflow_routing", "sla_tracking"],
            Self::Email => &["stakeholder_communication", "status_broadcasting", "executive_reporting", "team_updates"],
            Self::Remediation => &["automated_fixes", "rollback_procedures", "system_recovery", "configuration_management"],
            Self::Validation => &["health_verification", "performance_testing", "compliance_checking", "monitoring_setup"],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Capability
// ============================================================================

#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> AgentId;

    fn name(&self) -> String;

    fn capabilities(&self) -> Vec<String> {
        Vec::new()
    }

    async fn execute(&self, input: StageInput, reporter: StageReporter) -> Result<StageOutput, StageFault>;
}

// ============================================================================
// Input
// ============================================================================

/// Incident fields a stage may read. Execution history is deliberately not
/// part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentBrief {
    pub id: IncidentId,
    pub title: String,
    pub description: String,
    pub category: IncidentCategory,
    pub severity: Severity,
    pub affected_systems: Vec<String>,
    pub findings: IncidentFindings,
    /// Stages that already failed in this run.
    pub failed_stages: Vec<AgentId>,
}

impl From<&Incident> for IncidentBrief {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id.clone(),
            title: incident.title.clone(),
            description: incident.description.clone(),
            category: incident.category,
            severity: incident.severity,
            affected_systems: incident.affected_systems.clone(),
            findings: incident.findings.clone(),
            failed_stages: incident.failed_stages.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageInput {
    pub incident: IncidentBrief,
    pub context: ContextInsights,
    /// Messages drained from this stage's mailbox right before dispatch.
    pub inbox: Vec<A2AMessage>,
    /// 1-based attempt number.
    pub attempt: u32,
}

impl StageInput {
    /// Snapshot recorded as the execution's input.
    pub fn snapshot(&self) -> Value {
        serde_json::json!({
            "incident_id": self.incident.id,
            "attempt": self.attempt,
            "failed_stages": self.incident.failed_stages,
            "context_version": self.context.version,
            "peer_insights": self.context.peer_insights.keys().collect::<Vec<_>>(),
            "shared_knowledge_keys": self.context.shared_knowledge.keys().collect::<Vec<_>>(),
            "aggregate_confidence": self.context.aggregate_confidence,
            "inbox": self.inbox.len(),
        })
    }

    pub fn inbox_of_type(&self, message_type: MessageType) -> impl Iterator<Item = &A2AMessage> {
        self.inbox.iter().filter(move |m| m.message_type == message_type)
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub receiver: AgentId,
    pub message_type: MessageType,
    pub content: Value,
    pub priority: MessagePriority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationProposal {
    pub participants: Vec<AgentId>,
    pub task: String,
    pub context: Value,
}

/// Effects a successful stage asks the engine to apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub payload: Value,
    /// Confidence in `payload`. The engine substitutes its configured
    /// default when absent.
    pub confidence: Option<f64>,
    pub findings: IncidentFindings,
    pub knowledge: Vec<(String, Value)>,
    pub patterns: Vec<CorrelationPattern>,
    pub messages: Vec<OutboundMessage>,
    pub collaborations: Vec<CollaborationProposal>,
}

impl StageOutput {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            ..Default::default()
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_findings(mut self, findings: IncidentFindings) -> Self {
        self.findings = findings;
        self
    }

    pub fn share(mut self, key: impl Into<String>, value: Value) -> Self {
        self.knowledge.push((key.into(), value));
        self
    }

    pub fn pattern(mut self, pattern: CorrelationPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn send(
        mut self,
        receiver: impl Into<AgentId>,
        message_type: MessageType,
        content: Value,
        priority: MessagePriority,
    ) -> Self {
        self.messages.push(OutboundMessage {
            receiver: receiver.into(),
            message_type,
            content,
            priority,
        });
        self
    }

    pub fn collaborate<I, A>(mut self, participants: I, task: impl Into<String>, context: Value) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AgentId>,
    {
        self.collaborations.push(CollaborationProposal {
            participants: participants.into_iter().map(Into::into).collect(),
            task: task.into(),
            context,
        });
        self
    }
}

// ============================================================================
// Reporter
// ============================================================================

/// Live progress and log sink for one running stage.
///
/// Writes land in the stage's `AgentExecution`. They are dropped once the
/// execution is terminal, so a stage that outlives its timeout cannot alter
/// the recorded result.
#[derive(Clone)]
pub struct StageReporter {
    incident: Option<IncidentHandle>,
    agent_id: AgentId,
}

impl StageReporter {
    pub fn new(incident: IncidentHandle, agent_id: AgentId) -> Self {
        Self {
            incident: Some(incident),
            agent_id,
        }
    }

    /// A reporter that records nothing. Useful when driving an agent outside
    /// the engine.
    pub fn detached(agent_id: AgentId) -> Self {
        Self {
            incident: None,
            agent_id,
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub async fn progress(&self, percent: u8) {
        let Some(incident) = &self.incident else {
            return;
        };
        let mut incident = incident.write().await;
        if let Some(execution) = incident.execution_mut(&self.agent_id) {
            execution.set_progress(percent);
        }
    }

    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(agent = %self.agent_id, ?level, "{}", message);
        let Some(incident) = &self.incident else {
            return;
        };
        let mut incident = incident.write().await;
        if let Some(execution) = incident.execution_mut(&self.agent_id) {
            execution.log(level, message);
        }
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message).await;
    }

    pub async fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message).await;
    }
}
