// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Incident Aggregate
//!
//! The unit of work driven through the pipeline. An [`Incident`] owns its
//! ordered [`AgentExecution`] records and the stage bookkeeping lists; the
//! workflow engine is the only writer.
//!
//! ## Lifecycle
//!
//! ```text
//! pending ──start()──▶ running ──finish(false)──▶ completed | failed
//!                         │
//!                         └─────finish(true)──▶ cancelled
//! ```
//!
//! Once terminal, an incident is archived into history and never mutated again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use triage_swarm::{AgentId, CollaborationId};

use crate::domain::execution::{AgentExecution, ExecutionId, ExecutionStatus};
use crate::domain::mcp::ContextId;

// ============================================================================
// Identity
// ============================================================================

/// Opaque incident identifier of the form `INC-<unix seconds>-<8 hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(String);

impl IncidentId {
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "INC-{}-{}",
            Utc::now().timestamp(),
            suffix[..8].to_uppercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing random segment, used to derive external reference numbers.
    pub fn short(&self) -> &str {
        self.0.rsplit('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IncidentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for IncidentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    Database,
    Security,
    Network,
    Container,
    Api,
    Infrastructure,
    Application,
}

impl IncidentCategory {
    pub const ALL: [IncidentCategory; 7] = [
        Self::Database,
        Self::Security,
        Self::Network,
        Self::Container,
        Self::Api,
        Self::Infrastructure,
        Self::Application,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Security => "security",
            Self::Network => "network",
            Self::Container => "container",
            Self::Api => "api",
            Self::Infrastructure => "infrastructure",
            Self::Application => "application",
        }
    }
}

impl fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| format!("unknown incident category '{s}'"))
    }
}

/// Incident severity. Ordering follows urgency: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Open,
    Resolved,
    PartiallyResolved,
    Unresolved,
    Cancelled,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::PartiallyResolved => "partially_resolved",
            Self::Unresolved => "unresolved",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Trigger request & findings
// ============================================================================

/// Request to open a new incident. Missing fields are either filled from the
/// scenario catalog or rejected, depending on configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<IncidentCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub affected_systems: Vec<String>,
}

impl IncidentSpec {
    pub fn new(title: impl Into<String>, category: IncidentCategory, severity: Severity) -> Self {
        Self {
            title: Some(title.into()),
            category: Some(category),
            severity: Some(severity),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_affected_systems<I, S>(mut self, systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_systems = systems.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_complete(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
            && self.category.is_some()
            && self.severity.is_some()
    }
}

/// Free-form results accumulated by the pipeline agents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentFindings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_ref: Option<String>,
    #[serde(default)]
    pub remediation_actions: Vec<String>,
}

impl IncidentFindings {
    /// Overlay `other` on top of `self`. Set fields win; actions accumulate.
    pub fn merge(&mut self, other: IncidentFindings) {
        if other.root_cause.is_some() {
            self.root_cause = other.root_cause;
        }
        if other.resolution.is_some() {
            self.resolution = other.resolution;
        }
        if other.page_ref.is_some() {
            self.page_ref = other.page_ref;
        }
        if other.ticket_ref.is_some() {
            self.ticket_ref = other.ticket_ref;
        }
        self.remediation_actions.extend(other.remediation_actions);
    }

    pub fn is_empty(&self) -> bool {
        *self == IncidentFindings::default()
    }
}

// ============================================================================
// Aggregate root
// ============================================================================

/// Shared, lockable incident record. Writers are the workflow engine and the
/// stage reporter of the currently running stage.
pub type IncidentHandle = std::sync::Arc<tokio::sync::RwLock<Incident>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub title: String,
    pub description: String,
    pub category: IncidentCategory,
    pub severity: Severity,
    pub affected_systems: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub workflow_status: WorkflowStatus,
    pub resolution_status: ResolutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<AgentId>,
    pub completed_stages: Vec<AgentId>,
    pub failed_stages: Vec<AgentId>,
    pub skipped_stages: Vec<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<ContextId>,
    pub collaborations: Vec<CollaborationId>,
    pub findings: IncidentFindings,
    pub executions: Vec<AgentExecution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Incident {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: IncidentCategory,
        severity: Severity,
        affected_systems: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: IncidentId::generate(),
            title: title.into(),
            description: description.into(),
            category,
            severity,
            affected_systems,
            created_at: now,
            updated_at: now,
            workflow_status: WorkflowStatus::Pending,
            resolution_status: ResolutionStatus::Open,
            current_stage: None,
            completed_stages: Vec::new(),
            failed_stages: Vec::new(),
            skipped_stages: Vec::new(),
            context_id: None,
            collaborations: Vec::new(),
            findings: IncidentFindings::default(),
            executions: Vec::new(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.workflow_status.is_terminal()
    }

    /// `pending → running`. Returns `false` if the incident had already left
    /// `pending`.
    pub fn start(&mut self) -> bool {
        if self.workflow_status != WorkflowStatus::Pending {
            return false;
        }
        self.workflow_status = WorkflowStatus::Running;
        self.touch();
        true
    }

    /// Dispatch a stage: point `current_stage` at it and append a running
    /// execution record.
    pub fn begin_stage(&mut self, agent_id: AgentId, agent_name: impl Into<String>, input: serde_json::Value) -> ExecutionId {
        let mut execution = AgentExecution::new(agent_id.clone(), agent_name);
        execution.start(input);
        let id = execution.id;
        self.current_stage = Some(agent_id);
        self.executions.push(execution);
        self.touch();
        id
    }

    pub fn execution(&self, agent_id: &AgentId) -> Option<&AgentExecution> {
        self.executions.iter().find(|e| &e.agent_id == agent_id)
    }

    pub fn execution_mut(&mut self, agent_id: &AgentId) -> Option<&mut AgentExecution> {
        self.executions.iter_mut().find(|e| &e.agent_id == agent_id)
    }

    /// Append the stage to the completed or failed list once its execution
    /// has reached a terminal status.
    pub fn record_stage_outcome(&mut self, agent_id: &AgentId) {
        let Some(status) = self.execution(agent_id).map(|e| e.status) else {
            return;
        };
        match status {
            ExecutionStatus::Success => self.completed_stages.push(agent_id.clone()),
            ExecutionStatus::Error => self.failed_stages.push(agent_id.clone()),
            _ => return,
        }
        self.touch();
    }

    /// Record a stage that never ran because the workflow was cancelled.
    pub fn skip_stage(&mut self, agent_id: AgentId, agent_name: impl Into<String>, reason: &str) {
        let mut execution = AgentExecution::new(agent_id.clone(), agent_name);
        execution.skip(reason);
        self.executions.push(execution);
        self.skipped_stages.push(agent_id);
        self.touch();
    }

    pub fn apply_findings(&mut self, findings: IncidentFindings) {
        if findings.is_empty() {
            return;
        }
        self.findings.merge(findings);
        self.touch();
    }

    pub fn add_collaboration(&mut self, collaboration_id: CollaborationId) {
        if !self.collaborations.contains(&collaboration_id) {
            self.collaborations.push(collaboration_id);
        }
    }

    /// Close the workflow. `completed` when no stage failed, `failed`
    /// otherwise; `cancelled` takes precedence.
    pub fn finish(&mut self, cancelled: bool) {
        let now = Utc::now();
        self.current_stage = None;
        self.completed_at = Some(now);
        self.updated_at = now;

        if cancelled {
            self.workflow_status = WorkflowStatus::Cancelled;
            self.resolution_status = ResolutionStatus::Cancelled;
            return;
        }

        self.workflow_status = if self.failed_stages.is_empty() {
            WorkflowStatus::Completed
        } else {
            WorkflowStatus::Failed
        };
        self.resolution_status = match (self.completed_stages.len(), self.failed_stages.len()) {
            (_, 0) => ResolutionStatus::Resolved,
            (0, _) => ResolutionStatus::Unresolved,
            _ => ResolutionStatus::PartiallyResolved,
        };
    }

    /// Seconds between creation and completion, once terminal.
    pub fn resolution_time_secs(&self) -> Option<f64> {
        self.completed_at
            .map(|done| (done - self.created_at).num_milliseconds() as f64 / 1000.0)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn incident() -> Incident {
        Incident::new(
            "Database Connection Pool Exhaustion",
            "pool exhausted",
            IncidentCategory::Database,
            Severity::Critical,
            vec!["mysql-prod-01".into()],
        )
    }

    #[test]
    fn test_incident_id_format() {
        let id = IncidentId::generate();
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "INC");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id.short(), parts[2]);
    }

    #[test]
    fn test_category_and_severity_parsing() {
        assert_eq!("Database".parse::<IncidentCategory>(), Ok(IncidentCategory::Database));
        assert!("mainframe".parse::<IncidentCategory>().is_err());
        assert_eq!(" CRITICAL ".parse::<Severity>(), Ok(Severity::Critical));
        assert!(Severity::Low < Severity::Medium && Severity::High < Severity::Critical);
    }

    #[test]
    fn test_finish_derives_status_from_stage_outcomes() {
        let mut inc = incident();
        assert!(inc.start());
        assert!(!inc.start());

        for (agent, ok) in [("monitoring", true), ("rca", false)] {
            let agent = AgentId::from(agent);
            inc.begin_stage(agent.clone(), agent.as_str(), json!({}));
            let exec = inc.execution_mut(&agent).unwrap();
            if ok {
                exec.succeed(json!({}), None).unwrap();
            } else {
                exec.fail("boom").unwrap();
            }
            inc.record_stage_outcome(&agent);
        }

        inc.finish(false);
        assert_eq!(inc.workflow_status, WorkflowStatus::Failed);
        assert_eq!(inc.resolution_status, ResolutionStatus::PartiallyResolved);
        assert!(inc.completed_at.is_some());
        assert!(inc.current_stage.is_none());
    }

    #[test]
    fn test_finish_all_failed_is_unresolved() {
        let mut inc = incident();
        inc.start();
        let agent = AgentId::from("monitoring");
        inc.begin_stage(agent.clone(), "Monitoring", json!({}));
        inc.execution_mut(&agent).unwrap().fail("down").unwrap();
        inc.record_stage_outcome(&agent);
        inc.finish(false);
        assert_eq!(inc.resolution_status, ResolutionStatus::Unresolved);
    }

    #[test]
    fn test_cancelled_takes_precedence() {
        let mut inc = incident();
        inc.start();
        inc.skip_stage(AgentId::from("validation"), "Validation", "cancelled");
        inc.finish(true);
        assert_eq!(inc.workflow_status, WorkflowStatus::Cancelled);
        assert_eq!(inc.resolution_status, ResolutionStatus::Cancelled);
        assert_eq!(inc.skipped_stages, vec![AgentId::from("validation")]);
        assert_eq!(inc.executions[0].status, ExecutionStatus::Skipped);
    }

    #[test]
    fn test_findings_merge() {
        let mut findings = IncidentFindings {
            root_cause: Some("pool".into()),
            remediation_actions: vec!["a".into()],
            ..Default::default()
        };
        findings.merge(IncidentFindings {
            ticket_ref: Some("EMCP-1".into()),
            remediation_actions: vec!["b".into()],
            ..Default::default()
        });
        assert_eq!(findings.root_cause.as_deref(), Some("pool"));
        assert_eq!(findings.ticket_ref.as_deref(), Some("EMCP-1"));
        assert_eq!(findings.remediation_actions, vec!["a", "b"]);
    }
}
