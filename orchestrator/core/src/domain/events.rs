// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use triage_swarm::{AgentId, CollaborationId, MessageId, MessagePriority, MessageType};

use crate::domain::execution::ExecutionId;
use crate::domain::incident::{IncidentCategory, IncidentId, ResolutionStatus, Severity, WorkflowStatus};
use crate::domain::mcp::{ContextId, ContextMutation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IncidentEvent {
    IncidentTriggered {
        incident_id: IncidentId,
        title: String,
        category: IncidentCategory,
        severity: Severity,
        triggered_at: DateTime<Utc>,
    },
    StageStarted {
        incident_id: IncidentId,
        agent_id: AgentId,
        execution_id: ExecutionId,
        started_at: DateTime<Utc>,
    },
    StageRetried {
        incident_id: IncidentId,
        agent_id: AgentId,
        attempt: u32,
        error: String,
        retried_at: DateTime<Utc>,
    },
    StageCompleted {
        incident_id: IncidentId,
        agent_id: AgentId,
        execution_id: ExecutionId,
        confidence: Option<f64>,
        duration_ms: u64,
        completed_at: DateTime<Utc>,
    },
    StageFailed {
        incident_id: IncidentId,
        agent_id: AgentId,
        execution_id: ExecutionId,
        error: String,
        attempts: u32,
        failed_at: DateTime<Utc>,
    },
    StageSkipped {
        incident_id: IncidentId,
        agent_id: AgentId,
        skipped_at: DateTime<Utc>,
    },
    IncidentFinished {
        incident_id: IncidentId,
        workflow_status: WorkflowStatus,
        resolution_status: ResolutionStatus,
        finished_at: DateTime<Utc>,
    },
}

impl IncidentEvent {
    pub fn incident_id(&self) -> &IncidentId {
        match self {
            Self::IncidentTriggered { incident_id, .. }
            | Self::StageStarted { incident_id, .. }
            | Self::StageRetried { incident_id, .. }
            | Self::StageCompleted { incident_id, .. }
            | Self::StageFailed { incident_id, .. }
            | Self::StageSkipped { incident_id, .. }
            | Self::IncidentFinished { incident_id, .. } => incident_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContextEvent {
    ContextCreated {
        context_id: ContextId,
        incident_id: IncidentId,
        created_at: DateTime<Utc>,
    },
    ContextUpdated {
        context_id: ContextId,
        incident_id: IncidentId,
        version: u64,
        mutation: ContextMutation,
        updated_at: DateTime<Utc>,
    },
}

impl ContextEvent {
    pub fn incident_id(&self) -> &IncidentId {
        match self {
            Self::ContextCreated { incident_id, .. } | Self::ContextUpdated { incident_id, .. } => incident_id,
        }
    }
}

/// A2A traffic. `incident_id` is recovered from the message scope, so it is
/// absent for traffic that was sent outside any incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessageEvent {
    MessageSent {
        message_id: MessageId,
        incident_id: Option<IncidentId>,
        sender: AgentId,
        receiver: AgentId,
        message_type: MessageType,
        priority: MessagePriority,
        sent_at: DateTime<Utc>,
    },
    CollaborationOpened {
        collaboration_id: CollaborationId,
        incident_id: Option<IncidentId>,
        initiator: AgentId,
        participants: Vec<AgentId>,
        task: String,
        opened_at: DateTime<Utc>,
    },
    CollaborationClosed {
        collaboration_id: CollaborationId,
        incident_id: Option<IncidentId>,
        closed_at: DateTime<Utc>,
    },
}

impl MessageEvent {
    pub fn incident_id(&self) -> Option<&IncidentId> {
        match self {
            Self::MessageSent { incident_id, .. }
            | Self::CollaborationOpened { incident_id, .. }
            | Self::CollaborationClosed { incident_id, .. } => incident_id.as_ref(),
        }
    }
}
