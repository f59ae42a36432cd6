// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! A2A message value objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::collaboration::CollaborationId;

/// Unique identifier for an [`A2AMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    InfoRequest,
    CollaborationRequest,
    DataShare,
    StatusUpdate,
    Response,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InfoRequest => "info_request",
            Self::CollaborationRequest => "collaboration_request",
            Self::DataShare => "data_share",
            Self::StatusUpdate => "status_update",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low,
    #[default]
    Normal,
    High,
}

impl MessagePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A direct message between two agents.
///
/// Messages are immutable once built. The bus hands each one to its receiver
/// at most once through [`crate::MessageBus::drain`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2AMessage {
    pub id: MessageId,
    pub sender: AgentId,
    pub receiver: AgentId,
    pub message_type: MessageType,
    pub content: Value,
    pub priority: MessagePriority,
    pub created_at: DateTime<Utc>,
    pub requires_response: bool,
    /// Links the message to a [`crate::Collaboration`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CollaborationId>,
    /// Partition key for mailboxes. Agents working different incidents share
    /// role ids, so the orchestrator scopes every message to its incident.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl A2AMessage {
    pub fn new(
        sender: impl Into<AgentId>,
        receiver: impl Into<AgentId>,
        message_type: MessageType,
        content: Value,
    ) -> Self {
        Self {
            id: MessageId::new(),
            sender: sender.into(),
            receiver: receiver.into(),
            message_type,
            content,
            priority: MessagePriority::Normal,
            created_at: Utc::now(),
            requires_response: false,
            correlation_id: None,
            scope: None,
        }
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn requiring_response(mut self) -> Self {
        self.requires_response = true;
        self
    }

    pub fn correlated_with(mut self, collaboration_id: CollaborationId) -> Self {
        self.correlation_id = Some(collaboration_id);
        self
    }

    pub fn scoped_to(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}
