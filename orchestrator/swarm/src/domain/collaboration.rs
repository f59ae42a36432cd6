// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Collaboration Aggregate
//!
//! - [`Collaboration`]: aggregate root tracking a shared task between agents.
//! - [`CollaborationId`]: unique identifier (UUID newtype).
//! - [`CollaborationStatus`]: `active` until explicitly closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::message::MessageId;

/// Unique identifier for a [`Collaboration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollaborationId(pub Uuid);

impl CollaborationId {
    /// Generate a new random `CollaborationId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CollaborationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CollaborationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    Active,
    Closed,
}

/// Aggregate root for a group of agents working one task together.
///
/// # Invariants
///
/// - `participants` holds no duplicates and keeps first-appearance order.
/// - A closed collaboration never reopens and accepts no further messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaboration {
    pub id: CollaborationId,
    pub initiator: AgentId,
    pub participants: Vec<AgentId>,
    pub task: String,
    /// Context snapshot the initiator attached when opening the session.
    pub context: Value,
    pub status: CollaborationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Ids of every message correlated to this collaboration, in send order.
    pub messages: Vec<MessageId>,
    /// Mailbox scope inherited by every invitation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Collaboration {
    pub fn open(
        initiator: AgentId,
        participants: impl IntoIterator<Item = AgentId>,
        task: impl Into<String>,
        context: Value,
    ) -> Self {
        let mut ordered: Vec<AgentId> = Vec::new();
        for participant in participants {
            if !ordered.contains(&participant) {
                ordered.push(participant);
            }
        }

        Self {
            id: CollaborationId::new(),
            initiator,
            participants: ordered,
            task: task.into(),
            context,
            status: CollaborationStatus::Active,
            created_at: Utc::now(),
            closed_at: None,
            messages: Vec::new(),
            scope: None,
        }
    }

    pub fn scoped_to(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == CollaborationStatus::Active
    }

    /// Participants that must be invited, i.e. everyone except the initiator.
    pub fn invitees(&self) -> impl Iterator<Item = &AgentId> {
        self.participants.iter().filter(move |p| **p != self.initiator)
    }

    /// Returns `false` when the collaboration was already closed.
    pub fn close(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = CollaborationStatus::Closed;
        self.closed_at = Some(Utc::now());
        true
    }

    pub fn record_message(&mut self, message_id: MessageId) {
        self.messages.push(message_id);
    }
}
