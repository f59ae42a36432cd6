// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Message Bus (A2A Protocol)
//!
//! In-process implementation of the agent-to-agent protocol.
//!
//! All mailbox, history and collaboration state lives behind one mutex so that
//! a send is observed atomically: a message is either in both the receiver's
//! mailbox and the history, or in neither. Observers are invoked after the
//! lock is released.
//!
//! Unknown receivers get an implicitly-created mailbox; the bus never rejects
//! a message because the receiver has not registered yet.
//!
//! Mailboxes are keyed by `(scope, receiver)`. Unscoped traffic lands in the
//! agent's default mailbox, the one created by capability registration.
//! Scoped mailboxes live until [`MessageBus::purge_scope`] drops them; the
//! history is append-only.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::{
    A2AError, A2AMessage, AgentId, Collaboration, CollaborationId, CollaborationStatus, MessageId,
    MessagePriority, MessageType,
};

/// Notification hook for live transports.
///
/// Delivery is best-effort: implementations must not block, and a panic inside
/// an observer is caught and logged without affecting the bus operation.
pub trait MessageObserver: Send + Sync {
    fn on_message_sent(&self, message: &A2AMessage);

    fn on_collaboration_opened(&self, _collaboration: &Collaboration) {}

    fn on_collaboration_closed(&self, _collaboration: &Collaboration) {}
}

/// Filter for [`MessageBus::history`]. Empty fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageFilter {
    pub sender: Option<AgentId>,
    pub receiver: Option<AgentId>,
    pub message_type: Option<MessageType>,
    pub correlation_id: Option<CollaborationId>,
    pub scope: Option<String>,
    /// Keep only the most recent `limit` matches.
    pub limit: Option<usize>,
}

impl MessageFilter {
    fn matches(&self, message: &A2AMessage) -> bool {
        self.sender.as_ref().is_none_or(|s| *s == message.sender)
            && self.receiver.as_ref().is_none_or(|r| *r == message.receiver)
            && self.message_type.is_none_or(|t| t == message.message_type)
            && self.correlation_id.is_none_or(|c| Some(c) == message.correlation_id)
            && self.scope.as_ref().is_none_or(|s| Some(s) == message.scope.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentActivity {
    pub sent: usize,
    pub received: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageStatistics {
    pub total_messages: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub agent_activity: BTreeMap<AgentId, AgentActivity>,
    pub active_collaborations: usize,
    pub closed_collaborations: usize,
    pub registered_agents: usize,
    pub total_capabilities: usize,
}

type MailboxKey = (Option<String>, AgentId);

#[derive(Default)]
struct BusState {
    mailboxes: HashMap<MailboxKey, VecDeque<A2AMessage>>,
    history: Vec<A2AMessage>,
    collaborations: HashMap<CollaborationId, Collaboration>,
    collaboration_order: Vec<CollaborationId>,
    capabilities: BTreeMap<AgentId, Vec<String>>,
}

impl BusState {
    /// Appends to mailbox and history. Callers have already validated the
    /// correlation id.
    fn deliver(&mut self, message: A2AMessage) {
        if let Some(collab_id) = message.correlation_id {
            if let Some(collab) = self.collaborations.get_mut(&collab_id) {
                collab.record_message(message.id);
            }
        }
        self.mailboxes
            .entry((message.scope.clone(), message.receiver.clone()))
            .or_default()
            .push_back(message.clone());
        self.history.push(message);
    }

    fn check_correlation(&self, message: &A2AMessage) -> Result<(), A2AError> {
        let Some(collab_id) = message.correlation_id else {
            return Ok(());
        };
        match self.collaborations.get(&collab_id) {
            None => Err(A2AError::CollaborationNotFound(collab_id)),
            Some(collab) if !collab.is_active() => Err(A2AError::CollaborationClosed(collab_id)),
            Some(_) => Ok(()),
        }
    }
}

/// Agent-to-agent message bus.
#[derive(Default)]
pub struct MessageBus {
    state: Mutex<BusState>,
    observers: RwLock<Vec<Arc<dyn MessageObserver>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&self, observer: Arc<dyn MessageObserver>) {
        self.observers.write().push(observer);
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// Record the capability tags an agent advertises. Also creates the
    /// agent's mailbox so it shows up in discovery before its first message.
    pub fn register_capabilities(&self, agent_id: AgentId, capabilities: Vec<String>) {
        let mut state = self.state.lock();
        state.mailboxes.entry((None, agent_id.clone())).or_default();
        info!(agent = %agent_id, capabilities = ?capabilities, "Registered A2A capabilities");
        state.capabilities.insert(agent_id, capabilities);
    }

    pub fn capabilities(&self, agent_id: &AgentId) -> Option<Vec<String>> {
        self.state.lock().capabilities.get(agent_id).cloned()
    }

    pub fn find_by_capability(&self, capability: &str) -> Vec<AgentId> {
        self.state
            .lock()
            .capabilities
            .iter()
            .filter(|(_, caps)| caps.iter().any(|c| c == capability))
            .map(|(agent, _)| agent.clone())
            .collect()
    }

    pub fn registered_agents(&self) -> Vec<AgentId> {
        self.state.lock().capabilities.keys().cloned().collect()
    }

    // ========================================================================
    // Messaging
    // ========================================================================

    /// Queue a message for its receiver and append it to the history.
    pub fn send(&self, message: A2AMessage) -> Result<MessageId, A2AError> {
        if message.sender.as_str().is_empty() || message.receiver.as_str().is_empty() {
            return Err(A2AError::InvalidMessage(
                "sender and receiver must be non-empty".to_string(),
            ));
        }

        {
            let mut state = self.state.lock();
            if let Err(e) = state.check_correlation(&message) {
                warn!(
                    sender = %message.sender,
                    receiver = %message.receiver,
                    error = %e,
                    "Rejected A2A message"
                );
                return Err(e);
            }
            state.deliver(message.clone());
        }

        debug!(
            sender = %message.sender,
            receiver = %message.receiver,
            message_type = %message.message_type,
            "A2A message sent"
        );
        metrics::counter!("triage_a2a_messages_total", "type" => message.message_type.as_str()).increment(1);

        let id = message.id;
        self.notify(|observer| observer.on_message_sent(&message));
        Ok(id)
    }

    /// Remove and return every message queued for `agent_id` in `scope`, in
    /// send order.
    pub fn drain(&self, agent_id: &AgentId, scope: Option<&str>) -> Vec<A2AMessage> {
        let key = (scope.map(str::to_string), agent_id.clone());
        let mut state = self.state.lock();
        match state.mailboxes.get_mut(&key) {
            Some(queue) => queue.drain(..).collect(),
            None => Vec::new(),
        }
    }

    pub fn pending_count(&self, agent_id: &AgentId, scope: Option<&str>) -> usize {
        let key = (scope.map(str::to_string), agent_id.clone());
        self.state
            .lock()
            .mailboxes
            .get(&key)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Drop every mailbox belonging to `scope` and return how many undelivered
    /// messages went with them. The history keeps its copies.
    pub fn purge_scope(&self, scope: &str) -> usize {
        let mut state = self.state.lock();
        let mut dropped = 0;
        state.mailboxes.retain(|(mailbox_scope, _), queue| {
            if mailbox_scope.as_deref() == Some(scope) {
                dropped += queue.len();
                false
            } else {
                true
            }
        });
        dropped
    }

    /// Number of mailboxes held for `scope`, empty ones included.
    pub fn mailbox_count(&self, scope: Option<&str>) -> usize {
        self.state
            .lock()
            .mailboxes
            .keys()
            .filter(|(mailbox_scope, _)| mailbox_scope.as_deref() == scope)
            .count()
    }

    /// Messages from the history matching `filter`, oldest first.
    pub fn history(&self, filter: &MessageFilter) -> Vec<A2AMessage> {
        let state = self.state.lock();
        let mut matched: Vec<A2AMessage> = state
            .history
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            let skip = matched.len().saturating_sub(limit);
            matched.drain(..skip);
        }
        matched
    }

    pub fn total_messages(&self) -> usize {
        self.state.lock().history.len()
    }

    // ========================================================================
    // Collaborations
    // ========================================================================

    /// Open a collaboration and invite every participant except the initiator
    /// with exactly one correlated `collaboration_request`.
    pub fn open_collaboration(&self, collaboration: Collaboration) -> Result<CollaborationId, A2AError> {
        if collaboration.initiator.as_str().is_empty() {
            return Err(A2AError::InvalidMessage("initiator must be non-empty".to_string()));
        }
        if !collaboration.is_active() {
            return Err(A2AError::CollaborationClosed(collaboration.id));
        }

        let collab_id = collaboration.id;

        let invitations: Vec<A2AMessage> = collaboration
            .invitees()
            .map(|participant| {
                let invitation = A2AMessage::new(
                    collaboration.initiator.clone(),
                    participant.clone(),
                    MessageType::CollaborationRequest,
                    json!({
                        "collaboration_id": collab_id,
                        "task": collaboration.task,
                        "context": collaboration.context,
                    }),
                )
                .with_priority(MessagePriority::High)
                .requiring_response()
                .correlated_with(collab_id);
                match &collaboration.scope {
                    Some(scope) => invitation.scoped_to(scope.clone()),
                    None => invitation,
                }
            })
            .collect();

        let opened = {
            let mut state = self.state.lock();
            state.collaborations.insert(collab_id, collaboration);
            state.collaboration_order.push(collab_id);
            for message in &invitations {
                state.deliver(message.clone());
            }
            state.collaborations.get(&collab_id).cloned()
        };

        info!(
            collaboration_id = %collab_id,
            invitations = invitations.len(),
            "Started A2A collaboration"
        );

        for message in &invitations {
            metrics::counter!("triage_a2a_messages_total", "type" => message.message_type.as_str()).increment(1);
            self.notify(|observer| observer.on_message_sent(message));
        }
        if let Some(collab) = opened {
            self.notify(|observer| observer.on_collaboration_opened(&collab));
        }

        Ok(collab_id)
    }

    /// Close a collaboration. Returns `Ok(false)` if it was already closed.
    pub fn close_collaboration(&self, collaboration_id: CollaborationId) -> Result<bool, A2AError> {
        let closed = {
            let mut state = self.state.lock();
            let collab = state
                .collaborations
                .get_mut(&collaboration_id)
                .ok_or(A2AError::CollaborationNotFound(collaboration_id))?;
            if !collab.close() {
                return Ok(false);
            }
            collab.clone()
        };

        info!(collaboration_id = %collaboration_id, "Closed A2A collaboration");
        self.notify(|observer| observer.on_collaboration_closed(&closed));
        Ok(true)
    }

    pub fn collaboration(&self, collaboration_id: CollaborationId) -> Option<Collaboration> {
        self.state.lock().collaborations.get(&collaboration_id).cloned()
    }

    /// Collaborations in the order they were opened.
    pub fn collaborations(&self, status: Option<CollaborationStatus>) -> Vec<Collaboration> {
        let state = self.state.lock();
        state
            .collaboration_order
            .iter()
            .filter_map(|id| state.collaborations.get(id))
            .filter(|c| status.is_none_or(|s| s == c.status))
            .cloned()
            .collect()
    }

    pub fn statistics(&self) -> MessageStatistics {
        let state = self.state.lock();
        let mut stats = MessageStatistics {
            total_messages: state.history.len(),
            registered_agents: state.capabilities.len(),
            total_capabilities: state.capabilities.values().map(Vec::len).sum(),
            ..Default::default()
        };

        for message in &state.history {
            *stats.by_type.entry(message.message_type.to_string()).or_default() += 1;
            *stats.by_priority.entry(message.priority.to_string()).or_default() += 1;
            stats.agent_activity.entry(message.sender.clone()).or_default().sent += 1;
            stats.agent_activity.entry(message.receiver.clone()).or_default().received += 1;
        }

        for collab in state.collaborations.values() {
            match collab.status {
                CollaborationStatus::Active => stats.active_collaborations += 1,
                CollaborationStatus::Closed => stats.closed_collaborations += 1,
            }
        }

        stats
    }

    fn notify(&self, f: impl Fn(&dyn MessageObserver)) {
        let observers = self.observers.read().clone();
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))).is_err() {
                warn!("A2A observer panicked; notification dropped");
            }
        }
    }
}
