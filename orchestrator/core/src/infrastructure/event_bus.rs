// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Event Bus Implementation - Pub/Sub for Domain Events
//
// In-memory event streaming over a tokio broadcast channel. Feeds the CLI
// watcher and any transport layer that wants push updates. Events published
// with no subscriber are dropped.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use triage_swarm::{A2AMessage, Collaboration, MessageObserver};

use crate::domain::events::{ContextEvent, IncidentEvent, MessageEvent};
use crate::domain::incident::IncidentId;
use crate::domain::mcp::{ContextMutation, MCPContext};
use crate::infrastructure::context_store::ContextObserver;

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Incident(IncidentEvent),
    Context(ContextEvent),
    Message(MessageEvent),
}

impl DomainEvent {
    /// Incident this event belongs to, if any.
    pub fn incident_id(&self) -> Option<&IncidentId> {
        match self {
            Self::Incident(event) => Some(event.incident_id()),
            Self::Context(event) => Some(event.incident_id()),
            Self::Message(event) => event.incident_id(),
        }
    }
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Capacity is how many events a slow subscriber may fall behind before
    /// it starts losing the oldest ones.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_incident_event(&self, event: IncidentEvent) {
        self.publish(DomainEvent::Incident(event));
    }

    pub fn publish_context_event(&self, event: ContextEvent) {
        self.publish(DomainEvent::Context(event));
    }

    pub fn publish_message_event(&self, event: MessageEvent) {
        self.publish(DomainEvent::Message(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the events of a single incident, including the A2A
    /// traffic scoped to it.
    pub fn subscribe_incident(&self, incident_id: IncidentId) -> IncidentEventReceiver {
        IncidentEventReceiver {
            receiver: self.sender.subscribe(),
            incident_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

// ============================================================================
// Observer bridges
// ============================================================================

impl ContextObserver for EventBus {
    fn on_context_created(&self, context: &MCPContext) {
        self.publish_context_event(ContextEvent::ContextCreated {
            context_id: context.id,
            incident_id: context.incident_id.clone(),
            created_at: context.created_at,
        });
    }

    fn on_context_updated(&self, context: &MCPContext, mutation: &ContextMutation) {
        self.publish_context_event(ContextEvent::ContextUpdated {
            context_id: context.id,
            incident_id: context.incident_id.clone(),
            version: context.version,
            mutation: mutation.clone(),
            updated_at: context.updated_at,
        });
    }
}

impl MessageObserver for EventBus {
    fn on_message_sent(&self, message: &A2AMessage) {
        self.publish_message_event(MessageEvent::MessageSent {
            message_id: message.id,
            incident_id: message.scope.as_deref().map(IncidentId::from),
            sender: message.sender.clone(),
            receiver: message.receiver.clone(),
            message_type: message.message_type,
            priority: message.priority,
            sent_at: message.created_at,
        });
    }

    fn on_collaboration_opened(&self, collaboration: &Collaboration) {
        self.publish_message_event(MessageEvent::CollaborationOpened {
            collaboration_id: collaboration.id,
            incident_id: collaboration.scope.as_deref().map(IncidentId::from),
            initiator: collaboration.initiator.clone(),
            participants: collaboration.participants.clone(),
            task: collaboration.task.clone(),
            opened_at: collaboration.created_at,
        });
    }

    fn on_collaboration_closed(&self, collaboration: &Collaboration) {
        self.publish_message_event(MessageEvent::CollaborationClosed {
            collaboration_id: collaboration.id,
            incident_id: collaboration.scope.as_deref().map(IncidentId::from),
            closed_at: collaboration.closed_at.unwrap_or_else(Utc::now),
        });
    }
}

// ============================================================================
// Receivers
// ============================================================================

fn map_recv_error(err: broadcast::error::RecvError) -> EventBusError {
    match err {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for a single incident's events (filtered)
pub struct IncidentEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    incident_id: IncidentId,
}

impl IncidentEventReceiver {
    pub fn incident_id(&self) -> &IncidentId {
        &self.incident_id
    }

    /// Receive the next event for this incident, skipping everything else.
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.incident_id() == Some(&self.incident_id) {
                return Ok(event);
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_swarm::{AgentId, MessageType};

    fn triggered(id: &IncidentId) -> IncidentEvent {
        IncidentEvent::IncidentTriggered {
            incident_id: id.clone(),
            title: "t".into(),
            category: crate::domain::incident::IncidentCategory::Api,
            severity: crate::domain::incident::Severity::High,
            triggered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();
        let id = IncidentId::from("INC-1-AAAAAAAA");

        event_bus.publish_incident_event(triggered(&id));

        match receiver.recv().await.unwrap() {
            DomainEvent::Incident(IncidentEvent::IncidentTriggered { incident_id, .. }) => {
                assert_eq!(incident_id, id);
            }
            other => panic!("Wrong event type received: {other:?}"),
        }
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }

    #[tokio::test]
    async fn test_incident_event_filtering() {
        let event_bus = EventBus::new(10);
        let ours = IncidentId::from("INC-1-AAAAAAAA");
        let other = IncidentId::from("INC-1-BBBBBBBB");
        let mut receiver = event_bus.subscribe_incident(ours.clone());

        event_bus.publish_incident_event(triggered(&other));
        // Unscoped A2A traffic belongs to no incident.
        event_bus.on_message_sent(&A2AMessage::new(
            AgentId::from("a"),
            AgentId::from("b"),
            MessageType::StatusUpdate,
            serde_json::json!({}),
        ));
        event_bus.on_message_sent(
            &A2AMessage::new(
                AgentId::from("a"),
                AgentId::from("b"),
                MessageType::DataShare,
                serde_json::json!({}),
            )
            .scoped_to(ours.as_str()),
        );

        let received = receiver.recv().await.unwrap();
        assert!(matches!(
            received,
            DomainEvent::Message(MessageEvent::MessageSent { message_type: MessageType::DataShare, .. })
        ));
        assert_eq!(received.incident_id(), Some(&ours));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish_incident_event(triggered(&IncidentId::from("INC-1-CCCCCCCC")));

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
    }

    #[test]
    fn test_domain_event_serializes_with_type_tag() {
        let event = DomainEvent::Incident(triggered(&IncidentId::from("INC-1-DDDDDDDD")));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "incident");
    }
}
