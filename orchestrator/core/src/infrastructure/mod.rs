// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agents;
pub mod context_store;
pub mod event_bus;
pub mod incident_registry;

pub use context_store::{ContextObserver, ContextStore};
pub use event_bus::{DomainEvent, EventBus, EventBusError, EventReceiver, IncidentEventReceiver};
pub use incident_registry::IncidentRegistry;
