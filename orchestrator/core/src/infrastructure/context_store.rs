// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Context Store (MCP Registry)
//!
//! Owns every [`MCPContext`]. Contexts live in a `DashMap`, so updates to
//! different incidents proceed in parallel while updates to one context are
//! serialized by its shard lock. Observers are called after the lock is
//! released, with a snapshot of the context as of that mutation.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

use triage_swarm::AgentId;

use crate::domain::error::{OrchestratorError, Result};
use crate::domain::incident::IncidentId;
use crate::domain::mcp::{ContextId, ContextInsights, ContextMutation, ContextSummary, CorrelationPattern, MCPContext};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Notified after every successful context mutation. Delivery is best effort.
pub trait ContextObserver: Send + Sync {
    fn on_context_created(&self, _context: &MCPContext) {}

    fn on_context_updated(&self, context: &MCPContext, mutation: &ContextMutation);
}

pub struct ContextStore {
    contexts: DashMap<ContextId, MCPContext>,
    by_incident: DashMap<IncidentId, ContextId>,
    confidence_threshold: f64,
    observers: RwLock<Vec<Arc<dyn ContextObserver>>>,
}

impl ContextStore {
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            contexts: DashMap::new(),
            by_incident: DashMap::new(),
            confidence_threshold,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn add_observer(&self, observer: Arc<dyn ContextObserver>) {
        self.observers.write().push(observer);
    }

    /// Open the context for `incident_id`. An incident gets exactly one.
    pub fn create_context(&self, incident_id: IncidentId) -> Result<MCPContext> {
        let context = MCPContext::new(incident_id.clone());
        match self.by_incident.entry(incident_id) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                return Err(OrchestratorError::ConcurrencyConflict(format!(
                    "incident {} already has context {}",
                    entry.key(),
                    entry.get()
                )));
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(context.id);
            }
        }
        self.contexts.insert(context.id, context.clone());

        debug!(context_id = %context.id, incident_id = %context.incident_id, "MCP context created");
        self.notify(|observer| observer.on_context_created(&context));
        Ok(context)
    }

    /// Overwrite `agent_id`'s insight. Returns the new version.
    pub fn update_context(&self, context_id: ContextId, agent_id: AgentId, payload: Value, confidence: f64) -> Result<u64> {
        self.mutate(context_id, |context| context.update_insight(agent_id, payload, confidence))
    }

    pub fn share_knowledge(&self, context_id: ContextId, key: impl Into<String>, value: Value) -> Result<u64> {
        self.mutate(context_id, |context| context.share_knowledge(key, value))
    }

    pub fn record_pattern(&self, context_id: ContextId, pattern: CorrelationPattern) -> Result<u64> {
        self.mutate(context_id, |context| context.record_pattern(pattern))
    }

    /// What `requesting_agent` is allowed to see, filtered by the store's
    /// confidence threshold.
    pub fn insights_for(&self, context_id: ContextId, requesting_agent: &AgentId) -> Result<ContextInsights> {
        self.contexts
            .get(&context_id)
            .map(|context| context.insights_for(requesting_agent, self.confidence_threshold))
            .ok_or_else(|| OrchestratorError::not_found("context", context_id))
    }

    pub fn get_context(&self, context_id: ContextId) -> Option<MCPContext> {
        self.contexts.get(&context_id).map(|c| c.clone())
    }

    pub fn context_for_incident(&self, incident_id: &IncidentId) -> Option<MCPContext> {
        let context_id = *self.by_incident.get(incident_id)?;
        self.get_context(context_id)
    }

    /// Summaries of every context, most recently updated first.
    pub fn list_summaries(&self) -> Vec<ContextSummary> {
        let mut summaries: Vec<ContextSummary> = self.contexts.iter().map(|c| c.summary()).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    fn mutate(&self, context_id: ContextId, f: impl FnOnce(&mut MCPContext) -> (u64, ContextMutation)) -> Result<u64> {
        let (version, mutation, snapshot) = {
            let mut context = self
                .contexts
                .get_mut(&context_id)
                .ok_or_else(|| OrchestratorError::not_found("context", context_id))?;
            let (version, mutation) = f(&mut context);
            let snapshot = if self.observers.read().is_empty() {
                None
            } else {
                Some(context.clone())
            };
            (version, mutation, snapshot)
        };

        debug!(context_id = %context_id, version, ?mutation, "MCP context updated");
        if let Some(snapshot) = snapshot {
            self.notify(|observer| observer.on_context_updated(&snapshot, &mutation));
        }
        Ok(version)
    }

    fn notify(&self, f: impl Fn(&dyn ContextObserver)) {
        let observers = self.observers.read().clone();
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))).is_err() {
                warn!("Context observer panicked; notification dropped");
            }
        }
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}
