// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory incident registry.
//!
//! Incidents are held in one of two maps: `active` while their workflow runs,
//! `history` once terminal. Each record sits behind its own lock
//! ([`IncidentHandle`]) so readers of one incident never wait on another.
//! Only the workflow engine writes here; queries return cloned snapshots.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::domain::error::{OrchestratorError, Result};
use crate::domain::incident::{Incident, IncidentHandle, IncidentId};

#[derive(Default)]
pub struct IncidentRegistry {
    active: RwLock<HashMap<IncidentId, IncidentHandle>>,
    history: RwLock<HashMap<IncidentId, IncidentHandle>>,
    /// Registration order, oldest first.
    order: RwLock<Vec<IncidentId>>,
}

impl IncidentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, incident: Incident) -> Result<IncidentHandle> {
        let id = incident.id.clone();
        let mut active = self.active.write().await;
        if active.contains_key(&id) || self.history.read().await.contains_key(&id) {
            error!(incident_id = %id, "Incident id already registered");
            return Err(OrchestratorError::ConcurrencyConflict(format!(
                "incident {id} is already registered"
            )));
        }

        let handle: IncidentHandle = Arc::new(RwLock::new(incident));
        active.insert(id.clone(), handle.clone());
        self.order.write().await.push(id.clone());
        debug!(incident_id = %id, "Incident registered");
        Ok(handle)
    }

    /// Live handle of a running incident.
    pub async fn active_handle(&self, id: &IncidentId) -> Option<IncidentHandle> {
        self.active.read().await.get(id).cloned()
    }

    /// Move a terminal incident from `active` to `history`.
    ///
    /// The move happens under both map locks, so a concurrent lookup always
    /// finds the incident in one of them.
    pub async fn archive(&self, id: &IncidentId) -> Result<()> {
        let handle = self
            .active_handle(id)
            .await
            .ok_or_else(|| OrchestratorError::not_found("active incident", id))?;

        if !handle.read().await.is_terminal() {
            error!(incident_id = %id, "Refusing to archive a non-terminal incident");
            return Err(OrchestratorError::ConcurrencyConflict(format!(
                "incident {id} is still running"
            )));
        }

        let mut active = self.active.write().await;
        let mut history = self.history.write().await;
        let handle = active
            .remove(id)
            .ok_or_else(|| OrchestratorError::not_found("active incident", id))?;
        history.insert(id.clone(), handle);
        debug!(incident_id = %id, "Incident archived");
        Ok(())
    }

    /// Snapshot from either map, active first.
    pub async fn snapshot(&self, id: &IncidentId) -> Result<Incident> {
        let handle = match self.active_handle(id).await {
            Some(handle) => handle,
            None => self
                .history
                .read()
                .await
                .get(id)
                .cloned()
                .ok_or_else(|| OrchestratorError::not_found("incident", id))?,
        };
        let snapshot = handle.read().await.clone();
        Ok(snapshot)
    }

    pub async fn is_active(&self, id: &IncidentId) -> bool {
        self.active.read().await.contains_key(id)
    }

    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    pub async fn history_count(&self) -> usize {
        self.history.read().await.len()
    }

    pub async fn active_ids(&self) -> Vec<IncidentId> {
        self.active.read().await.keys().cloned().collect()
    }

    /// Page of incidents, newest first, active and archived alike.
    pub async fn list(&self, offset: usize, limit: usize) -> Vec<Incident> {
        let ids: Vec<IncidentId> = self
            .order
            .read()
            .await
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        let mut incidents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(incident) = self.snapshot(&id).await {
                incidents.push(incident);
            }
        }
        incidents
    }

    /// Snapshots of every archived incident.
    pub async fn history(&self) -> Vec<Incident> {
        let handles: Vec<IncidentHandle> = self.history.read().await.values().cloned().collect();
        let mut incidents = Vec::with_capacity(handles.len());
        for handle in handles {
            incidents.push(handle.read().await.clone());
        }
        incidents
    }

    pub async fn active(&self) -> Vec<Incident> {
        let handles: Vec<IncidentHandle> = self.active.read().await.values().cloned().collect();
        let mut incidents = Vec::with_capacity(handles.len());
        for handle in handles {
            incidents.push(handle.read().await.clone());
        }
        incidents
    }
}
