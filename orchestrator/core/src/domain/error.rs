// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error taxonomy for the orchestrator core.
//!
//! [`StageFault`] describes why a single stage did not succeed. It is always
//! recovered by the workflow engine into the stage's execution record and
//! never returned to callers. [`OrchestratorError`] is what the public API
//! returns.

use std::time::Duration;
use thiserror::Error;

use triage_swarm::{A2AError, CollaborationId};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StageFault {
    #[error("stage failed: {0}")]
    Failed(String),

    #[error("stage timed out after {0:?}")]
    TimedOut(Duration),

    #[error("stage panicked: {0}")]
    Panicked(String),

    #[error("stage task was aborted")]
    Aborted,
}

impl StageFault {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Faults worth another attempt. A panic is a programming error and is
    /// never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::TimedOut(_))
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Collaboration {0} is closed")]
    CollaborationClosed(CollaborationId),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl OrchestratorError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<A2AError> for OrchestratorError {
    fn from(err: A2AError) -> Self {
        match err {
            A2AError::CollaborationNotFound(id) => Self::not_found("collaboration", id),
            A2AError::CollaborationClosed(id) => Self::CollaborationClosed(id),
            A2AError::InvalidMessage(msg) => Self::InvalidInput(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
