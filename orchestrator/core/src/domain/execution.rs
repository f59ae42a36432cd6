// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use triage_swarm::{AgentId, CollaborationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Idle,
    Running,
    Success,
    Error,
    Skipped,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Execution is {0}, expected running")]
    NotRunning(ExecutionStatus),
}

/// One pipeline stage run for one incident.
///
/// Progress only moves forward while `running`. After `success`, `error` or
/// `skipped` every mutator is a no-op or an error, so a stage that was timed
/// out or cancelled cannot rewrite its record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecution {
    pub id: ExecutionId,
    pub agent_id: AgentId,
    pub agent_name: String,
    pub status: ExecutionStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub attempts: u32,
    /// Context view the stage read.
    pub input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub logs: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub messages_sent: usize,
    pub messages_received: usize,
    pub collaboration_sessions: Vec<CollaborationId>,
}

impl AgentExecution {
    pub fn new(agent_id: AgentId, agent_name: impl Into<String>) -> Self {
        Self {
            id: ExecutionId::new(),
            agent_id,
            agent_name: agent_name.into(),
            status: ExecutionStatus::Idle,
            progress: 0,
            started_at: None,
            ended_at: None,
            duration_ms: None,
            attempts: 0,
            input: Value::Null,
            output: None,
            confidence: None,
            logs: Vec::new(),
            error: None,
            messages_sent: 0,
            messages_received: 0,
            collaboration_sessions: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn start(&mut self, input: Value) -> bool {
        if self.status != ExecutionStatus::Idle {
            return false;
        }
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.input = input;
        true
    }

    pub fn set_progress(&mut self, percent: u8) {
        if self.status == ExecutionStatus::Running {
            self.progress = self.progress.max(percent.min(100));
        }
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.logs.push(LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        });
    }

    pub fn record_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub fn note_received(&mut self, collaboration: Option<CollaborationId>) {
        if self.is_terminal() {
            return;
        }
        self.messages_received += 1;
        if let Some(id) = collaboration {
            self.join_session(id);
        }
    }

    pub fn note_sent(&mut self, count: usize) {
        if !self.is_terminal() {
            self.messages_sent += count;
        }
    }

    pub fn join_session(&mut self, collaboration: CollaborationId) {
        if !self.is_terminal() && !self.collaboration_sessions.contains(&collaboration) {
            self.collaboration_sessions.push(collaboration);
        }
    }

    pub fn succeed(&mut self, output: Value, confidence: Option<f64>) -> Result<(), ExecutionError> {
        self.ensure_running()?;
        self.status = ExecutionStatus::Success;
        self.progress = 100;
        self.output = Some(output);
        self.confidence = confidence;
        self.stamp_end();
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), ExecutionError> {
        self.ensure_running()?;
        let error = error.into();
        self.logs.push(LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Error,
            message: error.clone(),
        });
        self.status = ExecutionStatus::Error;
        self.error = Some(error);
        self.stamp_end();
        Ok(())
    }

    /// Terminal `skipped` for a stage that was never dispatched.
    pub fn skip(&mut self, reason: &str) {
        if self.is_terminal() {
            return;
        }
        self.log(LogLevel::Info, format!("Stage skipped: {reason}"));
        self.status = ExecutionStatus::Skipped;
        self.ended_at = Some(Utc::now());
    }

    fn ensure_running(&self) -> Result<(), ExecutionError> {
        if self.status == ExecutionStatus::Running {
            Ok(())
        } else {
            Err(ExecutionError::NotRunning(self.status))
        }
    }

    fn stamp_end(&mut self) {
        let now = Utc::now();
        self.ended_at = Some(now);
        self.duration_ms = self
            .started_at
            .map(|start| (now - start).num_milliseconds().max(0) as u64);
    }
}
