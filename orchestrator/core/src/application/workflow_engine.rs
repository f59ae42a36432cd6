// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow Engine Application Service
//!
//! Drives every triggered incident through the fixed agent pipeline.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Run incidents stage by stage, thread the shared MCP context
//!   between stages and deliver their A2A traffic
//! - **Dependencies:** Domain (Incident, Agent), Infrastructure (ContextStore,
//!   IncidentRegistry, EventBus), Swarm (MessageBus)
//!
//! # Stage Loop
//!
//! ```text
//! for stage in pipeline {
//!     if cancelled { skip remaining stages; break }
//!
//!     dispatch execution (running)
//!     drain stage mailbox          // data_share → shared.<sender>
//!     input = incident + context view for stage
//!     outcome = invoke(stage, input) with timeout and retry
//!
//!     on success: apply insight, knowledge, patterns, findings, messages
//!     record execution (terminal), completed/failed list
//! }
//! finish → archive → IncidentFinished
//! ```
//!
//! Each incident runs in its own task on a [`TaskTracker`]; each stage
//! attempt runs in a further task so a hung or panicking agent only costs
//! that stage.

use metrics::{counter, histogram};
use serde_json::{json, Value};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use triage_swarm::{
    A2AMessage, AgentId, Collaboration, CollaborationStatus, MessageBus, MessageFilter, MessageStatistics, MessageType,
};

use crate::application::dashboard::DashboardService;
use crate::domain::agent::{Agent, IncidentBrief, StageInput, StageOutput, StageReporter};
use crate::domain::error::{OrchestratorError, Result, StageFault};
use crate::domain::events::IncidentEvent;
use crate::domain::execution::{AgentExecution, ExecutionStatus, LogLevel};
use crate::domain::incident::{Incident, IncidentHandle, IncidentId, IncidentSpec};
use crate::domain::mcp::{clamp_confidence, ContextId, ContextSummary, MCPContext};
use crate::domain::node_config::{OrchestratorConfigManifest, WorkflowConfig};
use crate::domain::scenario;
use crate::infrastructure::agents::standard_pipeline;
use crate::infrastructure::context_store::ContextStore;
use crate::infrastructure::event_bus::{EventBus, EventReceiver, IncidentEventReceiver};
use crate::infrastructure::incident_registry::IncidentRegistry;

/// Control handles for one in-flight incident.
struct RunHandle {
    cancel: CancellationToken,
    done: watch::Receiver<bool>,
}

/// Workflow Engine (Application Service)
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct WorkflowEngine {
    config: Arc<WorkflowConfig>,
    agents: Arc<Vec<Arc<dyn Agent>>>,
    registry: Arc<IncidentRegistry>,
    contexts: Arc<ContextStore>,
    message_bus: Arc<MessageBus>,
    event_bus: Arc<EventBus>,
    runs: Arc<RwLock<HashMap<IncidentId, RunHandle>>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl WorkflowEngine {
    /// Wire an engine from explicitly constructed stores. The event bus is
    /// registered as an observer on both the context store and the message
    /// bus, and every agent's capabilities are advertised on the bus.
    pub fn new(
        config: WorkflowConfig,
        agents: Vec<Arc<dyn Agent>>,
        registry: Arc<IncidentRegistry>,
        contexts: Arc<ContextStore>,
        message_bus: Arc<MessageBus>,
        event_bus: Arc<EventBus>,
    ) -> Result<Self> {
        if agents.is_empty() {
            return Err(OrchestratorError::InvalidInput("pipeline has no agents".to_string()));
        }
        let mut seen = HashSet::new();
        for agent in &agents {
            if !seen.insert(agent.id()) {
                return Err(OrchestratorError::InvalidInput(format!(
                    "agent '{}' appears twice in the pipeline",
                    agent.id()
                )));
            }
        }

        contexts.add_observer(event_bus.clone());
        message_bus.add_observer(event_bus.clone());
        for agent in &agents {
            message_bus.register_capabilities(agent.id(), agent.capabilities());
        }

        info!(
            stages = agents.len(),
            stage_timeout = ?config.stage_timeout,
            max_attempts = config.retry.max_attempts,
            "Workflow engine initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            agents: Arc::new(agents),
            registry,
            contexts,
            message_bus,
            event_bus,
            runs: Arc::new(RwLock::new(HashMap::new())),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Engine with fresh stores and the standard seven-stage pipeline.
    pub fn from_config(manifest: &OrchestratorConfigManifest) -> Result<Self> {
        let workflow = manifest.spec.workflow.clone();
        let agents = standard_pipeline(&workflow);
        Self::new(
            workflow.clone(),
            agents,
            Arc::new(IncidentRegistry::new()),
            Arc::new(ContextStore::new(workflow.confidence_threshold)),
            Arc::new(MessageBus::new()),
            Arc::new(EventBus::new(manifest.spec.event_bus.capacity)),
        )
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// `(agent id, display name)` of each stage in pipeline order.
    pub fn pipeline(&self) -> Vec<(AgentId, String)> {
        self.agents.iter().map(|a| (a.id(), a.name())).collect()
    }

    pub fn registry(&self) -> Arc<IncidentRegistry> {
        self.registry.clone()
    }

    pub fn context_store(&self) -> Arc<ContextStore> {
        self.contexts.clone()
    }

    pub fn message_bus(&self) -> Arc<MessageBus> {
        self.message_bus.clone()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.registry.clone(), self.contexts.clone(), self.message_bus.clone())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Create an incident and start its workflow in the background.
    ///
    /// Returns the freshly created `pending` incident. Nothing is registered
    /// when the request is rejected.
    pub async fn trigger(&self, spec: IncidentSpec) -> Result<Incident> {
        if self.shutdown.is_cancelled() {
            return Err(OrchestratorError::ConcurrencyConflict(
                "workflow engine is shutting down".to_string(),
            ));
        }

        let spec = if !spec.is_complete() && self.config.autofill_incident_scenario {
            scenario::autofill(spec)
        } else {
            spec
        };
        let (title, category, severity) = match (spec.title, spec.category, spec.severity) {
            (Some(title), Some(category), Some(severity)) if !title.trim().is_empty() => (title, category, severity),
            (title, category, severity) => {
                let mut missing = Vec::new();
                if title.as_deref().is_none_or(|t| t.trim().is_empty()) {
                    missing.push("title");
                }
                if category.is_none() {
                    missing.push("category");
                }
                if severity.is_none() {
                    missing.push("severity");
                }
                return Err(OrchestratorError::InvalidInput(format!(
                    "incident is missing {}",
                    missing.join(", ")
                )));
            }
        };

        let incident = Incident::new(
            title,
            spec.description.unwrap_or_default(),
            category,
            severity,
            spec.affected_systems,
        );
        let incident_id = incident.id.clone();
        let handle = self.registry.register(incident).await?;

        counter!("triage_incidents_triggered_total").increment(1);
        info!(incident_id = %incident_id, %category, %severity, "Incident triggered");

        let snapshot = {
            let incident = handle.read().await;
            self.event_bus.publish_incident_event(IncidentEvent::IncidentTriggered {
                incident_id: incident_id.clone(),
                title: incident.title.clone(),
                category,
                severity,
                triggered_at: incident.created_at,
            });
            incident.clone()
        };

        let context = self.contexts.create_context(incident_id.clone())?;
        for (key, value) in [
            ("incident_type", json!(category)),
            ("severity", json!(severity)),
            ("affected_systems", json!(snapshot.affected_systems)),
            ("title", json!(snapshot.title)),
        ] {
            self.contexts.share_knowledge(context.id, key, value)?;
        }

        let snapshot = {
            let mut incident = handle.write().await;
            incident.context_id = Some(context.id);
            incident.clone()
        };

        let cancel = self.shutdown.child_token();
        let (done_tx, done_rx) = watch::channel(false);
        self.runs.write().await.insert(
            incident_id.clone(),
            RunHandle {
                cancel: cancel.clone(),
                done: done_rx,
            },
        );

        let engine = self.clone();
        self.tracker.spawn(async move {
            engine.run(handle, context.id, cancel).await;
            let _ = done_tx.send(true);
        });

        Ok(snapshot)
    }

    /// Ask a running incident to stop after its current stage.
    ///
    /// Returns `false` when the incident has already finished. A `true`
    /// always ends the incident as cancelled, even if no stage was left to
    /// skip.
    pub async fn cancel(&self, id: &IncidentId) -> Result<bool> {
        if let Some(run) = self.runs.read().await.get(id) {
            if *run.done.borrow() {
                return Ok(false);
            }
            let Some(handle) = self.registry.active_handle(id).await else {
                return Ok(false);
            };
            // The run settles its final status under the write lock, so the
            // token is either seen there or the incident is already terminal.
            let incident = handle.read().await;
            if incident.is_terminal() {
                return Ok(false);
            }
            info!(incident_id = %id, "Cancellation requested");
            run.cancel.cancel();
            drop(incident);
            return Ok(true);
        }
        self.registry.snapshot(id).await.map(|_| false)
    }

    /// Cancel every in-flight incident and wait for their tasks to finish.
    pub async fn shutdown(&self) {
        info!("Shutting down workflow engine");
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("Workflow engine stopped");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_incident(&self, id: &IncidentId) -> Result<Incident> {
        self.registry.snapshot(id).await
    }

    pub async fn get_agent_log(&self, id: &IncidentId, agent_id: &AgentId) -> Result<AgentExecution> {
        let incident = self.registry.snapshot(id).await?;
        incident
            .execution(agent_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::not_found("agent execution", format!("{id}/{agent_id}")))
    }

    /// Newest first, active and archived alike.
    pub async fn list_incidents(&self, offset: usize, limit: usize) -> Vec<Incident> {
        self.registry.list(offset, limit).await
    }

    /// Resolve once the incident is terminal and return its final snapshot.
    pub async fn wait_for_incident(&self, id: &IncidentId) -> Result<Incident> {
        let done = self.runs.read().await.get(id).map(|run| run.done.clone());
        if let Some(mut done) = done {
            // A dropped sender means the run task is gone; the registry has
            // the last word either way.
            let _ = done.wait_for(|finished| *finished).await;
        }
        self.registry.snapshot(id).await
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    pub fn subscribe_incident(&self, id: IncidentId) -> IncidentEventReceiver {
        self.event_bus.subscribe_incident(id)
    }

    pub fn context_for_incident(&self, id: &IncidentId) -> Result<MCPContext> {
        self.contexts
            .context_for_incident(id)
            .ok_or_else(|| OrchestratorError::not_found("context", id))
    }

    pub fn context_summaries(&self) -> Vec<ContextSummary> {
        self.contexts.list_summaries()
    }

    pub fn messages(&self, filter: &MessageFilter) -> Vec<A2AMessage> {
        self.message_bus.history(filter)
    }

    pub fn collaborations(&self, status: Option<CollaborationStatus>) -> Vec<Collaboration> {
        self.message_bus.collaborations(status)
    }

    pub fn message_statistics(&self) -> MessageStatistics {
        self.message_bus.statistics()
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    async fn run(&self, handle: IncidentHandle, context_id: ContextId, cancel: CancellationToken) {
        let incident_id = {
            let mut incident = handle.write().await;
            incident.start();
            incident.id.clone()
        };
        info!(incident_id = %incident_id, "Workflow started");

        let mut cancelled = false;
        for (index, agent) in self.agents.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                self.skip_remaining(&handle, &incident_id, &self.agents[index..]).await;
                break;
            }
            self.run_stage(&handle, &incident_id, context_id, agent.clone(), &cancel)
                .await;
        }

        self.close_collaborations(&handle).await;
        let undelivered = self.message_bus.purge_scope(incident_id.as_str());
        if undelivered > 0 {
            debug!(incident_id = %incident_id, undelivered, "Dropped undelivered A2A messages");
        }

        let (workflow_status, resolution_status, finished_at) = {
            let mut incident = handle.write().await;
            // A cancel accepted after the last stage still counts.
            incident.finish(cancelled || cancel.is_cancelled());
            (
                incident.workflow_status,
                incident.resolution_status,
                incident.completed_at.unwrap_or(incident.updated_at),
            )
        };

        if let Err(e) = self.registry.archive(&incident_id).await {
            error!(incident_id = %incident_id, error = %e, "Failed to archive incident");
        }
        self.runs.write().await.remove(&incident_id);

        info!(
            incident_id = %incident_id,
            status = %workflow_status,
            resolution = %resolution_status,
            "Workflow finished"
        );
        self.event_bus.publish_incident_event(IncidentEvent::IncidentFinished {
            incident_id,
            workflow_status,
            resolution_status,
            finished_at,
        });
    }

    async fn run_stage(
        &self,
        handle: &IncidentHandle,
        incident_id: &IncidentId,
        context_id: ContextId,
        agent: Arc<dyn Agent>,
        cancel: &CancellationToken,
    ) {
        let agent_id = agent.id();

        // 1. Dispatch
        let (execution_id, started_at) = {
            let mut incident = handle.write().await;
            let execution_id = incident.begin_stage(agent_id.clone(), agent.name(), Value::Null);
            let started_at = incident
                .execution(&agent_id)
                .and_then(|e| e.started_at)
                .unwrap_or(incident.updated_at);
            (execution_id, started_at)
        };
        debug!(incident_id = %incident_id, agent = %agent_id, "Stage started");
        self.event_bus.publish_incident_event(IncidentEvent::StageStarted {
            incident_id: incident_id.clone(),
            agent_id: agent_id.clone(),
            execution_id,
            started_at,
        });

        // 2. Mailbox
        let inbox = self.message_bus.drain(&agent_id, Some(incident_id.as_str()));
        if !inbox.is_empty() {
            let mut incident = handle.write().await;
            if let Some(execution) = incident.execution_mut(&agent_id) {
                for message in &inbox {
                    execution.note_received(message.correlation_id);
                }
            }
        }
        for message in inbox.iter().filter(|m| m.message_type == MessageType::DataShare) {
            let key = format!("shared.{}", message.sender);
            if let Err(e) = self.contexts.share_knowledge(context_id, key, message.content.clone()) {
                warn!(incident_id = %incident_id, agent = %agent_id, error = %e, "Failed to merge shared data");
            }
        }

        // 3. Input
        let reporter = StageReporter::new(handle.clone(), agent_id.clone());
        let outcome = match self.contexts.insights_for(context_id, &agent_id) {
            Ok(context) => {
                let incident = IncidentBrief::from(&*handle.read().await);
                let input = StageInput {
                    incident,
                    context,
                    inbox,
                    attempt: 1,
                };
                {
                    let mut incident = handle.write().await;
                    if let Some(execution) = incident.execution_mut(&agent_id) {
                        execution.input = input.snapshot();
                    }
                }
                // 4. Invoke
                self.invoke_with_retry(&agent, input, &reporter, handle, incident_id, cancel)
                    .await
            }
            Err(e) => Err((StageFault::failed(format!("context unavailable: {e}")), 0)),
        };

        // 5 & 6. Record
        match outcome {
            Ok(output) => self.complete_stage(handle, incident_id, context_id, &agent_id, output).await,
            Err((fault, attempts)) => self.fail_stage(handle, incident_id, &agent_id, fault, attempts).await,
        }
    }

    async fn invoke_with_retry(
        &self,
        agent: &Arc<dyn Agent>,
        input: StageInput,
        reporter: &StageReporter,
        handle: &IncidentHandle,
        incident_id: &IncidentId,
        cancel: &CancellationToken,
    ) -> std::result::Result<StageOutput, (StageFault, u32)> {
        let agent_id = agent.id();
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            {
                let mut incident = handle.write().await;
                if let Some(execution) = incident.execution_mut(&agent_id) {
                    execution.record_attempt();
                }
            }

            let mut attempt_input = input.clone();
            attempt_input.attempt = attempt;
            let fault = match self.invoke_once(agent.clone(), attempt_input, reporter.clone()).await {
                Ok(output) => return Ok(output),
                Err(fault) => fault,
            };

            if !fault.is_retryable() || attempt >= max_attempts || cancel.is_cancelled() {
                return Err((fault, attempt));
            }

            let delay = self.config.retry.backoff_after(attempt);
            warn!(
                incident_id = %incident_id,
                agent = %agent_id,
                attempt,
                error = %fault,
                "Stage attempt failed, retrying in {:?}",
                delay
            );
            reporter
                .log(
                    LogLevel::Warning,
                    format!("Attempt {attempt}/{max_attempts} failed: {fault}. Retrying in {delay:?}"),
                )
                .await;
            self.event_bus.publish_incident_event(IncidentEvent::StageRetried {
                incident_id: incident_id.clone(),
                agent_id: agent_id.clone(),
                attempt,
                error: fault.to_string(),
                retried_at: chrono::Utc::now(),
            });
            tokio::time::sleep(delay).await;
        }
    }

    /// One attempt in its own task, bounded by the stage timeout.
    async fn invoke_once(
        &self,
        agent: Arc<dyn Agent>,
        input: StageInput,
        reporter: StageReporter,
    ) -> std::result::Result<StageOutput, StageFault> {
        let timeout = self.config.stage_timeout;
        let task = tokio::spawn(async move { agent.execute(input, reporter).await });
        let abort = task.abort_handle();

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) if join_error.is_panic() => {
                Err(StageFault::Panicked(panic_message(join_error.into_panic())))
            }
            Ok(Err(_)) => Err(StageFault::Aborted),
            Err(_) => {
                abort.abort();
                Err(StageFault::TimedOut(timeout))
            }
        }
    }

    /// Apply a successful stage's effects, then mark it succeeded. Messages
    /// and sessions are counted while the execution is still running.
    async fn complete_stage(
        &self,
        handle: &IncidentHandle,
        incident_id: &IncidentId,
        context_id: ContextId,
        agent_id: &AgentId,
        output: StageOutput,
    ) {
        let StageOutput {
            payload,
            confidence,
            findings,
            knowledge,
            patterns,
            messages,
            collaborations,
        } = output;
        let confidence = clamp_confidence(confidence.unwrap_or(self.config.default_confidence));
        let mut problems: Vec<String> = Vec::new();

        if let Err(e) = self
            .contexts
            .update_context(context_id, agent_id.clone(), payload.clone(), confidence)
        {
            problems.push(format!("insight not recorded: {e}"));
        }
        for (key, value) in knowledge {
            if let Err(e) = self.contexts.share_knowledge(context_id, key.clone(), value) {
                problems.push(format!("knowledge '{key}' not shared: {e}"));
            }
        }
        for pattern in patterns {
            if let Err(e) = self.contexts.record_pattern(context_id, pattern) {
                problems.push(format!("pattern not recorded: {e}"));
            }
        }

        let mut sent = 0usize;
        for message in messages {
            let a2a = A2AMessage::new(agent_id.clone(), message.receiver, message.message_type, message.content)
                .with_priority(message.priority)
                .scoped_to(incident_id.as_str());
            match self.message_bus.send(a2a) {
                Ok(_) => sent += 1,
                Err(e) => problems.push(format!("message not sent: {e}")),
            }
        }

        let mut sessions = Vec::new();
        for proposal in collaborations {
            let collaboration = Collaboration::open(agent_id.clone(), proposal.participants, proposal.task, proposal.context)
                .scoped_to(incident_id.as_str());
            let invitees = collaboration.invitees().count();
            match self.message_bus.open_collaboration(collaboration) {
                Ok(id) => {
                    sent += invitees;
                    sessions.push(id);
                }
                Err(e) => problems.push(format!("collaboration not opened: {e}")),
            }
        }

        let (execution_id, duration_ms) = {
            let mut incident = handle.write().await;
            incident.apply_findings(findings);
            for id in &sessions {
                incident.add_collaboration(*id);
            }

            let Some(execution) = incident.execution_mut(agent_id) else {
                error!(incident_id = %incident_id, agent = %agent_id, "Execution record missing");
                return;
            };
            for problem in &problems {
                execution.log(LogLevel::Warning, problem.clone());
            }
            execution.note_sent(sent);
            for id in sessions {
                execution.join_session(id);
            }
            if let Err(e) = execution.succeed(payload, Some(confidence)) {
                error!(incident_id = %incident_id, agent = %agent_id, error = %e, "Could not record stage success");
            }
            let ids = (execution.id, execution.duration_ms.unwrap_or(0));
            incident.record_stage_outcome(agent_id);
            ids
        };

        for problem in &problems {
            warn!(incident_id = %incident_id, agent = %agent_id, "{}", problem);
        }
        self.record_metrics(agent_id, ExecutionStatus::Success, duration_ms);
        info!(incident_id = %incident_id, agent = %agent_id, confidence, duration_ms, "Stage completed");
        self.event_bus.publish_incident_event(IncidentEvent::StageCompleted {
            incident_id: incident_id.clone(),
            agent_id: agent_id.clone(),
            execution_id,
            confidence: Some(confidence),
            duration_ms,
            completed_at: chrono::Utc::now(),
        });
    }

    async fn fail_stage(
        &self,
        handle: &IncidentHandle,
        incident_id: &IncidentId,
        agent_id: &AgentId,
        fault: StageFault,
        attempts: u32,
    ) {
        let error = fault.to_string();
        let (execution_id, duration_ms) = {
            let mut incident = handle.write().await;
            let Some(execution) = incident.execution_mut(agent_id) else {
                error!(incident_id = %incident_id, agent = %agent_id, "Execution record missing");
                return;
            };
            if let Err(e) = execution.fail(error.clone()) {
                error!(incident_id = %incident_id, agent = %agent_id, error = %e, "Could not record stage failure");
            }
            let ids = (execution.id, execution.duration_ms.unwrap_or(0));
            incident.record_stage_outcome(agent_id);
            ids
        };

        self.record_metrics(agent_id, ExecutionStatus::Error, duration_ms);
        warn!(incident_id = %incident_id, agent = %agent_id, attempts, error = %error, "Stage failed");
        self.event_bus.publish_incident_event(IncidentEvent::StageFailed {
            incident_id: incident_id.clone(),
            agent_id: agent_id.clone(),
            execution_id,
            error,
            attempts,
            failed_at: chrono::Utc::now(),
        });
    }

    async fn skip_remaining(&self, handle: &IncidentHandle, incident_id: &IncidentId, agents: &[Arc<dyn Agent>]) {
        info!(incident_id = %incident_id, remaining = agents.len(), "Workflow cancelled, skipping remaining stages");
        let mut incident = handle.write().await;
        for agent in agents {
            let agent_id = agent.id();
            incident.skip_stage(agent_id.clone(), agent.name(), "workflow cancelled");
            self.record_metrics(&agent_id, ExecutionStatus::Skipped, 0);
            self.event_bus.publish_incident_event(IncidentEvent::StageSkipped {
                incident_id: incident_id.clone(),
                agent_id,
                skipped_at: chrono::Utc::now(),
            });
        }
    }

    async fn close_collaborations(&self, handle: &IncidentHandle) {
        let collaborations = handle.read().await.collaborations.clone();
        for id in collaborations {
            if let Err(e) = self.message_bus.close_collaboration(id) {
                warn!(collaboration_id = %id, error = %e, "Failed to close collaboration");
            }
        }
    }

    fn record_metrics(&self, agent_id: &AgentId, status: ExecutionStatus, duration_ms: u64) {
        counter!(
            "triage_stage_executions_total",
            "agent" => agent_id.to_string(),
            "status" => status.as_str()
        )
        .increment(1);
        if status != ExecutionStatus::Skipped {
            histogram!("triage_stage_duration_seconds", "agent" => agent_id.to_string())
                .record(Duration::from_millis(duration_ms).as_secs_f64());
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42u8)), "unknown panic payload");
    }
}
