// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the workflow engine
//!
//! These tests drive whole incidents through the engine:
//! 1. Stage ordering and exactly-once dispatch
//! 2. Failure isolation (errors, timeouts, panics)
//! 3. Retries, cancellation and shutdown
//! 4. Context threading and per-incident isolation
//! 5. The standard seven-stage pipeline end to end

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use triage_core::application::WorkflowEngine;
use triage_core::domain::agent::{Agent, Stage, StageInput, StageOutput, StageReporter};
use triage_core::domain::error::{OrchestratorError, StageFault};
use triage_core::domain::events::IncidentEvent;
use triage_core::domain::execution::{ExecutionStatus, LogLevel};
use triage_core::domain::incident::{
    Incident, IncidentCategory, IncidentId, IncidentSpec, ResolutionStatus, Severity, WorkflowStatus,
};
use triage_core::domain::node_config::{OrchestratorConfigManifest, RetryPolicy, WorkflowConfig};
use triage_core::domain::scenario::scenario_for_category;
use triage_core::infrastructure::agents::standard_pipeline;
use triage_core::infrastructure::{ContextStore, DomainEvent, EventBus, IncidentRegistry};
use triage_core::swarm::{AgentId, CollaborationStatus, MessageBus, MessageFilter};

const WAIT: Duration = Duration::from_secs(10);

enum Behavior {
    Succeed(f64),
    Fail,
    Panic,
    Hang,
    /// Fail the first `n` calls, then succeed.
    Flaky(u32),
    Slow(Duration),
    /// Signal `started`, then block until `release` fires.
    Gate { started: Arc<Notify>, release: Arc<Notify> },
}

struct ScriptedAgent {
    id: &'static str,
    behavior: Behavior,
    calls: AtomicU32,
}

impl ScriptedAgent {
    fn new(id: &'static str, behavior: Behavior) -> Arc<dyn Agent> {
        Arc::new(Self {
            id,
            behavior,
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn id(&self) -> AgentId {
        AgentId::from(self.id)
    }

    fn name(&self) -> String {
        format!("Scripted {}", self.id)
    }

    async fn execute(&self, input: StageInput, reporter: StageReporter) -> Result<StageOutput, StageFault> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        reporter.info(format!("call {call}, attempt {}", input.attempt)).await;
        let output = StageOutput::new(json!({ "agent": self.id, "version_seen": input.context.version }));

        match &self.behavior {
            Behavior::Succeed(confidence) => Ok(output.with_confidence(*confidence)),
            Behavior::Fail => Err(StageFault::failed("scripted failure")),
            Behavior::Panic => panic!("scripted panic in {}", self.id),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(output)
            }
            Behavior::Flaky(failures) => {
                if call <= *failures {
                    Err(StageFault::failed(format!("transient failure {call}")))
                } else {
                    Ok(output.with_confidence(0.9))
                }
            }
            Behavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(output.with_confidence(0.9))
            }
            Behavior::Gate { started, release } => {
                started.notify_one();
                release.notified().await;
                Ok(output.with_confidence(0.9))
            }
        }
    }
}

fn test_config() -> WorkflowConfig {
    WorkflowConfig {
        stage_timeout: Duration::from_secs(5),
        ..WorkflowConfig::default()
    }
}

fn engine_with(config: WorkflowConfig, agents: Vec<Arc<dyn Agent>>) -> WorkflowEngine {
    WorkflowEngine::new(
        config,
        agents,
        Arc::new(IncidentRegistry::new()),
        Arc::new(ContextStore::default()),
        Arc::new(MessageBus::new()),
        Arc::new(EventBus::with_default_capacity()),
    )
    .expect("engine should build")
}

/// Seven succeeding stages named after the standard pipeline, with the
/// behavior at `index` replaced.
fn pipeline_with(index: usize, behavior: Behavior) -> Vec<Arc<dyn Agent>> {
    let mut behavior = Some(behavior);
    Stage::PIPELINE
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let b = if i == index {
                behavior.take().unwrap()
            } else {
                Behavior::Succeed(0.9)
            };
            ScriptedAgent::new(stage.as_str(), b)
        })
        .collect()
}

fn standard_engine() -> WorkflowEngine {
    let manifest = OrchestratorConfigManifest::default();
    WorkflowEngine::from_config(&manifest).expect("standard engine should build")
}

fn spec() -> IncidentSpec {
    IncidentSpec::new("Checkout latency spike", IncidentCategory::Api, Severity::Medium)
        .with_affected_systems(["checkout-api"])
}

async fn finish(engine: &WorkflowEngine, id: &IncidentId) -> Incident {
    tokio::time::timeout(WAIT, engine.wait_for_incident(id))
        .await
        .expect("incident should finish in time")
        .expect("incident should exist")
}

fn statuses(incident: &Incident) -> Vec<(String, ExecutionStatus)> {
    incident
        .executions
        .iter()
        .map(|e| (e.agent_id.to_string(), e.status))
        .collect()
}

#[tokio::test]
async fn test_stages_run_in_order_exactly_once() {
    let engine = engine_with(test_config(), pipeline_with(0, Behavior::Succeed(0.95)));
    let triggered = engine.trigger(spec()).await.unwrap();
    assert_eq!(triggered.workflow_status, WorkflowStatus::Pending);
    assert!(triggered.context_id.is_some());

    let incident = finish(&engine, &triggered.id).await;

    let order: Vec<&str> = incident.executions.iter().map(|e| e.agent_id.as_str()).collect();
    let expected: Vec<&str> = Stage::PIPELINE.iter().map(|s| s.as_str()).collect();
    assert_eq!(order, expected);
    assert_eq!(incident.completed_stages.len(), 7);
    assert!(incident.executions.iter().all(|e| e.status == ExecutionStatus::Success));
    assert!(incident.executions.iter().all(|e| e.attempts == 1));
    assert!(incident
        .executions
        .windows(2)
        .all(|w| w[0].ended_at.unwrap() <= w[1].started_at.unwrap()));

    assert_eq!(incident.workflow_status, WorkflowStatus::Completed);
    assert_eq!(incident.resolution_status, ResolutionStatus::Resolved);
    assert!(incident.current_stage.is_none());
    assert!(incident.completed_at.is_some());
}

#[tokio::test]
async fn test_failed_stage_does_not_stop_pipeline() {
    let engine = engine_with(test_config(), pipeline_with(2, Behavior::Fail));
    let id = engine.trigger(spec()).await.unwrap().id;
    let incident = finish(&engine, &id).await;

    let errors: Vec<_> = incident
        .executions
        .iter()
        .filter(|e| e.status == ExecutionStatus::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].agent_id.as_str(), "pager");
    assert!(errors[0].error.as_deref().unwrap().contains("scripted failure"));

    assert_eq!(incident.failed_stages, vec![AgentId::from("pager")]);
    assert_eq!(incident.completed_stages.len(), 6);
    assert_eq!(incident.workflow_status, WorkflowStatus::Failed);
    assert_eq!(incident.resolution_status, ResolutionStatus::PartiallyResolved);

    // Later stages saw the failure in their input.
    let validation = engine.get_agent_log(&id, &AgentId::from("validation")).await.unwrap();
    assert_eq!(validation.status, ExecutionStatus::Success);
    assert_eq!(validation.input["failed_stages"], json!(["pager"]));
}

#[tokio::test]
async fn test_every_stage_failing_leaves_incident_unresolved() {
    let agents = Stage::PIPELINE
        .iter()
        .map(|s| ScriptedAgent::new(s.as_str(), Behavior::Fail))
        .collect();
    let engine = engine_with(test_config(), agents);
    let id = engine.trigger(spec()).await.unwrap().id;
    let incident = finish(&engine, &id).await;

    assert_eq!(incident.failed_stages.len(), 7);
    assert_eq!(incident.workflow_status, WorkflowStatus::Failed);
    assert_eq!(incident.resolution_status, ResolutionStatus::Unresolved);
}

#[tokio::test]
async fn test_hung_stage_times_out() {
    let config = WorkflowConfig {
        stage_timeout: Duration::from_millis(100),
        ..WorkflowConfig::default()
    };
    let engine = engine_with(config, pipeline_with(1, Behavior::Hang));
    let id = engine.trigger(spec()).await.unwrap().id;
    let incident = finish(&engine, &id).await;

    let rca = incident.execution(&AgentId::from("rca")).unwrap();
    assert_eq!(rca.status, ExecutionStatus::Error);
    assert!(rca.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(incident.completed_stages.len(), 6);
    assert_eq!(incident.workflow_status, WorkflowStatus::Failed);
}

#[tokio::test]
async fn test_panicking_agent_is_isolated() {
    let engine = engine_with(test_config(), pipeline_with(3, Behavior::Panic));
    let first = engine.trigger(spec()).await.unwrap().id;
    let incident = finish(&engine, &first).await;

    let ticketing = incident.execution(&AgentId::from("ticketing")).unwrap();
    assert_eq!(ticketing.status, ExecutionStatus::Error);
    assert!(ticketing.error.as_deref().unwrap().contains("scripted panic"));
    assert_eq!(incident.completed_stages.len(), 6);

    // The engine keeps serving incidents afterwards.
    let second = engine.trigger(spec()).await.unwrap().id;
    let incident = finish(&engine, &second).await;
    assert_eq!(incident.executions.len(), 7);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let config = WorkflowConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
            backoff_multiplier: 2.0,
        },
        ..test_config()
    };
    let engine = engine_with(config, pipeline_with(0, Behavior::Flaky(2)));
    let mut events = engine.subscribe();
    let id = engine.trigger(spec()).await.unwrap().id;
    let incident = finish(&engine, &id).await;

    let monitoring = incident.execution(&AgentId::from("monitoring")).unwrap();
    assert_eq!(monitoring.status, ExecutionStatus::Success);
    assert_eq!(monitoring.attempts, 3);
    let warnings = monitoring
        .logs
        .iter()
        .filter(|l| l.level == LogLevel::Warning && l.message.starts_with("Attempt"))
        .count();
    assert_eq!(warnings, 2);

    let mut retried = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DomainEvent::Incident(IncidentEvent::StageRetried { attempt, .. }) = event {
            retried.push(attempt);
        }
    }
    assert_eq!(retried, vec![1, 2]);
}

#[tokio::test]
async fn test_retries_give_up_after_max_attempts() {
    let config = WorkflowConfig {
        retry: RetryPolicy {
            max_attempts: 2,
            initial_backoff_ms: 1,
            backoff_multiplier: 1.0,
        },
        ..test_config()
    };
    let engine = engine_with(config, pipeline_with(0, Behavior::Flaky(5)));
    let id = engine.trigger(spec()).await.unwrap().id;
    let incident = finish(&engine, &id).await;

    let monitoring = incident.execution(&AgentId::from("monitoring")).unwrap();
    assert_eq!(monitoring.status, ExecutionStatus::Error);
    assert_eq!(monitoring.attempts, 2);
    assert!(monitoring.error.as_deref().unwrap().contains("transient failure 2"));
}

#[tokio::test]
async fn test_cancel_skips_remaining_stages() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gate = Behavior::Gate {
        started: started.clone(),
        release: release.clone(),
    };
    let engine = engine_with(test_config(), pipeline_with(1, gate));
    let id = engine.trigger(spec()).await.unwrap().id;

    tokio::time::timeout(WAIT, started.notified()).await.unwrap();
    assert!(engine.cancel(&id).await.unwrap());
    release.notify_one();

    let incident = finish(&engine, &id).await;
    assert_eq!(incident.workflow_status, WorkflowStatus::Cancelled);
    assert_eq!(incident.resolution_status, ResolutionStatus::Cancelled);
    // The in-flight stage is allowed to finish.
    assert_eq!(incident.completed_stages, vec![AgentId::from("monitoring"), AgentId::from("rca")]);
    assert_eq!(incident.skipped_stages.len(), 5);
    assert!(statuses(&incident)[2..]
        .iter()
        .all(|(_, status)| *status == ExecutionStatus::Skipped));

    // Cancelling a finished incident is a no-op.
    assert!(!engine.cancel(&id).await.unwrap());
}

#[tokio::test]
async fn test_cancel_during_last_stage_ends_cancelled() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gate = Behavior::Gate {
        started: started.clone(),
        release: release.clone(),
    };
    let engine = engine_with(test_config(), pipeline_with(6, gate));
    let id = engine.trigger(spec()).await.unwrap().id;

    tokio::time::timeout(WAIT, started.notified()).await.unwrap();
    assert!(engine.cancel(&id).await.unwrap());
    release.notify_one();

    let incident = finish(&engine, &id).await;
    assert_eq!(incident.workflow_status, WorkflowStatus::Cancelled);
    assert_eq!(incident.resolution_status, ResolutionStatus::Cancelled);
    assert_eq!(incident.completed_stages.len(), 7);
    assert!(incident.skipped_stages.is_empty());
}

#[tokio::test]
async fn test_finished_incident_leaves_no_mailboxes_behind() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let config = test_config();
    let mut agents = standard_pipeline(&config);
    agents[1] = ScriptedAgent::new(
        "rca",
        Behavior::Gate {
            started: started.clone(),
            release: release.clone(),
        },
    );
    let bus = Arc::new(MessageBus::new());
    let engine = WorkflowEngine::new(
        config,
        agents,
        Arc::new(IncidentRegistry::new()),
        Arc::new(ContextStore::default()),
        bus.clone(),
        Arc::new(EventBus::with_default_capacity()),
    )
    .expect("engine should build");

    let security = scenario_for_category(IncidentCategory::Security).unwrap();
    let id = engine.trigger(security.to_spec()).await.unwrap().id;
    tokio::time::timeout(WAIT, started.notified()).await.unwrap();

    // Monitoring's threat share is still waiting for remediation.
    let remediation = AgentId::from("remediation");
    assert!(bus.pending_count(&remediation, Some(id.as_str())) > 0);

    assert!(engine.cancel(&id).await.unwrap());
    release.notify_one();
    let incident = finish(&engine, &id).await;
    assert_eq!(incident.workflow_status, WorkflowStatus::Cancelled);
    assert_eq!(incident.skipped_stages.len(), 5);

    assert_eq!(bus.pending_count(&remediation, Some(id.as_str())), 0);
    assert_eq!(bus.mailbox_count(Some(id.as_str())), 0);
    // The history keeps what was sent.
    let history = engine.messages(&MessageFilter {
        scope: Some(id.to_string()),
        receiver: Some(remediation),
        ..MessageFilter::default()
    });
    assert!(!history.is_empty());
}

#[tokio::test]
async fn test_cancel_unknown_incident_is_not_found() {
    let engine = engine_with(test_config(), pipeline_with(0, Behavior::Succeed(0.9)));
    let err = engine.cancel(&IncidentId::from("INC-missing")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::NotFound { .. }));
}

#[tokio::test]
async fn test_incomplete_trigger_is_rejected_without_state() {
    let engine = engine_with(test_config(), pipeline_with(0, Behavior::Succeed(0.9)));
    let spec = IncidentSpec {
        title: Some("  ".to_string()),
        severity: Some(Severity::High),
        ..IncidentSpec::default()
    };

    let err = engine.trigger(spec).await.unwrap_err();
    match err {
        OrchestratorError::InvalidInput(message) => {
            assert!(message.contains("title"));
            assert!(message.contains("category"));
            assert!(!message.contains("severity"));
        }
        other => panic!("expected InvalidInput, got {other:?}"),
    }
    assert!(engine.list_incidents(0, 10).await.is_empty());
    assert!(engine.context_summaries().is_empty());
}

#[tokio::test]
async fn test_autofill_completes_partial_trigger() {
    let config = WorkflowConfig {
        autofill_incident_scenario: true,
        ..test_config()
    };
    let engine = engine_with(config, pipeline_with(0, Behavior::Succeed(0.9)));
    let spec = IncidentSpec {
        category: Some(IncidentCategory::Database),
        ..IncidentSpec::default()
    };

    let incident = engine.trigger(spec).await.unwrap();
    let scenario = scenario_for_category(IncidentCategory::Database).unwrap();
    assert_eq!(incident.title, scenario.title);
    assert_eq!(incident.category, IncidentCategory::Database);
    assert!(!incident.affected_systems.is_empty());
    finish(&engine, &incident.id).await;
}

#[tokio::test]
async fn test_context_versions_strictly_increase() {
    let engine = engine_with(test_config(), pipeline_with(0, Behavior::Succeed(0.9)));
    let mut events = engine.subscribe();
    let id = engine.trigger(spec()).await.unwrap().id;
    let incident = finish(&engine, &id).await;

    let mut versions = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DomainEvent::Context(triage_core::domain::events::ContextEvent::ContextUpdated {
            version,
            incident_id,
            ..
        }) = event
        {
            assert_eq!(incident_id, id);
            versions.push(version);
        }
    }
    // Four seeded knowledge entries plus one insight per stage.
    assert_eq!(versions.len(), 4 + 7);
    assert!(versions.windows(2).all(|w| w[0] < w[1]));

    let context = engine.context_for_incident(&id).unwrap();
    assert_eq!(Some(context.id), incident.context_id);
    assert_eq!(context.version, *versions.last().unwrap());
    assert_eq!(context.agent_insights.len(), 7);
    assert_eq!(context.shared_knowledge["incident_type"], json!("api"));
}

#[tokio::test]
async fn test_later_stages_see_earlier_insights() {
    let engine = engine_with(test_config(), pipeline_with(0, Behavior::Succeed(0.95)));
    let id = engine.trigger(spec()).await.unwrap().id;
    finish(&engine, &id).await;

    let monitoring = engine.get_agent_log(&id, &AgentId::from("monitoring")).await.unwrap();
    assert_eq!(monitoring.input["peer_insights"], json!([]));

    let validation = engine.get_agent_log(&id, &AgentId::from("validation")).await.unwrap();
    let peers = validation.input["peer_insights"].as_array().unwrap();
    assert_eq!(peers.len(), 6);
    assert!(!peers.contains(&json!("validation")));
}

#[tokio::test]
async fn test_incident_subscription_sees_full_lifecycle() {
    let engine = engine_with(test_config(), pipeline_with(0, Behavior::Succeed(0.9)));
    let mut all = engine.subscribe();
    let id = engine.trigger(spec()).await.unwrap().id;
    finish(&engine, &id).await;

    let mut kinds = Vec::new();
    while let Ok(event) = all.try_recv() {
        if let DomainEvent::Incident(event) = event {
            kinds.push(match event {
                IncidentEvent::IncidentTriggered { .. } => "triggered",
                IncidentEvent::StageStarted { .. } => "started",
                IncidentEvent::StageCompleted { .. } => "completed",
                IncidentEvent::IncidentFinished { .. } => "finished",
                _ => "other",
            });
        }
    }
    assert_eq!(kinds.first(), Some(&"triggered"));
    assert_eq!(kinds.last(), Some(&"finished"));
    assert_eq!(kinds.iter().filter(|k| **k == "started").count(), 7);
    assert_eq!(kinds.iter().filter(|k| **k == "completed").count(), 7);
}

#[tokio::test]
async fn test_unknown_lookups_are_not_found() {
    let engine = engine_with(test_config(), pipeline_with(0, Behavior::Succeed(0.9)));
    let missing = IncidentId::from("INC-missing");
    assert!(matches!(
        engine.get_incident(&missing).await,
        Err(OrchestratorError::NotFound { .. })
    ));

    let id = engine.trigger(spec()).await.unwrap().id;
    finish(&engine, &id).await;
    assert!(matches!(
        engine.get_agent_log(&id, &AgentId::from("nobody")).await,
        Err(OrchestratorError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_duplicate_agents_are_rejected() {
    let agents = vec![
        ScriptedAgent::new("monitoring", Behavior::Succeed(0.9)),
        ScriptedAgent::new("monitoring", Behavior::Succeed(0.9)),
    ];
    let result = WorkflowEngine::new(
        test_config(),
        agents,
        Arc::new(IncidentRegistry::new()),
        Arc::new(ContextStore::default()),
        Arc::new(MessageBus::new()),
        Arc::new(EventBus::with_default_capacity()),
    );
    assert!(matches!(result, Err(OrchestratorError::InvalidInput(_))));
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_work() {
    let engine = engine_with(
        test_config(),
        Stage::PIPELINE
            .iter()
            .map(|s| ScriptedAgent::new(s.as_str(), Behavior::Slow(Duration::from_millis(50))))
            .collect(),
    );
    let id = engine.trigger(spec()).await.unwrap().id;

    tokio::time::timeout(WAIT, engine.shutdown()).await.unwrap();

    let incident = engine.get_incident(&id).await.unwrap();
    assert_eq!(incident.workflow_status, WorkflowStatus::Cancelled);
    assert!(!incident.skipped_stages.is_empty());

    let err = engine.trigger(spec()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::ConcurrencyConflict(_)));
}

// ============================================================================
// Standard pipeline
// ============================================================================

#[tokio::test]
async fn test_standard_pipeline_resolves_database_incident() {
    let engine = standard_engine();
    let scenario = scenario_for_category(IncidentCategory::Database).unwrap();
    let id = engine.trigger(scenario.to_spec()).await.unwrap().id;
    let incident = finish(&engine, &id).await;

    assert_eq!(incident.workflow_status, WorkflowStatus::Completed);
    assert_eq!(incident.resolution_status, ResolutionStatus::Resolved);
    assert_eq!(incident.completed_stages.len(), 7);

    let findings = &incident.findings;
    assert_eq!(findings.root_cause.as_deref(), Some(scenario.root_cause));
    assert!(findings.page_ref.as_deref().unwrap().starts_with("PD-DATABASE-"));
    assert!(findings.ticket_ref.as_deref().unwrap().starts_with("EMCP-DATABASE"));
    assert!(findings.remediation_actions.len() >= 4);
    assert!(findings.resolution.as_deref().unwrap().starts_with("Database fully resolved"));

    // Monitoring invited RCA into a collaboration; RCA received it.
    let rca = incident.execution(&AgentId::from("rca")).unwrap();
    assert!(rca.messages_received >= 1);
    let monitoring = incident.execution(&AgentId::from("monitoring")).unwrap();
    assert_eq!(monitoring.collaboration_sessions.len(), 1);
    assert!(monitoring.messages_sent >= 1);

    let context = engine.context_for_incident(&id).unwrap();
    let aggregate = context.aggregate_confidence();
    assert!((0.0..=1.0).contains(&aggregate));
    assert!(context.shared_knowledge.contains_key("final_resolution"));
    assert!(context.shared_knowledge.contains_key("shared.rca"));
    assert!(!context.correlation_patterns.is_empty());

    // Sessions opened during the incident are closed with it.
    assert!(engine.collaborations(Some(CollaborationStatus::Active)).is_empty());
    assert!(!engine.collaborations(Some(CollaborationStatus::Closed)).is_empty());
}

#[tokio::test]
async fn test_concurrent_incidents_stay_isolated() {
    let engine = standard_engine();
    let database = scenario_for_category(IncidentCategory::Database).unwrap().to_spec();
    let security = scenario_for_category(IncidentCategory::Security).unwrap().to_spec();

    let (a, b) = tokio::join!(engine.trigger(database), engine.trigger(security));
    let (a, b) = (a.unwrap().id, b.unwrap().id);
    let (incident_a, incident_b) = tokio::join!(finish(&engine, &a), finish(&engine, &b));

    for incident in [&incident_a, &incident_b] {
        assert_eq!(incident.executions.len(), 7);
        assert_eq!(incident.workflow_status, WorkflowStatus::Completed);
        let context = engine.context_for_incident(&incident.id).unwrap();
        assert_eq!(context.incident_id, incident.id);
        assert_eq!(
            context.shared_knowledge["incident_type"],
            json!(incident.category)
        );
    }
    assert_ne!(incident_a.context_id, incident_b.context_id);

    // Every message carries the scope of the incident that produced it.
    let scoped_a = engine.messages(&MessageFilter {
        scope: Some(a.to_string()),
        ..MessageFilter::default()
    });
    let scoped_b = engine.messages(&MessageFilter {
        scope: Some(b.to_string()),
        ..MessageFilter::default()
    });
    assert!(!scoped_a.is_empty());
    assert!(!scoped_b.is_empty());
    assert_eq!(scoped_a.len() + scoped_b.len(), engine.message_statistics().total_messages);

    // Only the security incident carries monitoring's threat share.
    let security_context = engine.context_for_incident(&b).unwrap();
    assert!(security_context.shared_knowledge.contains_key("shared.monitoring"));
    let database_context = engine.context_for_incident(&a).unwrap();
    assert!(!database_context.shared_knowledge.contains_key("shared.monitoring"));
}

#[tokio::test]
async fn test_dashboard_reflects_finished_incidents() {
    let engine = engine_with(test_config(), pipeline_with(4, Behavior::Fail));
    for _ in 0..2 {
        let id = engine.trigger(spec()).await.unwrap().id;
        finish(&engine, &id).await;
    }

    let stats = engine.dashboard().stats().await;
    assert_eq!(stats.total_incidents, 2);
    assert_eq!(stats.active_incidents, 0);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.partially_resolved, 2);
    assert_eq!(stats.contexts, 2);
    let email = &stats.agents[&AgentId::from("email")];
    assert_eq!((email.executions, email.failures), (2, 2));
    assert_eq!(stats.agents[&AgentId::from("monitoring")].success_rate, 1.0);
}
