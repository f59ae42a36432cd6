// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Terminal rendering for incidents, live events and the dashboard.

use colored::{ColoredString, Colorize};

use triage_core::application::DashboardStats;
use triage_core::domain::events::{ContextEvent, IncidentEvent, MessageEvent};
use triage_core::domain::execution::ExecutionStatus;
use triage_core::domain::incident::{Incident, ResolutionStatus, WorkflowStatus};
use triage_core::infrastructure::DomainEvent;

pub fn execution_badge(status: ExecutionStatus) -> ColoredString {
    let label = format!("{:<8}", status.as_str());
    match status {
        ExecutionStatus::Success => label.green(),
        ExecutionStatus::Error => label.red(),
        ExecutionStatus::Skipped => label.dimmed(),
        ExecutionStatus::Running => label.cyan(),
        ExecutionStatus::Idle => label.normal(),
    }
}

pub fn workflow_badge(status: WorkflowStatus) -> ColoredString {
    match status {
        WorkflowStatus::Completed => status.as_str().green().bold(),
        WorkflowStatus::Failed => status.as_str().red().bold(),
        WorkflowStatus::Cancelled => status.as_str().yellow().bold(),
        WorkflowStatus::Pending | WorkflowStatus::Running => status.as_str().cyan(),
    }
}

pub fn resolution_badge(status: ResolutionStatus) -> ColoredString {
    match status {
        ResolutionStatus::Resolved => status.as_str().green(),
        ResolutionStatus::PartiallyResolved => status.as_str().yellow(),
        ResolutionStatus::Unresolved => status.as_str().red(),
        ResolutionStatus::Open | ResolutionStatus::Cancelled => status.as_str().dimmed(),
    }
}

pub fn format_confidence(confidence: Option<f64>) -> String {
    confidence
        .map(|c| format!("{:.1}%", c * 100.0))
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_duration_ms(duration_ms: Option<u64>) -> String {
    match duration_ms {
        None => "-".to_string(),
        Some(ms) if ms < 1000 => format!("{ms}ms"),
        Some(ms) => format!("{:.2}s", ms as f64 / 1000.0),
    }
}

/// One plain-text line per event, or `None` for events not worth showing.
pub fn event_line(event: &DomainEvent) -> Option<String> {
    let line = match event {
        DomainEvent::Incident(event) => {
            let id = event.incident_id().short().to_string();
            match event {
                IncidentEvent::IncidentTriggered {
                    title,
                    category,
                    severity,
                    ..
                } => format!("[{id}] triggered {severity} {category} incident: {title}"),
                IncidentEvent::StageStarted { agent_id, .. } => format!("[{id}] {agent_id} started"),
                IncidentEvent::StageRetried {
                    agent_id,
                    attempt,
                    error,
                    ..
                } => format!("[{id}] {agent_id} attempt {attempt} failed ({error}), retrying"),
                IncidentEvent::StageCompleted {
                    agent_id,
                    confidence,
                    duration_ms,
                    ..
                } => format!(
                    "[{id}] {agent_id} completed in {} (confidence {})",
                    format_duration_ms(Some(*duration_ms)),
                    format_confidence(*confidence)
                ),
                IncidentEvent::StageFailed {
                    agent_id,
                    error,
                    attempts,
                    ..
                } => format!("[{id}] {agent_id} failed after {attempts} attempt(s): {error}"),
                IncidentEvent::StageSkipped { agent_id, .. } => format!("[{id}] {agent_id} skipped"),
                IncidentEvent::IncidentFinished {
                    workflow_status,
                    resolution_status,
                    ..
                } => format!("[{id}] finished: {workflow_status} / {resolution_status}"),
            }
        }
        DomainEvent::Context(ContextEvent::ContextCreated { incident_id, .. }) => {
            format!("[{}] context created", incident_id.short())
        }
        // Every stage bumps the context several times.
        DomainEvent::Context(ContextEvent::ContextUpdated { .. }) => return None,
        DomainEvent::Message(event) => {
            let id = event
                .incident_id()
                .map(|i| i.short().to_string())
                .unwrap_or_else(|| "-".to_string());
            match event {
                MessageEvent::MessageSent {
                    sender,
                    receiver,
                    message_type,
                    ..
                } => format!("[{id}] a2a {sender} -> {receiver} ({message_type})"),
                MessageEvent::CollaborationOpened {
                    initiator,
                    participants,
                    task,
                    ..
                } => format!(
                    "[{id}] collaboration '{task}' opened by {initiator} with {} participant(s)",
                    participants.len()
                ),
                MessageEvent::CollaborationClosed { collaboration_id, .. } => {
                    format!("[{id}] collaboration {collaboration_id} closed")
                }
            }
        }
    };
    Some(line)
}

pub fn print_event(event: &DomainEvent) {
    let Some(line) = event_line(event) else {
        return;
    };
    let styled = match event {
        DomainEvent::Incident(IncidentEvent::StageFailed { .. }) => line.red(),
        DomainEvent::Incident(IncidentEvent::StageRetried { .. }) => line.yellow(),
        DomainEvent::Incident(IncidentEvent::StageCompleted { .. }) => line.green(),
        DomainEvent::Incident(IncidentEvent::IncidentFinished { .. })
        | DomainEvent::Incident(IncidentEvent::IncidentTriggered { .. }) => line.bold(),
        DomainEvent::Message(_) => line.dimmed(),
        _ => line.normal(),
    };
    println!("{styled}");
}

pub fn print_incident(incident: &Incident) {
    println!();
    println!("{} {}", "Incident".bold(), incident.id.to_string().bold());
    println!("  Title:      {}", incident.title);
    println!("  Category:   {} ({})", incident.category, incident.severity);
    if !incident.affected_systems.is_empty() {
        println!("  Systems:    {}", incident.affected_systems.join(", "));
    }
    println!(
        "  Status:     {} / {}",
        workflow_badge(incident.workflow_status),
        resolution_badge(incident.resolution_status)
    );
    if let Some(secs) = incident.resolution_time_secs() {
        println!("  Duration:   {secs:.2}s");
    }
    println!();

    println!("  {}", "Stages:".bold());
    for execution in &incident.executions {
        println!(
            "    {} {:<26} {:>8}  conf {:>6}  tries {}  msgs {}/{}",
            execution_badge(execution.status),
            execution.agent_name,
            format_duration_ms(execution.duration_ms),
            format_confidence(execution.confidence),
            execution.attempts,
            execution.messages_sent,
            execution.messages_received,
        );
        if let Some(error) = &execution.error {
            println!("      {}", error.red());
        }
    }

    let findings = &incident.findings;
    if !findings.is_empty() {
        println!();
        println!("  {}", "Findings:".bold());
        if let Some(root_cause) = &findings.root_cause {
            println!("    Root cause:  {root_cause}");
        }
        if let Some(page) = &findings.page_ref {
            println!("    Page:        {page}");
        }
        if let Some(ticket) = &findings.ticket_ref {
            println!("    Ticket:      {ticket}");
        }
        if !findings.remediation_actions.is_empty() {
            println!("    Remediation: {}", findings.remediation_actions.join(", "));
        }
        if let Some(resolution) = &findings.resolution {
            println!("    Resolution:  {resolution}");
        }
    }
}

pub fn print_dashboard(stats: &DashboardStats) {
    println!();
    println!("{}", "Dashboard:".bold());
    println!(
        "  Incidents:  {} total, {} active ({} completed, {} failed, {} cancelled)",
        stats.total_incidents, stats.active_incidents, stats.completed, stats.failed, stats.cancelled
    );
    println!(
        "  Resolution: {} resolved, {} partial, {} unresolved",
        stats.resolved, stats.partially_resolved, stats.unresolved
    );
    println!(
        "  Success:    {} (avg resolution {:.2}s)",
        format_confidence(Some(stats.success_rate)),
        stats.average_resolution_secs
    );
    println!(
        "  Contexts:   {} (avg confidence {})",
        stats.contexts,
        format_confidence(Some(stats.average_context_confidence))
    );
    println!(
        "  A2A:        {} messages, {} open / {} closed collaborations",
        stats.messages.total_messages, stats.messages.active_collaborations, stats.messages.closed_collaborations
    );

    if !stats.agents.is_empty() {
        println!();
        println!("  {}", "Agents:".bold());
        for (agent, agent_stats) in &stats.agents {
            println!(
                "    {:<12} runs {:>3}  ok {:>6}  avg {:>8}",
                agent.as_str(),
                agent_stats.executions,
                format_confidence(Some(agent_stats.success_rate)),
                format_duration_ms(Some(agent_stats.average_duration_ms.round() as u64)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::domain::incident::{IncidentCategory, IncidentId, Severity};
    use triage_core::swarm::AgentId;

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(Some(0.913)), "91.3%");
        assert_eq!(format_confidence(None), "-");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ms(Some(250)), "250ms");
        assert_eq!(format_duration_ms(Some(1500)), "1.50s");
        assert_eq!(format_duration_ms(None), "-");
    }

    #[test]
    fn test_event_lines() {
        let incident_id = IncidentId::from("INC-1700000000000-ABCDEF12");
        let triggered = DomainEvent::Incident(IncidentEvent::IncidentTriggered {
            incident_id: incident_id.clone(),
            title: "Pool exhausted".to_string(),
            category: IncidentCategory::Database,
            severity: Severity::Critical,
            triggered_at: chrono::Utc::now(),
        });
        let line = event_line(&triggered).unwrap();
        assert!(line.contains("critical database incident: Pool exhausted"));

        let skipped = DomainEvent::Incident(IncidentEvent::StageSkipped {
            incident_id,
            agent_id: AgentId::from("email"),
            skipped_at: chrono::Utc::now(),
        });
        assert!(event_line(&skipped).unwrap().ends_with("email skipped"));
    }
}
