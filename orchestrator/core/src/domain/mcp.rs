// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Shared Analysis Context (MCP)
//!
//! One [`MCPContext`] per incident accumulates what each pipeline stage
//! learned, so later stages can read the insights of earlier ones.
//!
//! ## Invariants
//!
//! - `version` starts at 1 and strictly increases on every mutation.
//! - Every stored confidence lies in `[0, 1]`; NaN is stored as `0`.
//! - A stage never sees its own insight in [`MCPContext::insights_for`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use triage_swarm::AgentId;

use crate::domain::incident::IncidentId;

pub const INCIDENT_ANALYSIS: &str = "incident_analysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInsight {
    pub payload: Value,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPattern {
    pub pattern: String,
    pub description: String,
    pub contributing_agents: Vec<AgentId>,
    pub confidence: f64,
    pub recorded_at: DateTime<Utc>,
}

impl CorrelationPattern {
    pub fn new(
        pattern: impl Into<String>,
        description: impl Into<String>,
        contributing_agents: Vec<AgentId>,
        confidence: f64,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            description: description.into(),
            contributing_agents,
            confidence: clamp_confidence(confidence),
            recorded_at: Utc::now(),
        }
    }
}

/// What changed in a context mutation. Handed to store observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextMutation {
    Insight { agent_id: AgentId, confidence: f64 },
    Knowledge { key: String },
    Pattern { pattern: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPContext {
    pub id: ContextId,
    pub incident_id: IncidentId,
    pub context_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    pub agent_insights: BTreeMap<AgentId, AgentInsight>,
    pub shared_knowledge: BTreeMap<String, Value>,
    pub correlation_patterns: Vec<CorrelationPattern>,
    pub data_sources: Vec<AgentId>,
}

impl MCPContext {
    pub fn new(incident_id: IncidentId) -> Self {
        let now = Utc::now();
        Self {
            id: ContextId::new(),
            incident_id,
            context_type: INCIDENT_ANALYSIS.to_string(),
            created_at: now,
            updated_at: now,
            version: 1,
            agent_insights: BTreeMap::new(),
            shared_knowledge: BTreeMap::new(),
            correlation_patterns: Vec::new(),
            data_sources: Vec::new(),
        }
    }

    /// Replace `agent_id`'s insight. Returns the new version and what changed.
    pub fn update_insight(&mut self, agent_id: AgentId, payload: Value, confidence: f64) -> (u64, ContextMutation) {
        let confidence = clamp_confidence(confidence);
        if !self.data_sources.contains(&agent_id) {
            self.data_sources.push(agent_id.clone());
        }
        self.agent_insights.insert(
            agent_id.clone(),
            AgentInsight {
                payload,
                confidence,
                timestamp: Utc::now(),
            },
        );
        (self.bump(), ContextMutation::Insight { agent_id, confidence })
    }

    pub fn share_knowledge(&mut self, key: impl Into<String>, value: Value) -> (u64, ContextMutation) {
        let key = key.into();
        self.shared_knowledge.insert(key.clone(), value);
        (self.bump(), ContextMutation::Knowledge { key })
    }

    pub fn record_pattern(&mut self, pattern: CorrelationPattern) -> (u64, ContextMutation) {
        let name = pattern.pattern.clone();
        self.correlation_patterns.push(pattern);
        (self.bump(), ContextMutation::Pattern { pattern: name })
    }

    /// Arithmetic mean of every recorded per-agent confidence, `0` when none.
    pub fn aggregate_confidence(&self) -> f64 {
        if self.agent_insights.is_empty() {
            return 0.0;
        }
        let total: f64 = self.agent_insights.values().map(|i| i.confidence).sum();
        total / self.agent_insights.len() as f64
    }

    /// Context view for `requesting_agent`: peers whose confidence is strictly
    /// above `threshold`, never the requester itself.
    pub fn insights_for(&self, requesting_agent: &AgentId, threshold: f64) -> ContextInsights {
        let peer_insights = self
            .agent_insights
            .iter()
            .filter(|(agent, insight)| *agent != requesting_agent && insight.confidence > threshold)
            .map(|(agent, insight)| (agent.clone(), insight.clone()))
            .collect();

        ContextInsights {
            context_id: self.id,
            version: self.version,
            shared_knowledge: self.shared_knowledge.clone(),
            peer_insights,
            correlation_patterns: self.correlation_patterns.clone(),
            aggregate_confidence: self.aggregate_confidence(),
        }
    }

    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            context_id: self.id,
            incident_id: self.incident_id.clone(),
            version: self.version,
            agent_count: self.agent_insights.len(),
            average_confidence: self.aggregate_confidence(),
            pattern_count: self.correlation_patterns.len(),
            knowledge_keys: self.shared_knowledge.len(),
            updated_at: self.updated_at,
        }
    }

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.updated_at = Utc::now();
        self.version
    }
}

/// Read-only view of a context handed to a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextInsights {
    pub context_id: ContextId,
    pub version: u64,
    pub shared_knowledge: BTreeMap<String, Value>,
    pub peer_insights: BTreeMap<AgentId, AgentInsight>,
    pub correlation_patterns: Vec<CorrelationPattern>,
    pub aggregate_confidence: f64,
}

impl ContextInsights {
    pub fn knowledge(&self, key: &str) -> Option<&Value> {
        self.shared_knowledge.get(key)
    }

    pub fn peer(&self, agent_id: &str) -> Option<&AgentInsight> {
        self.peer_insights.get(&AgentId::from(agent_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub context_id: ContextId,
    pub incident_id: IncidentId,
    pub version: u64,
    pub agent_count: usize,
    pub average_confidence: f64,
    pub pattern_count: usize,
    pub knowledge_keys: usize,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> MCPContext {
        MCPContext::new(IncidentId::from("INC-1-ABCDEF01"))
    }

    #[test]
    fn test_new_context_starts_at_version_one() {
        let context = ctx();
        assert_eq!(context.version, 1);
        assert_eq!(context.context_type, INCIDENT_ANALYSIS);
        assert_eq!(context.aggregate_confidence(), 0.0);
    }

    #[test]
    fn test_every_mutation_bumps_version() {
        let mut context = ctx();
        let (v1, _) = context.update_insight(AgentId::from("monitoring"), json!({}), 0.9);
        let (v2, _) = context.share_knowledge("incident_type", json!("database"));
        let (v3, _) = context.record_pattern(CorrelationPattern::new("p", "d", vec![], 0.8));
        let (v4, _) = context.update_insight(AgentId::from("monitoring"), json!({}), 0.7);
        assert!(1 < v1 && v1 < v2 && v2 < v3 && v3 < v4);
        assert_eq!(context.data_sources.len(), 1);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut context = ctx();
        context.update_insight(AgentId::from("a"), json!({}), 1.7);
        context.update_insight(AgentId::from("b"), json!({}), -0.2);
        context.update_insight(AgentId::from("c"), json!({}), f64::NAN);
        let confidences: Vec<f64> = context.agent_insights.values().map(|i| i.confidence).collect();
        assert_eq!(confidences, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_insights_exclude_self_and_low_confidence() {
        let mut context = ctx();
        context.update_insight(AgentId::from("monitoring"), json!({"cpu": 97}), 0.92);
        context.update_insight(AgentId::from("rca"), json!({}), 0.7);
        context.update_insight(AgentId::from("pager"), json!({}), 0.95);

        let view = context.insights_for(&AgentId::from("pager"), 0.7);
        let peers: Vec<&str> = view.peer_insights.keys().map(|a| a.as_str()).collect();
        assert_eq!(peers, vec!["monitoring"]);
        assert!((view.aggregate_confidence - (0.92 + 0.7 + 0.95) / 3.0).abs() < 1e-9);
        assert!(view.peer("monitoring").is_some());
    }
}
