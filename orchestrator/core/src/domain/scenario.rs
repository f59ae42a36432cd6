// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Built-in incident scenario catalog.
//!
//! Used to fill incomplete trigger requests when
//! `spec.workflow.autofill_incident_scenario` is enabled, and by the RCA stage
//! to recognise a known failure mode by title.

use rand::seq::IndexedRandom;

use crate::domain::incident::{IncidentCategory, IncidentSpec, Severity};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncidentScenario {
    pub title: &'static str,
    pub description: &'static str,
    pub category: IncidentCategory,
    pub severity: Severity,
    pub affected_systems: &'static [&'static str],
    pub root_cause: &'static str,
}

pub static SCENARIOS: [IncidentScenario; 5] = [
    IncidentScenario {
        title: "Database Connection Pool Exhaustion - Production MySQL",
        description: "Production MySQL database experiencing connection pool exhaustion with applications unable to establish new connections.",
        category: IncidentCategory::Database,
        severity: Severity::Critical,
        affected_systems: &["mysql-prod-01", "mysql-prod-02", "app-servers-pool"],
        root_cause: "Connection pool exhaustion due to long-running queries and insufficient connection cleanup",
    },
    IncidentScenario {
        title: "DDoS Attack Detected - Main Web Application",
        description: "Distributed Denial of Service attack targeting main web application. Traffic spike: 50,000 requests/second.",
        category: IncidentCategory::Security,
        severity: Severity::Critical,
        affected_systems: &["web-app-prod", "load-balancer-01", "cdn-endpoints"],
        root_cause: "Coordinated DDoS attack using botnet across multiple geographic regions",
    },
    IncidentScenario {
        title: "Kubernetes Pod Crash Loop - Microservices",
        description: "Critical microservices experiencing crash loop backoff in Kubernetes cluster. Pod restart count exceeded threshold.",
        category: IncidentCategory::Container,
        severity: Severity::High,
        affected_systems: &["k8s-cluster-prod", "user-service", "order-service"],
        root_cause: "Memory limits too restrictive for current workload causing OOMKilled events",
    },
    IncidentScenario {
        title: "Network Switch Stack Failure - Data Center",
        description: "Core network switch stack failure in primary data center causing network segmentation across VLANs.",
        category: IncidentCategory::Network,
        severity: Severity::Critical,
        affected_systems: &["core-switch-stack", "vlan-infrastructure", "inter-dc-links"],
        root_cause: "Switch stack master election failure due to firmware bug and split-brain condition",
    },
    IncidentScenario {
        title: "API Rate Limit Exceeded - Payment Integration",
        description: "Third-party payment API rate limits exceeded causing transaction failures. 95% of payment requests failing.",
        category: IncidentCategory::Api,
        severity: Severity::High,
        affected_systems: &["payment-service", "checkout-api", "billing-system"],
        root_cause: "Inefficient API call patterns and missing request throttling mechanisms",
    },
];

impl IncidentScenario {
    pub fn to_spec(&self) -> IncidentSpec {
        IncidentSpec::new(self.title, self.category, self.severity)
            .with_description(self.description)
            .with_affected_systems(self.affected_systems.iter().copied())
    }
}

pub fn random_scenario() -> &'static IncidentScenario {
    SCENARIOS.choose(&mut rand::rng()).unwrap_or(&SCENARIOS[0])
}

pub fn scenario_for_category(category: IncidentCategory) -> Option<&'static IncidentScenario> {
    SCENARIOS.iter().find(|s| s.category == category)
}

pub fn scenario_by_title(title: &str) -> Option<&'static IncidentScenario> {
    SCENARIOS.iter().find(|s| s.title == title)
}

/// Fill the gaps of `spec` from the catalog. A requested category without a
/// catalog entry keeps its category and gets a generic title.
pub fn autofill(mut spec: IncidentSpec) -> IncidentSpec {
    let scenario = match spec.category {
        Some(category) => scenario_for_category(category),
        None => Some(random_scenario()),
    };

    match scenario {
        Some(scenario) => {
            spec.category.get_or_insert(scenario.category);
            spec.severity.get_or_insert(scenario.severity);
            if spec.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
                spec.title = Some(scenario.title.to_string());
                if spec.description.is_none() {
                    spec.description = Some(scenario.description.to_string());
                }
            }
            if spec.affected_systems.is_empty() {
                spec.affected_systems = scenario.affected_systems.iter().map(|s| s.to_string()).collect();
            }
        }
        None => {
            let category = spec.category.unwrap_or(IncidentCategory::Infrastructure);
            spec.severity.get_or_insert(Severity::Medium);
            if spec.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
                spec.title = Some(format!("{} service degradation", title_case(category.as_str())));
            }
        }
    }

    spec
}

pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
