// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Orchestrator Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) controlling:
// - Stage execution policy (timeout, retry, confidence threshold)
// - Scenario autofill for incomplete trigger requests
// - Event bus sizing
// - Logging

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::error::OrchestratorError;

pub const API_VERSION: &str = "triage.dev/v1";
pub const KIND: &str = "OrchestratorConfig";
pub const CONFIG_PATH_ENV: &str = "TRIAGE_CONFIG_PATH";

/// Top-level orchestrator configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfigManifest {
    /// API version (must be "triage.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "OrchestratorConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: OrchestratorConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfigSpec {
    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub event_bus: EventBusConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Peer insights at or below this confidence are hidden from later stages
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Confidence recorded for a stage that reports none
    #[serde(default = "default_confidence")]
    pub default_confidence: f64,

    /// Upper bound for one stage attempt (e.g. "30s", "2m")
    #[serde(default = "default_stage_timeout", with = "humantime_serde")]
    pub stage_timeout: Duration,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Fill missing trigger fields from the built-in scenario catalog instead
    /// of rejecting the request
    #[serde(default)]
    pub autofill_incident_scenario: bool,

    /// Artificial per-stage delay used by the standard agents
    #[serde(default)]
    pub simulated_latency: LatencyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per stage, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, where `attempt` is the 1-based
    /// number of the attempt that just failed.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let millis = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(millis.min(u64::MAX as f64) as u64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyConfig {
    #[serde(default)]
    pub min_ms: u64,
    #[serde(default)]
    pub max_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Events buffered per subscriber before the oldest are dropped
    #[serde(default = "default_event_bus_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_confidence() -> f64 {
    0.8
}

fn default_stage_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_event_bus_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            default_confidence: default_confidence(),
            stage_timeout: default_stage_timeout(),
            retry: RetryPolicy::default(),
            autofill_incident_scenario: false,
            simulated_latency: LatencyConfig::default(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_bus_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for OrchestratorConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "triage-orchestrator".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: OrchestratorConfigSpec::default(),
        }
    }
}

impl OrchestratorConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. TRIAGE_CONFIG_PATH environment variable
    /// 2. ./triage-config.yaml (working directory)
    /// 3. ~/.triage/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./triage-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".triage").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails loudly if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Invalid values are
    /// logged and ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("TRIAGE_LOG_LEVEL") {
            tracing::info!("Environment override: TRIAGE_LOG_LEVEL={}", level);
            self.logging_mut().level = level;
        }

        if let Some(val) = lookup("TRIAGE_STAGE_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) => {
                    tracing::info!("Environment override: TRIAGE_STAGE_TIMEOUT_SECS={}", secs);
                    self.spec.workflow.stage_timeout = Duration::from_secs(secs);
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for TRIAGE_STAGE_TIMEOUT_SECS: '{}'. Expected whole seconds. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Some(val) = lookup("TRIAGE_AUTOFILL") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: TRIAGE_AUTOFILL=true");
                    self.spec.workflow.autofill_incident_scenario = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: TRIAGE_AUTOFILL=false");
                    self.spec.workflow.autofill_incident_scenario = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for TRIAGE_AUTOFILL: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        self.spec
            .observability
            .as_ref()
            .and_then(|o| o.logging.clone())
            .unwrap_or_default()
    }

    fn logging_mut(&mut self) -> &mut LoggingConfig {
        self.spec
            .observability
            .get_or_insert_with(ObservabilityConfig::default)
            .logging
            .get_or_insert_with(LoggingConfig::default)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        let fail = |msg: String| Err(OrchestratorError::Configuration(msg));

        if self.api_version != API_VERSION {
            return fail(format!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version, API_VERSION
            ));
        }

        if self.kind != KIND {
            return fail(format!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND));
        }

        if self.metadata.name.is_empty() {
            return fail("metadata.name cannot be empty".to_string());
        }

        let workflow = &self.spec.workflow;
        for (name, value) in [
            ("confidence_threshold", workflow.confidence_threshold),
            ("default_confidence", workflow.default_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return fail(format!("spec.workflow.{name} must be within [0, 1], got {value}"));
            }
        }

        if workflow.stage_timeout.is_zero() {
            return fail("spec.workflow.stage_timeout must be greater than zero".to_string());
        }

        if workflow.retry.max_attempts == 0 {
            return fail("spec.workflow.retry.max_attempts must be at least 1".to_string());
        }

        if workflow.retry.backoff_multiplier.is_nan() || workflow.retry.backoff_multiplier < 1.0 {
            return fail(format!(
                "spec.workflow.retry.backoff_multiplier must be >= 1.0, got {}",
                workflow.retry.backoff_multiplier
            ));
        }

        if workflow.simulated_latency.min_ms > workflow.simulated_latency.max_ms {
            return fail(format!(
                "spec.workflow.simulated_latency.min_ms ({}) exceeds max_ms ({})",
                workflow.simulated_latency.min_ms, workflow.simulated_latency.max_ms
            ));
        }

        if self.spec.event_bus.capacity == 0 {
            return fail("spec.event_bus.capacity must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = OrchestratorConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert!(!manifest.metadata.name.is_empty());

        let workflow = &manifest.spec.workflow;
        assert_eq!(workflow.confidence_threshold, 0.7);
        assert_eq!(workflow.default_confidence, 0.8);
        assert_eq!(workflow.stage_timeout, Duration::from_secs(30));
        assert_eq!(workflow.retry.max_attempts, 1);
        assert!(!workflow.autofill_incident_scenario);
        assert_eq!(manifest.spec.event_bus.capacity, 1000);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
apiVersion: triage.dev/v1
kind: OrchestratorConfig
metadata:
  name: ops-node
spec:
  workflow:
    stage_timeout: 2m 30s
    retry:
      max_attempts: 3
    autofill_incident_scenario: true
  observability:
    logging:
      level: debug
"#;
        let manifest = OrchestratorConfigManifest::from_yaml_str(yaml).unwrap();
        let workflow = &manifest.spec.workflow;
        assert_eq!(workflow.stage_timeout, Duration::from_secs(150));
        assert_eq!(workflow.retry.max_attempts, 3);
        assert_eq!(workflow.retry.initial_backoff_ms, 200);
        assert!(workflow.autofill_incident_scenario);
        assert_eq!(workflow.confidence_threshold, 0.7);
        assert_eq!(manifest.spec.event_bus.capacity, 1000);
        assert_eq!(manifest.logging().level, "debug");
        assert_eq!(manifest.logging().format, "text");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage-config.yaml");

        let mut manifest = OrchestratorConfigManifest::default();
        manifest.metadata.name = "file-node".to_string();
        manifest.spec.workflow.simulated_latency = LatencyConfig { min_ms: 5, max_ms: 25 };
        manifest.to_yaml_file(&path).unwrap();

        let loaded = OrchestratorConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.metadata.name, "file-node");
        assert_eq!(loaded.spec.workflow.simulated_latency, LatencyConfig { min_ms: 5, max_ms: 25 });
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = OrchestratorConfigManifest::load_or_default(Some(dir.path().join("absent.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let mut manifest = OrchestratorConfigManifest::default();
        let env: HashMap<&str, &str> = HashMap::from([
            ("TRIAGE_LOG_LEVEL", "warn"),
            ("TRIAGE_STAGE_TIMEOUT_SECS", "5"),
            ("TRIAGE_AUTOFILL", "yes"),
        ]);
        manifest.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(manifest.logging().level, "warn");
        assert_eq!(manifest.spec.workflow.stage_timeout, Duration::from_secs(5));
        assert!(manifest.spec.workflow.autofill_incident_scenario);

        let bad: HashMap<&str, &str> = HashMap::from([
            ("TRIAGE_STAGE_TIMEOUT_SECS", "soon"),
            ("TRIAGE_AUTOFILL", "maybe"),
        ]);
        manifest.apply_overrides_from(|k| bad.get(k).map(|v| v.to_string()));
        assert_eq!(manifest.spec.workflow.stage_timeout, Duration::from_secs(5));
        assert!(manifest.spec.workflow.autofill_incident_scenario);
    }

    #[test]
    fn test_validation() {
        let mut manifest = OrchestratorConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.workflow.confidence_threshold = 1.2;
        assert!(manifest.validate().is_err());
        manifest.spec.workflow.confidence_threshold = 0.7;

        manifest.spec.workflow.stage_timeout = Duration::ZERO;
        assert!(manifest.validate().is_err());
        manifest.spec.workflow.stage_timeout = Duration::from_secs(1);

        manifest.spec.workflow.retry.max_attempts = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.workflow.retry.max_attempts = 2;

        manifest.spec.workflow.retry.backoff_multiplier = 0.5;
        assert!(manifest.validate().is_err());
        manifest.spec.workflow.retry.backoff_multiplier = 2.0;

        manifest.spec.workflow.simulated_latency = LatencyConfig { min_ms: 10, max_ms: 1 };
        assert!(manifest.validate().is_err());
        manifest.spec.workflow.simulated_latency = LatencyConfig::default();

        manifest.spec.event_bus.capacity = 0;
        assert!(matches!(manifest.validate(), Err(OrchestratorError::Configuration(_))));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
        };
        assert_eq!(policy.backoff_after(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(400));
    }
}
