//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Each section converts into its application-level parameters through a
//! `to_*` method returning `(value, issues)`: a bad value never aborts, it
//! falls back to the default and reports a [`ConfigIssue`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use toolforge_application::config::{
    AutonomousParams, RetrievalKind, RetrievalParams, RuntimeConfig, SandboxParams, SwarmParams,
    TaskParams,
};
use toolforge_domain::{ConfigIssue, ConfigIssueCode, DEFAULT_HISTORY_CAPACITY};

/// `[gateway]`: OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatewayConfig {
    /// Base URL, without the `/chat/completions` suffix
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for FileGatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl FileGatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// `[retrieval]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetrievalConfig {
    /// "direct", "llm" or "embedding"
    pub strategy: String,
    pub similarity_threshold: f32,
    pub top_k: usize,
}

impl Default for FileRetrievalConfig {
    fn default() -> Self {
        let params = RetrievalParams::default();
        Self {
            strategy: params.kind.as_str().to_string(),
            similarity_threshold: params.similarity_threshold,
            top_k: params.top_k,
        }
    }
}

impl FileRetrievalConfig {
    pub fn to_params(&self) -> (RetrievalParams, Vec<ConfigIssue>) {
        let defaults = RetrievalParams::default();
        let mut issues = Vec::new();

        let kind = RetrievalKind::parse(&self.strategy).unwrap_or_else(|| {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnknownRetrievalStrategy,
                format!(
                    "retrieval.strategy: unknown value '{}', falling back to '{}'",
                    self.strategy, defaults.kind
                ),
            ));
            defaults.kind
        });

        let similarity_threshold = if (0.0..=1.0).contains(&self.similarity_threshold) {
            self.similarity_threshold
        } else {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ThresholdOutOfRange,
                format!(
                    "retrieval.similarity_threshold: {} is outside [0, 1], using {}",
                    self.similarity_threshold, defaults.similarity_threshold
                ),
            ));
            defaults.similarity_threshold
        };

        let top_k = positive("retrieval.top_k", self.top_k, defaults.top_k, &mut issues);

        (
            RetrievalParams {
                kind,
                similarity_threshold,
                top_k,
            },
            issues,
        )
    }
}

/// `[autonomous]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAutonomousConfig {
    /// Actions per day, -1 for unlimited
    pub daily_limit: i64,
    pub cooldown_seconds: u64,
    pub history_capacity: usize,
}

impl Default for FileAutonomousConfig {
    fn default() -> Self {
        let params = AutonomousParams::default();
        Self {
            daily_limit: params.daily_limit,
            cooldown_seconds: params.cooldown.as_secs(),
            history_capacity: params.history_capacity,
        }
    }
}

impl FileAutonomousConfig {
    pub fn to_params(&self) -> (AutonomousParams, Vec<ConfigIssue>) {
        let defaults = AutonomousParams::default();
        let mut issues = Vec::new();

        let daily_limit = if self.daily_limit < -1 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidBudgetLimit,
                format!(
                    "autonomous.daily_limit: {} is below -1, using {}",
                    self.daily_limit, defaults.daily_limit
                ),
            ));
            defaults.daily_limit
        } else {
            self.daily_limit
        };

        let history_capacity = positive(
            "autonomous.history_capacity",
            self.history_capacity,
            DEFAULT_HISTORY_CAPACITY,
            &mut issues,
        );

        (
            AutonomousParams {
                daily_limit,
                cooldown: Duration::from_secs(self.cooldown_seconds),
                history_capacity,
            },
            issues,
        )
    }
}

/// `[task]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTaskConfig {
    pub max_iterations: usize,
    pub history_capacity: usize,
}

impl Default for FileTaskConfig {
    fn default() -> Self {
        let params = TaskParams::default();
        Self {
            max_iterations: params.max_iterations,
            history_capacity: params.history_capacity,
        }
    }
}

impl FileTaskConfig {
    pub fn to_params(&self) -> (TaskParams, Vec<ConfigIssue>) {
        let defaults = TaskParams::default();
        let mut issues = Vec::new();
        let params = TaskParams {
            max_iterations: positive(
                "task.max_iterations",
                self.max_iterations,
                defaults.max_iterations,
                &mut issues,
            ),
            history_capacity: positive(
                "task.history_capacity",
                self.history_capacity,
                defaults.history_capacity,
                &mut issues,
            ),
        };
        (params, issues)
    }
}

/// `[swarm]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSwarmConfig {
    pub workers: usize,
    pub max_iterations: usize,
    pub poll_delay_ms: u64,
}

impl Default for FileSwarmConfig {
    fn default() -> Self {
        let params = SwarmParams::default();
        Self {
            workers: params.workers,
            max_iterations: params.max_iterations,
            poll_delay_ms: params.poll_delay.as_millis() as u64,
        }
    }
}

impl FileSwarmConfig {
    pub fn to_params(&self) -> (SwarmParams, Vec<ConfigIssue>) {
        let defaults = SwarmParams::default();
        let mut issues = Vec::new();
        let params = SwarmParams {
            workers: positive("swarm.workers", self.workers, defaults.workers, &mut issues),
            max_iterations: positive(
                "swarm.max_iterations",
                self.max_iterations,
                defaults.max_iterations,
                &mut issues,
            ),
            poll_delay: Duration::from_millis(self.poll_delay_ms),
        };
        (params, issues)
    }
}

/// `[sandbox]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSandboxConfig {
    pub max_call_depth: usize,
    pub timeout_seconds: u64,
    pub memory_limit_mb: usize,
}

impl Default for FileSandboxConfig {
    fn default() -> Self {
        let params = SandboxParams::default();
        Self {
            max_call_depth: params.max_call_depth,
            timeout_seconds: params.timeout.as_secs(),
            memory_limit_mb: params.memory_limit_bytes / (1024 * 1024),
        }
    }
}

impl FileSandboxConfig {
    pub fn to_params(&self) -> (SandboxParams, Vec<ConfigIssue>) {
        let defaults = SandboxParams::default();
        let mut issues = Vec::new();
        let timeout_seconds = positive(
            "sandbox.timeout_seconds",
            self.timeout_seconds as usize,
            defaults.timeout.as_secs() as usize,
            &mut issues,
        );
        let memory_limit_mb = positive(
            "sandbox.memory_limit_mb",
            self.memory_limit_mb,
            defaults.memory_limit_bytes / (1024 * 1024),
            &mut issues,
        );
        let params = SandboxParams {
            max_call_depth: positive(
                "sandbox.max_call_depth",
                self.max_call_depth,
                defaults.max_call_depth,
                &mut issues,
            ),
            timeout: Duration::from_secs(timeout_seconds as u64),
            memory_limit_bytes: memory_limit_mb * 1024 * 1024,
        };
        (params, issues)
    }
}

/// `[storage]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Registry document location. Defaults to the user data directory.
    pub path: Option<PathBuf>,
}

impl FileStorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("toolforge").join("tools.json"))
                .unwrap_or_else(|| PathBuf::from(".toolforge").join("tools.json"))
        })
    }
}

/// `[logging]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript of loop activity; disabled when unset
    pub transcript: Option<PathBuf>,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub gateway: FileGatewayConfig,
    pub retrieval: FileRetrievalConfig,
    pub autonomous: FileAutonomousConfig,
    pub task: FileTaskConfig,
    pub swarm: FileSwarmConfig,
    pub sandbox: FileSandboxConfig,
    pub storage: FileStorageConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        self.convert().1
    }

    /// Application parameters, with invalid values replaced by defaults.
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        self.convert().0
    }

    fn convert(&self) -> (RuntimeConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        let (retrieval, i) = self.retrieval.to_params();
        issues.extend(i);
        let (autonomous, i) = self.autonomous.to_params();
        issues.extend(i);
        let (task, i) = self.task.to_params();
        issues.extend(i);
        let (swarm, i) = self.swarm.to_params();
        issues.extend(i);
        let (sandbox, i) = self.sandbox.to_params();
        issues.extend(i);

        let config = RuntimeConfig {
            retrieval,
            autonomous,
            task,
            swarm,
            sandbox,
        };
        (config, issues)
    }
}

fn positive(field: &str, value: usize, default: usize, issues: &mut Vec<ConfigIssue>) -> usize {
    if value > 0 {
        return value;
    }
    issues.push(ConfigIssue::warning(
        ConfigIssueCode::ZeroLimit,
        format!("{}: must be greater than 0, using {}", field, default),
    ));
    default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[gateway]
endpoint = "http://localhost:11434/v1"
model = "llama3"

[retrieval]
strategy = "llm"
top_k = 3

[autonomous]
daily_limit = -1
cooldown_seconds = 5

[swarm]
workers = 2
poll_delay_ms = 100

[storage]
path = "/tmp/tools.json"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gateway.model, "llama3");
        assert_eq!(config.gateway.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.storage.resolved_path(), PathBuf::from("/tmp/tools.json"));

        let runtime = config.to_runtime_config();
        assert_eq!(runtime.retrieval.kind, RetrievalKind::Llm);
        assert_eq!(runtime.retrieval.top_k, 3);
        assert_eq!(runtime.autonomous.daily_limit, -1);
        assert_eq!(runtime.autonomous.cooldown, Duration::from_secs(5));
        assert_eq!(runtime.swarm.workers, 2);
        assert_eq!(runtime.swarm.poll_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: FileConfig = toml::from_str("[task]\nmax_iterations = 4\n").unwrap();
        let runtime = config.to_runtime_config();
        assert_eq!(runtime.task.max_iterations, 4);
        // Defaults should apply
        assert_eq!(runtime.task.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(runtime.retrieval.kind, RetrievalKind::Embedding);
        assert!(config.logging.transcript.is_none());
    }

    #[test]
    fn test_default_config_round_trips_runtime_defaults() {
        let runtime = FileConfig::default().to_runtime_config();
        let expected = RuntimeConfig::default();
        assert_eq!(runtime.retrieval.kind, expected.retrieval.kind);
        assert_eq!(runtime.autonomous.daily_limit, expected.autonomous.daily_limit);
        assert_eq!(runtime.autonomous.cooldown, expected.autonomous.cooldown);
        assert_eq!(runtime.swarm.poll_delay, expected.swarm.poll_delay);
        assert_eq!(
            runtime.sandbox.memory_limit_bytes,
            expected.sandbox.memory_limit_bytes
        );
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(FileConfig::default().validate().is_empty());
    }

    #[test]
    fn test_invalid_values_fall_back_with_warnings() {
        let mut config = FileConfig::default();
        config.retrieval.strategy = "vector".to_string();
        config.retrieval.similarity_threshold = 1.5;
        config.autonomous.daily_limit = -7;
        config.swarm.workers = 0;

        let issues = config.validate();
        let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                ConfigIssueCode::UnknownRetrievalStrategy,
                ConfigIssueCode::ThresholdOutOfRange,
                ConfigIssueCode::InvalidBudgetLimit,
                ConfigIssueCode::ZeroLimit,
            ]
        );
        assert!(!ConfigIssue::has_errors(&issues));

        let runtime = config.to_runtime_config();
        assert_eq!(runtime.retrieval.kind, RetrievalKind::Embedding);
        assert_eq!(runtime.autonomous.daily_limit, 50);
        assert_eq!(runtime.swarm.workers, 3);
    }
}
