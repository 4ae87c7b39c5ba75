//! Configuration loading, validation, and management for Convoy.
//!
//! Loads configuration from `~/.convoy/config.toml` with environment
//! variable overrides. Validates all settings at startup.

pub mod logging;

use convoy_core::GenerationOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use logging::init_tracing;

/// The root configuration structure.
///
/// Maps directly to `~/.convoy/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Assistant identity and conversation bounds
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Default sampling options for every model call
    #[serde(default)]
    pub generation: GenerationOptions,

    /// Retry behaviour for provider calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Streaming output filtering
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Log level and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Extra instructions appended to the system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Persona description appended to the system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,

    /// Maximum tool round-trips per user turn
    #[serde(default = "default_max_thread_depth")]
    pub max_thread_depth: usize,

    /// Number of past messages replayed into each turn
    #[serde(default = "default_history_length")]
    pub history_length: usize,
}

fn default_name() -> String {
    "Convoy".into()
}
fn default_model() -> String {
    "default".into()
}
fn default_greeting() -> String {
    "Hello, how can I help you today?".into()
}
fn default_max_thread_depth() -> usize {
    15
}
fn default_history_length() -> usize {
    50
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            model: default_model(),
            greeting: default_greeting(),
            instructions: None,
            persona: None,
            max_thread_depth: default_max_thread_depth(),
            history_length: default_history_length(),
        }
    }
}

/// How the delay between retry attempts grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay every time
    Constant,
    /// initial × attempt
    Linear,
    /// initial × 2^(attempt − 1)
    #[default]
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default)]
    pub backoff: BackoffStrategy,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff: BackoffStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Hide `<tools>`, `<memory>` and `<tool_help>` spans from streamed output
    #[serde(default = "default_true")]
    pub filter_markers: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            filter_markers: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.convoy/config.toml).
    ///
    /// Environment variables override the file:
    /// - `CONVOY_MODEL`
    /// - `CONVOY_MAX_DEPTH`
    /// - `CONVOY_LOG`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `CONVOY_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("CONVOY_MODEL") {
            self.assistant.model = model;
        }

        if let Some(depth) = lookup("CONVOY_MAX_DEPTH") {
            self.assistant.max_thread_depth = depth.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("CONVOY_MAX_DEPTH must be a non-negative integer, got '{depth}'"))
            })?;
        }

        if let Some(level) = lookup("CONVOY_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".convoy")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assistant.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("assistant.model must not be empty".into()));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError("retry.max_attempts must be at least 1".into()));
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "retry.initial_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }

        let problems = self.generation.validate();
        if !problems.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "generation: {}",
                problems.join("; ")
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}

impl From<ConfigError> for convoy_core::Error {
    fn from(err: ConfigError) -> Self {
        convoy_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.assistant.max_thread_depth, 15);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff, BackoffStrategy::Exponential);
        assert!(config.streaming.filter_markers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.assistant.name, config.assistant.name);
        assert_eq!(parsed.retry.max_delay_ms, config.retry.max_delay_ms);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            generation: GenerationOptions::default().with_temperature(5.0),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn inverted_retry_delays_rejected() {
        let mut config = AppConfig::default();
        config.retry.initial_delay_ms = 60_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.assistant.name, "Convoy");
    }

    #[test]
    fn load_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[assistant]
name = "Ada"
max_thread_depth = 4

[generation]
temperature = 0.2

[retry]
backoff = "linear"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.assistant.name, "Ada");
        assert_eq!(config.assistant.max_thread_depth, 4);
        assert_eq!(config.assistant.greeting, "Hello, how can I help you today?");
        assert_eq!(config.generation.temperature, Some(0.2));
        assert_eq!(config.retry.backoff, BackoffStrategy::Linear);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[assistant\nname = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CONVOY_MODEL", "big-model"),
            ("CONVOY_MAX_DEPTH", "7"),
            ("CONVOY_LOG", "debug"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.assistant.model, "big-model");
        assert_eq!(config.assistant.max_thread_depth, 7);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn bad_depth_override_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(|k| (k == "CONVOY_MAX_DEPTH").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("CONVOY_MAX_DEPTH"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("max_thread_depth = 15"));
        assert!(toml_str.contains("exponential"));
    }
}
