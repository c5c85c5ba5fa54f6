//! Configuration management for exec-bridge.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::execution::{ExecutionTarget, ExitPolicy, TargetRegistry, TargetSpec, DEFAULT_TIMEOUT};

/// Name of the target registered by default.
pub const LOCAL_TARGET: &str = "default/local";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Execution settings.
    pub execution: ExecutionSection,
    /// Known targets, keyed by `namespace/name`.
    pub targets: BTreeMap<String, TargetSpec>,
    /// Logging configuration.
    pub logging: LoggingSection,
}

impl Default for Config {
    fn default() -> Self {
        let mut targets = BTreeMap::new();
        targets.insert(LOCAL_TARGET.to_string(), TargetSpec::default());

        Self {
            execution: ExecutionSection::default(),
            targets,
            logging: LoggingSection::default(),
        }
    }
}

/// Execution configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    /// Seconds to wait for a terminal event.
    pub timeout_secs: u64,
    /// How nonzero exit codes are reported.
    pub exit_policy: ExitPolicy,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            exit_policy: ExitPolicy::default(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// File targets are merged with [`LOCAL_TARGET`], which is kept unless
    /// the file defines it itself.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let mut config: Self = serde_json::from_str(&content).map_err(ConfigError::Json)?;
        config
            .targets
            .entry(LOCAL_TARGET.to_string())
            .or_default();
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(secs) = std::env::var("EXEC_BRIDGE_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.execution.timeout_secs = secs;
            }
        }

        if let Ok(policy) = std::env::var("EXEC_BRIDGE_EXIT_POLICY") {
            if let Ok(policy) = serde_json::from_value(serde_json::Value::String(policy)) {
                self.execution.exit_policy = policy;
            }
        }

        if let Ok(level) = std::env::var("EXEC_BRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(secs) = args.timeout_secs {
            self.execution.timeout_secs = secs;
        }

        if args.fail_on_nonzero {
            self.execution.exit_policy = ExitPolicy::FailOnNonZero;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Check that every target key is a valid `namespace/name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in self.targets.keys() {
            key.parse::<ExecutionTarget>()
                .map_err(|_| ConfigError::InvalidTarget(key.clone()))?;
        }
        Ok(())
    }

    /// Build the target registry from the `targets` section.
    pub fn registry(&self) -> Result<TargetRegistry, ConfigError> {
        self.targets
            .iter()
            .map(|(key, spec)| {
                key.parse::<ExecutionTarget>()
                    .map(|target| (target, spec.clone()))
                    .map_err(|_| ConfigError::InvalidTarget(key.clone()))
            })
            .collect()
    }

    /// Execution timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.execution.timeout_secs)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Target key is not `namespace/name`.
    InvalidTarget(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidTarget(key) => write!(f, "invalid target name: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}
