//! File configuration.
//!
//! Every section is optional. Declared metrics are validated when the file
//! is loaded, so a config that loads successfully can always be declared.

use crate::http::{ListenAddr, ReporterOptions};
use crate::metrics::{create_metric, AnyMetric, MetricOpts, Registration};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
    #[error("invalid metric {name:?}: {reason}")]
    InvalidMetric { name: String, reason: String },
}

/// Exposition endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: ListenAddr,
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: ListenAddr::default(),
            path: "/metrics".to_string(),
        }
    }
}

/// Process collector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub enabled: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub reporter: ReporterOptions,
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub metrics: Vec<MetricOpts>,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        content.parse()
    }

    /// Checks that every declared metric can be created.
    ///
    /// Metrics are built against a scratch registry that is dropped
    /// afterwards; nothing reaches the default registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scratch = Registry::new();
        self.declare(&Registration::detached().also(&scratch))
            .map(|_| ())
    }

    /// Creates every declared metric.
    pub fn declare(&self, registration: &Registration) -> Result<Vec<AnyMetric>, ConfigError> {
        self.metrics
            .iter()
            .map(|opts| {
                create_metric(opts, registration).map_err(|e| ConfigError::InvalidMetric {
                    name: opts.fully_qualified_name(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

impl std::str::FromStr for FileConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
