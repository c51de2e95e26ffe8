//! Application configuration
//!
//! `AppConfig` carries command-line level settings. `EngineConfig` sizes the
//! local graph computer and can be loaded from a TOML file:
//!
//! ```toml
//! workers = 8
//! reduce_partitions = 2
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Application configuration structure
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        Self { verbose }
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Sizing of the local graph computer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Vertex partitions, and threads of the compute runtime
    pub workers: usize,
    /// Key partitions of the reduce stage; defaults to `workers`
    pub reduce_partitions: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            reduce_partitions: None,
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_reduce_partitions(mut self, partitions: usize) -> Self {
        self.reduce_partitions = Some(partitions);
        self
    }

    pub fn reduce_partitions(&self) -> usize {
        self.reduce_partitions.unwrap_or(self.workers)
    }

    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&document)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.reduce_partitions == Some(0) {
            return Err(ConfigError::Invalid {
                field: "reduce_partitions",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_follows_verbosity() {
        assert_eq!(AppConfig::new(0).log_level(), "info");
        assert_eq!(AppConfig::new(1).log_level(), "debug");
        assert_eq!(AppConfig::new(5).log_level(), "trace");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.reduce_partitions(), 4);
    }

    #[test]
    fn test_reduce_partitions_override() {
        let config = EngineConfig::from_toml_str("workers = 3\nreduce_partitions = 1\n").unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.reduce_partitions(), 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = EngineConfig::from_toml_str("workers = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "workers", .. }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EngineConfig::from_toml_str("threads = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/engine.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
