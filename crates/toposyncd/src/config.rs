//! Daemon configuration.
//!
//! Configuration is an explicit struct handed to the pieces that need it; no
//! process-wide singleton. Values come from defaults, then an optional JSON
//! config file, then `TOPOSYNCD_*` environment overrides, in that order.

use crate::error::{Result, ToposyncError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default bound of the persistence/derived-event queue.
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Runtime configuration for toposyncd.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopoSyncConfig {
    /// Event feed path (newline-delimited JSON). `None` reads stdin.
    pub input: Option<PathBuf>,
    /// Capacity of the bounded queue between dispatcher and persistence
    /// worker.
    pub persistence_queue_capacity: usize,
    /// `tracing` filter directive, e.g. `info` or `toposyncd=debug`.
    pub log_filter: String,
}

impl Default for TopoSyncConfig {
    fn default() -> Self {
        TopoSyncConfig {
            input: None,
            persistence_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            log_filter: "info".to_string(),
        }
    }
}

impl TopoSyncConfig {
    /// Loads configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TopoSyncConfig = serde_json::from_str(&contents)
            .map_err(|e| ToposyncError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `TOPOSYNCD_*` environment overrides.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(input) = std::env::var("TOPOSYNCD_INPUT") {
            self.input = Some(PathBuf::from(input));
        }
        if let Ok(capacity) = std::env::var("TOPOSYNCD_QUEUE_CAPACITY") {
            self.persistence_queue_capacity = capacity.parse().map_err(|_| {
                ToposyncError::Config(format!("bad TOPOSYNCD_QUEUE_CAPACITY: {capacity}"))
            })?;
        }
        if let Ok(filter) = std::env::var("TOPOSYNCD_LOG_FILTER") {
            self.log_filter = filter;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks the configuration for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.persistence_queue_capacity == 0 {
            return Err(ToposyncError::Config(
                "persistence_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.log_filter.is_empty() {
            return Err(ToposyncError::Config(
                "log_filter cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = TopoSyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.persistence_queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(config.input.is_none());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = TopoSyncConfig {
            persistence_queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ToposyncError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"input": "/var/run/topo-events.ndjson", "persistence_queue_capacity": 64}}"#
        )
        .unwrap();

        let config = TopoSyncConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.input,
            Some(PathBuf::from("/var/run/topo-events.ndjson"))
        );
        assert_eq!(config.persistence_queue_capacity, 64);
        // Unspecified fields keep their defaults.
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_from_file_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(TopoSyncConfig::from_file(file.path()).is_err());
    }
}
