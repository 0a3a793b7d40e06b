//! Configuration module for rxflow
//!
//! Engine settings are read from a TOML file. Every field has a default, so
//! a partial file (or none at all) is valid.
//!
//! # Config Location
//!
//! [`EngineConfig::load_or_default`] looks in the platform config directory:
//! - **Linux**: `~/.config/rxflow/rxflow.toml`
//! - **macOS**: `~/Library/Application Support/rxflow/rxflow.toml`
//! - **Windows**: `%APPDATA%\rxflow\rxflow.toml`
//!
//! # Example
//!
//! ```toml
//! [harness]
//! timeout_ms = 2000
//!
//! [merge]
//! worker_threads = 2
//! queue_capacity = 64
//!
//! [logging]
//! filter = "info,rxflow=debug"
//! ```

use crate::error::{Result, ResultExt, RxflowError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for the config directory
pub const APP_ID: &str = "rxflow";

/// Config filename
pub const CONFIG_FILE: &str = "rxflow.toml";

/// Default verification timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default parallel-merge channel capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default number of pooled merge workers
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Default park interval for waiting threads in milliseconds
pub const DEFAULT_IDLE_WAIT_MS: u64 = 5;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Path of the config file in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

// ==================== Sections ====================

/// Verification harness defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Upper bound on waiting for any single scripted signal
    pub timeout_ms: u64,

    /// Demand requested on subscribe; `None` is unbounded
    pub initial_request: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            initial_request: None,
        }
    }
}

/// `merge_parallel` settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Pool size; `0` spawns one thread per upstream instead
    pub worker_threads: usize,

    /// Capacity of the bounded worker channel
    pub queue_capacity: usize,

    /// How long idle workers and waiters park between checks
    pub idle_wait_ms: u64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_wait_ms: DEFAULT_IDLE_WAIT_MS,
        }
    }
}

/// Logging settings used by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,

    /// Directory for daily rolling log files; console only when unset
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: None,
        }
    }
}

// ==================== Engine Config ====================

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub harness: HarnessConfig,
    pub merge: MergeConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// Load from the platform config directory, returning defaults if the file
    /// is missing or invalid
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            tracing::debug!("No config directory on this platform, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {:?}", path))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.merge.queue_capacity == 0 {
            return Err(RxflowError::Config(
                "merge.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.harness.timeout_ms == 0 {
            return Err(RxflowError::Config(
                "harness.timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.harness.timeout_ms, 1000);
        assert_eq!(config.harness.initial_request, None);
        assert_eq!(config.merge.queue_capacity, 256);
        assert_eq!(config.merge.worker_threads, 4);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [merge]
            queue_capacity = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.merge.queue_capacity, 8);
        assert_eq!(config.merge.worker_threads, DEFAULT_WORKER_THREADS);
        assert_eq!(config.harness, HarnessConfig::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = EngineConfig::from_toml_str("[merge]\nqueue_capacity = 0\n").unwrap_err();
        assert!(matches!(err, RxflowError::Config(_)));
    }

    #[test]
    fn test_unreadable_file_keeps_io_source() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = EngineConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));
        match err {
            RxflowError::WithContext { source, .. } => {
                assert!(matches!(*source, RxflowError::Io(_)))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_save_into_file_path_fails_with_io() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let err = EngineConfig::default()
            .save(blocker.join("rxflow.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to create config directory"));
        assert!(matches!(
            err,
            RxflowError::WithContext { ref source, .. } if matches!(**source, RxflowError::Io(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        let err = EngineConfig::from_toml_str("[harness\n").unwrap_err();
        assert!(matches!(err, RxflowError::Toml(_)));
    }
}
