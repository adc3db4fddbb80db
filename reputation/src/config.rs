//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tronguard_utils::LogFormat;

use crate::lifecycle::TemporaryPolicy;
use crate::ReputationError;

/// Configuration for the reputation engine and the store it runs on.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in mebibytes.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,

    /// Lifetime of an unpromoted vote-created entry.
    #[serde(default = "default_day_secs")]
    pub temporary_window_secs: u64,

    /// How long after casting a voter may still cancel.
    #[serde(default = "default_day_secs")]
    pub revocation_window_secs: u64,

    /// Distinct voters needed to promote a temporary entry.
    #[serde(default = "default_promotion_threshold")]
    pub promotion_threshold: u32,

    /// Extra attempts for a transaction that failed transiently.
    #[serde(default = "default_storage_retry_attempts")]
    pub storage_retry_attempts: u32,

    /// How many recent records the detailed verify report lists.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tronguard_data")
}

fn default_map_size_mb() -> usize {
    256
}

fn default_max_dbs() -> u32 {
    16
}

fn default_day_secs() -> u64 {
    86_400
}

fn default_promotion_threshold() -> u32 {
    3
}

fn default_storage_retry_attempts() -> u32 {
    3
}

fn default_recent_limit() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ReputationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReputationError::ConfigUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ReputationError> {
        let config: Self =
            toml::from_str(s).map_err(|e| ReputationError::ConfigUnavailable(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ReputationError> {
        toml::to_string_pretty(self).map_err(|e| ReputationError::ConfigUnavailable(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReputationError> {
        if self.promotion_threshold == 0 {
            return Err(ReputationError::ConfigUnavailable(
                "promotion_threshold must be at least 1".to_string(),
            ));
        }
        if self.map_size_mb == 0 {
            return Err(ReputationError::ConfigUnavailable(
                "map_size_mb must be positive".to_string(),
            ));
        }
        self.log_format()?;
        Ok(())
    }

    /// The parsed `log_format`.
    pub fn log_format(&self) -> Result<LogFormat, ReputationError> {
        self.log_format
            .parse()
            .map_err(ReputationError::ConfigUnavailable)
    }

    /// LMDB map size in bytes.
    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn temporary_policy(&self) -> TemporaryPolicy {
        TemporaryPolicy {
            window_secs: self.temporary_window_secs,
            revocation_window_secs: self.revocation_window_secs,
            promotion_threshold: self.promotion_threshold,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            max_dbs: default_max_dbs(),
            temporary_window_secs: default_day_secs(),
            revocation_window_secs: default_day_secs(),
            promotion_threshold: default_promotion_threshold(),
            storage_retry_attempts: default_storage_retry_attempts(),
            recent_limit: default_recent_limit(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = EngineConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = EngineConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.promotion_threshold, 3);
        assert_eq!(config.temporary_window_secs, 86_400);
        assert_eq!(config.data_dir, PathBuf::from("./tronguard_data"));
        assert_eq!(config.log_format, "human");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            promotion_threshold = 5
            revocation_window_secs = 600
        "#;
        let config = EngineConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.promotion_threshold, 5);
        assert_eq!(config.revocation_window_secs, 600);
        assert_eq!(config.storage_retry_attempts, 3); // default
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let result = EngineConfig::from_toml_str("promotion_threshold = 0");
        assert!(matches!(result, Err(ReputationError::ConfigUnavailable(_))));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let result = EngineConfig::from_toml_str("log_format = \"xml\"");
        assert!(matches!(result, Err(ReputationError::ConfigUnavailable(_))));
        let config = EngineConfig::from_toml_str("log_format = \"json\"").unwrap();
        assert_eq!(config.log_format().unwrap(), LogFormat::Json);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = EngineConfig::from_toml_file(Path::new("/nonexistent/tronguard.toml"));
        assert!(matches!(result, Err(ReputationError::ConfigUnavailable(_))));
    }

    #[test]
    fn map_size_in_bytes() {
        let config = EngineConfig {
            map_size_mb: 2,
            ..Default::default()
        };
        assert_eq!(config.map_size_bytes(), 2 * 1024 * 1024);
    }
}
