//! Round bookkeeping configuration.

use crate::error::{Result, RoundError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of trailing rounds kept when pruning round storage.
pub const DEFAULT_PRUNE_BELOW_COUNT: usize = 5;

/// Tunables for round bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Upper bound for the timeout count reached through
    /// `increment_timeout_count` (0 disables the cap).
    pub timeout_cap: i32,

    /// Rounds kept by `prune_round_storage` (0 disables pruning).
    pub prune_below_count: usize,

    /// VRF shares needed before a round stops accepting more.
    pub vrf_threshold: usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            timeout_cap: 0,
            prune_below_count: DEFAULT_PRUNE_BELOW_COUNT,
            vrf_threshold: 1,
        }
    }
}

impl RoundConfig {
    /// Loads configuration from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RoundError::InvalidConfig(format!("failed to read file: {}", e)))?;

        let config: RoundConfig = serde_json::from_str(&content)
            .map_err(|e| RoundError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RoundError::InvalidConfig(format!("failed to read file: {}", e)))?;

        let config: RoundConfig = serde_yaml::from_str(&content)
            .map_err(|e| RoundError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_cap < 0 {
            return Err(RoundError::InvalidConfig(format!(
                "timeout_cap must not be negative, got {}",
                self.timeout_cap
            )));
        }

        if self.vrf_threshold == 0 {
            return Err(RoundError::InvalidConfig(
                "vrf_threshold must be at least 1".into(),
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
    fn test_defaults() {
        let config = RoundConfig::default();
        assert_eq!(config.timeout_cap, 0);
        assert_eq!(config.prune_below_count, DEFAULT_PRUNE_BELOW_COUNT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_cap: 8\nvrf_threshold: 3").unwrap();

        let config = RoundConfig::load_yaml(file.path()).unwrap();
        assert_eq!(config.timeout_cap, 8);
        assert_eq!(config.vrf_threshold, 3);
        assert_eq!(config.prune_below_count, DEFAULT_PRUNE_BELOW_COUNT);
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"prune_below_count": 10}}"#).unwrap();

        let config = RoundConfig::load_json(file.path()).unwrap();
        assert_eq!(config.prune_below_count, 10);
    }

    #[test]
    fn test_rejects_negative_cap() {
        let config = RoundConfig {
            timeout_cap: -1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RoundError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let config = RoundConfig {
            vrf_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            RoundConfig::load_yaml("/nonexistent/round.yaml"),
            Err(RoundError::InvalidConfig(_))
        ));
    }
}
