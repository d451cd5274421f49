//! Configuration management with validation and defaults
//!
//! Nested config sections for the ledger, the game tables, and
//! monitoring, loadable from TOML with CLI overrides in the binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level service configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WagerhallConfig {
    pub ledger: LedgerConfig,
    pub games: GamesConfig,
    pub monitoring: MonitoringConfig,
}

/// Balance ledger tuning: how hard to retry a contended commit before
/// giving up and surfacing a transient failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub max_apply_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Capacity of the balance-event broadcast channel.
    pub feed_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_apply_attempts: 5,
            backoff_base_ms: 2,
            backoff_max_ms: 50,
            feed_capacity: 1024,
        }
    }
}

/// Game table configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GamesConfig {
    /// Number of wheel segments; colors alternate, so this must be even
    /// for the 50/50 payout model to hold.
    pub wheel_segments: u8,
    pub enable_wheel: bool,
    pub enable_rock_paper_scissors: bool,
    pub min_stake_cents: u64,
    pub max_stake_cents: u64,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            wheel_segments: 10,
            enable_wheel: true,
            enable_rock_paper_scissors: true,
            min_stake_cents: 100,           // 1.00
            max_stake_cents: 1_000_000_00,  // 1,000,000.00 table cap
        }
    }
}

/// Monitoring and metrics configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enable_metrics: bool,
    pub heartbeat_interval_seconds: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            heartbeat_interval_seconds: 30,
        }
    }
}

impl WagerhallConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: WagerhallConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Configuration for tests: tiny backoffs, no table minimum.
    pub fn testing() -> Self {
        Self {
            ledger: LedgerConfig {
                backoff_base_ms: 1,
                backoff_max_ms: 5,
                ..Default::default()
            },
            games: GamesConfig {
                min_stake_cents: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.max_apply_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "ledger.max_apply_attempts must be > 0".to_string(),
            ));
        }
        if self.ledger.backoff_base_ms > self.ledger.backoff_max_ms {
            return Err(ConfigError::InvalidValue(
                "ledger.backoff_base_ms must be <= ledger.backoff_max_ms".to_string(),
            ));
        }
        if self.ledger.feed_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "ledger.feed_capacity must be > 0".to_string(),
            ));
        }
        if self.games.wheel_segments == 0 || self.games.wheel_segments % 2 != 0 {
            return Err(ConfigError::InvalidValue(
                "games.wheel_segments must be a positive even number".to_string(),
            ));
        }
        if self.games.min_stake_cents == 0 {
            return Err(ConfigError::InvalidValue(
                "games.min_stake_cents must be > 0".to_string(),
            ));
        }
        if self.games.min_stake_cents > self.games.max_stake_cents {
            return Err(ConfigError::InvalidValue(
                "games.min_stake_cents must be <= games.max_stake_cents".to_string(),
            ));
        }
        Ok(())
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.ledger.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.ledger.backoff_max_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring.heartbeat_interval_seconds)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}
