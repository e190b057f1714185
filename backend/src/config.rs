//! Configuration management for the dawn-patrol forecaster
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with DAWN_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{
    validate_scoring_settings, validate_verification_settings, LifecycleSchedule,
    ScoringSettings, VerificationSettings,
};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Factor thresholds, weights, bonuses and confidence cap
    #[serde(default)]
    pub scoring: ScoringSettings,

    /// Lifecycle checkpoints and retention
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Accuracy scoring and retention
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Background maintenance
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LifecycleConfig {
    #[serde(flatten)]
    pub schedule: LifecycleSchedule,

    /// Lifecycle records for dates older than this are purged
    pub retention_days: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            schedule: LifecycleSchedule::default(),
            retention_days: 7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VerificationConfig {
    #[serde(flatten)]
    pub accuracy: VerificationSettings,

    /// Verification records and the prediction log are purged after this
    pub retention_days: i64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            accuracy: VerificationSettings::default(),
            retention_days: 7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub enabled: bool,

    /// Seconds between purge sweeps
    pub sweep_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("DAWN_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "sqlite://dawn_patrol.db?mode=rwc")?
            .set_default("database.max_connections", 4)?
            .set_default("database.min_connections", 1)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (DAWN_ prefix)
            .add_source(
                Environment::with_prefix("DAWN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_scoring_settings(&self.scoring)
            .map_err(|e| ConfigError::Message(format!("scoring: {}", e)))?;
        self.lifecycle
            .schedule
            .validate()
            .map_err(|e| ConfigError::Message(format!("lifecycle: {}", e)))?;
        validate_verification_settings(&self.verification.accuracy)
            .map_err(|e| ConfigError::Message(format!("verification: {}", e)))?;
        if self.lifecycle.retention_days < 1 || self.verification.retention_days < 1 {
            return Err(ConfigError::Message(
                "retention_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://dawn_patrol.db?mode=rwc".to_string(),
            max_connections: 4,
            min_connections: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            scoring: ScoringSettings::default(),
            lifecycle: LifecycleConfig::default(),
            verification: VerificationConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}
