//! Configuration management for carecircle.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::emergency::NearestFirst;
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "carecircle";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "state.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CARECIRCLE_`, sections split on `__`)
/// 2. TOML config file at `~/.config/carecircle/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Emergency dispatch configuration.
    pub emergency: EmergencyConfig,
    /// Volunteer directory configuration.
    pub directory: DirectoryConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
}

/// Emergency-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Only alert volunteers within this many miles.
    pub max_distance_miles: f64,
    /// Maximum number of volunteers alerted per emergency.
    pub max_respondents: usize,
}

/// Directory-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// JSON roster file. The built-in roster is used when unset.
    pub roster_path: Option<PathBuf>,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/carecircle/state.db`
    pub database_path: Option<PathBuf>,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            max_distance_miles: 2.0,
            max_respondents: 3,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("CARECIRCLE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let distance = self.emergency.max_distance_miles;
        if !distance.is_finite() || distance < 0.0 {
            return Err(Error::ConfigValidation {
                message: format!("max_distance_miles ({distance}) must be a non-negative number"),
            });
        }

        if self.emergency.max_respondents == 0 {
            return Err(Error::ConfigValidation {
                message: "max_respondents must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// The respondent selection policy described by this configuration.
    #[must_use]
    pub fn respondent_selector(&self) -> NearestFirst {
        NearestFirst::within(
            self.emergency.max_distance_miles,
            self.emergency.max_respondents,
        )
    }
}
