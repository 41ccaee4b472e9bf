//! Trip computer configuration
//!
//! Stored as JSON. Every field has a default, so a partial file (or none at
//! all) is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::reader::TransportSettings;
use crate::telemetry::SelectedProgram;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The config file or its directory could not be written
    #[error("Failed to write config {}: {source}", path.display())]
    Write {
        /// File that was written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not valid config JSON
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A setting is out of range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending setting
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The platform has no user config directory
    #[error("Could not determine the user config directory")]
    NoConfigDir,
}

/// Trip computer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripConfig {
    /// Program selected at startup
    pub program: SelectedProgram,

    /// Multiplier on the MAF-to-fuel constant; calibrate against fill-ups
    pub fuel_calibration: f64,

    /// Age of the last update below which the link counts as live, ms
    pub staleness_threshold_ms: u64,

    /// Fixed wait between reconnection attempts, ms
    pub reconnect_backoff_ms: u64,

    /// Clamp for the instantaneous economy display
    pub max_display_economy: f64,

    /// Acquisition cycle tick, ms
    pub poll_interval_ms: u64,

    /// Longest a single query may stay pending before it counts as failed, ms
    pub query_timeout_ms: u64,

    /// Presentation refresh interval, ms
    pub render_interval_ms: u64,

    /// Longest the presentation waits for the store lock, ms
    pub snapshot_timeout_ms: u64,

    /// Adapter connection
    pub transport: TransportSettings,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            program: SelectedProgram::Basic,
            fuel_calibration: 1.0,
            staleness_threshold_ms: 500,
            reconnect_backoff_ms: 2500,
            max_display_economy: 99.0,
            poll_interval_ms: 10,
            query_timeout_ms: 1000,
            render_interval_ms: 100,
            snapshot_timeout_ms: 20,
            transport: TransportSettings::default(),
        }
    }
}

impl TripConfig {
    /// Default config location: `<config dir>/libretrip/config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("libretrip").join("config.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Parse and validate a config from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: TripConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Load a config file, falling back to defaults when it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(write_err)
    }

    /// Reject values the acquisition loop cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fuel_calibration.is_finite() && self.fuel_calibration > 0.0) {
            return Err(ConfigError::Invalid {
                field: "fuel_calibration",
                reason: format!("must be a positive number, got {}", self.fuel_calibration),
            });
        }
        if !(self.max_display_economy.is_finite() && self.max_display_economy > 0.0) {
            return Err(ConfigError::Invalid {
                field: "max_display_economy",
                reason: format!("must be a positive number, got {}", self.max_display_economy),
            });
        }

        let non_zero = [
            ("staleness_threshold_ms", self.staleness_threshold_ms),
            ("reconnect_backoff_ms", self.reconnect_backoff_ms),
            ("query_timeout_ms", self.query_timeout_ms),
            ("render_interval_ms", self.render_interval_ms),
            ("snapshot_timeout_ms", self.snapshot_timeout_ms),
            ("transport.response_timeout_ms", self.transport.response_timeout_ms),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.transport.max_consecutive_failures == 0 {
            return Err(ConfigError::Invalid {
                field: "transport.max_consecutive_failures",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Reconnection backoff as a duration
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    /// Poll tick as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Render tick as a duration
    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    /// Presentation lock wait as a duration
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }
}
