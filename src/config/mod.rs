//! # Configuration Management Module
//!
//! TOML configuration for the monitor, with serde defaults for every
//! optional key and a [`Config::validate`] pass run at startup.
//!
//! ## Configuration Structure
//!
//! - [`DeviceConfig`] - serial port, baud rate, read timeout, poll interval
//! - [`AnalysisConfig`] - bulk-collection deadline
//! - [`DisplayConfig`] - rolling window length, resampling, forecast window
//! - [`ProfilesConfig`] - location of the plant profile file
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [device]
//! port = "/dev/ttyACM0"
//! baud_rate = 9600
//! read_timeout_ms = 50
//! poll_interval_ms = 200
//!
//! [analysis]
//! timeout_secs = 20
//!
//! [display]
//! history_len = 50
//! resample_factor = 4
//! forecast_window = 20
//!
//! [profiles]
//! path = "plant_preferences.json"
//!
//! [logging]
//! level = "info"
//! file = "plantmon.log"
//! ```
//!
//! CLI arguments take precedence over the file, which takes precedence over
//! defaults.

use crate::device::{is_supported_baud, SUPPORTED_BAUD_RATES};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub profiles: ProfilesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Serial port path. Empty means "must be given on the command line".
    #[serde(default)]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Hardware read timeout for each poll (ms).
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Interval between read attempts (ms).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pause after opening the port before the first read (ms).
    #[serde(default)]
    pub settle_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    50
}

fn default_poll_interval_ms() -> u64 {
    200
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_ms: 0,
        }
    }
}

impl DeviceConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Seconds to wait for all bulk frames after a request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    20
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_history_len")]
    pub history_len: usize,
    #[serde(default = "default_resample_factor")]
    pub resample_factor: usize,
    #[serde(default = "default_forecast_window")]
    pub forecast_window: usize,
}

fn default_history_len() -> usize {
    crate::series::DEFAULT_CAPACITY
}

fn default_resample_factor() -> usize {
    crate::series::DEFAULT_RESAMPLE_FACTOR
}

fn default_forecast_window() -> usize {
    crate::series::DEFAULT_FORECAST_WINDOW
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            history_len: default_history_len(),
            resample_factor: default_resample_factor(),
            forecast_window: default_forecast_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    #[serde(default = "default_profiles_path")]
    pub path: String,
}

fn default_profiles_path() -> String {
    "plant_preferences.json".to_string()
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            path: default_profiles_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !is_supported_baud(self.device.baud_rate) {
            return Err(anyhow!(
                "Unsupported baud rate {} (expected one of {:?})",
                self.device.baud_rate,
                SUPPORTED_BAUD_RATES
            ));
        }
        if self.device.poll_interval_ms == 0 {
            return Err(anyhow!("device.poll_interval_ms must be greater than 0"));
        }
        if self.analysis.timeout_secs == 0 {
            return Err(anyhow!("analysis.timeout_secs must be greater than 0"));
        }
        if self.display.history_len == 0 {
            return Err(anyhow!("display.history_len must be greater than 0"));
        }
        if self.display.resample_factor == 0 {
            return Err(anyhow!("display.resample_factor must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: DeviceConfig::default(),
            analysis: AnalysisConfig::default(),
            display: DisplayConfig::default(),
            profiles: ProfilesConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("plantmon.log".to_string()),
            },
        }
    }
}
