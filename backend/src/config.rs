//! Configuration file support.
//!
//! Settings are read from a TOML file (`watts.toml` by default). Every field
//! has a default, so an empty or missing file yields a working configuration
//! monitoring the demo facility.
//!
//! ```toml
//! [server]
//! port = 3030
//!
//! [sampling]
//! period_ms = 200
//!
//! [regression]
//! request_timeout_ms = 30000
//!
//! [facility]
//! name = "Ker Escuelle"
//! idle_temperature = 13.0
//!
//! [[facility.heat_sources]]
//! name = "press"
//! temperature = 10.0
//! inertia_duration = 0.5
//! weight = 0.25
//! activities = [[12.0, 15.0]]
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{demo_facility, Activity, Facility, HeatSource, ModelError};

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid facility configuration: {0}")]
    InvalidFacility(#[from] ModelError),

    #[error("Invalid environment variable {name}: {message}")]
    InvalidEnv { name: String, message: String },
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WattsConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub regression: RegressionSettings,
    /// Monitored facility; the demo facility when absent
    #[serde(default)]
    pub facility: Option<FacilitySettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Probe simulator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingSettings {
    /// Delay before the first probe reading
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Delay between two probe readings
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// Width of the uniform noise added to temperature readings
    #[serde(default = "default_noise_range")]
    pub noise_range: f64,
    /// How many times the facility temperature is listed among the monitored items
    #[serde(default = "default_temperature_weight")]
    pub temperature_weight: usize,
}

impl SamplingSettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            period_ms: default_period_ms(),
            noise_range: default_noise_range(),
            temperature_weight: default_temperature_weight(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSettings {
    /// Pending requests are abandoned after this delay; 0 waits forever
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_ridge_alpha")]
    pub ridge_alpha: f64,
}

impl RegressionSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

impl Default for RegressionSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            ridge_alpha: default_ridge_alpha(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilitySettings {
    pub name: String,
    pub idle_temperature: f64,
    #[serde(default)]
    pub heat_sources: Vec<HeatSourceSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatSourceSettings {
    pub name: String,
    pub temperature: f64,
    pub inertia_duration: f64,
    pub weight: f64,
    /// `[start_hour, end_hour]` pairs
    pub activities: Vec<[f64; 2]>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3030
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_period_ms() -> u64 {
    200
}

fn default_noise_range() -> f64 {
    5.0
}

fn default_temperature_weight() -> usize {
    2
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_ridge_alpha() -> f64 {
    crate::regression::DEFAULT_ALPHA
}

impl WattsConfig {
    /// Load the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load the configuration from `WATTS_CONFIG`, or the first `watts.toml` found in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    ///
    /// Falls back to the defaults when no file exists. `HOST` and `PORT`
    /// override the server settings.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("WATTS_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::from_default_location()?.unwrap_or_default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load `watts.toml` from the standard locations, if any.
    pub fn from_default_location() -> Result<Option<Self>, ConfigError> {
        let search_paths = [
            PathBuf::from("watts.toml"),
            PathBuf::from("backend/watts.toml"),
            PathBuf::from("../watts.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PORT".to_string(),
                message: format!("'{}' is not a valid port number", port),
            })?;
        }
        Ok(())
    }

    /// Build the monitored facility.
    pub fn build_facility(&self) -> Result<Facility, ConfigError> {
        match &self.facility {
            Some(settings) => settings.build(),
            None => Ok(demo_facility()?),
        }
    }
}

impl FacilitySettings {
    pub fn build(&self) -> Result<Facility, ConfigError> {
        let mut facility = Facility::new(self.name.clone(), self.idle_temperature)?;
        for source in &self.heat_sources {
            let activities = source
                .activities
                .iter()
                .map(|[start, end]| Activity::new(*start, *end))
                .collect::<Result<Vec<_>, _>>()?;
            let heat_source = HeatSource::new(
                source.name.clone(),
                source.temperature,
                source.inertia_duration,
                activities,
            )?;
            facility.add_heat_source(Arc::new(heat_source), source.weight)?;
        }
        Ok(facility)
    }
}
