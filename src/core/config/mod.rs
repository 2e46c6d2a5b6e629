use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration loaded from helpers.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HelpersConfig {
    /// Step execution settings
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Geolocation lookup settings
    #[serde(default)]
    pub geolocation: GeolocationConfig,

    /// Logging settings (consumed by the logging layer)
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Step execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Upper bound for a single helper execution, as a humantime string
    #[serde(default = "default_step_timeout")]
    pub step_timeout: String,
}

/// Geolocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// Base URL of the JSON lookup service; the IP is appended as a path segment
    #[serde(default = "default_geo_endpoint")]
    pub endpoint: String,

    /// Request timeout, as a humantime string
    #[serde(default = "default_geo_timeout")]
    pub timeout: String,
}

/// `[logging]` section as written in helpers.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_output: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_file: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_step_timeout() -> String {
    "30s".to_string()
}

fn default_geo_endpoint() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_geo_timeout() -> String {
    "5s".to_string()
}

const FALLBACK_STEP_TIMEOUT: Duration = Duration::from_secs(30);
const FALLBACK_GEO_TIMEOUT: Duration = Duration::from_secs(5);

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            step_timeout: default_step_timeout(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        GeolocationConfig {
            endpoint: default_geo_endpoint(),
            timeout: default_geo_timeout(),
        }
    }
}

impl ExecutionConfig {
    /// Parsed step timeout. Falls back to 30s when the string is malformed;
    /// `ConfigValidator` rejects such values before they reach a run.
    pub fn step_timeout(&self) -> Duration {
        humantime::parse_duration(self.step_timeout.trim()).unwrap_or(FALLBACK_STEP_TIMEOUT)
    }
}

impl GeolocationConfig {
    pub fn timeout(&self) -> Duration {
        humantime::parse_duration(self.timeout.trim()).unwrap_or(FALLBACK_GEO_TIMEOUT)
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
