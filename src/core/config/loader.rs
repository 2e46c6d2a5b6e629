#![allow(clippy::result_large_err)]

use super::HelpersConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "helpers.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from `<workspace>/helpers.toml`, then apply env overrides.
    /// A missing file means defaults plus env.
    pub fn load_from_workspace(workspace_path: &Path) -> Result<HelpersConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Load config from a specific file. Returns Ok(None) if it doesn't exist.
    pub fn load_from_file(path: &Path) -> Result<Option<HelpersConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
            .with_code("CFG-READ-001")
        })?;

        let config: HelpersConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("CFG-PARSE-001")
        })?;

        Ok(Some(config))
    }

    /// Environment variables take precedence over file values.
    pub fn apply_env_overrides(config: &mut HelpersConfig) {
        if let Some(timeout) = non_empty_var("CRM_HELPERS_STEP_TIMEOUT") {
            config.execution.step_timeout = timeout;
        }

        if let Some(endpoint) = non_empty_var("CRM_HELPERS_GEO_ENDPOINT") {
            config.geolocation.endpoint = endpoint;
        }

        if let Some(timeout) = non_empty_var("CRM_HELPERS_GEO_TIMEOUT") {
            config.geolocation.timeout = timeout;
        }
    }

    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "CRM_HELPERS_STEP_TIMEOUT - Override the per-step execution timeout (default: 30s)",
            "CRM_HELPERS_GEO_ENDPOINT - Override the geolocation endpoint (default: http://ip-api.com/json)",
            "CRM_HELPERS_GEO_TIMEOUT - Override the geolocation request timeout (default: 5s)",
            "CRM_HELPERS_LOG_DIR - Write JSON logs to this directory (enables the file sink)",
            "CRM_HELPERS_EMBEDDED - Set to 1 to silence console logs when run by a workflow engine",
            "RUST_LOG - Override the logging filter",
        ]
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
