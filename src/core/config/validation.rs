#![allow(clippy::result_large_err)]

use super::HelpersConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::time::Duration;
use url::Url;

const CONSOLE_OUTPUTS: [&str; 3] = ["stdout", "stderr", "none"];

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &HelpersConfig) -> Result<(), AppError> {
        positive_duration("execution.step_timeout", &config.execution.step_timeout)?;
        positive_duration("geolocation.timeout", &config.geolocation.timeout)?;

        let endpoint = Url::parse(config.geolocation.endpoint.trim()).map_err(|e| {
            invalid(
                "geolocation.endpoint",
                format!("geolocation.endpoint is not a valid URL: {}", e),
            )
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(invalid(
                "geolocation.endpoint",
                format!(
                    "geolocation.endpoint must use http or https, got '{}'",
                    endpoint.scheme()
                ),
            ));
        }

        if let Some(output) = &config.logging.console_output {
            if !CONSOLE_OUTPUTS.contains(&output.as_str()) {
                return Err(invalid(
                    "logging.console_output",
                    format!(
                        "logging.console_output must be one of: {}; got '{}'",
                        CONSOLE_OUTPUTS.join(", "),
                        output
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn positive_duration(key: &str, raw: &str) -> Result<Duration, AppError> {
    let parsed = humantime::parse_duration(raw.trim())
        .map_err(|e| invalid(key, format!("{} is not a valid duration '{}': {}", key, raw, e)))?;
    if parsed.is_zero() {
        return Err(invalid(key, format!("{} must be greater than zero", key)));
    }
    Ok(parsed)
}

fn invalid(key: &str, message: String) -> AppError {
    let mut error = AppError::new(ErrorCategory::ValidationError, message).with_code("CFG-VAL-001");
    error.add_context("key", key);
    error
}
