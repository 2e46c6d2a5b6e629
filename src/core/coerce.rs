//! Coercion of untyped CRM field values and step config into concrete Rust types.
//!
//! Connectors hand back whatever the platform stores, so numbers may arrive as text and
//! text may arrive as numbers. Helpers funnel every read through these functions.

#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde_json::{Map, Number, Value};

/// Interpret a field value as a number. Accepts JSON numbers and numeric text, ignoring
/// surrounding whitespace, thousands separators and a leading currency sign.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let cleaned: String = text
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

/// Render a field value as text. `null` has no text form.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

/// `null`, empty strings and empty arrays count as blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Wrap a float as a JSON number, failing on NaN and infinities.
pub fn number_value(number: f64) -> Result<Value, AppError> {
    Number::from_f64(number).map(Value::Number).ok_or_else(|| {
        AppError::new(
            ErrorCategory::ComputationError,
            format!("result {} is not a finite number", number),
        )
        .with_code("HLP-MATH-002")
    })
}

/// Trimmed, non-empty string config value.
pub fn config_str(config: &Map<String, Value>, key: &str) -> Option<String> {
    config
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

pub fn require_str(config: &Map<String, Value>, key: &str) -> Result<String, AppError> {
    config_str(config, key)
        .ok_or_else(|| AppError::invalid_field(key, format!("{} is required", key)))
}

/// Numeric config value; numeric strings are accepted.
pub fn config_f64(config: &Map<String, Value>, key: &str) -> Result<Option<f64>, AppError> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_number(value).map(Some).ok_or_else(|| {
            AppError::invalid_field(key, format!("{} must be a number, got {}", key, value))
        }),
    }
}

pub fn config_i64(config: &Map<String, Value>, key: &str) -> Result<Option<i64>, AppError> {
    match config_f64(config, key)? {
        None => Ok(None),
        Some(number) if number.fract() == 0.0 => Ok(Some(number as i64)),
        Some(number) => Err(AppError::invalid_field(
            key,
            format!("{} must be an integer, got {}", key, number),
        )),
    }
}

pub fn config_bool(config: &Map<String, Value>, key: &str, default: bool) -> bool {
    config.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// List of non-empty strings. A single string is treated as a one-element list and
/// comma-separated text is split.
pub fn config_str_list(config: &Map<String, Value>, key: &str) -> Result<Vec<String>, AppError> {
    let values = match config.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let text = match item {
                    Value::String(text) => text.trim().to_string(),
                    Value::Number(number) => number.to_string(),
                    other => {
                        return Err(AppError::invalid_field(
                            key,
                            format!("{}[{}] must be a string, got {}", key, index, other),
                        ))
                    }
                };
                if !text.is_empty() {
                    out.push(text);
                }
            }
            out
        }
        Some(other) => {
            return Err(AppError::invalid_field(
                key,
                format!("{} must be a list of strings, got {}", key, other),
            ))
        }
    };
    Ok(values)
}
