#![allow(clippy::result_large_err)]

use crate::core::coerce::{self, as_text};
use crate::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::helpers::{read_optional, write_field, FailWith};
use crate::core::schema::{ConfigSchema, PropertySchema};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

const FORMATS: [&str; 7] = [
    "uppercase",
    "lowercase",
    "title_case",
    "sentence_case",
    "trim",
    "squish",
    "digits_only",
];

fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn apply_format(format: &str, text: &str) -> String {
    match format {
        "uppercase" => text.to_uppercase(),
        "lowercase" => text.to_lowercase(),
        "title_case" => whitespace()
            .split(text.trim())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        "sentence_case" => capitalize(text.trim()),
        "trim" => text.trim().to_string(),
        "squish" => whitespace().replace_all(text.trim(), " ").into_owned(),
        "digits_only" => text.chars().filter(char::is_ascii_digit).collect(),
        _ => text.to_string(),
    }
}

struct FormatConfig {
    source_field: String,
    target_field: String,
    format: String,
}

impl FormatConfig {
    fn from_config(config: &Map<String, Value>) -> Result<Self, AppError> {
        let source_field = coerce::require_str(config, "source_field")?;
        let target_field =
            coerce::config_str(config, "target_field").unwrap_or_else(|| source_field.clone());
        let format = coerce::require_str(config, "format")?;
        if !FORMATS.contains(&format.as_str()) {
            return Err(AppError::invalid_field(
                "format",
                format!("format must be one of: {}; got '{}'", FORMATS.join(", "), format),
            ));
        }
        Ok(Self {
            source_field,
            target_field,
            format,
        })
    }
}

/// Text normalization on a single field.
#[derive(Default)]
pub struct FormatIt;

#[async_trait]
impl Helper for FormatIt {
    fn name(&self) -> &'static str {
        "Format It"
    }

    fn helper_type(&self) -> &'static str {
        "format_it"
    }

    fn category(&self) -> &'static str {
        "data"
    }

    fn description(&self) -> &'static str {
        "Change the case or whitespace of a text field"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property("source_field", PropertySchema::string("Field to format"))
            .property(
                "target_field",
                PropertySchema::string("Field receiving the result (defaults to source_field)"),
            )
            .property(
                "format",
                PropertySchema::string("Formatting to apply").with_enum(&FORMATS),
            )
            .required(&["source_field", "format"])
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        let config = FormatConfig::from_config(&input.config)?;
        let mut output = HelperOutput::new();

        let current = read_optional(&input, &config.source_field)
            .await
            .fail_with(&mut output)?
            .as_ref()
            .and_then(as_text)
            .filter(|text| !text.trim().is_empty());
        let Some(text) = current else {
            output.log(format!("'{}' is empty", config.source_field));
            return Ok(output.succeed(format!(
                "Field '{}' is empty; nothing to format",
                config.source_field
            )));
        };

        let formatted = apply_format(&config.format, &text);
        if formatted == text && config.target_field == config.source_field {
            output.log("value already formatted");
            return Ok(output.succeed(format!(
                "Field '{}' already in {} format",
                config.source_field, config.format
            )));
        }

        write_field(
            &input,
            &mut output,
            &config.target_field,
            Value::String(formatted.clone()),
        )
        .await
        .fail_with(&mut output)?;
        Ok(output.succeed(format!(
            "Formatted '{}' as {} and saved to {}",
            config.source_field, config.format, config.target_field
        )))
    }
}
