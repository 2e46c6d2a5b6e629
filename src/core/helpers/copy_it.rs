#![allow(clippy::result_large_err)]

use crate::core::coerce::{self, is_blank};
use crate::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::helpers::{read_optional, write_field, FailWith};
use crate::core::schema::{ConfigSchema, PropertySchema};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

struct CopyConfig {
    source_field: String,
    target_field: String,
    overwrite: bool,
}

impl CopyConfig {
    fn from_config(config: &Map<String, Value>) -> Result<Self, AppError> {
        let source_field = coerce::require_str(config, "source_field")?;
        let target_field = coerce::require_str(config, "target_field")?;
        if source_field == target_field {
            return Err(AppError::invalid_field(
                "target_field",
                "target_field must differ from source_field",
            ));
        }
        Ok(Self {
            source_field,
            target_field,
            overwrite: coerce::config_bool(config, "overwrite", true),
        })
    }
}

/// Copies one field's value into another.
#[derive(Default)]
pub struct CopyIt;

#[async_trait]
impl Helper for CopyIt {
    fn name(&self) -> &'static str {
        "Copy It"
    }

    fn helper_type(&self) -> &'static str {
        "copy_it"
    }

    fn category(&self) -> &'static str {
        "data"
    }

    fn description(&self) -> &'static str {
        "Copy the value of one field into another field"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property("source_field", PropertySchema::string("Field to copy from"))
            .property("target_field", PropertySchema::string("Field to copy into"))
            .property(
                "overwrite",
                PropertySchema::boolean("Replace a value already present in target_field")
                    .with_default(json!(true)),
            )
            .required(&["source_field", "target_field"])
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), AppError> {
        self.config_schema().validate(config)?;
        CopyConfig::from_config(config).map(|_| ())
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        let config = CopyConfig::from_config(&input.config)?;
        let mut output = HelperOutput::new();

        let source = read_optional(&input, &config.source_field)
            .await
            .fail_with(&mut output)?
            .filter(|value| !is_blank(value));
        let Some(value) = source else {
            output.log(format!("'{}' is empty", config.source_field));
            return Ok(output.succeed(format!(
                "Field '{}' is empty; nothing to copy",
                config.source_field
            )));
        };

        if !config.overwrite {
            let existing = read_optional(&input, &config.target_field)
                .await
                .fail_with(&mut output)?;
            if existing.as_ref().is_some_and(|v| !is_blank(v)) {
                output.log(format!("'{}' already set, overwrite disabled", config.target_field));
                return Ok(output.succeed(format!(
                    "Field '{}' already has a value; left unchanged",
                    config.target_field
                )));
            }
        }

        write_field(&input, &mut output, &config.target_field, value)
            .await
            .fail_with(&mut output)?;
        Ok(output.succeed(format!(
            "Copied '{}' to '{}'",
            config.source_field, config.target_field
        )))
    }
}
