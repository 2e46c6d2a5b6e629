//! Built-in helper catalog.
//!
//! Field helpers share the read/write utilities below so that read failures, write
//! failures and the action audit trail behave identically across helpers.

pub mod clear_tags;
pub mod copy_it;
pub mod date_calc;
pub mod format_it;
pub mod goal_it;
pub mod ip_location;
pub mod math_it;
pub mod score_it;
pub mod tag_it;
pub mod trigger_automation;

use crate::core::connector::ConnectorError;
use crate::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::registry::HelperRegistryBuilder;
use crate::core::types::ErrorCategory;
use serde_json::Value;

/// Register every built-in helper into the supplied builder.
pub fn register_builtins(builder: &mut HelperRegistryBuilder) {
    builder
        .register_helper::<math_it::MathIt>()
        .register_helper::<format_it::FormatIt>()
        .register_helper::<copy_it::CopyIt>()
        .register_helper::<date_calc::DateCalc>()
        .register_helper::<tag_it::TagIt>()
        .register_helper::<clear_tags::ClearTags>()
        .register_helper::<score_it::ScoreIt>()
        .register_helper::<goal_it::GoalIt>()
        .register_helper::<trigger_automation::TriggerAutomation>()
        .register_helper::<ip_location::IpLocation>();
}

/// Convert an `AppError` into a failure that keeps everything recorded so far.
pub(crate) trait FailWith<T> {
    fn fail_with(self, output: &mut HelperOutput) -> Result<T, HelperFailure>;
}

impl<T> FailWith<T> for Result<T, AppError> {
    fn fail_with(self, output: &mut HelperOutput) -> Result<T, HelperFailure> {
        self.map_err(|err| std::mem::take(output).fail(err))
    }
}

/// Read a field, treating unknown keys and `null` as absent.
pub(crate) async fn read_optional(
    input: &HelperInput<'_>,
    field: &str,
) -> Result<Option<Value>, AppError> {
    match input
        .connector
        .get_contact_field_value(&input.contact_id, field)
        .await
    {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(ConnectorError::NotFound { kind, .. }) if kind == "field" => Ok(None),
        Err(err) => {
            let mut error = AppError::new(
                ErrorCategory::ReadError,
                format!("Failed to read field '{}': {}", field, err),
            )
            .with_code("HLP-READ-001");
            error.add_context("field", field);
            Err(error)
        }
    }
}

/// Write a field and record the mutation on success.
pub(crate) async fn write_field(
    input: &HelperInput<'_>,
    output: &mut HelperOutput,
    field: &str,
    value: Value,
) -> Result<(), AppError> {
    input
        .connector
        .set_contact_field_value(&input.contact_id, field, value.clone())
        .await
        .map_err(|err| {
            let mut error = AppError::new(
                ErrorCategory::WriteError,
                format!("Failed to update field '{}': {}", field, err),
            )
            .with_code("HLP-WRITE-001");
            error.add_context("field", field);
            error
        })?;
    output.log(format!("updated field '{}' to {}", field, value));
    output.record_field_update(field, value);
    Ok(())
}

/// Outcome of a continue-on-error batch over several items.
pub(crate) struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn failure_summary(&self) -> String {
        self.failed
            .iter()
            .map(|(item, reason)| format!("{} ({})", item, reason))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
