#![allow(clippy::result_large_err)]

use crate::core::coerce;
use crate::core::envelope::{Action, ActionType, HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::helpers::FailWith;
use crate::core::schema::{ConfigSchema, PropertySchema};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Default)]
pub struct TriggerAutomation;

#[async_trait]
impl Helper for TriggerAutomation {
    fn name(&self) -> &'static str {
        "Trigger Automation"
    }

    fn helper_type(&self) -> &'static str {
        "trigger_automation"
    }

    fn category(&self) -> &'static str {
        "automation"
    }

    fn description(&self) -> &'static str {
        "Start a CRM automation or sequence for the contact"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property(
                "automation_id",
                PropertySchema::string("Identifier of the automation to start"),
            )
            .required(&["automation_id"])
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        let automation_id = coerce::require_str(&input.config, "automation_id")?;
        let mut output = HelperOutput::new();

        input
            .connector
            .trigger_automation(&input.contact_id, &automation_id)
            .await
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::WriteError,
                    format!("Failed to trigger automation '{}': {}", automation_id, err),
                )
                .with_code("HLP-AUTO-001")
            })
            .fail_with(&mut output)?;

        output.log(format!("triggered automation '{}'", automation_id));
        output.record_action(Action::new(
            ActionType::AutomationTriggered,
            automation_id.clone(),
            Value::Bool(true),
        ));
        Ok(output.succeed(format!("Triggered automation '{}'", automation_id)))
    }
}
