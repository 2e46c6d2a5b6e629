#![allow(clippy::result_large_err)]

use crate::core::coerce;
use crate::core::envelope::{Action, ActionType, HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::helpers::FailWith;
use crate::core::schema::{ConfigSchema, PropertySchema};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{json, Value};

const DEFAULT_INTEGRATION: &str = "helpers";

/// Fires an API goal for the contact.
#[derive(Default)]
pub struct GoalIt;

#[async_trait]
impl Helper for GoalIt {
    fn name(&self) -> &'static str {
        "Goal It"
    }

    fn helper_type(&self) -> &'static str {
        "goal_it"
    }

    fn category(&self) -> &'static str {
        "automation"
    }

    fn description(&self) -> &'static str {
        "Achieve an API goal so the contact advances in a campaign"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property(
                "call_name",
                PropertySchema::string("Call name of the goal to achieve"),
            )
            .property(
                "integration",
                PropertySchema::string("Integration name the goal belongs to")
                    .with_default(json!(DEFAULT_INTEGRATION)),
            )
            .required(&["call_name"])
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        let call_name = coerce::require_str(&input.config, "call_name")?;
        let integration = coerce::config_str(&input.config, "integration")
            .unwrap_or_else(|| DEFAULT_INTEGRATION.to_string());
        let mut output = HelperOutput::new();

        input
            .connector
            .achieve_goal(&input.contact_id, &integration, &call_name)
            .await
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::WriteError,
                    format!("Failed to achieve goal '{}': {}", call_name, err),
                )
                .with_code("HLP-GOAL-001")
            })
            .fail_with(&mut output)?;

        output.log(format!("achieved goal {}/{}", integration, call_name));
        output.record_action(Action::new(
            ActionType::GoalAchieved,
            call_name.clone(),
            Value::String(integration.clone()),
        ));
        output.set_modified("goal", Value::String(call_name.clone()));
        Ok(output.succeed(format!("Achieved goal '{}'", call_name)))
    }
}
