#![allow(clippy::result_large_err)]

use crate::core::connector::CrmConnector;
use crate::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::registry::HelperRegistry;
use crate::core::types::ErrorCategory;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::time::timeout;
use tracing::Instrument;

/// One workflow step: which helper to run, for which contact, with what config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRequest {
    pub helper_type: String,
    pub contact_id: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl StepRequest {
    pub fn new(
        helper_type: impl Into<String>,
        contact_id: impl Into<String>,
        config: Map<String, Value>,
    ) -> Self {
        Self {
            helper_type: helper_type.into(),
            contact_id: contact_id.into(),
            config,
        }
    }

    /// Build a request from a JSON config value, which must be an object.
    pub fn from_value(
        helper_type: impl Into<String>,
        contact_id: impl Into<String>,
        config: Value,
    ) -> Result<Self, AppError> {
        match config {
            Value::Object(map) => Ok(Self::new(helper_type, contact_id, map)),
            other => Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("helper config must be a JSON object, got {}", kind_of(&other)),
            )
            .with_code("HLP-CFG-002")),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Resolve, validate and execute a single step.
///
/// Validation failures return before the connector is touched. Execution is bounded by
/// `step_timeout`; when it elapses the helper future is dropped and the step fails with
/// `TimeoutError`.
pub async fn run_step(
    registry: &HelperRegistry,
    request: &StepRequest,
    connector: &dyn CrmConnector,
    ctx: &ExecutionContext,
    step_timeout: Duration,
) -> Result<HelperOutput, HelperFailure> {
    let span = tracing::info_span!(
        "helper_step",
        helper_type = %request.helper_type,
        contact_id = %request.contact_id,
        execution_id = %ctx.execution_id,
    );

    async move {
        let helper = registry.new_helper(&request.helper_type)?;
        if let Err(err) = helper.validate_config(&request.config) {
            tracing::warn!(code = %err.code, "config rejected: {}", err.message);
            return Err(HelperFailure::from(err));
        }

        let input = HelperInput::new(
            request.contact_id.clone(),
            request.config.clone(),
            connector,
        );
        let started_at = Utc::now();
        let result = match timeout(step_timeout, helper.execute(ctx, input)).await {
            Ok(result) => result,
            Err(_) => Err(HelperFailure::from(
                AppError::new(
                    ErrorCategory::TimeoutError,
                    format!(
                        "helper '{}' timed out after {}",
                        request.helper_type,
                        humantime::format_duration(step_timeout)
                    ),
                )
                .with_code("HLP-TIME-001"),
            )),
        };
        let duration_ms = Utc::now()
            .signed_duration_since(started_at)
            .num_milliseconds();

        match &result {
            Ok(output) => tracing::info!(
                duration_ms,
                actions = output.actions.len(),
                "step succeeded: {}",
                output.message
            ),
            Err(failure) => tracing::warn!(
                duration_ms,
                code = %failure.error.code,
                category = %failure.error.category,
                actions = failure.output.actions.len(),
                "step failed: {}",
                failure.output.message
            ),
        }
        result
    }
    .instrument(span)
    .await
}
