use async_trait::async_trait;
use crm_helpers::core::connector::InMemoryConnector;
use crm_helpers::core::error::AppError;
use crm_helpers::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crm_helpers::core::helper::{ExecutionContext, Helper};
use crm_helpers::core::registry::HelperRegistry;
use crm_helpers::core::runner::{run_step, StepRequest};
use crm_helpers::core::schema::ConfigSchema;
use crm_helpers::core::types::ErrorCategory;
use crm_helpers_types::{NormalizedContact, Tag};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

fn crm() -> InMemoryConnector {
    InMemoryConnector::new()
        .with_tag(Tag::new("tag_a", "Lead"))
        .with_contact(NormalizedContact::new("c1").with_field("amount", json!(16.0)))
        .with_contact(NormalizedContact::new("c2").with_field("amount", json!(81)))
}

fn request(helper_type: &str, contact_id: &str, config: serde_json::Value) -> StepRequest {
    StepRequest::from_value(helper_type, contact_id, config).unwrap()
}

#[derive(Default)]
struct Stalls;

#[async_trait]
impl Helper for Stalls {
    fn name(&self) -> &'static str {
        "Stalls"
    }
    fn helper_type(&self) -> &'static str {
        "stalls"
    }
    fn category(&self) -> &'static str {
        "test"
    }
    fn description(&self) -> &'static str {
        "Applies a tag, then never finishes"
    }
    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
    }
    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        input
            .connector
            .apply_tag(&input.contact_id, "tag_a")
            .await
            .map_err(|err| HelperFailure::from(AppError::from(err)))?;
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(HelperOutput::new().succeed("unreachable"))
    }
}

#[tokio::test]
async fn test_step_runs_registered_helper() {
    let registry = HelperRegistry::with_builtins();
    let crm = crm();
    let ctx = ExecutionContext::default().with_execution_id("exec-42");
    let output = run_step(
        &registry,
        &request(
            "math_it",
            "c1",
            json!({"operation": "sqrt", "source_field": "amount", "target_field": "sqrt_amount"}),
        ),
        &crm,
        &ctx,
        STEP_TIMEOUT,
    )
    .await
    .unwrap();

    assert!(output.success);
    assert_eq!(output.modified_data["sqrt_amount"].as_f64(), Some(4.0));
    assert_eq!(ctx.execution_id, "exec-42");
}

#[tokio::test]
async fn test_invalid_config_never_reaches_connector() {
    let registry = HelperRegistry::with_builtins();
    let crm = crm();
    let failure = run_step(
        &registry,
        &request("tag_it", "c1", json!({"action": "apply"})),
        &crm,
        &ExecutionContext::default(),
        STEP_TIMEOUT,
    )
    .await
    .unwrap_err();

    assert_eq!(failure.error.category, ErrorCategory::ValidationError);
    assert_eq!(failure.error.field(), Some("tag_ids"));
    assert!(!failure.output.success);
    assert!(crm.journal().is_empty());
}

#[tokio::test]
async fn test_unknown_helper_type() {
    let registry = HelperRegistry::with_builtins();
    let failure = run_step(
        &registry,
        &request("teleport_it", "c1", json!({})),
        &crm(),
        &ExecutionContext::default(),
        STEP_TIMEOUT,
    )
    .await
    .unwrap_err();

    assert_eq!(failure.error.category, ErrorCategory::NotRegistered);
    assert!(failure.output.message.contains("teleport_it"));
}

#[tokio::test]
async fn test_timeout_keeps_side_effects_already_made() {
    let mut builder = HelperRegistry::builder();
    builder.register_helper::<Stalls>();
    let registry = builder.build();
    let crm = crm();

    let failure = run_step(
        &registry,
        &request("stalls", "c1", json!({})),
        &crm,
        &ExecutionContext::default(),
        Duration::from_millis(100),
    )
    .await
    .unwrap_err();

    assert_eq!(failure.error.category, ErrorCategory::TimeoutError);
    assert_eq!(failure.error.code, "HLP-TIME-001");
    assert!(failure.output.message.contains("100ms"));
    assert!(crm.contact("c1").unwrap().has_tag("tag_a"));
}

#[tokio::test]
async fn test_concurrent_steps_share_registry_and_connector() {
    let registry = HelperRegistry::with_builtins();
    let crm = Arc::new(crm());

    let mut handles = Vec::new();
    for contact_id in ["c1", "c2"] {
        let registry = registry.clone();
        let crm = crm.clone();
        handles.push(tokio::spawn(async move {
            let step = request(
                "math_it",
                contact_id,
                json!({"operation": "sqrt", "source_field": "amount", "target_field": "root"}),
            );
            run_step(
                &registry,
                &step,
                crm.as_ref(),
                &ExecutionContext::default(),
                STEP_TIMEOUT,
            )
            .await
            .map(|output| output.success)
            .unwrap_or(false)
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    assert_eq!(crm.contact("c1").unwrap().custom_fields["root"].as_f64(), Some(4.0));
    assert_eq!(crm.contact("c2").unwrap().custom_fields["root"].as_f64(), Some(9.0));
}

#[test]
fn test_step_request_deserializes_from_workflow_json() {
    let step: StepRequest = serde_json::from_value(json!({
        "helper_type": "goal_it",
        "contact_id": "c1",
        "config": {"call_name": "signup"}
    }))
    .unwrap();
    assert_eq!(step.helper_type, "goal_it");
    assert_eq!(step.config["call_name"], "signup");

    let err = StepRequest::from_value("goal_it", "c1", json!("signup")).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
    assert!(err.message.contains("a string"));
}
