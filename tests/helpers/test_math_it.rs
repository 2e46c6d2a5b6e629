use crm_helpers::core::connector::InMemoryConnector;
use crm_helpers::core::envelope::{ActionType, HelperFailure, HelperInput, HelperOutput};
use crm_helpers::core::helper::{ExecutionContext, Helper};
use crm_helpers::core::helpers::math_it::MathIt;
use crm_helpers::core::types::ErrorCategory;
use crm_helpers_types::NormalizedContact;
use serde_json::{json, Value};

fn crm_with(fields: &[(&str, Value)]) -> InMemoryConnector {
    let contact = fields
        .iter()
        .fold(NormalizedContact::new("c1"), |contact, (key, value)| {
            contact.with_field(*key, value.clone())
        });
    InMemoryConnector::new().with_contact(contact)
}

async fn run(crm: &InMemoryConnector, config: Value) -> Result<HelperOutput, HelperFailure> {
    let config = config.as_object().cloned().unwrap();
    MathIt
        .validate_config(&config)
        .map_err(HelperFailure::from)?;
    MathIt
        .execute(&ExecutionContext::default(), HelperInput::new("c1", config, crm))
        .await
}

#[tokio::test]
async fn test_sqrt_writes_float_to_target() {
    let crm = crm_with(&[("amount", json!(16.0))]);
    let output = run(
        &crm,
        json!({"operation": "sqrt", "source_field": "amount", "target_field": "sqrt_amount"}),
    )
    .await
    .unwrap();

    assert!(output.success);
    assert_eq!(output.actions.len(), 1);
    let action = &output.actions[0];
    assert_eq!(action.action_type, ActionType::FieldUpdated);
    assert_eq!(action.target, "sqrt_amount");
    assert!(action.value.is_f64());
    assert_eq!(action.value.as_f64(), Some(4.0));

    let stored = crm.contact("c1").unwrap();
    assert_eq!(stored.custom_fields["sqrt_amount"].as_f64(), Some(4.0));
    assert_eq!(stored.custom_fields["amount"], json!(16.0));
}

#[tokio::test]
async fn test_sqrt_of_negative_fails_without_actions() {
    let crm = crm_with(&[("amount", json!(-4.0))]);
    let failure = run(
        &crm,
        json!({"operation": "sqrt", "source_field": "amount", "target_field": "result"}),
    )
    .await
    .unwrap_err();

    assert!(!failure.output.success);
    assert!(failure.output.actions.is_empty());
    assert_eq!(failure.error.category, ErrorCategory::ComputationError);
    assert!(failure.output.message.contains("negative"));
    assert!(!crm.contact("c1").unwrap().custom_fields.contains_key("result"));
    assert!(crm.journal().is_empty());
}

#[tokio::test]
async fn test_divide_by_zero_is_a_computation_error() {
    let crm = crm_with(&[("total", json!(10))]);
    let failure = run(
        &crm,
        json!({"operation": "divide", "source_field": "total", "operand": 0}),
    )
    .await
    .unwrap_err();

    assert_eq!(failure.error.code, "HLP-MATH-001");
    assert!(failure.output.message.contains("divide"));
    assert!(failure.output.actions.is_empty());
}

#[tokio::test]
async fn test_second_field_and_numeric_strings() {
    let crm = crm_with(&[("price", json!("19.99")), ("quantity", json!(3))]);
    let output = run(
        &crm,
        json!({
            "operation": "multiply",
            "source_field": "price",
            "second_field": "quantity",
            "target_field": "line_total"
        }),
    )
    .await
    .unwrap();

    let written = output.modified_data["line_total"].as_f64().unwrap();
    assert!((written - 59.97).abs() < 1e-9);
}

#[tokio::test]
async fn test_single_value_operation_ignores_stray_operands() {
    let crm = crm_with(&[("amount", json!(16.0))]);
    let output = run(
        &crm,
        json!({
            "operation": "sqrt",
            "source_field": "amount",
            "target_field": "root",
            "operand": 3,
            "second_field": "not_there"
        }),
    )
    .await
    .unwrap();

    assert!(output.message.contains("sqrt(16)"), "{}", output.message);
    assert!(!output.message.contains(", 3"));
    assert!(!output.logs.iter().any(|line| line.contains("not_there")));
    assert_eq!(output.modified_data["root"].as_f64(), Some(4.0));
}

#[tokio::test]
async fn test_result_overwrites_source_when_no_target() {
    let crm = crm_with(&[("visits", json!(4))]);
    run(
        &crm,
        json!({"operation": "add", "source_field": "visits", "operand": 1}),
    )
    .await
    .unwrap();

    let stored = crm.contact("c1").unwrap();
    assert_eq!(stored.custom_fields["visits"].as_f64(), Some(5.0));
}

#[tokio::test]
async fn test_missing_source_is_a_read_error() {
    let crm = crm_with(&[]);
    let failure = run(&crm, json!({"operation": "abs", "source_field": "balance"}))
        .await
        .unwrap_err();

    assert_eq!(failure.error.category, ErrorCategory::ReadError);
    assert_eq!(failure.error.field(), Some("balance"));
}

#[tokio::test]
async fn test_non_numeric_source_is_rejected() {
    let crm = crm_with(&[("amount", json!("lots"))]);
    let failure = run(&crm, json!({"operation": "round", "source_field": "amount"}))
        .await
        .unwrap_err();

    assert_eq!(failure.error.category, ErrorCategory::ComputationError);
    assert!(failure.output.message.contains("lots"));
}

#[tokio::test]
async fn test_write_refusal_reports_no_action() {
    let crm = crm_with(&[("amount", json!(9))]);
    crm.fail_set_field("root");
    let failure = run(
        &crm,
        json!({"operation": "sqrt", "source_field": "amount", "target_field": "root"}),
    )
    .await
    .unwrap_err();

    assert_eq!(failure.error.category, ErrorCategory::WriteError);
    assert!(failure.output.actions.is_empty());
    assert!(failure.output.logs.iter().any(|line| line.contains("read 9")));
}

#[tokio::test]
async fn test_unknown_operation_fails_validation() {
    let crm = crm_with(&[("amount", json!(1))]);
    let failure = run(&crm, json!({"operation": "modulo", "source_field": "amount"}))
        .await
        .unwrap_err();

    assert_eq!(failure.error.category, ErrorCategory::ValidationError);
    assert_eq!(failure.error.field(), Some("operation"));
    assert!(crm.journal().is_empty());
}
