use crm_helpers::core::connector::ConnectorError;
use crm_helpers::core::envelope::{Action, HelperFailure, HelperOutput};
use crm_helpers::core::error::AppError;
use crm_helpers::core::types::{ErrorCategory, ErrorSeverity};
use serde_json::json;

#[test]
fn test_error_creation_all_categories() {
    let categories = vec![
        ErrorCategory::ValidationError,
        ErrorCategory::NotRegistered,
        ErrorCategory::ReadError,
        ErrorCategory::WriteError,
        ErrorCategory::ComputationError,
        ErrorCategory::ConnectorError,
        ErrorCategory::NetworkError,
        ErrorCategory::TimeoutError,
        ErrorCategory::SerializationError,
        ErrorCategory::IoError,
        ErrorCategory::InternalError,
        ErrorCategory::Unknown,
    ];

    for category in categories {
        let error = AppError::new(category, "test message");
        assert_eq!(error.category, category);
        assert_eq!(error.message, "test message");
        assert!(error.context.is_empty());
        assert!(error.recovery_suggestions.is_empty());
        assert!(error.occurred_at <= chrono::Utc::now());
        assert!(error.source.is_none());
        assert!(error.code.starts_with("ERR-"));
    }
}

#[test]
fn test_error_severity_mapping() {
    assert_eq!(
        AppError::new(ErrorCategory::ComputationError, "x").severity(),
        ErrorSeverity::Error
    );
    assert_eq!(
        AppError::new(ErrorCategory::Unknown, "x").severity(),
        ErrorSeverity::Info
    );
}

#[test]
fn test_error_display() {
    let error = AppError::invalid_field("decimals", "decimals must be between 0 and 10");

    let display = format!("{}", error);
    assert!(display.contains("HLP-CFG-001"));
    assert!(display.contains("ValidationError"));
    assert!(display.contains("decimals must be between 0 and 10"));
    assert!(display.contains("decimals"));
}

#[test]
fn test_error_display_with_source() {
    let source = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
    let error = AppError::with_source(
        ErrorCategory::NetworkError,
        "geolocation request failed",
        Box::new(source),
    );

    let display = format!("{}", error);
    assert!(display.contains("geolocation request failed"));
    assert!(display.contains("socket closed"));
}

#[test]
fn test_error_from_io_error() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "fixture missing");
    let app_error = AppError::from(io_error);

    assert_eq!(app_error.category, ErrorCategory::IoError);
    assert_eq!(app_error.code, "IO_ERROR");
    assert_eq!(
        app_error.recovery_suggestions,
        vec!["Check file permissions and paths".to_string()]
    );
}

#[test]
fn test_error_from_anyhow() {
    let app_error = AppError::from(anyhow::anyhow!("boom"));
    assert_eq!(app_error.category, ErrorCategory::InternalError);
    assert_eq!(app_error.message, "boom");
    assert!(app_error.source.is_some());
}

#[test]
fn test_error_from_serde() {
    let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let app_error = AppError::from(parse_error);
    assert_eq!(app_error.category, ErrorCategory::SerializationError);
    assert_eq!(app_error.code, "SERDE_ERROR");
}

#[test]
fn test_connector_errors_keep_their_kind() {
    let cases = vec![
        (ConnectorError::not_found("contact", "c9"), "CRM-404"),
        (ConnectorError::Rejected("quota".to_string()), "CRM-REJECTED"),
        (ConnectorError::Unsupported("goals".to_string()), "CRM-UNSUPPORTED"),
        (ConnectorError::Transport("reset".to_string()), "CRM-TRANSPORT"),
    ];
    for (source, code) in cases {
        let message = source.to_string();
        let error = AppError::from(source);
        assert_eq!(error.category, ErrorCategory::ConnectorError);
        assert_eq!(error.code, code);
        assert_eq!(error.message, message);
    }
    assert_eq!(
        ConnectorError::not_found("field", "nickname").to_string(),
        "field 'nickname' not found"
    );
}

#[test]
fn test_failure_from_error_carries_message() {
    let failure = HelperFailure::from(AppError::new(
        ErrorCategory::ComputationError,
        "Cannot divide 10 by zero",
    ));
    assert!(!failure.output.success);
    assert_eq!(failure.output.message, "Cannot divide 10 by zero");
    assert!(failure.output.actions.is_empty());
    assert!(failure.to_string().contains("Cannot divide 10 by zero"));
}

#[test]
fn test_fail_keeps_completed_actions() {
    let mut output = HelperOutput::new();
    output.record_action(Action::tag_applied("t1"));
    let failure = output.fail(
        AppError::new(ErrorCategory::WriteError, "Failed to apply threshold tag").with_code("HLP-TAG-002"),
    );
    assert!(!failure.output.success);
    assert_eq!(failure.output.actions.len(), 1);
    assert_eq!(failure.error.code, "HLP-TAG-002");

    let serialized = serde_json::to_value(&failure.output).unwrap();
    assert_eq!(serialized["success"], json!(false));
    assert_eq!(serialized["actions"][0]["type"], json!("tag_applied"));
    assert_eq!(serialized["actions"][0]["target"], json!("t1"));
}
