#![allow(clippy::result_large_err)]

use crate::core::coerce;
use crate::core::envelope::{Action, HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::helpers::BatchReport;
use crate::core::schema::{ConfigSchema, PropertySchema};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagAction {
    Apply,
    Remove,
}

impl TagAction {
    fn verb(self) -> &'static str {
        match self {
            TagAction::Apply => "apply",
            TagAction::Remove => "remove",
        }
    }

    fn past(self) -> &'static str {
        match self {
            TagAction::Apply => "Applied",
            TagAction::Remove => "Removed",
        }
    }
}

struct TagConfig {
    action: TagAction,
    tag_ids: Vec<String>,
}

impl TagConfig {
    fn from_config(config: &Map<String, Value>) -> Result<Self, AppError> {
        let action = match coerce::require_str(config, "action")?.as_str() {
            "apply" => TagAction::Apply,
            "remove" => TagAction::Remove,
            other => {
                return Err(AppError::invalid_field(
                    "action",
                    format!("action must be one of: apply, remove; got '{}'", other),
                ))
            }
        };
        let mut tag_ids = coerce::config_str_list(config, "tag_ids")?;
        dedupe(&mut tag_ids);
        if tag_ids.is_empty() {
            return Err(AppError::invalid_field(
                "tag_ids",
                "tag_ids must contain at least one tag",
            ));
        }
        Ok(Self { action, tag_ids })
    }
}

pub(crate) fn dedupe(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// Apply or remove each tag, continuing past individual failures.
pub(crate) async fn run_tag_batch(
    input: &HelperInput<'_>,
    output: &mut HelperOutput,
    action: TagAction,
    tag_ids: &[String],
) -> BatchReport {
    let mut report = BatchReport::new();
    for tag_id in tag_ids {
        let result = match action {
            TagAction::Apply => input.connector.apply_tag(&input.contact_id, tag_id).await,
            TagAction::Remove => input.connector.remove_tag(&input.contact_id, tag_id).await,
        };
        match result {
            Ok(()) => {
                output.log(format!("{} tag '{}'", action.past().to_lowercase(), tag_id));
                output.record_action(match action {
                    TagAction::Apply => Action::tag_applied(tag_id),
                    TagAction::Remove => Action::tag_removed(tag_id),
                });
                report.succeeded.push(tag_id.clone());
            }
            Err(err) => {
                tracing::warn!(
                    contact_id = %input.contact_id,
                    tag_id = %tag_id,
                    error = %err,
                    "tag {} failed",
                    action.verb()
                );
                output.log(format!(
                    "Failed to {} tag '{}': {}",
                    action.verb(),
                    tag_id,
                    err
                ));
                report.failed.push((tag_id.clone(), err.to_string()));
            }
        }
    }
    report
}

/// Close out a tag batch: success when at least one item succeeded.
pub(crate) fn finish_tag_batch(
    mut output: HelperOutput,
    action: TagAction,
    report: BatchReport,
) -> Result<HelperOutput, HelperFailure> {
    let key = match action {
        TagAction::Apply => "tags_applied",
        TagAction::Remove => "tags_removed",
    };
    output.set_modified(
        key,
        Value::Array(report.succeeded.iter().cloned().map(Value::String).collect()),
    );
    if report.succeeded.is_empty() {
        let error = AppError::new(
            ErrorCategory::WriteError,
            format!(
                "Failed to {} tag(s): {}",
                action.verb(),
                report.failure_summary()
            ),
        )
        .with_code("HLP-TAG-001");
        return Err(output.fail(error));
    }
    let message = if report.failed.is_empty() {
        format!("{} {} tag(s)", action.past(), report.succeeded.len())
    } else {
        format!(
            "{} {} of {} tag(s); failed: {}",
            action.past(),
            report.succeeded.len(),
            report.attempted(),
            report.failure_summary()
        )
    };
    Ok(output.succeed(message))
}

/// Applies or removes a list of tags on the contact.
#[derive(Default)]
pub struct TagIt;

#[async_trait]
impl Helper for TagIt {
    fn name(&self) -> &'static str {
        "Tag It"
    }

    fn helper_type(&self) -> &'static str {
        "tag_it"
    }

    fn category(&self) -> &'static str {
        "tagging"
    }

    fn description(&self) -> &'static str {
        "Apply or remove one or more tags on the contact"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property(
                "action",
                PropertySchema::string("Whether to apply or remove the tags")
                    .with_enum(&["apply", "remove"]),
            )
            .property(
                "tag_ids",
                PropertySchema::array("Tags to change", PropertySchema::string("Tag id")),
            )
            .required(&["action", "tag_ids"])
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), AppError> {
        self.config_schema().validate(config)?;
        TagConfig::from_config(config).map(|_| ())
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        let config = TagConfig::from_config(&input.config)?;
        let mut output = HelperOutput::new();
        let report = run_tag_batch(&input, &mut output, config.action, &config.tag_ids).await;
        finish_tag_batch(output, config.action, report)
    }
}
