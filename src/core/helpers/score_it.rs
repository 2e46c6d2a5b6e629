#![allow(clippy::result_large_err)]

use crate::core::coerce::{self, as_number, number_value};
use crate::core::envelope::{Action, HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::helpers::{write_field, FailWith};
use crate::core::schema::{ConfigSchema, PropertySchema};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{Map, Value};

struct ScoreRule {
    tag_id: String,
    points: f64,
}

struct ScoreConfig {
    rules: Vec<ScoreRule>,
    target_field: String,
    threshold: Option<f64>,
    threshold_tag_id: Option<String>,
}

impl ScoreConfig {
    fn from_config(config: &Map<String, Value>) -> Result<Self, AppError> {
        let raw_rules = config
            .get("rules")
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::invalid_field("rules", "rules must be a list"))?;
        if raw_rules.is_empty() {
            return Err(AppError::invalid_field(
                "rules",
                "rules must contain at least one rule",
            ));
        }
        let mut rules = Vec::with_capacity(raw_rules.len());
        for (index, raw) in raw_rules.iter().enumerate() {
            let field = |name: &str| format!("rules[{}].{}", index, name);
            let tag_id = raw
                .get("tag_id")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    AppError::invalid_field(&field("tag_id"), format!("{} is required", field("tag_id")))
                })?;
            let points = raw.get("points").and_then(as_number).ok_or_else(|| {
                AppError::invalid_field(
                    &field("points"),
                    format!("{} must be a number", field("points")),
                )
            })?;
            rules.push(ScoreRule {
                tag_id: tag_id.to_string(),
                points,
            });
        }
        let target_field = coerce::require_str(config, "target_field")?;
        let threshold = coerce::config_f64(config, "threshold")?;
        let threshold_tag_id = coerce::config_str(config, "threshold_tag_id");
        match (&threshold, &threshold_tag_id) {
            (Some(_), None) => {
                return Err(AppError::invalid_field(
                    "threshold_tag_id",
                    "threshold_tag_id is required when threshold is set",
                ))
            }
            (None, Some(_)) => {
                return Err(AppError::invalid_field(
                    "threshold",
                    "threshold is required when threshold_tag_id is set",
                ))
            }
            _ => {}
        }
        Ok(Self {
            rules,
            target_field,
            threshold,
            threshold_tag_id,
        })
    }
}

/// Scores a contact from the tags it carries.
#[derive(Default)]
pub struct ScoreIt;

#[async_trait]
impl Helper for ScoreIt {
    fn name(&self) -> &'static str {
        "Score It"
    }

    fn helper_type(&self) -> &'static str {
        "score_it"
    }

    fn category(&self) -> &'static str {
        "tagging"
    }

    fn description(&self) -> &'static str {
        "Add up points for the tags a contact has and save the score"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property(
                "rules",
                PropertySchema::array(
                    "Scoring rules",
                    PropertySchema::object("{ tag_id, points } pair"),
                ),
            )
            .property(
                "target_field",
                PropertySchema::string("Field receiving the score"),
            )
            .property(
                "threshold",
                PropertySchema::number("Score at which threshold_tag_id is applied"),
            )
            .property(
                "threshold_tag_id",
                PropertySchema::string("Tag applied when the score reaches threshold"),
            )
            .required(&["rules", "target_field"])
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), AppError> {
        self.config_schema().validate(config)?;
        ScoreConfig::from_config(config).map(|_| ())
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        let config = ScoreConfig::from_config(&input.config)?;
        let mut output = HelperOutput::new();

        let contact = input
            .connector
            .get_contact(&input.contact_id)
            .await
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::ReadError,
                    format!(
                        "Failed to read tags for contact '{}': {}",
                        input.contact_id, err
                    ),
                )
                .with_code("HLP-READ-003")
            })
            .fail_with(&mut output)?;

        let mut score = 0.0;
        for rule in &config.rules {
            if contact.has_tag(&rule.tag_id) {
                score += rule.points;
                output.log(format!("tag '{}' present: +{}", rule.tag_id, rule.points));
            }
        }

        let value = number_value(score).fail_with(&mut output)?;
        write_field(&input, &mut output, &config.target_field, value)
            .await
            .fail_with(&mut output)?;

        if let (Some(threshold), Some(tag_id)) = (config.threshold, &config.threshold_tag_id) {
            if score >= threshold {
                if contact.has_tag(tag_id) {
                    output.log(format!("threshold tag '{}' already present", tag_id));
                } else {
                    input
                        .connector
                        .apply_tag(&input.contact_id, tag_id)
                        .await
                        .map_err(|err| {
                            AppError::new(
                                ErrorCategory::WriteError,
                                format!("Failed to apply threshold tag '{}': {}", tag_id, err),
                            )
                            .with_code("HLP-TAG-002")
                        })
                        .fail_with(&mut output)?;
                    output.log(format!("applied threshold tag '{}'", tag_id));
                    output.record_action(Action::tag_applied(tag_id));
                }
            }
        }

        Ok(output.succeed(format!(
            "Score {} saved to {}",
            score, config.target_field
        )))
    }
}
