#![allow(clippy::result_large_err)]

use crate::core::coerce;
use crate::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::helpers::tag_it::{dedupe, finish_tag_batch, run_tag_batch, TagAction};
use crate::core::helpers::FailWith;
use crate::core::schema::{ConfigSchema, PropertySchema};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{Map, Value};

struct ClearConfig {
    tag_ids: Vec<String>,
    name_prefix: Option<String>,
}

impl ClearConfig {
    fn from_config(config: &Map<String, Value>) -> Result<Self, AppError> {
        let tag_ids = coerce::config_str_list(config, "tag_ids")?;
        let name_prefix = coerce::config_str(config, "name_prefix");
        if tag_ids.is_empty() && name_prefix.is_none() {
            return Err(AppError::invalid_field(
                "tag_ids",
                "tag_ids must list at least one tag unless name_prefix is set",
            ));
        }
        Ok(Self {
            tag_ids,
            name_prefix,
        })
    }
}

/// Removes a set of tags, chosen by id or by name prefix.
#[derive(Default)]
pub struct ClearTags;

#[async_trait]
impl Helper for ClearTags {
    fn name(&self) -> &'static str {
        "Clear Tags"
    }

    fn helper_type(&self) -> &'static str {
        "clear_tags"
    }

    fn category(&self) -> &'static str {
        "tagging"
    }

    fn description(&self) -> &'static str {
        "Remove listed tags, or every tag whose name starts with a prefix"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property(
                "tag_ids",
                PropertySchema::array("Tags to remove", PropertySchema::string("Tag id")),
            )
            .property(
                "name_prefix",
                PropertySchema::string(
                    "Also remove every tag whose name starts with this text (case-insensitive)",
                ),
            )
    }

    /// Neither key is required on its own; at least one of them must select tags.
    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), AppError> {
        self.config_schema().validate(config)?;
        ClearConfig::from_config(config).map(|_| ())
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        let config = ClearConfig::from_config(&input.config)?;
        let mut output = HelperOutput::new();

        let mut targets = config.tag_ids.clone();
        if let Some(prefix) = &config.name_prefix {
            let contact = input
                .connector
                .get_contact(&input.contact_id)
                .await
                .map_err(|err| {
                    AppError::new(
                        ErrorCategory::ReadError,
                        format!("Failed to read tags for contact '{}': {}", input.contact_id, err),
                    )
                    .with_code("HLP-READ-003")
                })
                .fail_with(&mut output)?;
            let prefix = prefix.to_lowercase();
            let matched: Vec<String> = contact
                .tags
                .iter()
                .filter(|tag| tag.name.to_lowercase().starts_with(&prefix))
                .map(|tag| tag.id.clone())
                .collect();
            output.log(format!(
                "{} tag(s) match prefix '{}'",
                matched.len(),
                prefix
            ));
            targets.extend(matched);
        }
        dedupe(&mut targets);

        if targets.is_empty() {
            output.set_modified("tags_removed", Value::Array(Vec::new()));
            return Ok(output.succeed("No matching tags to clear"));
        }

        let report = run_tag_batch(&input, &mut output, TagAction::Remove, &targets).await;
        finish_tag_batch(output, TagAction::Remove, report)
    }
}
