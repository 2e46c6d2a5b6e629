use crate::core::config::HelpersConfig;
use crate::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::geo::{GeoLookup, HttpGeoLookup};
use crate::core::schema::ConfigSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Read-only catalog view of a helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub helper_type: String,
    pub category: String,
    pub description: String,
    pub requires_crm: bool,
    /// Platform slugs the helper is limited to; empty means every platform.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_crms: Vec<String>,
}

impl HelperMetadata {
    pub fn supports(&self, platform: &str) -> bool {
        self.supported_crms.is_empty() || self.supported_crms.iter().any(|p| p == platform)
    }
}

/// Runtime settings that some helpers need but that are not part of a step's config.
#[derive(Debug, Clone)]
pub struct HelperSettings {
    pub geo_endpoint: String,
    pub geo_timeout: Duration,
}

impl Default for HelperSettings {
    fn default() -> Self {
        Self::from_config(&HelpersConfig::default())
    }
}

impl HelperSettings {
    pub fn from_config(config: &HelpersConfig) -> Self {
        Self {
            geo_endpoint: config.geolocation.endpoint.clone(),
            geo_timeout: config.geolocation.timeout(),
        }
    }
}

/// Per-run context handed to [`Helper::execute`].
#[derive(Clone)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub settings: Arc<HelperSettings>,
    geo_lookup: Option<Arc<dyn GeoLookup>>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(Arc::new(HelperSettings::default()))
    }
}

impl ExecutionContext {
    pub fn new(settings: Arc<HelperSettings>) -> Self {
        Self {
            execution_id: format!("exec-{}", uuid::Uuid::new_v4()),
            settings,
            geo_lookup: None,
        }
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = execution_id.into();
        self
    }

    /// Replace the HTTP geolocation client, e.g. with a stub in tests.
    pub fn with_geo_lookup(mut self, lookup: Arc<dyn GeoLookup>) -> Self {
        self.geo_lookup = Some(lookup);
        self
    }

    pub fn geo_lookup(&self) -> Result<Arc<dyn GeoLookup>, AppError> {
        if let Some(lookup) = &self.geo_lookup {
            return Ok(lookup.clone());
        }
        let client = HttpGeoLookup::new(&self.settings.geo_endpoint, self.settings.geo_timeout)?;
        Ok(Arc::new(client))
    }
}

/// Contract implemented by every helper plugin.
///
/// Helpers are stateless: the registry creates a fresh instance per execution and drops it
/// afterwards. Metadata accessors and [`Helper::config_schema`] must be cheap and free of
/// side effects because catalog listings instantiate every helper.
#[async_trait]
pub trait Helper: Send + Sync + 'static {
    /// Display name shown in the workflow builder.
    fn name(&self) -> &'static str;

    /// Stable identifier used in stored workflow definitions.
    fn helper_type(&self) -> &'static str;

    fn category(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn requires_crm(&self) -> bool {
        true
    }

    /// Platforms this helper is restricted to. Empty means all.
    fn supported_crms(&self) -> &'static [&'static str] {
        &[]
    }

    fn metadata(&self) -> HelperMetadata {
        HelperMetadata {
            name: self.name().to_string(),
            helper_type: self.helper_type().to_string(),
            category: self.category().to_string(),
            description: self.description().to_string(),
            requires_crm: self.requires_crm(),
            supported_crms: self
                .supported_crms()
                .iter()
                .map(|crm| crm.to_string())
                .collect(),
        }
    }

    fn config_schema(&self) -> ConfigSchema;

    /// Validate raw config ahead of execution. Never touches the connector.
    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), AppError> {
        self.config_schema().validate(config)
    }

    /// Run the helper against `input.contact_id`. Only called with validated config.
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure>;
}
