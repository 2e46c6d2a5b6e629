//! Normalized CRM capability surface consumed by helpers.
//!
//! Platform adapters implement [`CrmConnector`]; helpers never talk to a CRM API directly.
//! The trait is intentionally flat so every helper depends on exactly one type regardless
//! of which subset of operations it uses.

pub mod memory;

pub use memory::InMemoryConnector;

use async_trait::async_trait;
use crm_helpers_types::{
    Capability, ContactList, CrmMetadata, NormalizedContact, QueryOptions, Tag,
};
use serde_json::{Map, Value};
use thiserror::Error;

/// Failure reported by a connector call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: String },
    #[error("request rejected by CRM: {0}")]
    Rejected(String),
    #[error("operation not supported by this CRM: {0}")]
    Unsupported(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ConnectorError {
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        ConnectorError::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConnectorError::NotFound { .. })
    }
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[async_trait]
pub trait CrmConnector: Send + Sync {
    async fn get_contact(&self, contact_id: &str) -> ConnectorResult<NormalizedContact>;

    async fn get_contacts(&self, opts: &QueryOptions) -> ConnectorResult<ContactList>;

    async fn create_contact(&self, contact: NormalizedContact)
        -> ConnectorResult<NormalizedContact>;

    /// Merge `fields` into the contact and return the updated record.
    async fn update_contact(
        &self,
        contact_id: &str,
        fields: &Map<String, Value>,
    ) -> ConnectorResult<NormalizedContact>;

    async fn delete_contact(&self, contact_id: &str) -> ConnectorResult<()>;

    /// Read a single field. Unknown keys yield [`ConnectorError::NotFound`].
    async fn get_contact_field_value(&self, contact_id: &str, key: &str)
        -> ConnectorResult<Value>;

    async fn set_contact_field_value(
        &self,
        contact_id: &str,
        key: &str,
        value: Value,
    ) -> ConnectorResult<()>;

    async fn get_tags(&self) -> ConnectorResult<Vec<Tag>>;

    async fn apply_tag(&self, contact_id: &str, tag_id: &str) -> ConnectorResult<()>;

    async fn remove_tag(&self, contact_id: &str, tag_id: &str) -> ConnectorResult<()>;

    async fn trigger_automation(&self, contact_id: &str, automation_id: &str)
        -> ConnectorResult<()>;

    async fn achieve_goal(
        &self,
        contact_id: &str,
        integration: &str,
        call_name: &str,
    ) -> ConnectorResult<()>;

    async fn test_connection(&self) -> ConnectorResult<()>;

    fn get_metadata(&self) -> CrmMetadata;

    fn get_capabilities(&self) -> Vec<Capability>;
}
