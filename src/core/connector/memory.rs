use crate::core::connector::{ConnectorError, ConnectorResult, CrmConnector};
use async_trait::async_trait;
use chrono::Utc;
use crm_helpers_types::{
    Capability, ContactList, CrmMetadata, NormalizedContact, QueryOptions, Tag,
};
use dashmap::{DashMap, DashSet};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Mutex;

const STANDARD_FIELDS: [&str; 4] = ["id", "email", "first_name", "last_name"];

/// A successful mutation observed by the in-memory connector.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    ContactCreated { contact_id: String },
    ContactUpdated { contact_id: String },
    ContactDeleted { contact_id: String },
    FieldSet { contact_id: String, key: String, value: Value },
    TagApplied { contact_id: String, tag_id: String },
    TagRemoved { contact_id: String, tag_id: String },
    AutomationTriggered { contact_id: String, automation_id: String },
    GoalAchieved { contact_id: String, integration: String, call_name: String },
}

/// Which calls should fail, keyed by the identifier they touch.
#[derive(Default)]
struct FailurePlan {
    apply_tag: DashSet<String>,
    remove_tag: DashSet<String>,
    set_field: DashSet<String>,
    get_field: DashSet<String>,
    automations: DashSet<String>,
    goals: DashSet<String>,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    metadata: Option<CrmMetadata>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    contacts: Vec<NormalizedContact>,
    #[serde(default)]
    failures: FixtureFailures,
}

/// Optional `failures` block of a fixture, listing identifiers whose calls should fail.
#[derive(Debug, Default, Deserialize)]
struct FixtureFailures {
    #[serde(default)]
    apply_tag: Vec<String>,
    #[serde(default)]
    remove_tag: Vec<String>,
    #[serde(default)]
    set_field: Vec<String>,
    #[serde(default)]
    get_field: Vec<String>,
    #[serde(default)]
    automations: Vec<String>,
    #[serde(default)]
    goals: Vec<String>,
}

/// Connector backed by process memory.
///
/// Used by tests and the CLI `run` command. Writes to unknown custom fields create the
/// field unless strict mode is enabled; reads of unknown fields always return `NotFound`.
pub struct InMemoryConnector {
    metadata: CrmMetadata,
    contacts: DashMap<String, NormalizedContact>,
    tags: DashMap<String, Tag>,
    failures: FailurePlan,
    strict_fields: bool,
    journal: Mutex<Vec<Mutation>>,
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self {
            metadata: CrmMetadata {
                platform: "memory".to_string(),
                display_name: "In-memory CRM".to_string(),
                api_version: None,
            },
            contacts: DashMap::new(),
            tags: DashMap::new(),
            failures: FailurePlan::default(),
            strict_fields: false,
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Build a connector from a JSON document with optional `metadata`, `tags`,
    /// `contacts` and `failures` keys.
    pub fn from_fixture(value: Value) -> Result<Self, serde_json::Error> {
        let fixture: Fixture = serde_json::from_value(value)?;
        let mut connector = Self::new();
        if let Some(metadata) = fixture.metadata {
            connector.metadata = metadata;
        }
        for tag in fixture.tags {
            connector.insert_tag(tag);
        }
        for contact in fixture.contacts {
            connector.insert_contact(contact);
        }
        let plan = fixture.failures;
        plan.apply_tag.into_iter().for_each(|id| connector.fail_apply_tag(id));
        plan.remove_tag.into_iter().for_each(|id| connector.fail_remove_tag(id));
        plan.set_field.into_iter().for_each(|key| connector.fail_set_field(key));
        plan.get_field.into_iter().for_each(|key| connector.fail_get_field(key));
        plan.automations.into_iter().for_each(|id| connector.fail_automation(id));
        plan.goals.into_iter().for_each(|name| connector.fail_goal(name));
        Ok(connector)
    }

    pub fn with_contact(self, contact: NormalizedContact) -> Self {
        self.insert_contact(contact);
        self
    }

    pub fn with_tag(self, tag: Tag) -> Self {
        self.insert_tag(tag);
        self
    }

    /// Reject writes to custom fields the contact does not already carry.
    pub fn with_strict_fields(mut self) -> Self {
        self.strict_fields = true;
        self
    }

    pub fn insert_contact(&self, contact: NormalizedContact) {
        self.contacts.insert(contact.id.clone(), contact);
    }

    pub fn insert_tag(&self, tag: Tag) {
        self.tags.insert(tag.id.clone(), tag);
    }

    pub fn fail_apply_tag(&self, tag_id: impl Into<String>) {
        self.failures.apply_tag.insert(tag_id.into());
    }

    pub fn fail_remove_tag(&self, tag_id: impl Into<String>) {
        self.failures.remove_tag.insert(tag_id.into());
    }

    pub fn fail_set_field(&self, key: impl Into<String>) {
        self.failures.set_field.insert(key.into());
    }

    pub fn fail_get_field(&self, key: impl Into<String>) {
        self.failures.get_field.insert(key.into());
    }

    pub fn fail_automation(&self, automation_id: impl Into<String>) {
        self.failures.automations.insert(automation_id.into());
    }

    pub fn fail_goal(&self, call_name: impl Into<String>) {
        self.failures.goals.insert(call_name.into());
    }

    /// Snapshot of a stored contact.
    pub fn contact(&self, contact_id: &str) -> Option<NormalizedContact> {
        self.contacts.get(contact_id).map(|entry| entry.value().clone())
    }

    /// Successful mutations in the order they happened.
    pub fn journal(&self) -> Vec<Mutation> {
        self.journal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, mutation: Mutation) {
        self.journal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(mutation);
    }

    fn missing_contact(contact_id: &str) -> ConnectorError {
        ConnectorError::not_found("contact", contact_id)
    }
}

fn read_field(contact: &NormalizedContact, key: &str) -> Option<Value> {
    let optional = |value: &Option<String>| value.clone().map(Value::String);
    match key {
        "id" => Some(Value::String(contact.id.clone())),
        "email" => optional(&contact.email),
        "first_name" => optional(&contact.first_name),
        "last_name" => optional(&contact.last_name),
        _ => contact.custom_fields.get(key).cloned(),
    }
}

fn write_field(contact: &mut NormalizedContact, key: &str, value: Value) -> ConnectorResult<()> {
    let as_text = |value: Value| match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        other => Err(ConnectorError::Rejected(format!(
            "field '{}' only accepts text, got {}",
            key, other
        ))),
    };
    match key {
        "id" => {
            return Err(ConnectorError::Rejected(
                "contact id is read-only".to_string(),
            ))
        }
        "email" => contact.email = as_text(value)?,
        "first_name" => contact.first_name = as_text(value)?,
        "last_name" => contact.last_name = as_text(value)?,
        _ => {
            contact.custom_fields.insert(key.to_string(), value);
        }
    }
    contact.updated_at = Some(Utc::now());
    Ok(())
}

#[async_trait]
impl CrmConnector for InMemoryConnector {
    async fn get_contact(&self, contact_id: &str) -> ConnectorResult<NormalizedContact> {
        self.contact(contact_id)
            .ok_or_else(|| Self::missing_contact(contact_id))
    }

    async fn get_contacts(&self, opts: &QueryOptions) -> ConnectorResult<ContactList> {
        let mut matching: Vec<NormalizedContact> = self
            .contacts
            .iter()
            .filter(|entry| {
                opts.email
                    .as_deref()
                    .map_or(true, |email| entry.email.as_deref() == Some(email))
            })
            .filter(|entry| opts.tag_id.as_deref().map_or(true, |tag| entry.has_tag(tag)))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        let total = matching.len();
        let contacts: Vec<NormalizedContact> = matching
            .into_iter()
            .skip(opts.offset)
            .take(opts.limit)
            .collect();
        let has_more = opts.offset + contacts.len() < total;
        Ok(ContactList {
            contacts,
            total,
            has_more,
        })
    }

    async fn create_contact(
        &self,
        mut contact: NormalizedContact,
    ) -> ConnectorResult<NormalizedContact> {
        if contact.id.trim().is_empty() {
            contact.id = uuid::Uuid::new_v4().to_string();
        }
        if self.contacts.contains_key(&contact.id) {
            return Err(ConnectorError::Rejected(format!(
                "contact '{}' already exists",
                contact.id
            )));
        }
        let now = Utc::now();
        contact.created_at.get_or_insert(now);
        contact.updated_at = Some(now);
        self.contacts.insert(contact.id.clone(), contact.clone());
        self.record(Mutation::ContactCreated {
            contact_id: contact.id.clone(),
        });
        Ok(contact)
    }

    async fn update_contact(
        &self,
        contact_id: &str,
        fields: &Map<String, Value>,
    ) -> ConnectorResult<NormalizedContact> {
        let updated = {
            let mut entry = self
                .contacts
                .get_mut(contact_id)
                .ok_or_else(|| Self::missing_contact(contact_id))?;
            let mut draft = entry.value().clone();
            for (key, value) in fields {
                write_field(&mut draft, key, value.clone())?;
            }
            *entry = draft.clone();
            draft
        };
        self.record(Mutation::ContactUpdated {
            contact_id: contact_id.to_string(),
        });
        Ok(updated)
    }

    async fn delete_contact(&self, contact_id: &str) -> ConnectorResult<()> {
        self.contacts
            .remove(contact_id)
            .ok_or_else(|| Self::missing_contact(contact_id))?;
        self.record(Mutation::ContactDeleted {
            contact_id: contact_id.to_string(),
        });
        Ok(())
    }

    async fn get_contact_field_value(
        &self,
        contact_id: &str,
        key: &str,
    ) -> ConnectorResult<Value> {
        if self.failures.get_field.contains(key) {
            return Err(ConnectorError::Transport(format!(
                "read of field '{}' failed",
                key
            )));
        }
        let contact = self
            .contacts
            .get(contact_id)
            .ok_or_else(|| Self::missing_contact(contact_id))?;
        read_field(&contact, key).ok_or_else(|| ConnectorError::not_found("field", key))
    }

    async fn set_contact_field_value(
        &self,
        contact_id: &str,
        key: &str,
        value: Value,
    ) -> ConnectorResult<()> {
        if self.failures.set_field.contains(key) {
            return Err(ConnectorError::Rejected(format!(
                "write of field '{}' refused",
                key
            )));
        }
        {
            let mut contact = self
                .contacts
                .get_mut(contact_id)
                .ok_or_else(|| Self::missing_contact(contact_id))?;
            if self.strict_fields
                && !STANDARD_FIELDS.contains(&key)
                && !contact.custom_fields.contains_key(key)
            {
                return Err(ConnectorError::not_found("field", key));
            }
            write_field(&mut contact, key, value.clone())?;
        }
        self.record(Mutation::FieldSet {
            contact_id: contact_id.to_string(),
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    async fn get_tags(&self) -> ConnectorResult<Vec<Tag>> {
        let mut tags: Vec<Tag> = self.tags.iter().map(|entry| entry.value().clone()).collect();
        tags.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tags)
    }

    async fn apply_tag(&self, contact_id: &str, tag_id: &str) -> ConnectorResult<()> {
        if self.failures.apply_tag.contains(tag_id) {
            return Err(ConnectorError::Rejected(format!(
                "tag '{}' could not be applied",
                tag_id
            )));
        }
        let tag = self
            .tags
            .get(tag_id)
            .map(|entry| entry.to_ref())
            .ok_or_else(|| ConnectorError::not_found("tag", tag_id))?;
        {
            let mut contact = self
                .contacts
                .get_mut(contact_id)
                .ok_or_else(|| Self::missing_contact(contact_id))?;
            if !contact.has_tag(tag_id) {
                contact.tags.push(tag);
            }
        }
        self.record(Mutation::TagApplied {
            contact_id: contact_id.to_string(),
            tag_id: tag_id.to_string(),
        });
        Ok(())
    }

    async fn remove_tag(&self, contact_id: &str, tag_id: &str) -> ConnectorResult<()> {
        if self.failures.remove_tag.contains(tag_id) {
            return Err(ConnectorError::Rejected(format!(
                "tag '{}' could not be removed",
                tag_id
            )));
        }
        {
            let mut contact = self
                .contacts
                .get_mut(contact_id)
                .ok_or_else(|| Self::missing_contact(contact_id))?;
            contact.tags.retain(|tag| tag.id != tag_id);
        }
        self.record(Mutation::TagRemoved {
            contact_id: contact_id.to_string(),
            tag_id: tag_id.to_string(),
        });
        Ok(())
    }

    async fn trigger_automation(
        &self,
        contact_id: &str,
        automation_id: &str,
    ) -> ConnectorResult<()> {
        if self.failures.automations.contains(automation_id) {
            return Err(ConnectorError::Rejected(format!(
                "automation '{}' could not be triggered",
                automation_id
            )));
        }
        if !self.contacts.contains_key(contact_id) {
            return Err(Self::missing_contact(contact_id));
        }
        self.record(Mutation::AutomationTriggered {
            contact_id: contact_id.to_string(),
            automation_id: automation_id.to_string(),
        });
        Ok(())
    }

    async fn achieve_goal(
        &self,
        contact_id: &str,
        integration: &str,
        call_name: &str,
    ) -> ConnectorResult<()> {
        if self.failures.goals.contains(call_name) {
            return Err(ConnectorError::Rejected(format!(
                "goal '{}' could not be achieved",
                call_name
            )));
        }
        if !self.contacts.contains_key(contact_id) {
            return Err(Self::missing_contact(contact_id));
        }
        self.record(Mutation::GoalAchieved {
            contact_id: contact_id.to_string(),
            integration: integration.to_string(),
            call_name: call_name.to_string(),
        });
        Ok(())
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }

    fn get_metadata(&self) -> CrmMetadata {
        self.metadata.clone()
    }

    fn get_capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::Contacts,
            Capability::Tags,
            Capability::CustomFields,
            Capability::Automations,
            Capability::Goals,
        ]
    }
}
