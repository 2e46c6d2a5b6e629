use crate::core::connector::CrmConnector;
use crate::core::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of state change recorded in an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    FieldUpdated,
    TagApplied,
    TagRemoved,
    GoalAchieved,
    AutomationTriggered,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionType::FieldUpdated => "field_updated",
            ActionType::TagApplied => "tag_applied",
            ActionType::TagRemoved => "tag_removed",
            ActionType::GoalAchieved => "goal_achieved",
            ActionType::AutomationTriggered => "automation_triggered",
        };
        f.write_str(label)
    }
}

/// Audit record of one successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub target: String,
    pub value: Value,
}

impl Action {
    pub fn new(action_type: ActionType, target: impl Into<String>, value: Value) -> Self {
        Self {
            action_type,
            target: target.into(),
            value,
        }
    }

    pub fn field_updated(field: &str, value: Value) -> Self {
        Self::new(ActionType::FieldUpdated, field, value)
    }

    pub fn tag_applied(tag_id: &str) -> Self {
        Self::new(ActionType::TagApplied, tag_id, Value::Bool(true))
    }

    pub fn tag_removed(tag_id: &str) -> Self {
        Self::new(ActionType::TagRemoved, tag_id, Value::Bool(true))
    }
}

/// Everything a helper needs for one execution. The connector is borrowed for the
/// duration of the call.
pub struct HelperInput<'a> {
    pub contact_id: String,
    pub config: Map<String, Value>,
    pub connector: &'a dyn CrmConnector,
}

impl<'a> HelperInput<'a> {
    pub fn new(
        contact_id: impl Into<String>,
        config: Map<String, Value>,
        connector: &'a dyn CrmConnector,
    ) -> Self {
        Self {
            contact_id: contact_id.into(),
            config,
            connector,
        }
    }
}

/// What a helper reports back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HelperOutput {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub modified_data: Map<String, Value>,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl HelperOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic line; mirrored to tracing at debug level.
    pub fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(target: "crm_helpers::helper", "{}", line);
        self.logs.push(line);
    }

    pub fn record_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn set_modified(&mut self, key: impl Into<String>, value: Value) {
        self.modified_data.insert(key.into(), value);
    }

    /// Record a field write: action plus matching `modified_data` entry.
    pub fn record_field_update(&mut self, field: &str, value: Value) {
        self.record_action(Action::field_updated(field, value.clone()));
        self.set_modified(field, value);
    }

    pub fn succeed(mut self, message: impl Into<String>) -> Self {
        self.success = true;
        self.message = message.into();
        self
    }

    /// Turn the output into a failure carrying `error`. The message shown to the user is
    /// the error's message.
    pub fn fail(mut self, error: AppError) -> HelperFailure {
        self.success = false;
        self.message = error.message.clone();
        self.log(format!("failed: {}", error.message));
        HelperFailure {
            output: self,
            error,
        }
    }
}

/// Failed execution: the partial output plus the error a caller can branch on.
///
/// `output.success` is always `false`; `output.actions` still lists mutations that
/// succeeded before the failure.
#[derive(Debug)]
pub struct HelperFailure {
    pub output: HelperOutput,
    pub error: AppError,
}

impl fmt::Display for HelperFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for HelperFailure {}

impl From<AppError> for HelperFailure {
    fn from(error: AppError) -> Self {
        HelperOutput::new().fail(error)
    }
}
