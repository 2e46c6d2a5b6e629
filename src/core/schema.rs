//! Declarative description of the parameters a helper accepts.
//!
//! The serialized form is a small JSON-Schema subset (`type`, `properties`, `required`,
//! `enum`, `default`, `description`, `items`) consumed by workflow-builder UIs, so it has to
//! round-trip through JSON without loss. Property order is preserved.

use crate::core::error::AppError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Semantic type of a config property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SchemaType::String => "a string",
            SchemaType::Number => "a number",
            SchemaType::Integer => "an integer",
            SchemaType::Boolean => "a boolean",
            SchemaType::Array => "an array",
            SchemaType::Object => "an object",
        };
        f.write_str(label)
    }
}

impl SchemaType {
    /// Whether `value` is acceptable for this type. Numeric strings count as numbers since
    /// builder UIs frequently submit form input as text.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Number => {
                value.is_number()
                    || value
                        .as_str()
                        .is_some_and(|text| text.trim().parse::<f64>().is_ok())
            }
            SchemaType::Integer => match value {
                Value::Number(number) => {
                    number.is_i64()
                        || number.is_u64()
                        || number.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                Value::String(text) => text.trim().parse::<i64>().is_ok(),
                _ => false,
            },
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Array => value.is_array(),
            SchemaType::Object => value.is_object(),
        }
    }
}

/// Description of a single config property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    pub fn new(kind: SchemaType, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            allowed: None,
            default: None,
            items: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(SchemaType::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Number, description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Integer, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Boolean, description)
    }

    pub fn array(description: impl Into<String>, items: PropertySchema) -> Self {
        let mut schema = Self::new(SchemaType::Array, description);
        schema.items = Some(Box::new(items));
        schema
    }

    pub fn object(description: impl Into<String>) -> Self {
        Self::new(SchemaType::Object, description)
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| Value::String(v.to_string())).collect());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn check(&self, name: &str, value: &Value) -> Result<(), AppError> {
        if !self.kind.accepts(value) {
            return Err(AppError::invalid_field(
                name,
                format!("{} must be {}, got {}", name, self.kind, describe(value)),
            ));
        }
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(display_value).collect();
                return Err(AppError::invalid_field(
                    name,
                    format!(
                        "{} must be one of: {}; got {}",
                        name,
                        options.join(", "),
                        describe(value)
                    ),
                ));
            }
        }
        if let (Some(items), Some(entries)) = (&self.items, value.as_array()) {
            for (index, entry) in entries.iter().enumerate() {
                items.check(&format!("{}[{}]", name, index), entry)?;
            }
        }
        Ok(())
    }
}

/// Object-level schema returned by every helper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSchema {
    #[serde(rename = "type", default = "object_type")]
    pub kind: SchemaType,
    #[serde(default)]
    pub properties: IndexMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

fn object_type() -> SchemaType {
    SchemaType::Object
}

impl Default for ConfigSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self {
            kind: SchemaType::Object,
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }

    pub fn property(mut self, name: &str, schema: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    pub fn required(mut self, names: &[&str]) -> Self {
        for name in names {
            if !self.required.iter().any(|existing| existing == name) {
                self.required.push(name.to_string());
            }
        }
        self
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|existing| existing == name)
    }

    /// Check presence of required properties, declared types and enum membership.
    ///
    /// `null` counts as absent and required strings must be non-blank. Keys without a
    /// declared property are ignored.
    pub fn validate(&self, config: &Map<String, Value>) -> Result<(), AppError> {
        for name in &self.required {
            let present = match config.get(name) {
                None | Some(Value::Null) => false,
                Some(Value::String(text)) => !text.trim().is_empty(),
                Some(_) => true,
            };
            if !present {
                return Err(AppError::invalid_field(
                    name,
                    format!("{} is required", name),
                ));
            }
        }
        for (name, property) in &self.properties {
            match config.get(name) {
                None | Some(Value::Null) => continue,
                Some(value) => property.check(name, value)?,
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => format!("boolean {}", value),
        Value::Number(_) => format!("number {}", value),
        Value::String(text) => format!("'{}'", text),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
