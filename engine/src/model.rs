//! Model definition and validation.
//!
//! A model names the fields a record carries, which of them are required,
//! their default values and which field holds the backend identity. Record
//! validity is derived from it.

use crate::{config::ProxyConfig, error::Result, Error, Fields, ModelName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field types supported in models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Date,
    /// Arbitrary nested JSON
    #[default]
    Auto,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Bool => write!(f, "Bool"),
            FieldType::Date => write!(f, "Date"),
            FieldType::Auto => write!(f, "Auto"),
        }
    }
}

/// Definition of a field in a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field type
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    /// Whether this field must be present and non-null for the record to be valid
    #[serde(default)]
    pub required: bool,
    /// Value used when a new record does not supply this field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl FieldDef {
    /// Create a new required field definition.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            default_value: None,
        }
    }

    /// Create a new optional field definition.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default_value: None,
        }
    }

    /// Set the default value for this field.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Validate a JSON value against this field definition.
    pub fn validate(&self, value: Option<&Value>) -> Result<()> {
        match value {
            None | Some(Value::Null) if self.required => {
                Err(Error::MissingRequiredField(self.name.clone()))
            }
            None | Some(Value::Null) => Ok(()),
            Some(v) => self.validate_type(v),
        }
    }

    fn validate_type(&self, value: &Value) -> Result<()> {
        let valid = match self.field_type {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Bool => value.is_boolean(),
            // epoch millis or an ISO string
            FieldType::Date => value.is_u64() || value.is_i64() || value.is_string(),
            FieldType::Auto => true,
        };

        if valid {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                field: self.name.clone(),
                expected: self.field_type.to_string(),
                got: json_type_name(value).to_string(),
            })
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "Int",
        Value::Number(_) => "Float",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

fn default_id_property() -> String {
    "id".to_string()
}

/// A record type: its fields, identity field and preferred proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Model name, used for registry lookups
    pub name: ModelName,
    /// Field holding the backend-assigned identity
    #[serde(default = "default_id_property")]
    pub id_property: String,
    /// Field definitions
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Proxy used by stores of this model when they do not configure one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

impl Model {
    /// Create a new model.
    pub fn new(name: impl Into<ModelName>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            id_property: default_id_property(),
            fields,
            proxy: None,
        }
    }

    /// Builder-style method to rename the identity field.
    pub fn with_id_property(mut self, id_property: impl Into<String>) -> Self {
        self.id_property = id_property.into();
        self
    }

    /// Builder-style method to set the default proxy.
    pub fn with_proxy(mut self, proxy: impl Into<ProxyConfig>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Get a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fill in field defaults for every field `data` does not carry.
    pub fn apply_defaults(&self, data: &mut Fields) {
        for field in &self.fields {
            if let Some(default) = &field.default_value {
                data.entry(field.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
    }

    /// Validate a record's data against this model.
    pub fn validate(&self, data: &Fields) -> Result<()> {
        for field in &self.fields {
            field.validate(data.get(&field.name))?;
        }
        Ok(())
    }

    /// Validate an arbitrary JSON payload, which must be an object.
    pub fn validate_payload(&self, payload: &Value) -> Result<()> {
        let obj = payload
            .as_object()
            .ok_or_else(|| Error::InvalidPayload("payload must be an object".into()))?;
        self.validate(obj)
    }
}
