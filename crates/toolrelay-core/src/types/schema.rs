//! Parameter schemas
//!
//! Schemas are opaque documents to this crate. Only their shape is checked:
//! the top level must describe an object, and arguments are matched against
//! `required`, the primitive `type` of each declared property, and
//! `additionalProperties: false`. Nothing else in the schema is interpreted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structurally validated JSON Schema for tool parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ParameterSchema(Value);

impl ParameterSchema {
    /// Validate the shape of a schema document
    pub fn new(schema: Value) -> Result<Self, String> {
        let object = schema
            .as_object()
            .ok_or_else(|| format!("schema must be an object, got {}", kind_of(&schema)))?;

        if let Some(kind) = object.get("type") {
            if kind != "object" {
                return Err(format!("top-level schema type must be \"object\", got {kind}"));
            }
        }

        if let Some(properties) = object.get("properties") {
            let properties = properties
                .as_object()
                .ok_or("`properties` must be an object")?;
            for (name, property) in properties {
                if !property.is_object() && !property.is_boolean() {
                    return Err(format!("property `{name}` must be a schema object"));
                }
            }
        }

        if let Some(required) = object.get("required") {
            let all_strings = required
                .as_array()
                .map(|names| names.iter().all(Value::is_string))
                .unwrap_or(false);
            if !all_strings {
                return Err("`required` must be an array of strings".to_string());
            }
        }

        Ok(Self(schema))
    }

    /// Schema for a tool that takes no arguments
    pub fn empty() -> Self {
        Self(serde_json::json!({ "type": "object", "properties": {} }))
    }

    /// The underlying schema document
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        self.0.get("properties").and_then(Value::as_object)
    }

    fn required(&self) -> impl Iterator<Item = &str> {
        self.0
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    fn closed(&self) -> bool {
        self.0.get("additionalProperties") == Some(&Value::Bool(false))
    }

    /// Decode a textual argument payload and check it against this schema
    ///
    /// An empty payload (or `null`) stands for "no arguments".
    pub fn decode_arguments(&self, payload: &str) -> Result<Map<String, Value>, String> {
        let payload = payload.trim();
        if payload.is_empty() {
            return self.check(Map::new());
        }

        let value: Value =
            serde_json::from_str(payload).map_err(|e| format!("malformed JSON: {e}"))?;

        match value {
            Value::Null => self.check(Map::new()),
            Value::Object(arguments) => self.check(arguments),
            other => Err(format!(
                "arguments must be a JSON object, got {}",
                kind_of(&other)
            )),
        }
    }

    fn check(&self, arguments: Map<String, Value>) -> Result<Map<String, Value>, String> {
        for name in self.required() {
            if !arguments.contains_key(name) {
                return Err(format!("missing required argument `{name}`"));
            }
        }

        let properties = self.properties();
        for (name, value) in &arguments {
            match properties.and_then(|p| p.get(name)) {
                Some(property) => {
                    if !matches_declared_type(property, value) {
                        return Err(format!(
                            "argument `{name}` has type {}, expected {}",
                            kind_of(value),
                            property.get("type").map(Value::to_string).unwrap_or_default()
                        ));
                    }
                }
                None if self.closed() => {
                    return Err(format!("unexpected argument `{name}`"));
                }
                None => {}
            }
        }

        Ok(arguments)
    }
}

impl TryFrom<Value> for ParameterSchema {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParameterSchema> for Value {
    fn from(schema: ParameterSchema) -> Self {
        schema.0
    }
}

fn matches_declared_type(property: &Value, value: &Value) -> bool {
    match property.get("type") {
        Some(Value::String(kind)) => matches_type(kind, value),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| matches_type(kind, value)),
        _ => true,
    }
}

fn matches_type(kind: &str, value: &Value) -> bool {
    match kind {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        // Unknown type keywords are not ours to judge
        _ => true,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
