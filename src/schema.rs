//! Fixed object schemas for prompt inputs and model outputs.
//!
//! Every flow in this crate exchanges flat objects whose fields are all
//! required strings, so a schema is just the ordered list of those fields.
//! The same description is rendered to JSON Schema for the provider and used
//! to check values coming back from it.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ObjectSchema {
    pub fields: &'static [Field],
}

impl ObjectSchema {
    pub const fn new(fields: &'static [Field]) -> Self {
        Self { fields }
    }

    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.to_string(),
                    json!({ "type": "string", "description": f.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self.fields.iter().map(|f| f.name).collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Checks that `value` is an object carrying every field as a string.
    /// Unknown fields are tolerated.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("expected an object, got {}", type_name(value)))?;
        for field in self.fields {
            match obj.get(field.name) {
                Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(format!(
                        "field `{}` should be a string, got {}",
                        field.name,
                        type_name(other)
                    ))
                }
                None => return Err(format!("missing field `{}`", field.name)),
            }
        }
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Converts a raw model payload into `T`.
///
/// `None` or a blank payload is [`SchemaError::MissingOutput`]; text that is
/// not JSON is [`SchemaError::Malformed`]; JSON of the wrong shape is
/// [`SchemaError::Mismatch`]. A Markdown code fence around the JSON is
/// stripped first.
pub fn parse_output<T: DeserializeOwned>(
    schema: &ObjectSchema,
    raw: Option<&str>,
) -> Result<T, SchemaError> {
    let text = match raw.map(str::trim) {
        Some(t) if !t.is_empty() => strip_code_fence(t),
        _ => return Err(SchemaError::MissingOutput),
    };
    let value: Value = serde_json::from_str(text)?;
    schema.check(&value).map_err(SchemaError::Mismatch)?;
    serde_json::from_value(value).map_err(|e| SchemaError::Mismatch(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
