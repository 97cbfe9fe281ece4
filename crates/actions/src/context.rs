//! Step execution context.
//!
//! The context is the key/value map available to step configuration and
//! condition expressions. It is frozen from the trigger payload when an
//! execution starts and extended with step outputs as the sequence runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Accumulated key/value context for one execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepContext {
    values: Map<String, Value>,
}

impl StepContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self { values: Map::new() }
    }

    /// Create a context from a trigger payload.
    ///
    /// Non-object payloads produce an empty context.
    pub fn from_payload(payload: &Value) -> Self {
        match payload {
            Value::Object(map) => Self { values: map.clone() },
            _ => Self::new(),
        }
    }

    /// Get a raw value by field name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Get a field as a string slice, if it is a JSON string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(|v| v.as_str())
    }

    /// Whether the field is present and non-null.
    pub fn has(&self, field: &str) -> bool {
        matches!(self.values.get(field), Some(v) if !v.is_null())
    }

    /// String-coerce a field value for comparison.
    ///
    /// Strings are returned as-is; numbers and booleans are rendered;
    /// null and missing fields coerce to `None`.
    pub fn coerce_string(&self, field: &str) -> Option<String> {
        match self.values.get(field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }

    /// The subscriber email associated with this context, if any.
    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    /// Insert a single value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    /// Merge the fields of a JSON object into the context.
    ///
    /// Later values win. Non-object values are ignored.
    pub fn merge_object(&mut self, value: &Value) {
        if let Value::Object(map) = value {
            for (k, v) in map {
                self.values.insert(k.clone(), v.clone());
            }
        }
    }

    /// Snapshot the context as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}
