//! Decoded tool-call arguments.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BatonError;

/// Tool arguments decoded from the provider's JSON argument string.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments {
    value: Value,
}

impl ToolArguments {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Decode a raw argument string. A blank string decodes as `{}`.
    pub fn parse(raw: &str) -> Result<Self, BatonError> {
        if raw.trim().is_empty() {
            return Ok(Self::new(Value::Object(Default::default())));
        }
        Ok(Self::new(serde_json::from_str(raw)?))
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    pub fn get_str(&self, key: &str) -> Result<&str, BatonError> {
        self.get_str_opt(key)
            .ok_or_else(|| missing(key, "string"))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, BatonError> {
        self.value
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing(key, "integer"))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, BatonError> {
        self.value
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| missing(key, "number"))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, BatonError> {
        self.value
            .get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| missing(key, "boolean"))
    }

    /// Deserialize the whole argument object into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, BatonError> {
        Ok(serde_json::from_value(self.value.clone())?)
    }
}

fn missing(key: &str, expected: &str) -> BatonError {
    BatonError::Validation(format!("argument '{key}' missing or not a {expected}"))
}
