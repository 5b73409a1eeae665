//! Optional JSON-schema checks for tool arguments and handoff payloads.
//!
//! Covers the subset of JSON Schema that tool definitions use in practice:
//! `type`, `required`, `properties` (recursively) and string `enum`.

use std::fmt;

use serde_json::Value;

/// First schema violation found, with a dotted path to the offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validate `value` against `schema`.
pub fn validate_value(value: &Value, schema: &Value) -> Result<(), SchemaViolation> {
    check(value, schema, "")
}

fn check(value: &Value, schema: &Value, path: &str) -> Result<(), SchemaViolation> {
    let violation = |message: String| SchemaViolation {
        path: path.to_string(),
        message,
    };

    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !value_matches_type(value, expected) {
            return Err(violation(format!(
                "expected {expected}, got {}",
                json_type_name(value)
            )));
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(violation(format!("{value} is not one of {}", Value::from(allowed.clone()))));
        }
    }

    let Some(obj) = value.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(name) {
                return Err(violation(format!("missing required field '{name}'")));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, field) in obj {
            if let Some(field_schema) = properties.get(key) {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                check(field, field_schema, &child)?;
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": { "type": "string" },
                "depth": { "type": "string", "enum": ["brief", "full"] },
                "meta": {
                    "type": "object",
                    "properties": { "pages": { "type": "integer" } },
                    "required": ["pages"]
                }
            },
            "required": ["topic"]
        })
    }

    #[test]
    fn accepts_conforming_value() {
        let value = json!({"topic": "tides", "depth": "brief", "meta": {"pages": 3}});
        assert!(validate_value(&value, &report_schema()).is_ok());
    }

    #[test]
    fn reports_missing_required_field() {
        let err = validate_value(&json!({"depth": "full"}), &report_schema()).unwrap_err();
        assert_eq!(err.message, "missing required field 'topic'");
        assert_eq!(err.path, "");
    }

    #[test]
    fn reports_nested_violation_with_path() {
        let value = json!({"topic": "tides", "meta": {"pages": "three"}});
        let err = validate_value(&value, &report_schema()).unwrap_err();
        assert_eq!(err.path, "meta.pages");
        assert_eq!(err.to_string(), "meta.pages: expected integer, got string");
    }

    #[test]
    fn enforces_enum_membership() {
        let value = json!({"topic": "tides", "depth": "exhaustive"});
        let err = validate_value(&value, &report_schema()).unwrap_err();
        assert_eq!(err.path, "depth");
    }

    #[test]
    fn rejects_non_object_when_object_expected() {
        let err = validate_value(&json!("text"), &report_schema()).unwrap_err();
        assert!(err.message.contains("expected object"));
    }

    #[test]
    fn empty_schema_accepts_anything() {
        assert!(validate_value(&Value::Null, &json!({})).is_ok());
    }
}
