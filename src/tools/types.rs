//! Tool parameter schemas.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON Schema-based parameter definition for a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParameters {
    /// JSON Schema object describing the parameters.
    pub schema: Value,
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self::empty()
    }
}

impl ToolParameters {
    /// Create from a raw JSON Schema value.
    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// Create an empty parameter schema (no parameters).
    pub fn empty() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        }
    }

    /// Builder: create an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder::default()
    }
}

/// Builder for constructing tool parameter schemas.
#[derive(Debug, Default)]
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn property(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        if required && !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({ "type": "string", "description": description.into() });
        self.property(name, schema, required)
    }

    pub fn number(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({ "type": "number", "description": description.into() });
        self.property(name, schema, required)
    }

    pub fn integer(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({ "type": "integer", "description": description.into() });
        self.property(name, schema, required)
    }

    pub fn boolean(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({ "type": "boolean", "description": description.into() });
        self.property(name, schema, required)
    }

    /// Add a free-form object property.
    pub fn object(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({ "type": "object", "description": description.into() });
        self.property(name, schema, required)
    }

    /// Add an enum (string) property.
    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        let schema = json!({
            "type": "string",
            "description": description.into(),
            "enum": values,
        });
        self.property(name, schema, required)
    }

    /// Build into [`ToolParameters`].
    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}
