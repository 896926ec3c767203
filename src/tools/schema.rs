//! Parameter schemas and the function-calling declaration format.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::validation::{field_of_serde_error, validate_arguments};
use crate::types::ToolCallType;

/// A tool's parameter schema.
///
/// Either a plain JSON-Schema object, or a schema derived from a Rust type
/// that also gets checked by deserializing into that type.
#[derive(Debug, Clone)]
pub enum ToolSchema {
    Structural(Value),
    Typed(TypedSchema),
}

impl ToolSchema {
    pub fn structural(schema: Value) -> Self {
        Self::Structural(schema)
    }

    /// Schema derived from `T`.
    pub fn typed<T: DeserializeOwned + JsonSchema>() -> Self {
        Self::Typed(TypedSchema::of::<T>())
    }

    /// Builder: an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// The JSON Schema advertised to the model.
    pub fn parameters(&self) -> &Value {
        match self {
            Self::Structural(schema) => schema,
            Self::Typed(typed) => typed.schema(),
        }
    }

    /// Check `params`, returning one `"Parameter '<field>': <reason>"`
    /// message per violation.
    pub fn validate(&self, params: &Map<String, Value>) -> Vec<String> {
        let mut errors = validate_arguments(params, self.parameters());
        if let Self::Typed(typed) = self {
            if errors.is_empty() {
                if let Err(rejected) = typed.check(params) {
                    errors.push(format!(
                        "Parameter '{}': {}",
                        rejected.field, rejected.message
                    ));
                }
            }
        }
        errors
    }
}

/// JSON Schema of a Rust type plus a deserialization check for it.
#[derive(Debug, Clone)]
pub struct TypedSchema {
    schema: Value,
    check: fn(&Value) -> Result<(), Rejected>,
}

impl TypedSchema {
    pub fn of<T: DeserializeOwned + JsonSchema>() -> Self {
        let mut schema = serde_json::to_value(schemars::schema_for!(T))
            .unwrap_or_else(|_| json!({"type": "object", "properties": {}}));
        if let Some(obj) = schema.as_object_mut() {
            obj.remove("$schema");
        }
        Self {
            schema,
            check: deserializes_as::<T>,
        }
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    fn check(&self, params: &Map<String, Value>) -> Result<(), Rejected> {
        (self.check)(&Value::Object(params.clone()))
    }
}

/// A value the typed check refused, and the field it was found at.
#[derive(Debug)]
struct Rejected {
    field: String,
    message: String,
}

fn deserializes_as<T: DeserializeOwned>(value: &Value) -> Result<(), Rejected> {
    serde_path_to_error::deserialize::<_, T>(value)
        .map(drop)
        .map_err(|e| {
            let message = e.inner().to_string();
            // struct-level errors (missing/unknown field) sit at the root path
            let field = match e.path().to_string() {
                path if path == "." => field_of_serde_error(&message)
                    .unwrap_or("arguments")
                    .to_string(),
                path => path,
            };
            Rejected { field, message }
        })
}

/// Builder for structural parameter schemas.
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn property(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), schema);
        if required {
            self.required.push(name);
        }
        self
    }

    /// Add a string property.
    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({"type": "string", "description": description.into()});
        self.property(name, schema, required)
    }

    /// Add an integer property.
    pub fn integer(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let schema = json!({"type": "integer", "description": description.into()});
        self.property(name, schema, required)
    }

    pub fn build(self) -> ToolSchema {
        ToolSchema::Structural(json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        }))
    }
}

/// A tool as advertised in the `tools` array of a chat-completions request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type", default)]
    pub tool_type: ToolCallType,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool_type: ToolCallType::Function,
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}
