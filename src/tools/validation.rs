//! Validate tool parameters against a JSON Schema before execution.

use serde_json::{Map, Value};

/// Validate parameters against a JSON Schema.
///
/// Performs top-level validation: required field presence and property
/// type verification. Returns one `"Parameter '<field>': <reason>"` message
/// per violation; an empty list means valid.
pub fn validate_arguments(params: &Map<String, Value>, schema: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !params.contains_key(name) {
                errors.push(format!("Parameter '{name}': missing required field"));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, value) in params {
            let Some(expected) = properties.get(key).and_then(|p| p.get("type")) else {
                continue;
            };
            if !matches_any_type(value, expected) {
                errors.push(format!(
                    "Parameter '{key}': expected {}, got {}",
                    describe_type(expected),
                    json_type_name(value)
                ));
            }
        }
    }

    errors
}

/// Field named by a serde "missing field `x`" / "unknown field `x`" error.
pub(crate) fn field_of_serde_error(message: &str) -> Option<&str> {
    let rest = message
        .strip_prefix("missing field `")
        .or_else(|| message.strip_prefix("unknown field `"))?;
    rest.split('`').next()
}

fn matches_any_type(value: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(name) => value_matches_type(value, name),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| value_matches_type(value, name)),
        _ => true,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
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

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn rejects_missing_required_field() {
        let schema = json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        });

        let errors = validate_arguments(&params(json!({})), &schema);

        assert_eq!(errors, vec!["Parameter 'path': missing required field"]);
    }

    #[test]
    fn reports_every_violation() {
        let schema = json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" },
                "count": { "type": "integer" },
            },
            "required": ["path", "content"],
        });

        let errors = validate_arguments(&params(json!({ "count": "many" })), &schema);

        assert_eq!(
            errors,
            vec![
                "Parameter 'path': missing required field",
                "Parameter 'content': missing required field",
                "Parameter 'count': expected integer, got string",
            ]
        );
    }

    #[test]
    fn accepts_valid_args_with_all_required_fields() {
        let schema = json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        });

        assert!(validate_arguments(&params(json!({ "path": "test.txt" })), &schema).is_empty());
    }

    #[test]
    fn accepts_any_args_when_schema_is_empty_object() {
        assert!(validate_arguments(&params(json!({ "anything": 42 })), &json!({})).is_empty());
    }

    #[test]
    fn accepts_extra_fields_not_in_schema_properties() {
        let schema = json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        });
        let args = params(json!({ "path": "test.txt", "extra": true }));

        assert!(validate_arguments(&args, &schema).is_empty());
    }

    #[test]
    fn nullable_types_accept_either() {
        let schema = json!({
            "type": "object",
            "properties": { "limit": { "type": ["integer", "null"] } },
        });

        assert!(validate_arguments(&params(json!({ "limit": 3 })), &schema).is_empty());
        assert!(validate_arguments(&params(json!({ "limit": null })), &schema).is_empty());
        assert_eq!(
            validate_arguments(&params(json!({ "limit": "3" })), &schema),
            vec!["Parameter 'limit': expected integer or null, got string"]
        );
    }

    #[test]
    fn validates_boolean_and_array_types() {
        let schema = json!({
            "type": "object",
            "properties": { "flag": { "type": "boolean" }, "items": { "type": "array" } },
        });

        assert!(validate_arguments(&params(json!({ "flag": true, "items": [1] })), &schema).is_empty());
        assert_eq!(
            validate_arguments(&params(json!({ "flag": "yes", "items": {} })), &schema).len(),
            2
        );
    }

    #[test]
    fn serde_field_extraction() {
        assert_eq!(field_of_serde_error("missing field `path`"), Some("path"));
        assert_eq!(field_of_serde_error("unknown field `x`, expected `path`"), Some("x"));
        assert_eq!(
            field_of_serde_error("invalid value: integer `-1`, expected usize"),
            None
        );
    }
}
