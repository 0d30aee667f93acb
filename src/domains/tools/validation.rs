//! Tool input validation.
//!
//! Each tool's input schema is compiled once with `jsonschema` when the tool
//! is defined. Every validation error is reported as a [`FieldViolation`]
//! whose path reads like `sheets[0].columns[1].header`.

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema, ValidationError};
use rmcp::model::JsonObject;
use serde_json::{Value, json};

use super::error::{FieldViolation, ToolError};

/// A compiled tool input schema.
pub struct InputSchema {
    compiled: JSONSchema,
}

impl InputSchema {
    /// Compile `schema`, the input schema advertised for `tool`.
    pub fn compile(tool: &str, schema: &JsonObject) -> Result<Self, ToolError> {
        let mut schema = Value::Object(schema.clone());
        accept_nullable(&mut schema);

        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| {
                ToolError::internal(format!("input schema of '{}' does not compile: {}", tool, e))
            })?;
        Ok(Self { compiled })
    }

    /// Validate `input`, returning every violation found.
    pub fn validate(&self, input: &Value) -> Result<(), Vec<FieldViolation>> {
        match self.compiled.validate(input) {
            Ok(()) => Ok(()),
            Err(errors) => Err(errors.flat_map(violations_of).collect()),
        }
    }
}

impl std::fmt::Debug for InputSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSchema").finish_non_exhaustive()
    }
}

/// Rewrite OpenAPI-style `nullable: true` into a schema that also accepts null.
fn accept_nullable(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            for value in map.values_mut() {
                accept_nullable(value);
            }
            if map.get("nullable") == Some(&Value::Bool(true)) {
                map.remove("nullable");
                let inner = Value::Object(std::mem::take(map));
                map.insert("anyOf".to_string(), json!([inner, { "type": "null" }]));
            }
        }
        Value::Array(items) => items.iter_mut().for_each(accept_nullable),
        _ => {}
    }
}

fn violations_of(error: ValidationError<'_>) -> Vec<FieldViolation> {
    let path = dotted_path(&error.instance_path.to_string());
    match &error.kind {
        // Reported on the parent object; point at the missing field instead.
        ValidationErrorKind::Required { property } => {
            let field = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            vec![FieldViolation::new(join(&path, &field), "is required")]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|field| FieldViolation::new(join(&path, field), "is not an allowed field"))
            .collect(),
        _ => vec![FieldViolation::new(path, error.to_string())],
    }
}

/// Turn a JSON pointer such as `/sheets/0/columns` into `sheets[0].columns`.
fn dotted_path(pointer: &str) -> String {
    let mut path = String::new();
    for segment in pointer.split('/').skip(1) {
        if segment.parse::<usize>().is_ok() {
            path.push('[');
            path.push_str(segment);
            path.push(']');
        } else {
            let field = segment.replace("~1", "/").replace("~0", "~");
            path = join(&path, &field);
        }
    }
    path
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", path, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::handler::server::tool::schema_for_type;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    #[allow(dead_code)]
    #[serde(rename_all = "lowercase")]
    enum Mode {
        Fast,
        Slow,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Column {
        header: String,
        key: String,
        width: Option<f64>,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Params {
        name: String,
        count: u32,
        #[serde(default)]
        mode: Option<Mode>,
        columns: Vec<Column>,
        #[serde(default)]
        extra: serde_json::Value,
    }

    fn check(input: Value) -> Result<(), Vec<FieldViolation>> {
        let schema = InputSchema::compile("params", &schema_for_type::<Params>()).unwrap();
        schema.validate(&input)
    }

    fn compile(schema: Value) -> InputSchema {
        InputSchema::compile("inline", schema.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_valid_input_passes() {
        let input = json!({
            "name": "budget",
            "count": 3,
            "mode": "fast",
            "columns": [{ "header": "A", "key": "a", "width": 12.5 }],
            "extra": { "anything": [1, 2, 3] }
        });
        assert!(check(input).is_ok());
    }

    #[test]
    fn test_optional_fields_may_be_omitted_or_null() {
        assert!(check(json!({ "name": "budget", "count": 0, "columns": [] })).is_ok());

        let input = json!({
            "name": "budget",
            "count": 0,
            "columns": [{ "header": "A", "key": "a", "width": null }]
        });
        assert!(check(input).is_ok());
    }

    #[test]
    fn test_collects_every_violation() {
        let input = json!({ "count": "three", "columns": [{ "header": 1 }] });
        let violations = check(input).unwrap_err();
        let paths: Vec<_> = violations.iter().map(|v| v.path.as_str()).collect();

        assert!(paths.contains(&"name"), "missing name not reported: {:?}", paths);
        assert!(paths.contains(&"count"));
        assert!(paths.contains(&"columns[0].header"));
        assert!(paths.contains(&"columns[0].key"));
    }

    #[test]
    fn test_enum_violation() {
        let input = json!({ "name": "x", "count": 1, "mode": "warp", "columns": [] });
        let violations = check(input).unwrap_err();
        assert!(!violations.is_empty());
        assert!(violations.iter().all(|v| v.path == "mode"));
    }

    #[test]
    fn test_integer_rejects_fraction_and_negative() {
        let violations = check(json!({ "name": "x", "count": 1.5, "columns": [] })).unwrap_err();
        assert_eq!(violations[0].path, "count");

        let violations = check(json!({ "name": "x", "count": -1, "columns": [] })).unwrap_err();
        assert_eq!(violations[0].path, "count");
    }

    #[test]
    fn test_non_object_root() {
        let violations = check(json!("not an object")).unwrap_err();
        assert!(violations.iter().all(|v| v.path.is_empty()));
        assert!(violations.iter().any(|v| v.message.contains("object")));
    }

    #[test]
    fn test_additional_properties_false() {
        let schema = compile(json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "additionalProperties": false
        }));
        let violations = schema.validate(&json!({ "a": "x", "b": 1 })).unwrap_err();
        assert_eq!(violations, vec![FieldViolation::new("b", "is not an allowed field")]);
    }

    #[test]
    fn test_ref_resolution() {
        let schema = compile(json!({
            "type": "object",
            "properties": { "inner": { "$ref": "#/$defs/Inner" } },
            "$defs": {
                "Inner": {
                    "type": "object",
                    "properties": { "n": { "type": "number", "maximum": 10 } },
                    "required": ["n"]
                }
            }
        }));
        assert!(schema.validate(&json!({ "inner": { "n": 5 } })).is_ok());

        let violations = schema.validate(&json!({ "inner": { "n": 11 } })).unwrap_err();
        assert_eq!(violations[0].path, "inner.n");

        let violations = schema.validate(&json!({ "inner": {} })).unwrap_err();
        assert_eq!(violations, vec![FieldViolation::new("inner.n", "is required")]);
    }

    #[test]
    fn test_nullable_accepts_null() {
        let schema = compile(json!({
            "type": "object",
            "properties": { "width": { "type": "number", "nullable": true } }
        }));
        assert!(schema.validate(&json!({ "width": null })).is_ok());
        assert!(schema.validate(&json!({ "width": 3 })).is_ok());

        let violations = schema.validate(&json!({ "width": "wide" })).unwrap_err();
        assert_eq!(violations[0].path, "width");
    }

    #[test]
    fn test_dotted_path() {
        assert_eq!(dotted_path(""), "");
        assert_eq!(dotted_path("/sheets/0/columns/1/header"), "sheets[0].columns[1].header");
        assert_eq!(dotted_path("/a~1b/2"), "a/b[2]");
    }
}
