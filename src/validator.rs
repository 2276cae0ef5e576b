//! Request parameter validation against an operation's parameter schema.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use jsonschema::error::ValidationErrorKind;
use serde_json::{Map, Value};

use crate::error::ValidateError;
use crate::types::{JsonSchema, Operation};

/// Build the validator for an operation.
///
/// Uses the first parameter that carries a schema. Operations without one
/// yield `Ok(None)` and skip validation entirely.
///
/// # Errors
///
/// Returns `ValidateError::Compile` if the parameter schema is malformed.
pub fn get_validator(
    operation: &Operation,
    definitions: &IndexMap<String, JsonSchema>,
) -> Result<Option<ParamValidator>, ValidateError> {
    let Some(schema) = operation.parameters.iter().find_map(|p| p.schema.as_ref()) else {
        return Ok(None);
    };
    ParamValidator::compile(schema, definitions).map(Some)
}

/// A compiled parameter schema, reusable across requests.
#[derive(Clone)]
pub struct ParamValidator {
    schema: Arc<Value>,
    compiled: Arc<jsonschema::Validator>,
}

impl fmt::Debug for ParamValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl ParamValidator {
    /// Compile the raw keywords of `schema`.
    ///
    /// Definitions are attached when the schema contains a `$ref`, so
    /// `#/definitions/...` pointers resolve.
    pub fn compile(
        schema: &JsonSchema,
        definitions: &IndexMap<String, JsonSchema>,
    ) -> Result<Self, ValidateError> {
        let mut raw = schema.raw.clone();
        if !raw.contains_key("definitions") && contains_ref(&raw) {
            let defs: Map<String, Value> = definitions
                .iter()
                .map(|(name, def)| (name.clone(), Value::Object(def.raw.clone())))
                .collect();
            raw.insert("definitions".to_string(), Value::Object(defs));
        }

        let raw = Value::Object(raw);
        let compiled = jsonschema::validator_for(&raw).map_err(|e| ValidateError::Compile {
            message: e.to_string(),
        })?;

        Ok(Self {
            schema: Arc::new(raw),
            compiled: Arc::new(compiled),
        })
    }

    /// The schema the validator was compiled from.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Check `payload`, reporting only the first violation.
    pub fn validate(&self, payload: &Value) -> Result<(), ValidateError> {
        match self.compiled.iter_errors(payload).next() {
            None => Ok(()),
            Some(error) => Err(ValidateError::Invalid {
                message: describe(&error),
            }),
        }
    }
}

fn describe(error: &jsonschema::ValidationError<'_>) -> String {
    let location = dotted_path(&error.instance_path.to_string());

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let property = match property {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let name = if location.is_empty() {
                property
            } else {
                format!("{}.{}", location, property)
            };
            format!("property '{}' is required", name)
        }
        ValidationErrorKind::Type { .. } => {
            format!("{} has the wrong type: {}", subject(&location), error)
        }
        _ => format!("{} is invalid: {}", subject(&location), error),
    }
}

fn subject(location: &str) -> String {
    if location.is_empty() {
        "request body".to_string()
    } else {
        format!("property '{}'", location)
    }
}

/// `/card/number` becomes `card.number`.
fn dotted_path(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

fn contains_ref(map: &Map<String, Value>) -> bool {
    map.iter().any(|(key, value)| key == "$ref" || value_contains_ref(value))
}

fn value_contains_ref(value: &Value) -> bool {
    match value {
        Value::Object(map) => contains_ref(map),
        Value::Array(arr) => arr.iter().any(value_contains_ref),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameter;
    use serde_json::json;

    fn operation_with(schema: Option<Value>) -> Operation {
        Operation {
            parameters: vec![Parameter {
                schema: schema.map(|s| JsonSchema::from_value(&s, "#").unwrap()),
            }],
            ..Operation::default()
        }
    }

    fn no_definitions() -> IndexMap<String, JsonSchema> {
        IndexMap::new()
    }

    #[test]
    fn validates_property_types() {
        let operation = operation_with(Some(json!({
            "properties": {
                "name": { "type": "string" }
            }
        })));
        let validator = get_validator(&operation, &no_definitions())
            .unwrap()
            .expect("validator");

        assert!(validator.validate(&json!({ "name": "foo" })).is_ok());

        let err = validator.validate(&json!({ "name": 7 })).unwrap_err();
        match err {
            ValidateError::Invalid { message } => {
                assert!(
                    message.starts_with("property 'name' has the wrong type"),
                    "{}",
                    message
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_required_property() {
        let operation = operation_with(Some(json!({
            "type": "object",
            "properties": { "amount": { "type": "integer" } },
            "required": ["amount"]
        })));
        let validator = get_validator(&operation, &no_definitions()).unwrap().unwrap();

        let err = validator.validate(&json!({})).unwrap_err();
        assert_eq!(
            err,
            ValidateError::Invalid {
                message: "property 'amount' is required".into()
            }
        );
    }

    #[test]
    fn nested_required_property_is_dotted() {
        let operation = operation_with(Some(json!({
            "properties": {
                "card": {
                    "type": "object",
                    "properties": { "number": { "type": "string" } },
                    "required": ["number"]
                }
            }
        })));
        let validator = get_validator(&operation, &no_definitions()).unwrap().unwrap();

        let err = validator.validate(&json!({ "card": {} })).unwrap_err();
        assert_eq!(err.to_string(), "property 'card.number' is required");
    }

    #[test]
    fn stops_at_first_violation() {
        let operation = operation_with(Some(json!({
            "required": ["amount", "currency"]
        })));
        let validator = get_validator(&operation, &no_definitions()).unwrap().unwrap();

        let err = validator.validate(&json!({})).unwrap_err();
        assert!(err.to_string().ends_with("is required"));
        assert_eq!(err.to_string().matches("property").count(), 1);
    }

    #[test]
    fn no_schema_means_no_validator() {
        let operation = operation_with(None);
        let validator = get_validator(&operation, &no_definitions()).unwrap();
        assert!(validator.is_none());

        let validator = get_validator(&Operation::default(), &no_definitions()).unwrap();
        assert!(validator.is_none());
    }

    #[test]
    fn malformed_schema_fails_to_compile() {
        let operation = operation_with(Some(json!({ "type": 12 })));
        let err = get_validator(&operation, &no_definitions()).unwrap_err();
        assert!(matches!(err, ValidateError::Compile { .. }));
    }

    #[test]
    fn resolves_definition_refs() {
        let mut definitions = IndexMap::new();
        definitions.insert(
            "address".to_string(),
            JsonSchema::from_value(
                &json!({ "type": "object", "required": ["city"] }),
                "#",
            )
            .unwrap(),
        );
        let operation = operation_with(Some(json!({
            "properties": { "address": { "$ref": "#/definitions/address" } }
        })));
        let validator = get_validator(&operation, &definitions).unwrap().unwrap();

        assert!(validator.schema().get("definitions").is_some());
        assert!(validator.validate(&json!({ "address": { "city": "Paris" } })).is_ok());
        let err = validator.validate(&json!({ "address": {} })).unwrap_err();
        assert_eq!(err.to_string(), "property 'address.city' is required");
    }

    #[test]
    fn dotted_path_unescapes_pointer() {
        assert_eq!(dotted_path(""), "");
        assert_eq!(dotted_path("/card/number"), "card.number");
        assert_eq!(dotted_path("/a~1b/c~0d"), "a/b.c~d");
    }
}
