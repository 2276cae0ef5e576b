//! Schema document model: schema nodes, operations and the document itself.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::fixtures::ResourceId;

/// Vendor extension binding a schema node to a fixture resource.
pub const RESOURCE_ID_KEY: &str = "x-resourceId";

/// Vendor extension listing what a reference-only field expands into.
pub const EXPANSION_RESOURCES_KEY: &str = "x-expansionResources";

/// Prefix every `$ref` must carry.
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The keyword that drives how a schema node is interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// `$ref` to a named definition.
    Ref(String),
    /// An object with named members. `None` members accept any value.
    Properties(IndexMap<String, Option<JsonSchema>>),
    /// An array of `items`.
    Items(Box<JsonSchema>),
    /// A primitive, possibly closed over a set of values.
    Scalar { types: Vec<String>, values: Vec<String> },
    /// No driving keyword at all.
    Unconstrained,
}

/// A single node of the schema document.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchema {
    pub shape: Shape,
    /// Fixture resource this node is populated from.
    pub resource_id: Option<ResourceId>,
    /// Schemas the field expands into when a client asks for it.
    pub expansion_resources: Vec<JsonSchema>,
    /// The node as written, for keywords only the validator understands.
    pub raw: Map<String, Value>,
}

impl JsonSchema {
    fn with_shape(shape: Shape) -> Self {
        Self {
            shape,
            resource_id: None,
            expansion_resources: Vec::new(),
            raw: Map::new(),
        }
    }

    /// A `$ref` node.
    pub fn reference(pointer: impl Into<String>) -> Self {
        Self::with_shape(Shape::Ref(pointer.into()))
    }

    /// An object node with the given members.
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<JsonSchema>)>,
        K: Into<String>,
    {
        let properties = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        Self::with_shape(Shape::Properties(properties))
    }

    /// An array node.
    pub fn array(items: JsonSchema) -> Self {
        Self::with_shape(Shape::Items(Box::new(items)))
    }

    /// A primitive node.
    pub fn scalar<T, S>(types: T, values: Vec<String>) -> Self
    where
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_shape(Shape::Scalar {
            types: types.into_iter().map(Into::into).collect(),
            values,
        })
    }

    /// Bind the node to a fixture resource.
    pub fn with_resource_id(mut self, id: impl Into<ResourceId>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Mark the node as expandable into the given schemas.
    pub fn with_expansion_resources(mut self, resources: Vec<JsonSchema>) -> Self {
        self.expansion_resources = resources;
        self
    }

    pub fn ref_pointer(&self) -> Option<&str> {
        match &self.shape {
            Shape::Ref(pointer) => Some(pointer),
            _ => None,
        }
    }

    pub fn properties(&self) -> Option<&IndexMap<String, Option<JsonSchema>>> {
        match &self.shape {
            Shape::Properties(props) => Some(props),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&JsonSchema> {
        match &self.shape {
            Shape::Items(items) => Some(items),
            _ => None,
        }
    }

    /// Parse a raw schema node.
    ///
    /// Shape precedence is `$ref`, then `properties`, then `items`, then
    /// `type`/`enum`. `path` is a JSON Pointer used in error messages.
    pub fn from_value(value: &Value, path: &str) -> Result<Self, LoadError> {
        let Some(map) = value.as_object() else {
            return Err(LoadError::InvalidDocument {
                message: format!(
                    "schema at {} must be an object, got {}",
                    path,
                    json_type_name(value)
                ),
            });
        };

        let shape = if let Some(pointer) = map.get("$ref") {
            let pointer = pointer.as_str().ok_or_else(|| LoadError::InvalidDocument {
                message: format!("$ref at {} must be a string", path),
            })?;
            Shape::Ref(pointer.to_string())
        } else if let Some(props) = map.get("properties") {
            Shape::Properties(parse_properties(props, &format!("{}/properties", path))?)
        } else if let Some(items) = map.get("items") {
            let items = JsonSchema::from_value(items, &format!("{}/items", path))?;
            Shape::Items(Box::new(items))
        } else if map.contains_key("type") || map.contains_key("enum") {
            Shape::Scalar {
                types: string_list(map.get("type")),
                values: string_list(map.get("enum")),
            }
        } else {
            Shape::Unconstrained
        };

        let resource_id = map
            .get(RESOURCE_ID_KEY)
            .and_then(Value::as_str)
            .map(ResourceId::from);

        let expansion_resources = match map
            .get(EXPANSION_RESOURCES_KEY)
            .and_then(|v| v.get("oneOf"))
            .and_then(Value::as_array)
        {
            Some(branches) => branches
                .iter()
                .enumerate()
                .map(|(i, branch)| {
                    JsonSchema::from_value(
                        branch,
                        &format!("{}/{}/oneOf/{}", path, EXPANSION_RESOURCES_KEY, i),
                    )
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            shape,
            resource_id,
            expansion_resources,
            raw: map.clone(),
        })
    }
}

impl<'de> Deserialize<'de> for JsonSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        JsonSchema::from_value(&value, "#").map_err(serde::de::Error::custom)
    }
}

fn parse_properties(
    value: &Value,
    path: &str,
) -> Result<IndexMap<String, Option<JsonSchema>>, LoadError> {
    let Some(props) = value.as_object() else {
        return Err(LoadError::InvalidDocument {
            message: format!("properties at {} must be an object", path),
        });
    };

    let mut result = IndexMap::with_capacity(props.len());
    for (name, prop) in props {
        let prop = match prop {
            Value::Null => None,
            other => Some(JsonSchema::from_value(other, &format!("{}/{}", path, name))?),
        };
        result.insert(name.clone(), prop);
    }
    Ok(result)
}

/// `type` and `enum` may be a single string or a list; non-strings are skipped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

/// A request parameter. Only parameters carrying a `schema` take part in
/// validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub schema: Option<JsonSchema>,
}

/// One documented response of an operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseSpec {
    #[serde(default)]
    pub schema: Option<JsonSchema>,
}

/// A single (method, path) operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId", default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub responses: IndexMap<String, ResponseSpec>,
}

impl Operation {
    /// Schema of the success response: `"200"`, falling back to `"default"`.
    pub fn response_schema(&self) -> Option<&JsonSchema> {
        self.responses
            .get("200")
            .or_else(|| self.responses.get("default"))
            .and_then(|r| r.schema.as_ref())
    }
}

/// The loaded schema document.
///
/// Key order of `paths` and of each path's methods is the order in the
/// document and decides routing precedence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Spec {
    #[serde(default)]
    pub definitions: IndexMap<String, JsonSchema>,
    #[serde(default)]
    pub paths: IndexMap<String, IndexMap<String, Operation>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_ref_node() {
        let schema = JsonSchema::from_value(&json!({"$ref": "#/definitions/charge"}), "#").unwrap();
        assert_eq!(schema.ref_pointer(), Some("#/definitions/charge"));
    }

    #[test]
    fn ref_wins_over_properties() {
        let schema = JsonSchema::from_value(
            &json!({"$ref": "#/definitions/charge", "properties": {"id": {"type": "string"}}}),
            "#",
        )
        .unwrap();
        assert!(matches!(schema.shape, Shape::Ref(_)));
    }

    #[test]
    fn parse_properties_keeps_order_and_nulls() {
        let schema = JsonSchema::from_value(
            &json!({
                "properties": {
                    "url": null,
                    "object": {"enum": ["list"]},
                    "data": {"items": {"$ref": "#/definitions/charge"}}
                }
            }),
            "#",
        )
        .unwrap();

        let props = schema.properties().unwrap();
        let names: Vec<&str> = props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["url", "object", "data"]);
        assert!(props["url"].is_none());
        assert_eq!(
            props["object"].as_ref().unwrap().shape,
            Shape::Scalar {
                types: vec![],
                values: vec!["list".to_string()]
            }
        );
        let items = props["data"].as_ref().unwrap().items().unwrap();
        assert_eq!(items.ref_pointer(), Some("#/definitions/charge"));
    }

    #[test]
    fn parse_type_list() {
        let schema =
            JsonSchema::from_value(&json!({"type": ["string", "null"]}), "#").unwrap();
        assert_eq!(
            schema.shape,
            Shape::Scalar {
                types: vec!["string".into(), "null".into()],
                values: vec![]
            }
        );
    }

    #[test]
    fn parse_unconstrained() {
        let schema = JsonSchema::from_value(&json!({"description": "anything"}), "#").unwrap();
        assert_eq!(schema.shape, Shape::Unconstrained);
        assert_eq!(schema.raw["description"], "anything");
    }

    #[test]
    fn parse_extensions() {
        let schema = JsonSchema::from_value(
            &json!({
                "anyOf": [{"type": "string"}, {"$ref": "#/definitions/customer"}],
                "x-resourceId": "charge",
                "x-expansionResources": {"oneOf": [{"$ref": "#/definitions/customer"}]}
            }),
            "#",
        )
        .unwrap();
        assert_eq!(schema.resource_id, Some(ResourceId::from("charge")));
        assert_eq!(schema.expansion_resources.len(), 1);
        assert_eq!(
            schema.expansion_resources[0].ref_pointer(),
            Some("#/definitions/customer")
        );
    }

    #[test]
    fn non_object_schema_errors_with_path() {
        let err = JsonSchema::from_value(&json!({"properties": {"id": 7}}), "#").unwrap_err();
        match err {
            LoadError::InvalidDocument { message } => {
                assert!(message.contains("#/properties/id"), "{}", message)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn deserialize_spec_document() {
        let spec: Spec = serde_json::from_value(json!({
            "definitions": {
                "charge": {"type": "object", "properties": {"id": {"type": "string"}}}
            },
            "paths": {
                "/v1/charges": {
                    "get": {"responses": {"200": {"schema": {"$ref": "#/definitions/charge"}}}},
                    "post": {
                        "parameters": [{"in": "body", "name": "payload", "schema": {"required": ["amount"]}}],
                        "responses": {"default": {"schema": {"$ref": "#/definitions/charge"}}}
                    }
                }
            }
        }))
        .unwrap();

        assert!(spec.definitions.contains_key("charge"));
        let methods: Vec<&str> = spec.paths["/v1/charges"].keys().map(String::as_str).collect();
        assert_eq!(methods, vec!["get", "post"]);

        let post = &spec.paths["/v1/charges"]["post"];
        assert!(post.parameters[0].schema.is_some());
        assert_eq!(
            post.response_schema().and_then(JsonSchema::ref_pointer),
            Some("#/definitions/charge")
        );
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(7)), "number");
        assert_eq!(json_type_name(&json!({})), "object");
    }
}
