//! Response generation from schema nodes and fixtures.
//!
//! The generator recognizes three shapes:
//!
//! | Shape | Output |
//! |-------|--------|
//! | `$ref` to a definition | copy of the definition's fixture, `{}` when absent |
//! | list wrapper (`data.items.$ref`) | list object with exactly one generated item |
//! | `x-resourceId` with `properties` | the named fixture with sub-resources generated in place |
//!
//! Anything else is rejected with [`GenerateError::UnsupportedSchema`].

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::error::GenerateError;
use crate::expansion::ExpansionLevel;
use crate::fixtures::{Fixtures, ResourceId};
use crate::types::{JsonSchema, Shape, DEFINITIONS_PREFIX};

/// Extract the definition name from a `#/definitions/<name>` pointer.
pub fn definition_from_pointer(pointer: &str) -> Result<&str, GenerateError> {
    match pointer.strip_prefix(DEFINITIONS_PREFIX) {
        Some(name) if !name.is_empty() && !name.contains('/') => Ok(name),
        _ => Err(GenerateError::Dereference {
            pointer: pointer.to_string(),
        }),
    }
}

/// Synthesizes response bodies. Holds only shared references, so one can be
/// built per request at no cost.
#[derive(Debug, Clone, Copy)]
pub struct DataGenerator<'a> {
    definitions: &'a IndexMap<String, JsonSchema>,
    fixtures: &'a Fixtures,
}

impl<'a> DataGenerator<'a> {
    pub fn new(definitions: &'a IndexMap<String, JsonSchema>, fixtures: &'a Fixtures) -> Self {
        Self {
            definitions,
            fixtures,
        }
    }

    /// Generate a value for `schema`. `request_path` becomes the `url` of
    /// generated lists.
    pub fn generate(&self, schema: &JsonSchema, request_path: &str) -> Result<Value, GenerateError> {
        self.generate_expanded(schema, request_path, None)
    }

    /// Like [`generate`](Self::generate), additionally replacing
    /// reference-only fields named by `expansions` with their full objects.
    pub fn generate_expanded(
        &self,
        schema: &JsonSchema,
        request_path: &str,
        expansions: Option<&ExpansionLevel>,
    ) -> Result<Value, GenerateError> {
        if let Shape::Ref(pointer) = &schema.shape {
            return self.generate_reference(schema, pointer, request_path, expansions);
        }

        if let Some(items) = list_item_schema(schema) {
            return self.generate_list(items, request_path, expansions);
        }

        if let (Some(resource_id), Some(properties)) = (&schema.resource_id, schema.properties()) {
            return self.generate_nested(resource_id, properties, request_path, expansions);
        }

        Err(GenerateError::UnsupportedSchema)
    }

    fn generate_reference(
        &self,
        schema: &JsonSchema,
        pointer: &str,
        request_path: &str,
        expansions: Option<&ExpansionLevel>,
    ) -> Result<Value, GenerateError> {
        let name = definition_from_pointer(pointer)?;
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| GenerateError::Dereference {
                pointer: pointer.to_string(),
            })?;

        let resource_id = schema
            .resource_id
            .clone()
            .or_else(|| definition.resource_id.clone())
            .unwrap_or_else(|| ResourceId::from(name));

        let Some(fixture) = self.fixtures.get(&resource_id) else {
            return Ok(Value::Object(Map::new()));
        };

        let mut data = fixture.clone();
        if let Some(level) = expansions {
            self.expand_fields(definition, &mut data, request_path, level)?;
        }
        Ok(data)
    }

    fn generate_list(
        &self,
        items: &JsonSchema,
        request_path: &str,
        expansions: Option<&ExpansionLevel>,
    ) -> Result<Value, GenerateError> {
        let child = expansions.and_then(|level| level.child("data"));
        let item = self.generate_expanded(items, request_path, child)?;

        Ok(json!({
            "object": "list",
            "url": request_path,
            "has_more": false,
            "total_count": 0,
            "data": [item],
        }))
    }

    fn generate_nested(
        &self,
        resource_id: &ResourceId,
        properties: &IndexMap<String, Option<JsonSchema>>,
        request_path: &str,
        expansions: Option<&ExpansionLevel>,
    ) -> Result<Value, GenerateError> {
        let mut out = match self.fixtures.get(resource_id) {
            Some(Value::Object(fixture)) => fixture.clone(),
            _ => Map::new(),
        };

        for (name, prop) in properties {
            let Some(prop) = prop else { continue };
            if !is_generatable(prop) {
                continue;
            }
            let Some(sub_value) = out.get(name) else {
                continue;
            };

            // Sub-resources carry their own url; lists inside them report it.
            let sub_path = sub_value
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or(request_path)
                .to_string();
            let child = expansions.and_then(|level| level.child(name));
            let generated = self.generate_expanded(prop, &sub_path, child)?;
            out.insert(name.clone(), generated);
        }

        Ok(Value::Object(out))
    }

    fn expand_fields(
        &self,
        definition: &JsonSchema,
        data: &mut Value,
        request_path: &str,
        level: &ExpansionLevel,
    ) -> Result<(), GenerateError> {
        let (Some(properties), Value::Object(object)) = (definition.properties(), data) else {
            return Ok(());
        };

        for (field, prop) in properties {
            let Some(prop) = prop else { continue };
            if !level.expands(field) {
                continue;
            }
            let Some(target) = prop.expansion_resources.first() else {
                continue;
            };
            let Some(current) = object.get_mut(field) else {
                continue;
            };
            if current.is_null() {
                continue;
            }

            let child = if level.wildcard {
                None
            } else {
                level.child(field)
            };
            *current = self.generate_expanded(target, request_path, child)?;
        }

        Ok(())
    }
}

/// Item schema of a list wrapper: a `data` member whose items are a `$ref`.
fn list_item_schema(schema: &JsonSchema) -> Option<&JsonSchema> {
    let items = schema.properties()?.get("data")?.as_ref()?.items()?;
    items.ref_pointer().map(|_| items)
}

fn is_generatable(schema: &JsonSchema) -> bool {
    matches!(schema.shape, Shape::Ref(_))
        || list_item_schema(schema).is_some()
        || (schema.resource_id.is_some() && schema.properties().is_some())
}
