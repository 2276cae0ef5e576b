//! Schema Mock
//!
//! A stand-in HTTP server that answers API requests using nothing but the
//! API's OpenAPI document and a set of canonical example resources.
//!
//! Each request is authenticated, routed by compiled path template,
//! validated against the operation's parameter schema, and answered with a
//! body generated from the operation's response schema.
//!
//! # Example
//!
//! ```
//! use schema_mock::{DataGenerator, Fixtures, JsonSchema};
//! use indexmap::IndexMap;
//! use serde_json::json;
//!
//! let mut definitions = IndexMap::new();
//! definitions.insert("charge".to_string(), JsonSchema::object([("id", None)]));
//! let fixtures = Fixtures::new().with("charge", json!({ "id": "ch_123" }));
//!
//! let list = JsonSchema::object([
//!     ("data", Some(JsonSchema::array(JsonSchema::reference("#/definitions/charge")))),
//!     ("url", None),
//! ]);
//!
//! let generator = DataGenerator::new(&definitions, &fixtures);
//! let body = generator.generate(&list, "/v1/charges").unwrap();
//!
//! assert_eq!(body["object"], "list");
//! assert_eq!(body["url"], "/v1/charges");
//! assert_eq!(body["data"][0]["id"], "ch_123");
//! ```
//!
//! # Response shapes
//!
//! | Schema | Generated body |
//! |--------|----------------|
//! | `{"$ref": "#/definitions/charge"}` | the `charge` fixture, or `{}` |
//! | object whose `data.items` is a `$ref` | a list with one generated item |
//! | `x-resourceId` plus `properties` | the named fixture with sub-resources generated |
//!
//! # Expansion
//!
//! `expand[]=customer` replaces the `customer` ID inside the generated body
//! with the full customer fixture, provided the field declares
//! `x-expansionResources`. Paths nest with dots; `*` expands every field.

mod auth;
mod error;
mod expansion;
mod fixtures;
mod generator;
mod loader;
mod params;
mod router;
mod server;
mod types;
mod validator;

pub use auth::validate_auth;
pub use error::{GenerateError, LoadError, RequestError, RouteError, ValidateError};
pub use expansion::ExpansionLevel;
pub use fixtures::{Fixtures, ResourceId};
pub use generator::{definition_from_pointer, DataGenerator};
pub use loader::{
    is_url, load_fixtures, load_fixtures_str, load_json, load_json_auto, load_spec,
    load_spec_str,
};
pub use params::{coerce_form_values, expansions_from, parse_body, parse_form, BodyFormat};
pub use router::{compile_path, Route, RouteMatch, RouteTable};
pub use server::{
    app, StubRequest, StubResponse, StubServer, DEFAULT_PORT, VERSION, VERSION_HEADER,
};
pub use types::{json_type_name, JsonSchema, Operation, Parameter, ResponseSpec, Shape, Spec};
pub use validator::{get_validator, ParamValidator};

#[cfg(feature = "remote")]
pub use loader::load_json_url;
