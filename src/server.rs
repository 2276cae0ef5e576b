//! The stub server: auth, routing, validation and generation per request.
//!
//! [`StubServer::handle`] is transport-agnostic; [`app`] mounts it on an
//! axum service.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::auth::validate_auth;
use crate::error::{RequestError, RouteError};
use crate::expansion::ExpansionLevel;
use crate::fixtures::Fixtures;
use crate::generator::DataGenerator;
use crate::params::{
    coerce_form_values, expansions_from, merge, parse_body, parse_form, BodyFormat,
};
use crate::router::{Route, RouteTable};
use crate::types::{JsonSchema, Spec};

/// Version reported on every response.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Response header carrying [`VERSION`].
pub const VERSION_HEADER: &str = "schema-mock-version";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 12111;

/// An inbound request, decoupled from any HTTP library.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub authorization: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

impl<'a> StubRequest<'a> {
    pub fn new(method: &'a str, path: &'a str) -> Self {
        Self {
            method,
            path,
            ..Self::default()
        }
    }

    pub fn authorization(mut self, value: &'a str) -> Self {
        self.authorization = Some(value);
        self
    }

    pub fn query(mut self, query: &'a str) -> Self {
        self.query = Some(query);
        self
    }

    pub fn body(mut self, content_type: &'a str, body: &'a [u8]) -> Self {
        self.content_type = Some(content_type);
        self.body = body;
        self
    }
}

/// Status and JSON body produced for a request.
#[derive(Debug, Clone, PartialEq)]
pub struct StubResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Immutable server state: definitions, fixtures and compiled routes.
#[derive(Debug)]
pub struct StubServer {
    definitions: IndexMap<String, JsonSchema>,
    fixtures: Fixtures,
    routes: RouteTable,
}

impl StubServer {
    /// Compile the routes of `spec`.
    ///
    /// # Errors
    ///
    /// Returns `RouteError` if a path template or parameter schema does not
    /// compile.
    pub fn new(spec: Spec, fixtures: Fixtures) -> Result<Self, RouteError> {
        let routes = RouteTable::new(&spec)?;
        debug!(routes = routes.len(), "route table ready");
        Ok(Self {
            definitions: spec.definitions,
            fixtures,
            routes,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn generator(&self) -> DataGenerator<'_> {
        DataGenerator::new(&self.definitions, &self.fixtures)
    }

    /// Run the full pipeline for one request.
    pub fn handle(&self, request: &StubRequest<'_>) -> StubResponse {
        match self.respond(request) {
            Ok(body) => StubResponse {
                status: StatusCode::OK,
                body,
            },
            Err(err) => {
                let status = err.status();
                if status.is_server_error() {
                    warn!(method = request.method, path = request.path, error = %err, "cannot generate response");
                } else {
                    debug!(method = request.method, path = request.path, %status, error = %err, "request rejected");
                }
                StubResponse {
                    status,
                    body: err.to_body(),
                }
            }
        }
    }

    fn respond(&self, request: &StubRequest<'_>) -> Result<Value, RequestError> {
        if !request.authorization.map(validate_auth).unwrap_or(false) {
            return Err(RequestError::Unauthorized);
        }

        let matched = self
            .routes
            .route(request.method, request.path)
            .ok_or_else(|| RequestError::NotFound {
                method: request.method.to_string(),
                path: request.path.to_string(),
            })?;
        let route = matched.route;
        debug!(
            method = request.method,
            path = request.path,
            template = %route.path,
            params = ?matched.params,
            "routed request"
        );

        let payload = payload_for(request, route)?;
        if let Some(validator) = &route.validator {
            validator.validate(&payload)?;
        }

        let schema = route
            .operation
            .response_schema()
            .ok_or_else(|| RequestError::MissingResponse {
                method: route.method.clone(),
                path: route.path.clone(),
            })?;

        let expansions = ExpansionLevel::parse(&expansions_from(&payload));
        let level = (!expansions.is_empty()).then_some(&expansions);
        Ok(self
            .generator()
            .generate_expanded(schema, request.path, level)?)
    }
}

/// Parameters come from the query string for GET and DELETE, and from the
/// body layered over the query string otherwise. Only form-encoded input is
/// coerced; JSON values keep the types the client sent.
fn payload_for(request: &StubRequest<'_>, route: &Route) -> Result<Value, RequestError> {
    let coerce = |mut form: Value| {
        if let Some(validator) = &route.validator {
            coerce_form_values(validator.schema(), &mut form);
        }
        form
    };

    let query = coerce(
        request
            .query
            .map(parse_form)
            .unwrap_or_else(|| Value::Object(Map::new())),
    );

    let reads_query = ["GET", "DELETE"]
        .iter()
        .any(|m| m.eq_ignore_ascii_case(request.method));
    if reads_query {
        return Ok(query);
    }

    let body = parse_body(request.content_type, request.body)?;
    let body = match BodyFormat::from_content_type(request.content_type) {
        BodyFormat::Json => body,
        BodyFormat::Form => coerce(body),
    };
    Ok(merge(query, body))
}

impl IntoResponse for StubResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        response
            .headers_mut()
            .insert(VERSION_HEADER, HeaderValue::from_static(VERSION));
        response
    }
}

/// Build the axum service answering every request through `server`.
pub fn app(server: Arc<StubServer>) -> Router {
    Router::new()
        .fallback(handle_http)
        .with_state(server)
        .layer(TraceLayer::new_for_http())
}

async fn handle_http(
    State(server): State<Arc<StubServer>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = StubRequest {
        method: method.as_str(),
        path: uri.path(),
        query: uri.query(),
        authorization: header_str(&headers, header::AUTHORIZATION),
        content_type: header_str(&headers, header::CONTENT_TYPE),
        body: &body,
    };
    server.handle(&request).into_response()
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
