//! Path template compilation and request routing.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::error::RouteError;
use crate::types::{Operation, Spec};
use crate::validator::{get_validator, ParamValidator};

/// Characters a path parameter may contain. ASCII only.
const PARAM_CLASS: &str = r"[0-9A-Za-z_\-.]+";

/// Compile a path template such as `/v1/charges/{id}` into an anchored
/// pattern with one named group per placeholder.
///
/// # Errors
///
/// Returns `regex::Error` when a placeholder name is not a valid group name.
pub fn compile_path(template: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from(r"\A");
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open..].find('}') else {
            break;
        };
        let name = &rest[open + 1..open + len];
        pattern.push_str(&regex::escape(&rest[..open]));
        pattern.push_str(&format!("(?P<{}>{})", name, PARAM_CLASS));
        rest = &rest[open + len + 1..];
    }

    pattern.push_str(&regex::escape(rest));
    pattern.push_str(r"\z");
    Regex::new(&pattern)
}

/// A compiled (method, path) association.
#[derive(Debug, Clone)]
pub struct Route {
    /// Uppercase HTTP method.
    pub method: String,
    /// Path template as written in the document.
    pub path: String,
    pub pattern: Regex,
    pub operation: Operation,
    /// `None` when the operation declares no parameter schema.
    pub validator: Option<ParamValidator>,
}

/// A route matched against a concrete request path.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: BTreeMap<String, String>,
}

/// Every route of a document, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile all operations of `spec`.
    ///
    /// # Errors
    ///
    /// Fails on the first path template or parameter schema that does not
    /// compile.
    pub fn new(spec: &Spec) -> Result<Self, RouteError> {
        let mut routes = Vec::new();

        for (path, methods) in &spec.paths {
            let pattern = compile_path(path).map_err(|source| RouteError::InvalidPath {
                path: path.clone(),
                source,
            })?;

            for (method, operation) in methods {
                let method = method.to_uppercase();
                let validator = get_validator(operation, &spec.definitions).map_err(|source| {
                    RouteError::InvalidValidator {
                        method: method.clone(),
                        path: path.clone(),
                        source,
                    }
                })?;

                debug!(
                    %method,
                    %path,
                    operation = operation.operation_id.as_deref().unwrap_or("-"),
                    validated = validator.is_some(),
                    "compiled route"
                );
                routes.push(Route {
                    method,
                    path: path.clone(),
                    pattern: pattern.clone(),
                    operation: operation.clone(),
                    validator,
                });
            }
        }

        Ok(Self { routes })
    }

    /// Find the first route for `method` whose pattern matches all of `path`.
    /// `method` is compared case-insensitively.
    ///
    /// Overlapping templates resolve to whichever was declared first.
    pub fn route(&self, method: &str, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| {
            if !route.method.eq_ignore_ascii_case(method) {
                return None;
            }
            let captures = route.pattern.captures(path)?;
            let params = route
                .pattern
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect();
            Some(RouteMatch { route, params })
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
