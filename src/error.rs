//! Error types for schema loading, response generation, validation and routing.

use std::path::PathBuf;

use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors while loading the schema document or the fixtures document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid document: {message}")]
    InvalidDocument { message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while synthesizing a response body.
///
/// Both variants point at a defect in the schema document, never at the
/// request. A missing fixture is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("couldn't dereference: {pointer}")]
    Dereference { pointer: String },

    #[error("expected response to be a list or include $ref")]
    UnsupportedSchema,
}

/// Errors from request parameter validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
    /// The parameter schema itself could not be compiled.
    #[error("invalid parameter schema: {message}")]
    Compile { message: String },

    /// The payload violates the parameter schema. Only the first
    /// violation is reported.
    #[error("{message}")]
    Invalid { message: String },
}

/// Errors while building the route table.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("cannot compile path {path}: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot build validator for {method} {path}: {source}")]
    InvalidValidator {
        method: String,
        path: String,
        #[source]
        source: ValidateError,
    },
}

impl RouteError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Request-level failures, each mapped to an HTTP status.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("You did not provide a valid API key. Provide a test secret key (sk_test_...) as a Bearer token or as the Basic auth username.")]
    Unauthorized,

    #[error("Unrecognized request URL ({method}: {path}).")]
    NotFound { method: String, path: String },

    #[error("could not decode request body: {message}")]
    BadRequest { message: String },

    #[error(transparent)]
    Invalid(#[from] ValidateError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("no response schema for {method} {path}")]
    MissingResponse { method: String, path: String },
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Unauthorized => StatusCode::UNAUTHORIZED,
            RequestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RequestError::BadRequest { .. } | RequestError::Invalid(_) => StatusCode::BAD_REQUEST,
            RequestError::Generate(_) | RequestError::MissingResponse { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Error `type` reported in the response envelope.
    pub fn error_type(&self) -> &'static str {
        match self {
            RequestError::Generate(_) | RequestError::MissingResponse { .. } => "api_error",
            _ => "invalid_request_error",
        }
    }

    /// JSON envelope sent back to the client.
    pub fn to_body(&self) -> Value {
        json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}
