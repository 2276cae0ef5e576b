//! Canonical example resources used to populate generated responses.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a fixture resource (e.g. `charge`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only mapping from resource identifier to its example value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Fixtures {
    #[serde(default)]
    pub resources: HashMap<ResourceId, Value>,
}

impl Fixtures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource.
    pub fn with(mut self, id: impl Into<ResourceId>, value: Value) -> Self {
        self.resources.insert(id.into(), value);
        self
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Value> {
        self.resources.get(id)
    }
}
