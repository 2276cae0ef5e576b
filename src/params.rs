//! Decoding of request parameters into a JSON payload.
//!
//! Form-encoded keys use bracket nesting:
//!
//! | Input | Payload |
//! |-------|---------|
//! | `amount=100` | `{"amount": "100"}` |
//! | `card[number]=4242` | `{"card": {"number": "4242"}}` |
//! | `expand[]=customer` | `{"expand": ["customer"]}` |
//! | `items[0][price]=p_1` | `{"items": [{"price": "p_1"}]}` |
//!
//! Form values arrive as strings; [`coerce_form_values`] converts them to
//! the primitive types the parameter schema declares.

use serde_json::{Map, Number, Value};
use url::form_urlencoded;

use crate::error::RequestError;

/// Decode an `application/x-www-form-urlencoded` string.
pub fn parse_form(input: &str) -> Value {
    let mut root = Map::new();
    for (key, value) in form_urlencoded::parse(input.as_bytes()) {
        let segments = key_segments(&key);
        insert_segments(&mut root, &segments, value.into_owned());
    }
    let mut root = Value::Object(root);
    collapse_indexed(&mut root);
    root
}

/// Encoding of a request body, decided by its content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// Typed JSON values; never coerced.
    Json,
    /// Form-encoded; every value is a string.
    Form,
}

impl BodyFormat {
    /// `application/json` is JSON, anything else (or nothing) is a form.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.trim_start().starts_with("application/json") => Self::Json,
            _ => Self::Form,
        }
    }
}

/// Decode a request body. JSON bodies must be objects; anything that is not
/// JSON is treated as form-encoded. An empty body is an empty object.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, RequestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    if BodyFormat::from_content_type(content_type) == BodyFormat::Json {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| RequestError::BadRequest {
                message: e.to_string(),
            })?;
        if !value.is_object() {
            return Err(RequestError::BadRequest {
                message: "expected a JSON object".to_string(),
            });
        }
        return Ok(value);
    }

    let text = std::str::from_utf8(body).map_err(|e| RequestError::BadRequest {
        message: e.to_string(),
    })?;
    Ok(parse_form(text))
}

/// Overlay the members of `top` onto `base`. A non-object `top` replaces
/// `base` outright.
pub fn merge(base: Value, top: Value) -> Value {
    match (base, top) {
        (Value::Object(mut base), Value::Object(top)) => {
            for (key, value) in top {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, top) => top,
    }
}

/// Convert string values to the `integer`, `number` or `boolean` type their
/// schema declares. Values that do not parse are left alone for the
/// validator to reject.
pub fn coerce_form_values(schema: &Value, payload: &mut Value) {
    match payload {
        Value::Object(map) => {
            let Some(props) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            for (name, value) in map.iter_mut() {
                if let Some(prop) = props.get(name) {
                    coerce_form_values(prop, value);
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items {
                    coerce_form_values(item_schema, item);
                }
            }
        }
        Value::String(s) => {
            if let Some(coerced) = coerce_scalar(s, schema) {
                *payload = coerced;
            }
        }
        _ => {}
    }
}

/// The `expand` member of a payload as a list of paths.
pub fn expansions_from(payload: &Value) -> Vec<String> {
    match payload.get("expand") {
        Some(Value::Array(paths)) => paths
            .iter()
            .filter_map(|p| p.as_str().map(String::from))
            .collect(),
        Some(Value::String(path)) => vec![path.clone()],
        _ => Vec::new(),
    }
}

fn coerce_scalar(s: &str, schema: &Value) -> Option<Value> {
    let types: Vec<&str> = match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => return None,
    };
    if types.contains(&"string") {
        return None;
    }

    types.iter().find_map(|t| match *t {
        "integer" => s.parse::<i64>().ok().map(Value::from),
        "number" => s
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        "boolean" => match s {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    })
}

/// `card[number]` splits into `["card", "number"]`, `expand[]` into
/// `["expand", ""]`.
fn key_segments(key: &str) -> Vec<&str> {
    let Some(open) = key.find('[') else {
        return vec![key];
    };

    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            break;
        };
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    segments
}

fn insert_segments(map: &mut Map<String, Value>, segments: &[&str], value: String) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    match rest {
        [] => {
            map.insert(head.to_string(), Value::String(value));
        }
        [""] => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !entry.is_array() {
                *entry = Value::Array(Vec::new());
            }
            if let Value::Array(arr) = entry {
                arr.push(Value::String(value));
            }
        }
        _ => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_segments(child, rest, value);
            }
        }
    }
}

/// Objects keyed only by indices (`items[0]`, `items[1]`) become arrays.
fn collapse_indexed(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                collapse_indexed(child);
            }
            if map.is_empty() || !map.keys().all(|k| k.parse::<usize>().is_ok()) {
                return;
            }
            let mut indexed: Vec<(usize, Value)> = std::mem::take(map)
                .into_iter()
                .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                .collect();
            indexed.sort_by_key(|(i, _)| *i);
            *value = Value::Array(indexed.into_iter().map(|(_, v)| v).collect());
        }
        Value::Array(items) => {
            for item in items {
                collapse_indexed(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_form() {
        assert_eq!(
            parse_form("amount=100&currency=usd"),
            json!({"amount": "100", "currency": "usd"})
        );
    }

    #[test]
    fn bracket_nesting() {
        assert_eq!(
            parse_form("card[number]=4242&card[exp][month]=12"),
            json!({"card": {"number": "4242", "exp": {"month": "12"}}})
        );
    }

    #[test]
    fn array_append() {
        assert_eq!(
            parse_form("expand[]=customer&expand[]=charge.source"),
            json!({"expand": ["customer", "charge.source"]})
        );
    }

    #[test]
    fn indexed_arrays() {
        assert_eq!(
            parse_form("items[1][price]=p_2&items[0][price]=p_1"),
            json!({"items": [{"price": "p_1"}, {"price": "p_2"}]})
        );
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(
            parse_form("description=a%20b+c&metadata%5Bkey%5D=v"),
            json!({"description": "a b c", "metadata": {"key": "v"}})
        );
    }

    #[test]
    fn body_by_content_type() {
        assert_eq!(parse_body(None, b"").unwrap(), json!({}));
        assert_eq!(
            parse_body(Some("application/json; charset=utf-8"), br#"{"amount": 100}"#).unwrap(),
            json!({"amount": 100})
        );
        assert_eq!(
            parse_body(Some("application/x-www-form-urlencoded"), b"amount=100").unwrap(),
            json!({"amount": "100"})
        );
    }

    #[test]
    fn bad_bodies() {
        assert!(matches!(
            parse_body(Some("application/json"), b"{not json"),
            Err(RequestError::BadRequest { .. })
        ));
        assert!(matches!(
            parse_body(Some("application/json"), b"[1, 2]"),
            Err(RequestError::BadRequest { .. })
        ));
    }

    #[test]
    fn merge_prefers_top() {
        let merged = merge(json!({"a": "1", "b": "2"}), json!({"b": "3"}));
        assert_eq!(merged, json!({"a": "1", "b": "3"}));

        let merged = merge(json!({"a": "1"}), json!({}));
        assert_eq!(merged, json!({"a": "1"}));

        assert_eq!(merge(json!({"a": "1"}), json!(["x"])), json!(["x"]));
    }

    #[test]
    fn body_format_from_content_type() {
        assert_eq!(
            BodyFormat::from_content_type(Some("application/json; charset=utf-8")),
            BodyFormat::Json
        );
        assert_eq!(
            BodyFormat::from_content_type(Some("application/x-www-form-urlencoded")),
            BodyFormat::Form
        );
        assert_eq!(BodyFormat::from_content_type(None), BodyFormat::Form);
    }

    #[test]
    fn coercion_follows_schema() {
        let schema = json!({
            "properties": {
                "amount": {"type": "integer"},
                "rate": {"type": "number"},
                "capture": {"type": "boolean"},
                "description": {"type": "string"},
                "card": {"properties": {"exp_month": {"type": "integer"}}},
                "quantities": {"type": "array", "items": {"type": "integer"}}
            }
        });
        let mut payload = parse_form(
            "amount=100&rate=1.5&capture=false&description=123&card[exp_month]=12&quantities[]=1&quantities[]=2",
        );
        coerce_form_values(&schema, &mut payload);
        assert_eq!(
            payload,
            json!({
                "amount": 100,
                "rate": 1.5,
                "capture": false,
                "description": "123",
                "card": {"exp_month": 12},
                "quantities": [1, 2]
            })
        );
    }

    #[test]
    fn coercion_leaves_unparseable_values() {
        let schema = json!({"properties": {"amount": {"type": "integer"}}});
        let mut payload = json!({"amount": "lots"});
        coerce_form_values(&schema, &mut payload);
        assert_eq!(payload, json!({"amount": "lots"}));
    }

    #[test]
    fn expansion_paths() {
        assert_eq!(
            expansions_from(&json!({"expand": ["a", "b.c"]})),
            vec!["a".to_string(), "b.c".to_string()]
        );
        assert_eq!(expansions_from(&json!({"expand": "a"})), vec!["a".to_string()]);
        assert!(expansions_from(&json!({})).is_empty());
    }
}
