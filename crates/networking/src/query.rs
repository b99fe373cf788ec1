//! Query string serialization and URL joining.

use serde_json::Value;
use std::borrow::Cow;
use url::form_urlencoded;

/// Flat, insertion-ordered key/value mapping used for query strings and
/// request payloads. `Value::Null` marks an absent value.
pub type Params = serde_json::Map<String, Value>;

/// Serialize params as `key=value` pairs joined by `&`.
///
/// Null values are skipped. Arrays repeat the key once per element.
pub fn query_string(params: &Params) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    for (key, value) in params {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar_text(item) {
                        serializer.append_pair(key, &text);
                    }
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    serializer.append_pair(key, &text);
                }
            }
        }
    }

    serializer.finish()
}

/// Append params to `url`, merging with any query it already has.
pub fn join_url(url: &str, params: &Params) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    join_query(url, &query_string(params))
}

/// Append an already-encoded query fragment to `url`.
pub fn join_query(url: &str, fragment: &str) -> String {
    let (base, existing) = url.split_once('?').unwrap_or((url, ""));

    let combined = [existing, fragment]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("&");

    if combined.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, combined)
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        nested => Some(Cow::Owned(nested.to_string())),
    }
}
