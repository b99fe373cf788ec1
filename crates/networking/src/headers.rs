//! HTTP header handling.

use indexmap::IndexMap;

/// HTTP header map (case-insensitive keys, order-preserving).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMap {
    headers: IndexMap<String, String>,
}

impl HeaderMap {
    /// Create a new empty header map.
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    /// Insert a header, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.insert(name, value.into());
    }

    /// Append a header value, joining repeats with `", "`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        let value = value.into();
        match self.headers.get_mut(&name) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => {
                self.headers.insert(name, value);
            }
        }
    }

    /// Get a header value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Check if a header exists.
    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    /// Get number of headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate over headers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over headers that carry a non-empty value.
    pub fn applicable(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(_, value)| !value.is_empty())
    }

    /// Keep only headers matching the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.headers.retain(|name, value| keep(name.as_str(), value.as_str()));
    }

    /// Get Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.get(names::CONTENT_TYPE)
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Common HTTP headers.
pub mod names {
    pub const ACCEPT: &str = "accept";
    pub const ACCEPT_LANGUAGE: &str = "accept-language";
    pub const AUTHORIZATION: &str = "authorization";
    pub const CONTENT_LANGUAGE: &str = "content-language";
    pub const CONTENT_TYPE: &str = "content-type";
}

/// Check whether a request header may be sent on a simple cross-origin request.
pub fn is_cors_safelisted(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        names::ACCEPT | names::ACCEPT_LANGUAGE | names::CONTENT_LANGUAGE | names::CONTENT_TYPE
    )
}

/// Request body content types.
pub mod content_type {
    pub const PLAIN_UTF8: &str = "text/plain;charset=utf-8";
    pub const JSON_UTF8: &str = "application/json;charset=utf-8";
    pub const FORM_UTF8: &str = "application/x-www-form-urlencoded;charset=utf-8";
}
