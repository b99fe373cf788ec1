//! Request description and encoding.

use crate::client::RequestError;
use crate::headers::{content_type, names, HeaderMap};
use crate::query::{join_query, join_url, query_string, Params};
use bytes::Bytes;
use http::Method;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Returned when an encoding name is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown encoding: {0}")]
pub struct UnknownEncoding(pub String);

/// How the request body is encoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SendAs {
    #[default]
    Form,
    Json,
    Text,
}

impl SendAs {
    /// Content-Type sent for this encoding. All three stay within the
    /// CORS "simple request" set.
    pub fn content_type(self) -> &'static str {
        match self {
            SendAs::Form => content_type::FORM_UTF8,
            SendAs::Json => content_type::JSON_UTF8,
            SendAs::Text => content_type::PLAIN_UTF8,
        }
    }
}

impl FromStr for SendAs {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "form" => Ok(SendAs::Form),
            "json" => Ok(SendAs::Json),
            "text" => Ok(SendAs::Text),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

/// How the response body is decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadAs {
    #[default]
    Text,
    Json,
    Xml,
}

impl FromStr for ReadAs {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "form" => Ok(ReadAs::Text),
            "json" => Ok(ReadAs::Json),
            "xml" => Ok(ReadAs::Xml),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

/// Request payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    /// A flat key/value mapping.
    Fields(Params),
    /// A list of flat mappings.
    List(Vec<Params>),
    /// Pre-encoded text.
    Text(String),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Empty => true,
            Payload::Fields(params) => params.is_empty(),
            Payload::List(items) => items.is_empty(),
            Payload::Text(text) => text.is_empty(),
        }
    }

    /// Append the payload to `url` as query parameters.
    fn fold_into_url(&self, url: &str) -> String {
        match self {
            Payload::Empty => url.to_string(),
            Payload::Fields(params) => join_url(url, params),
            Payload::List(items) => items.iter().fold(url.to_string(), |acc, params| join_url(&acc, params)),
            Payload::Text(text) => join_query(url, text),
        }
    }

    /// Encode the payload as a request body.
    fn encode(&self, send_as: SendAs) -> Result<Option<Bytes>, RequestError> {
        let body = match (self, send_as) {
            (Payload::Empty, _) => return Ok(None),
            (Payload::Text(text), SendAs::Form | SendAs::Text) => text.clone(),
            (Payload::Fields(params), SendAs::Form) => query_string(params),
            (Payload::List(items), SendAs::Form) => items
                .iter()
                .map(query_string)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join("&"),
            (payload, SendAs::Json | SendAs::Text) => serde_json::to_string(&payload.to_json())
                .map_err(|e| RequestError::Encode(e.to_string()))?,
        };
        Ok(Some(Bytes::from(body)))
    }

    fn to_json(&self) -> Value {
        match self {
            Payload::Empty => Value::Null,
            Payload::Fields(params) => Value::Object(params.clone()),
            Payload::List(items) => Value::Array(items.iter().cloned().map(Value::Object).collect()),
            Payload::Text(text) => Value::String(text.clone()),
        }
    }
}

impl From<Params> for Payload {
    fn from(params: Params) -> Self {
        Payload::Fields(params)
    }
}

impl From<Vec<Params>> for Payload {
    fn from(items: Vec<Params>) -> Self {
        Payload::List(items)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Empty
    }
}

/// Hook run on the prepared request just before it is sent.
pub type BeforeSend = Arc<dyn Fn(&mut PreparedRequest) + Send + Sync>;

/// Per-request options.
#[derive(Clone)]
pub struct RequestOptions {
    /// Body encoding.
    pub send_as: SendAs,
    /// Response decoding.
    pub read_as: ReadAs,
    /// Extra headers. Empty values are not sent.
    pub headers: HeaderMap,
    /// Last-moment hook.
    pub before_send: Option<BeforeSend>,
    /// Request timeout. Zero disables the deadline.
    pub timeout: Duration,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the body encoding.
    pub fn send_as(mut self, send_as: SendAs) -> Self {
        self.send_as = send_as;
        self
    }

    /// Set the response decoding.
    pub fn read_as(mut self, read_as: ReadAs) -> Self {
        self.read_as = read_as;
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the request timeout. `Duration::ZERO` waits indefinitely.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Install a hook run just before sending.
    pub fn before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut PreparedRequest) + Send + Sync + 'static,
    {
        self.before_send = Some(Arc::new(hook));
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            send_as: SendAs::default(),
            read_as: ReadAs::default(),
            headers: HeaderMap::new(),
            before_send: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("send_as", &self.send_as)
            .field("read_as", &self.read_as)
            .field("headers", &self.headers)
            .field("before_send", &self.before_send.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A fully encoded request, ready for a transport.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Duration,
}

impl PreparedRequest {
    /// Encode `payload` for `method` and attach headers.
    ///
    /// GET and HEAD never carry a body; their payload goes into the query.
    pub fn build(
        method: Method,
        url: &str,
        payload: &Payload,
        options: &RequestOptions,
        resolve: impl FnOnce(&str) -> Result<Url, RequestError>,
    ) -> Result<Self, RequestError> {
        let (target, body) = if carries_body(&method) {
            (url.to_string(), payload.encode(options.send_as)?)
        } else {
            (payload.fold_into_url(url), None)
        };

        let mut headers = HeaderMap::new();
        headers.insert(names::CONTENT_TYPE, options.send_as.content_type());
        for (name, value) in options.headers.applicable() {
            headers.insert(name, value);
        }

        Ok(Self {
            method,
            url: resolve(&target)?,
            headers,
            body,
            timeout: options.timeout,
        })
    }

    /// Get the URL as a string.
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }
}

fn carries_body(method: &Method) -> bool {
    *method != Method::GET && *method != Method::HEAD
}
