//! HTTP response handling.

use crate::headers::{names, HeaderMap};
use crate::request::ReadAs;
use bytes::Bytes;
use encoding_rs::Encoding;
use http::StatusCode;
use indexmap::IndexMap;
use mime::Mime;
use serde_json::Value;
use std::fmt;

/// What a transport hands back: status, headers and undecoded body.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Decode the body as text.
    pub fn text(&self) -> String {
        let encoding = self.detect_encoding();
        let (text, _, _) = encoding.decode(&self.body);
        text.into_owned()
    }

    /// Detect character encoding.
    fn detect_encoding(&self) -> &'static Encoding {
        // Check content-type charset
        let mime = self
            .headers
            .content_type()
            .and_then(|value| value.parse::<Mime>().ok());
        if let Some(charset) = mime.as_ref().and_then(|m| m.get_param(mime::CHARSET)) {
            if let Some(encoding) = Encoding::for_label(charset.as_str().as_bytes()) {
                return encoding;
            }
        }

        // Check for BOM
        if let Some((encoding, _)) = Encoding::for_bom(&self.body) {
            return encoding;
        }

        encoding_rs::UTF_8
    }
}

/// Parse JSON without losing precision on large numbers.
pub fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}

/// A well-formed XML document.
///
/// The tree is built once at parse time and owned by the document.
#[derive(Clone, PartialEq, Eq)]
pub struct XmlDocument {
    source: String,
    root: XmlElement,
}

impl XmlDocument {
    /// Parse and validate `source`.
    pub fn parse(source: impl Into<String>) -> Result<Self, roxmltree::Error> {
        let source = source.into();
        let root = {
            let document = roxmltree::Document::parse(&source)?;
            XmlElement::from_node(document.root_element())
        };
        Ok(Self { source, root })
    }

    /// The root element.
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Local name of the root element.
    pub fn root_name(&self) -> &str {
        self.root.name()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlDocument").field("root", &self.root.name).finish()
    }
}

/// Element of a parsed XML document. Names are local (namespace-free).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: IndexMap<String, String>,
    children: Vec<XmlNode>,
}

/// Child of an [`XmlElement`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let attributes = node
            .attributes()
            .map(|attr| (attr.name().to_string(), attr.value().to_string()))
            .collect();
        let children = node
            .children()
            .filter_map(|child| {
                if child.is_element() {
                    Some(XmlNode::Element(Self::from_node(child)))
                } else if child.is_text() {
                    child.text().map(|text| XmlNode::Text(text.to_string()))
                } else {
                    None
                }
            })
            .collect();
        Self {
            name: node.tag_name().name().to_string(),
            attributes,
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// First descendant element named `name`, depth-first.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.elements()
            .find_map(|child| if child.name == name { Some(child) } else { child.find(name) })
    }
}

/// Decoded response body.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Text(String),
    Json(Value),
    Xml(XmlDocument),
}

impl Body {
    /// Decode `raw` according to `read_as`. Falls back to text when the
    /// body does not parse.
    pub fn decode(raw: &RawResponse, read_as: ReadAs) -> Self {
        let text = raw.text();
        match read_as {
            ReadAs::Text => Body::Text(text),
            ReadAs::Json => match parse_json(&text) {
                Ok(value) => Body::Json(value),
                Err(err) => {
                    tracing::debug!("Response is not JSON, returning text: {}", err);
                    Body::Text(text)
                }
            },
            ReadAs::Xml => match XmlDocument::parse(text.as_str()) {
                Ok(document) => Body::Xml(document),
                Err(err) => {
                    tracing::debug!("Response is not XML, returning text: {}", err);
                    Body::Text(text)
                }
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match self {
            Body::Xml(document) => Some(document),
            _ => None,
        }
    }
}

/// A settled HTTP response.
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    pub(crate) fn from_raw(raw: RawResponse, read_as: ReadAs) -> Self {
        let body = Body::decode(&raw, read_as);
        Self {
            status: raw.status,
            headers: raw.headers,
            body,
        }
    }

    /// Get the response status code.
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// Get the response status as a typed code.
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get a response header, case-insensitively.
    pub fn get_response_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the content type.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(names::CONTENT_TYPE)
    }

    /// Get the decoded body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Take the decoded body.
    pub fn into_body(self) -> Body {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(content_type: &str, body: &'static [u8]) -> RawResponse {
        let headers: HeaderMap = [("Content-Type", content_type)].into_iter().collect();
        RawResponse::new(StatusCode::OK, headers, body)
    }

    #[test]
    fn test_json_keeps_large_integers() {
        let response = raw(
            "application/json",
            br#"{"id": 123456789012345678901234567890, "small": 7}"#,
        );
        let body = Body::decode(&response, ReadAs::Json);
        let value = body.as_json().unwrap();
        assert_eq!(value["id"].to_string(), "123456789012345678901234567890");
        assert_eq!(value["small"].as_u64(), Some(7));
    }

    #[test]
    fn test_json_just_past_safe_integer() {
        let response = raw("application/json", b"[9007199254740993]");
        let body = Body::decode(&response, ReadAs::Json);
        assert_eq!(body.as_json().unwrap()[0].to_string(), "9007199254740993");
    }

    #[test]
    fn test_bad_json_falls_back_to_text() {
        let response = raw("application/json", b"<html>oops</html>");
        let body = Body::decode(&response, ReadAs::Json);
        assert_eq!(body, Body::Text("<html>oops</html>".to_string()));
    }

    #[test]
    fn test_xml_body() {
        let response = raw("text/xml", b"<?xml version=\"1.0\"?><users><user id=\"1\"/></users>");
        let body = Body::decode(&response, ReadAs::Xml);
        let document = body.as_xml().unwrap();
        assert_eq!(document.root_name(), "users");

        let user = document.root().find("user").unwrap();
        assert_eq!(user.attribute("id"), Some("1"));
    }

    #[test]
    fn test_xml_tree_is_owned() {
        let response = raw(
            "application/xml",
            b"<feed><entry id=\"a\"><title>First</title></entry><entry id=\"b\"><title>Second</title></entry></feed>",
        );
        let body = Body::decode(&response, ReadAs::Xml);
        let root = body.as_xml().unwrap().root().clone();
        drop(body);

        let ids: Vec<_> = root.elements().filter_map(|entry| entry.attribute("id")).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(root.find("title").map(XmlElement::text).as_deref(), Some("First"));
        assert!(root.find("missing").is_none());
    }

    #[test]
    fn test_bad_xml_falls_back_to_text() {
        let response = raw("text/xml", b"<users>");
        let body = Body::decode(&response, ReadAs::Xml);
        assert_eq!(body.as_text(), Some("<users>"));
    }

    #[test]
    fn test_text_charset_from_content_type() {
        // "caf\u{e9}" in latin-1
        let response = raw("text/plain; charset=iso-8859-1", b"caf\xe9");
        assert_eq!(response.text(), "caf\u{e9}");
    }

    #[test]
    fn test_text_bom() {
        let response = raw("text/plain", b"\xEF\xBB\xBFhi");
        assert_eq!(response.text(), "hi");
    }

    #[test]
    fn test_response_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Request-Id", "r-1");
        let response = Response::from_raw(
            RawResponse::new(StatusCode::NOT_FOUND, headers, "missing"),
            ReadAs::Text,
        );
        assert_eq!(response.status(), 404);
        assert!(!response.is_success());
        assert_eq!(response.get_response_header("x-request-id"), Some("r-1"));
        assert_eq!(response.get_response_header("etag"), None);
        assert_eq!(response.body().as_text(), Some("missing"));
    }
}
