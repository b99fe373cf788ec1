//! HTTP request utility for the ISF web console.
//!
//! This crate handles:
//! - Query string serialization and URL joining
//! - Request body encoding (form, JSON, text)
//! - Pluggable transports (standard and legacy cross-domain)
//! - Cancellable requests with timeouts
//! - Response decoding (text, lossless JSON, XML)
//! - Typed evaluation of query values

pub mod client;
pub mod eval;
pub mod headers;
pub mod origin;
pub mod query;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{HttpClient, HttpClientBuilder, PendingRequest, RequestAbortHandle, RequestError, RequestState};
pub use eval::{eval_query, parse_query};
pub use headers::HeaderMap;
pub use origin::Environment;
pub use query::{join_url, query_string, Params};
pub use request::{Payload, PreparedRequest, ReadAs, RequestOptions, SendAs};
pub use response::{Body, Response, XmlDocument, XmlElement, XmlNode};
pub use transport::{CrossDomainTransport, StandardTransport, Transport, TransportError};
