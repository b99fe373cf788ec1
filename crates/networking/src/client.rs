//! HTTP request executor.
//!
//! Every call to [`HttpClient::request`] is dispatched immediately as its own
//! tokio task and handed back as a [`PendingRequest`]. The pending request is
//! a future resolving to the decoded [`Response`], and can be aborted at any
//! time before it settles.
//!
//! Any HTTP status resolves successfully except 502, which rejects with
//! [`RequestError::GatewayUnavailable`]. Interpreting other status codes is
//! left to the caller.

use crate::headers::HeaderMap;
use crate::origin::Environment;
use crate::request::{Payload, PreparedRequest, ReadAs, RequestOptions};
use crate::response::{RawResponse, Response};
use crate::transport::{CrossDomainTransport, StandardTransport, Transport, TransportError};
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use http::{Method, StatusCode};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Request errors.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Encoding error: {0}")]
    Encode(String),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Gateway unavailable (HTTP {status})")]
    GatewayUnavailable {
        status: u16,
        headers: HeaderMap,
        body: String,
    },
    #[error("Aborted")]
    Aborted,
    #[error("No async runtime available")]
    NoRuntime,
    #[error("Task error: {0}")]
    Task(String),
}

impl RequestError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Timeout(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RequestError::Aborted)
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::GatewayUnavailable { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn rejection(&self) -> Rejection {
        match self {
            RequestError::InvalidUrl(_) | RequestError::Encode(_) | RequestError::NoRuntime => {
                Rejection::Invalid
            }
            RequestError::Transport(_) | RequestError::Task(_) => Rejection::Transport,
            RequestError::Timeout(_) => Rejection::Timeout,
            RequestError::GatewayUnavailable { .. } => Rejection::GatewayUnavailable,
            RequestError::Aborted => Rejection::Aborted,
        }
    }
}

/// Why a request was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    Invalid,
    Transport,
    Timeout,
    GatewayUnavailable,
    Aborted,
}

/// Lifecycle of a single request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    InFlight,
    Resolved,
    Rejected(Rejection),
}

impl RequestState {
    pub fn is_settled(&self) -> bool {
        matches!(self, RequestState::Resolved | RequestState::Rejected(_))
    }
}

type SharedState = Arc<Mutex<RequestState>>;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// HTTP client for making requests.
#[derive(Clone)]
pub struct HttpClient {
    standard: Arc<dyn Transport>,
    cross_domain: Option<Arc<dyn Transport>>,
    environment: Environment,
}

impl HttpClient {
    /// Create a client over the standard transport.
    pub fn new() -> Result<Self, RequestError> {
        HttpClientBuilder::new().build()
    }

    /// Start building a client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Create a client over a specific transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            standard: transport,
            cross_domain: None,
            environment: Environment::default(),
        }
    }

    /// Get the environment requests are issued from.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Dispatch a request.
    ///
    /// Must be called within a tokio runtime; otherwise the returned request
    /// is already rejected with [`RequestError::NoRuntime`].
    pub fn request(
        &self,
        method: Method,
        url: &str,
        payload: impl Into<Payload>,
        options: RequestOptions,
    ) -> PendingRequest {
        let id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        let payload = payload.into();

        let mut absolute = false;
        let prepared = PreparedRequest::build(method, url, &payload, &options, |target| {
            let (resolved, was_absolute) = self
                .environment
                .resolve(target)
                .map_err(|e| RequestError::InvalidUrl(format!("{}: {}", target, e)))?;
            absolute = was_absolute;
            Ok(resolved)
        });

        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                tracing::debug!(id, "Request could not be prepared: {}", err);
                return PendingRequest::rejected(err);
            }
        };

        let transport = self.select_transport(&prepared, absolute);

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => return PendingRequest::rejected(RequestError::NoRuntime),
        };

        tracing::debug!(
            id,
            method = %prepared.method,
            url = %prepared.url,
            transport = transport.name(),
            "Dispatching request"
        );

        let state: SharedState = Arc::new(Mutex::new(RequestState::Idle));
        let (abort, registration) = AbortHandle::new_pair();
        let exchange = Exchange {
            id,
            transport,
            read_as: options.read_as,
            before_send: options.before_send,
            state: state.clone(),
        };
        let task = runtime.spawn(exchange.run(prepared, registration));

        PendingRequest {
            state,
            abort,
            inner: Inner::Spawned(task),
        }
    }

    /// Dispatch a GET request.
    pub fn get(&self, url: &str, payload: impl Into<Payload>, options: RequestOptions) -> PendingRequest {
        self.request(Method::GET, url, payload, options)
    }

    /// Dispatch a POST request.
    pub fn post(&self, url: &str, payload: impl Into<Payload>, options: RequestOptions) -> PendingRequest {
        self.request(Method::POST, url, payload, options)
    }

    /// Dispatch a PUT request.
    pub fn put(&self, url: &str, payload: impl Into<Payload>, options: RequestOptions) -> PendingRequest {
        self.request(Method::PUT, url, payload, options)
    }

    /// Dispatch a DELETE request.
    pub fn delete(&self, url: &str, payload: impl Into<Payload>, options: RequestOptions) -> PendingRequest {
        self.request(Method::DELETE, url, payload, options)
    }

    /// Dispatch a PATCH request.
    pub fn patch(&self, url: &str, payload: impl Into<Payload>, options: RequestOptions) -> PendingRequest {
        self.request(Method::PATCH, url, payload, options)
    }

    /// Dispatch a HEAD request.
    pub fn head(&self, url: &str, payload: impl Into<Payload>, options: RequestOptions) -> PendingRequest {
        self.request(Method::HEAD, url, payload, options)
    }

    fn select_transport(&self, request: &PreparedRequest, absolute: bool) -> Arc<dyn Transport> {
        match &self.cross_domain {
            Some(cross_domain) if self.environment.needs_cross_domain(&request.url, absolute) => {
                cross_domain.clone()
            }
            _ => self.standard.clone(),
        }
    }
}

/// One spawned request/response exchange.
struct Exchange {
    id: u64,
    transport: Arc<dyn Transport>,
    read_as: ReadAs,
    before_send: Option<crate::request::BeforeSend>,
    state: SharedState,
}

impl Exchange {
    async fn run(self, prepared: PreparedRequest, registration: AbortRegistration) -> Result<Response, RequestError> {
        let id = self.id;
        let state = self.state.clone();

        let result = match Abortable::new(self.exchange(prepared), registration).await {
            Ok(result) => result,
            Err(_aborted) => Err(RequestError::Aborted),
        };

        settle(&state, id, result)
    }

    async fn exchange(self, mut prepared: PreparedRequest) -> Result<Response, RequestError> {
        if let Some(hook) = &self.before_send {
            hook(&mut prepared);
        }

        let timeout = prepared.timeout;
        {
            let mut state = self.state.lock();
            if state.is_settled() {
                return Err(RequestError::Aborted);
            }
            *state = RequestState::InFlight;
        }

        // A zero timeout means no deadline.
        let sent = if timeout.is_zero() {
            self.transport.send(prepared).await
        } else {
            match tokio::time::timeout(timeout, self.transport.send(prepared)).await {
                Ok(sent) => sent,
                Err(_elapsed) => return Err(RequestError::Timeout(timeout)),
            }
        };
        let raw = match sent {
            Err(TransportError::Timeout) => return Err(RequestError::Timeout(timeout)),
            Err(err) => return Err(RequestError::Transport(err)),
            Ok(raw) => raw,
        };

        if raw.status == StatusCode::BAD_GATEWAY {
            return Err(gateway_unavailable(raw));
        }

        Ok(Response::from_raw(raw, self.read_as))
    }
}

fn gateway_unavailable(raw: RawResponse) -> RequestError {
    let body = raw.text();
    RequestError::GatewayUnavailable {
        status: raw.status.as_u16(),
        headers: raw.headers,
        body,
    }
}

/// Record the outcome. An abort that got in first always wins.
fn settle(
    state: &SharedState,
    id: u64,
    result: Result<Response, RequestError>,
) -> Result<Response, RequestError> {
    let mut current = state.lock();
    if *current == RequestState::Rejected(Rejection::Aborted) {
        tracing::debug!(id, "Request aborted");
        return Err(RequestError::Aborted);
    }

    match &result {
        Ok(response) => {
            tracing::debug!(id, status = response.status(), "Request resolved");
            *current = RequestState::Resolved;
        }
        Err(err) => {
            match err {
                RequestError::Timeout(_) | RequestError::GatewayUnavailable { .. } => {
                    tracing::warn!(id, "Request failed: {}", err)
                }
                _ => tracing::debug!(id, "Request failed: {}", err),
            }
            *current = RequestState::Rejected(err.rejection());
        }
    }
    result
}

/// Cancels a pending request from anywhere.
#[derive(Clone, Debug)]
pub struct RequestAbortHandle {
    state: SharedState,
    abort: AbortHandle,
}

impl RequestAbortHandle {
    /// Abort the request if it has not settled yet.
    pub fn abort(&self) {
        let mut state = self.state.lock();
        if state.is_settled() {
            return;
        }
        *state = RequestState::Rejected(Rejection::Aborted);
        self.abort.abort();
    }

    pub fn state(&self) -> RequestState {
        *self.state.lock()
    }
}

enum Inner {
    Spawned(JoinHandle<Result<Response, RequestError>>),
    Failed(Option<RequestError>),
}

/// An in-flight request.
///
/// Resolves to the response, or to the reason the request was rejected.
/// Dropping it does not cancel the request; use [`PendingRequest::abort`].
pub struct PendingRequest {
    state: SharedState,
    abort: AbortHandle,
    inner: Inner,
}

impl PendingRequest {
    fn rejected(err: RequestError) -> Self {
        let (abort, _registration) = AbortHandle::new_pair();
        Self {
            state: Arc::new(Mutex::new(RequestState::Rejected(err.rejection()))),
            abort,
            inner: Inner::Failed(Some(err)),
        }
    }

    /// Abort the request if it has not settled yet.
    pub fn abort(&self) {
        self.abort_handle().abort();
    }

    /// Get a handle that can abort this request.
    pub fn abort_handle(&self) -> RequestAbortHandle {
        RequestAbortHandle {
            state: self.state.clone(),
            abort: self.abort.clone(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RequestState {
        *self.state.lock()
    }
}

impl Future for PendingRequest {
    type Output = Result<Response, RequestError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            Inner::Failed(err) => Poll::Ready(Err(err.take().unwrap_or(RequestError::Aborted))),
            Inner::Spawned(task) => match Pin::new(task).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(join_err)) if join_err.is_cancelled() => {
                    Poll::Ready(Err(RequestError::Aborted))
                }
                Poll::Ready(Err(join_err)) => Poll::Ready(Err(RequestError::Task(join_err.to_string()))),
            },
        }
    }
}

/// HTTP client builder.
pub struct HttpClientBuilder {
    standard: Option<Arc<dyn Transport>>,
    cross_domain: Option<Arc<dyn Transport>>,
    environment: Environment,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self {
            standard: None,
            cross_domain: None,
            environment: Environment::default(),
        }
    }

    /// Use a specific standard transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.standard = Some(transport);
        self
    }

    /// Use a specific cross-domain transport.
    pub fn cross_domain_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.cross_domain = Some(transport);
        self
    }

    /// Set the environment requests are issued from.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Build the client.
    ///
    /// When the environment declares the legacy cross-domain capability and
    /// no cross-domain transport was given, one is layered over the standard
    /// transport.
    pub fn build(self) -> Result<HttpClient, RequestError> {
        let standard: Arc<dyn Transport> = match self.standard {
            Some(transport) => transport,
            None => Arc::new(StandardTransport::new()?),
        };

        let cross_domain = match self.cross_domain {
            Some(transport) => Some(transport),
            None if self.environment.legacy_cross_domain => {
                Some(Arc::new(CrossDomainTransport::new(standard.clone())) as Arc<dyn Transport>)
            }
            None => None,
        };

        Ok(HttpClient {
            standard,
            cross_domain,
            environment: self.environment,
        })
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
