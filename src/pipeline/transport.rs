//! HTTP transport: the only place that touches the network.
//!
//! The client never reaches for a global HTTP stack; it receives an
//! `Arc<dyn Transport>` at construction. Production code uses
//! [`ReqwestTransport`] (one pooled `reqwest::Client`, safe to share across
//! tasks); tests substitute a scripted implementation.
//!
//! A transport reports *exchanges*, not outcomes: any status code, including
//! 4xx/5xx, comes back as `Ok(HttpResponse)`. Only failures where no response
//! arrived at all are `Err(TransportError)`, classified by
//! [`TransportErrorKind`] so the retry loop can tell a dropped connection from
//! a TLS misconfiguration.

use crate::config::ConvertOptions;
use crate::error::{Swift2MdError, TransportError, TransportErrorKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use tracing::debug;

/// A fully-built POST request. Cloning shares the body allocation.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Declared `Content-Type`, if any.
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// An HTTP stack able to upload requests and download resources.
///
/// Implementations must be safe for concurrent use; one instance is shared by
/// every call made through a client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a POST request and collect the full response.
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// GET a remote resource and collect the full response.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose connection pool honours the given options.
    pub fn new(options: &ConvertOptions) -> Result<Self, Swift2MdError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.timeout)
            .user_agent(&options.user_agent)
            .build()
            .map_err(|e| Swift2MdError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one shared with the rest of an application.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn collect(response: reqwest::Response) -> Result<HttpResponse, TransportError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(classify)?;
        debug!("HTTP {} ({} bytes)", status, body.len());
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await.map_err(classify)?;
        Self::collect(response).await
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;
        Self::collect(response).await
    }
}

/// Prefix of the connector error hyper-util raises when name resolution fails
/// (`ConnectError::new("dns error", ..)` in `hyper_util::client::legacy::connect`).
/// reqwest exposes no typed accessor for it.
const DNS_ERROR_MARKER: &str = "dns error";

/// Map a reqwest failure onto a [`TransportErrorKind`].
fn classify(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if let Some(kind) = io_kind(&err).or_else(|| hyper_kind(&err)) {
        kind
    } else if err.is_connect() {
        connect_kind(&err)
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.to_string()).with_source(err)
}

/// Classify by the first `io::Error` found in the source chain.
fn io_kind(err: &(dyn StdError + 'static)) -> Option<TransportErrorKind> {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<io::Error>() {
            return match io.kind() {
                io::ErrorKind::TimedOut => Some(TransportErrorKind::Timeout),
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof => Some(TransportErrorKind::ConnectionLost),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::HostUnreachable => {
                    Some(TransportErrorKind::Connect)
                }
                io::ErrorKind::NetworkUnreachable | io::ErrorKind::NetworkDown => {
                    Some(TransportErrorKind::Offline)
                }
                _ => None,
            };
        }
        source = e.source();
    }
    None
}

/// Classify by the first `hyper::Error` in the source chain.
///
/// A peer that closes the socket before any response bytes arrive surfaces as
/// "connection closed before message completed", with no `io::Error` beneath.
fn hyper_kind(err: &(dyn StdError + 'static)) -> Option<TransportErrorKind> {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(h) = e.downcast_ref::<hyper::Error>() {
            return (h.is_incomplete_message() || h.is_closed() || h.is_canceled())
                .then_some(TransportErrorKind::ConnectionLost);
        }
        source = e.source();
    }
    None
}

/// Split connect failures into DNS and everything else.
fn connect_kind(err: &(dyn StdError + 'static)) -> TransportErrorKind {
    if chain_mentions(err, DNS_ERROR_MARKER) {
        TransportErrorKind::Dns
    } else {
        TransportErrorKind::Connect
    }
}

fn chain_mentions(err: &(dyn StdError + 'static), needle: &str) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if e.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }
        current = e.source();
    }
    false
}
