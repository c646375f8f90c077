//! Error types for the swift2md library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`Swift2MdError`] (fatal): every public entry point returns this.
//!   Each variant carries the payload its handling site needs (an HTTP status
//!   and body, the API's message list, the offending filename), so callers
//!   match on it exhaustively instead of parsing strings.
//!
//! * [`TransportError`] (transport-level): what the HTTP layer reports
//!   when no response came back at all. Its [`TransportErrorKind`] is what the
//!   retry loop inspects to decide whether a fault is transient. Once the
//!   retry budget is spent it surfaces wrapped in [`Swift2MdError::Network`].

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Swift2MdError> = std::result::Result<T, E>;

/// All fatal errors returned by the swift2md library.
#[derive(Debug, Error)]
pub enum Swift2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The filename extension or MIME type is not accepted by `toMarkdown`.
    ///
    /// Raised before any network call is made.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A local file could not be read.
    #[error("File read error: {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// The transport failed and the fault was either permanent or the retry
    /// budget was exhausted.
    #[error("Network error: {source}")]
    Network {
        #[source]
        source: TransportError,
    },

    /// The server answered with a non-2xx status that was not retried, or
    /// kept answering with a retryable one until the budget ran out.
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// Workers AI answered with a well-formed envelope carrying `success: false`.
    #[error("{}", describe_api_error(.messages))]
    Api { messages: Vec<String> },

    /// The body could not be decoded into the expected envelope, or a
    /// single-file conversion produced no result.
    #[error("Invalid response from Workers AI API.")]
    InvalidResponse,

    /// The Markdown could not be written to the requested output path.
    #[error("Failed to write output {path:?}: {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caller's cancellation token fired while a request or a backoff
    /// sleep was pending.
    #[error("Conversion cancelled")]
    Cancelled,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation or HTTP client construction failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn describe_api_error(messages: &[String]) -> String {
    if messages.is_empty() {
        "Workers AI API returned an error.".to_string()
    } else {
        format!("Workers AI API error: {}", messages.join("; "))
    }
}

impl Swift2MdError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Swift2MdError::Http { status, .. } => Some(*status),
            Swift2MdError::UnsupportedFormat(_)
            | Swift2MdError::FileRead { .. }
            | Swift2MdError::Network { .. }
            | Swift2MdError::Api { .. }
            | Swift2MdError::InvalidResponse
            | Swift2MdError::OutputWriteFailed { .. }
            | Swift2MdError::Cancelled
            | Swift2MdError::InvalidConfig(_) => None,
        }
    }
}

impl From<TransportError> for Swift2MdError {
    fn from(source: TransportError) -> Self {
        match source.kind() {
            TransportErrorKind::Cancelled => Swift2MdError::Cancelled,
            TransportErrorKind::Timeout
            | TransportErrorKind::Connect
            | TransportErrorKind::Dns
            | TransportErrorKind::ConnectionLost
            | TransportErrorKind::Offline
            | TransportErrorKind::Other => Swift2MdError::Network { source },
        }
    }
}

// ── Transport errors ─────────────────────────────────────────────────────

/// Classification of a failed HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request or connect timeout elapsed.
    Timeout,
    /// The host refused or could not be reached.
    Connect,
    /// Name resolution failed.
    Dns,
    /// The connection dropped mid-exchange (reset, aborted, EOF).
    ConnectionLost,
    /// No network route is available.
    Offline,
    /// The exchange was aborted on the caller's behalf.
    Cancelled,
    /// Anything else: TLS failures, malformed URLs, body decoding, …
    Other,
}

impl TransportErrorKind {
    /// Whether a fault of this kind is worth retrying.
    pub fn is_transient(self) -> bool {
        match self {
            TransportErrorKind::Timeout
            | TransportErrorKind::Connect
            | TransportErrorKind::Dns
            | TransportErrorKind::ConnectionLost
            | TransportErrorKind::Offline => true,
            TransportErrorKind::Cancelled | TransportErrorKind::Other => false,
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Timeout => "timed out",
            TransportErrorKind::Connect => "connection failed",
            TransportErrorKind::Dns => "DNS lookup failed",
            TransportErrorKind::ConnectionLost => "connection lost",
            TransportErrorKind::Offline => "network unreachable",
            TransportErrorKind::Cancelled => "cancelled",
            TransportErrorKind::Other => "transport error",
        };
        f.write_str(s)
    }
}

/// A failed HTTP exchange: no status code was received.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_joins_messages() {
        let e = Swift2MdError::Api {
            messages: vec!["invalid token".into(), "try again".into()],
        };
        assert_eq!(e.to_string(), "Workers AI API error: invalid token; try again");
    }

    #[test]
    fn api_error_without_messages_falls_back() {
        let e = Swift2MdError::Api { messages: vec![] };
        assert_eq!(e.to_string(), "Workers AI API returned an error.");
    }

    #[test]
    fn http_error_display() {
        let e = Swift2MdError::Http {
            status: 403,
            body: "forbidden".into(),
        };
        assert_eq!(e.to_string(), "HTTP error 403: forbidden");
        assert_eq!(e.status(), Some(403));
    }

    #[test]
    fn network_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline");
        let t = TransportError::new(TransportErrorKind::Timeout, "request timed out").with_source(io);
        let e = Swift2MdError::from(t);
        assert!(e.to_string().starts_with("Network error: timed out"));
        let source = std::error::Error::source(&e).expect("transport error is the source");
        assert!(std::error::Error::source(source).is_some());
    }

    #[test]
    fn cancelled_transport_maps_to_cancelled() {
        let t = TransportError::new(TransportErrorKind::Cancelled, "aborted");
        assert!(matches!(Swift2MdError::from(t), Swift2MdError::Cancelled));
    }

    #[test]
    fn transient_allowlist() {
        assert!(TransportErrorKind::Timeout.is_transient());
        assert!(TransportErrorKind::Dns.is_transient());
        assert!(TransportErrorKind::ConnectionLost.is_transient());
        assert!(TransportErrorKind::Offline.is_transient());
        assert!(TransportErrorKind::Connect.is_transient());
        assert!(!TransportErrorKind::Cancelled.is_transient());
        assert!(!TransportErrorKind::Other.is_transient());
    }
}
