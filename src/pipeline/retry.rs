//! Retry policy: which outcomes are retried and how long to wait.
//!
//! Only symptoms of transient unavailability consume the retry budget:
//! rate limiting (429), server errors (5xx) and the transient transport
//! faults listed by [`TransportErrorKind::is_transient`]. Client errors,
//! malformed bodies and `success: false` envelopes fail immediately since
//! resending them cannot change the answer.
//!
//! Backoff is `base_delay * 2^attempt` with `attempt` starting at 0, so the
//! first retry waits exactly one base delay: 500 ms → 1 s → 2 s with defaults.

use crate::config::ConvertOptions;
use crate::error::{Swift2MdError, TransportError};
use crate::output::ConversionResult;
use crate::pipeline::envelope::ApiEnvelope;
use crate::pipeline::transport::HttpResponse;
use std::time::Duration;

/// Longest single backoff sleep; larger computed delays are clamped to it.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60 * 60);

/// Retry budget and backoff schedule for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry_count: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retry_count: u32, base_delay: Duration) -> Self {
        Self {
            max_retry_count,
            base_delay,
        }
    }

    pub fn from_options(options: &ConvertOptions) -> Self {
        Self::new(options.max_retry_count, options.retry_base_delay)
    }

    /// Whether another attempt is allowed after `attempt` (0-indexed) failed.
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retry_count
    }

    /// Delay before the retry that follows `attempt`; saturates at [`MAX_BACKOFF`].
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_options(&ConvertOptions::default())
    }
}

/// Whether an HTTP status signals transient unavailability.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

/// What the client should do after one attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Terminal success.
    Success(Vec<ConversionResult>),
    /// Eligible for a retry if budget remains; otherwise the carried error is final.
    Retryable(Swift2MdError),
    /// Terminal failure regardless of remaining budget.
    Fatal(Swift2MdError),
}

/// Classify a completed HTTP exchange.
pub fn classify_response(response: &HttpResponse) -> AttemptOutcome {
    if response.is_success() {
        return match ApiEnvelope::decode(&response.body).and_then(ApiEnvelope::into_result) {
            Ok(results) => AttemptOutcome::Success(results),
            Err(e) => AttemptOutcome::Fatal(e),
        };
    }

    let error = Swift2MdError::Http {
        status: response.status,
        body: response.text(),
    };
    if is_retryable_status(response.status) {
        AttemptOutcome::Retryable(error)
    } else {
        AttemptOutcome::Fatal(error)
    }
}

/// Classify a failed exchange.
pub fn classify_transport_error(error: TransportError) -> AttemptOutcome {
    if error.is_transient() {
        AttemptOutcome::Retryable(error.into())
    } else {
        AttemptOutcome::Fatal(error.into())
    }
}
