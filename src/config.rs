//! Credentials and runtime options for Workers AI conversion.
//!
//! Both types are immutable once built and live as long as the client that
//! owns them. Every conversion knob lives in [`ConvertOptions`], built via its
//! [`ConvertOptionsBuilder`], so callers set only what they care about and
//! rely on documented defaults for the rest.

use crate::error::Swift2MdError;
use std::fmt;
use std::time::Duration;

/// Environment variable holding the Cloudflare account identifier.
pub const ACCOUNT_ID_ENV: &str = "CLOUDFLARE_ACCOUNT_ID";

/// Environment variable holding the Workers AI API token.
pub const API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";

/// Production API root; the account-scoped path is appended to it.
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Upper bound applied to [`ConvertOptions::max_retry_count`].
pub const MAX_RETRY_COUNT: u32 = 10;

/// Cloudflare account credentials required for Workers AI requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account identifier used in the endpoint path.
    pub account_id: String,
    /// API token with permission to call Workers AI.
    pub api_token: String,
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
        }
    }

    /// Read credentials from `CLOUDFLARE_ACCOUNT_ID` / `CLOUDFLARE_API_TOKEN`.
    ///
    /// Values are trimmed; an empty value counts as missing.
    pub fn from_env() -> Result<Self, Swift2MdError> {
        let account_id = non_empty_env(ACCOUNT_ID_ENV).ok_or_else(|| {
            Swift2MdError::InvalidConfig(format!("{ACCOUNT_ID_ENV} is not set"))
        })?;
        let api_token = non_empty_env(API_TOKEN_ENV).ok_or_else(|| {
            Swift2MdError::InvalidConfig(format!("{API_TOKEN_ENV} is not set"))
        })?;
        Ok(Self::new(account_id, api_token))
    }

    /// Value of the `Authorization` header.
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.api_token)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Runtime options for a converter.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use swift2md::ConvertOptions;
///
/// let options = ConvertOptions::builder()
///     .timeout(Duration::from_secs(30))
///     .max_retry_count(3)
///     .retry_base_delay(Duration::from_millis(250))
///     .build()
///     .unwrap();
/// assert_eq!(options.max_retry_count, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Timeout applied to every API request and resource download. Default: 60 s.
    pub timeout: Duration,

    /// Retries allowed after the first attempt on a transient failure. Default: 2.
    ///
    /// Only rate limiting (429), server errors (5xx) and transient transport
    /// faults consume this budget. Clamped to [`MAX_RETRY_COUNT`].
    pub max_retry_count: u32,

    /// Base delay of the exponential backoff. Default: 500 ms.
    ///
    /// Retry `n` (0-indexed) waits `retry_base_delay * 2^n`. Zero disables the
    /// wait entirely.
    pub retry_base_delay: Duration,

    /// API root URL. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retry_count: 2,
            retry_base_delay: Duration::from_millis(500),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: concat!("swift2md/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ConvertOptions {
    /// Create a new builder for `ConvertOptions`.
    pub fn builder() -> ConvertOptionsBuilder {
        ConvertOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`ConvertOptions`].
#[derive(Debug)]
pub struct ConvertOptionsBuilder {
    options: ConvertOptions,
}

impl ConvertOptionsBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn max_retry_count(mut self, n: u32) -> Self {
        self.options.max_retry_count = n.min(MAX_RETRY_COUNT);
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.options.retry_base_delay = delay;
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.options.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.options.user_agent = ua.into();
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<ConvertOptions, Swift2MdError> {
        let o = &self.options;
        if o.timeout.is_zero() {
            return Err(Swift2MdError::InvalidConfig(
                "Timeout must be greater than zero".into(),
            ));
        }
        if o.api_base_url.is_empty() {
            return Err(Swift2MdError::InvalidConfig(
                "API base URL must not be empty".into(),
            ));
        }
        Ok(self.options)
    }
}
