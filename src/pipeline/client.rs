//! Workers AI `toMarkdown` client with bounded automatic retry.
//!
//! ## Request lifecycle
//!
//! ```text
//! validate ──▶ encode ──▶ Attempting ──▶ Success
//!                             │  ▲
//!                  retryable  │  │ backoff elapsed
//!                             ▼  │
//!                           RetryWait ──▶ FatalFailure
//! ```
//!
//! Every file is validated before anything is encoded, so an unsupported
//! format never costs a network round-trip or a retry. The multipart body is
//! built once per call and the same [`HttpRequest`] is resent on each attempt.
//! Attempts are strictly sequential; concurrent calls share nothing but the
//! transport.

use crate::config::{ConvertOptions, Credentials};
use crate::error::{Result, Swift2MdError};
use crate::format::SupportedFormat;
use crate::output::{ConversionResult, UploadFile};
use crate::pipeline::multipart::MultipartForm;
use crate::pipeline::retry::{classify_response, classify_transport_error, AttemptOutcome, RetryPolicy};
use crate::pipeline::transport::{HttpRequest, ReqwestTransport, Transport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Multipart field name expected by the endpoint.
const FILES_FIELD: &str = "files";

/// Client for the account-scoped `ai/tomarkdown` endpoint.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct CloudflareClient {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    policy: RetryPolicy,
    api_base_url: String,
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("credentials", &self.credentials)
            .field("transport", &"<dyn Transport>")
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl CloudflareClient {
    /// Build a client over a fresh [`ReqwestTransport`].
    pub fn new(credentials: Credentials, options: &ConvertOptions) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(options)?);
        Ok(Self::with_transport(credentials, options, transport))
    }

    /// Build a client over a caller-supplied transport.
    pub fn with_transport(
        credentials: Credentials,
        options: &ConvertOptions,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            credentials,
            transport,
            timeout: options.timeout,
            policy: RetryPolicy::from_options(options),
            api_base_url: options.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The transport shared by every call; the converter reuses it for downloads.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Full URL of the conversion endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/accounts/{}/ai/tomarkdown",
            self.api_base_url, self.credentials.account_id
        )
    }

    /// Convert a batch of files in one API request.
    ///
    /// An empty batch returns immediately without touching the network.
    ///
    /// # Errors
    /// - [`Swift2MdError::UnsupportedFormat`] before any request is sent
    /// - [`Swift2MdError::Http`] / [`Swift2MdError::Network`] once retries are exhausted
    ///   or the failure is not retryable
    /// - [`Swift2MdError::Api`] / [`Swift2MdError::InvalidResponse`] on a 2xx
    ///   that does not carry results
    pub async fn to_markdown(&self, files: &[UploadFile]) -> Result<Vec<ConversionResult>> {
        self.to_markdown_with_cancel(files, &CancellationToken::new())
            .await
    }

    /// Like [`to_markdown`](Self::to_markdown), aborting with
    /// [`Swift2MdError::Cancelled`] as soon as `cancel` fires.
    pub async fn to_markdown_with_cancel(
        &self,
        files: &[UploadFile],
        cancel: &CancellationToken,
    ) -> Result<Vec<ConversionResult>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.build_request(files)?;
        info!(
            "Uploading {} file(s), {} bytes, to Workers AI",
            files.len(),
            request.body.len()
        );
        self.execute_with_retry(&request, cancel).await
    }

    /// Validate every file and encode them into one request.
    fn build_request(&self, files: &[UploadFile]) -> Result<HttpRequest> {
        let formats = files
            .iter()
            .map(|f| {
                SupportedFormat::from_filename(&f.filename)
                    .ok_or_else(|| Swift2MdError::UnsupportedFormat(f.filename.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut form = MultipartForm::new();
        for (file, format) in files.iter().zip(formats) {
            form.add_file(&file.bytes, FILES_FIELD, &file.filename, format.mime_type());
        }
        let content_type = form.content_type();

        Ok(HttpRequest {
            url: self.endpoint(),
            headers: vec![
                ("Authorization".to_string(), self.credentials.bearer()),
                ("Content-Type".to_string(), content_type),
            ],
            body: form.finish(),
            timeout: self.timeout,
        })
    }

    /// Run the attempt/backoff loop for one logical request.
    async fn execute_with_retry(
        &self,
        request: &HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConversionResult>> {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let exchange = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Swift2MdError::Cancelled),
                r = self.transport.execute(request) => r,
            };

            let outcome = match exchange {
                Ok(response) => {
                    debug!("Attempt {}: HTTP {}", attempt + 1, response.status);
                    classify_response(&response)
                }
                Err(e) => {
                    debug!("Attempt {}: transport error: {}", attempt + 1, e);
                    classify_transport_error(e)
                }
            };

            let error = match outcome {
                AttemptOutcome::Success(results) => {
                    info!(
                        "Converted {} file(s) in {}ms after {} attempt(s)",
                        results.len(),
                        start.elapsed().as_millis(),
                        attempt + 1
                    );
                    return Ok(results);
                }
                AttemptOutcome::Fatal(e) => return Err(e),
                AttemptOutcome::Retryable(e) if !self.policy.can_retry(attempt) => return Err(e),
                AttemptOutcome::Retryable(e) => e,
            };

            let delay = self.policy.backoff(attempt);
            warn!(
                "Attempt {}/{} failed ({}), retrying in {}ms",
                attempt + 1,
                self.policy.max_retry_count + 1,
                error,
                delay.as_millis()
            );
            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Swift2MdError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TransportError, TransportErrorKind};
    use crate::pipeline::transport::HttpResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    type Reply = std::result::Result<HttpResponse, TransportError>;

    /// Transport that replays a fixed script and records every request.
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Reply>>,
        fallback: Option<fn(&HttpRequest) -> Reply>,
        calls: AtomicUsize,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                fallback: None,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn always(reply: fn(&HttpRequest) -> Reply) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(VecDeque::new()),
                fallback: Some(reply),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: &HttpRequest) -> Reply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            let next = self.replies.lock().unwrap().pop_front();
            match (next, self.fallback) {
                (Some(reply), _) => reply,
                (None, Some(make)) => make(request),
                (None, None) => panic!("transport script exhausted"),
            }
        }

        async fn fetch(&self, _url: &str, _timeout: Duration) -> Reply {
            panic!("fetch not scripted");
        }
    }

    /// Transport that fails the test if it is ever invoked.
    struct UnreachableTransport;

    #[async_trait]
    impl Transport for UnreachableTransport {
        async fn execute(&self, _request: &HttpRequest) -> Reply {
            panic!("network must not be touched");
        }

        async fn fetch(&self, _url: &str, _timeout: Duration) -> Reply {
            panic!("network must not be touched");
        }
    }

    /// Transport that never answers.
    struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn execute(&self, _request: &HttpRequest) -> Reply {
            std::future::pending().await
        }

        async fn fetch(&self, _url: &str, _timeout: Duration) -> Reply {
            std::future::pending().await
        }
    }

    fn reply(status: u16, body: &str) -> Reply {
        Ok(HttpResponse {
            status,
            content_type: Some("application/json".into()),
            body: Bytes::from(body.to_string()),
        })
    }

    fn success(markdown: &str) -> Reply {
        reply(
            200,
            &format!(
                r#"{{"result":[{{"name":"file.pdf","mimeType":"application/pdf","tokens":2,"data":"{markdown}"}}],"success":true,"errors":[],"messages":[]}}"#
            ),
        )
    }

    /// Answer with a result named after the uploaded file.
    fn echo_filename(request: &HttpRequest) -> Reply {
        let body = String::from_utf8_lossy(&request.body);
        let name = body
            .split("filename=\"")
            .nth(1)
            .and_then(|s| s.split('"').next())
            .unwrap_or_default();
        let json = serde_json::json!({
            "result": [{"name": name, "mimeType": "application/pdf", "tokens": 1, "data": format!("# {name}")}],
            "success": true
        });
        reply(200, &json.to_string())
    }

    fn client(transport: Arc<dyn Transport>, max_retry_count: u32) -> CloudflareClient {
        let options = ConvertOptions::builder()
            .timeout(Duration::from_secs(10))
            .max_retry_count(max_retry_count)
            .retry_base_delay(Duration::from_millis(1))
            .build()
            .unwrap();
        CloudflareClient::with_transport(Credentials::new("acc", "token"), &options, transport)
    }

    fn pdf(name: &str) -> Vec<UploadFile> {
        vec![UploadFile::new(vec![0x01u8], name)]
    }

    #[tokio::test]
    async fn success_decodes_data_as_markdown() {
        let transport = ScriptedTransport::new(vec![success("# Markdown")]);
        let c = client(transport.clone(), 2);

        let results = assert_ok!(c.to_markdown(&pdf("file.pdf")).await);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].markdown, "# Markdown");

        let seen = transport.seen.lock().unwrap();
        let req = &seen[0];
        assert_eq!(
            req.url,
            "https://api.cloudflare.com/client/v4/accounts/acc/ai/tomarkdown"
        );
        assert_eq!(req.header("authorization"), Some("Bearer token"));
        let content_type = req.header("content-type").unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        let boundary = content_type.rsplit('=').next().unwrap();
        assert!(req.body.ends_with(format!("--{boundary}--\r\n").as_bytes()));
    }

    #[tokio::test]
    async fn empty_batch_skips_network() {
        let c = client(Arc::new(UnreachableTransport), 2);
        let results = assert_ok!(c.to_markdown(&[]).await);
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn unsupported_format_fails_before_network() {
        let c = client(Arc::new(UnreachableTransport), 2);
        let files = vec![
            UploadFile::new(vec![1u8], "ok.pdf"),
            UploadFile::new(vec![2u8], "notes.txt"),
        ];
        match c.to_markdown(&files).await {
            Err(Swift2MdError::UnsupportedFormat(name)) => assert_eq!(name, "notes.txt"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn retries_429_then_succeeds() {
        let transport = ScriptedTransport::new(vec![reply(429, "rate limited"), success("# Retry Success")]);
        let c = client(transport.clone(), 2);

        let results = assert_ok!(c.to_markdown(&pdf("file.pdf")).await);
        assert_eq!(results[0].markdown, "# Retry Success");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn retry_reuses_identical_request() {
        let transport = ScriptedTransport::new(vec![reply(500, "boom"), reply(502, "boom"), success("ok")]);
        let c = client(transport.clone(), 2);

        assert_ok!(c.to_markdown(&pdf("file.pdf")).await);
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        for req in seen.iter().skip(1) {
            assert_eq!(req.body, seen[0].body);
            assert_eq!(req.headers, seen[0].headers);
        }
    }

    #[tokio::test]
    async fn retries_timeout_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::new(TransportErrorKind::Timeout, "request timed out")),
            success("# Retry Success"),
        ]);
        let c = client(transport.clone(), 2);

        let results = assert_ok!(c.to_markdown(&pdf("file.pdf")).await);
        assert_eq!(results[0].markdown, "# Retry Success");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn respects_retry_limit() {
        let transport = ScriptedTransport::always(|_| reply(503, "service unavailable"));
        let c = client(transport.clone(), 1);

        match c.to_markdown(&pdf("file.pdf")).await {
            Err(Swift2MdError::Http { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "service unavailable");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn zero_budget_means_single_attempt() {
        let transport = ScriptedTransport::always(|_| reply(429, "slow down"));
        let c = client(transport.clone(), 0);

        assert_err!(c.to_markdown(&pdf("file.pdf")).await);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn transport_faults_exhaust_into_network_error() {
        let transport = ScriptedTransport::always(|_| {
            Err(TransportError::new(TransportErrorKind::ConnectionLost, "reset by peer"))
        });
        let c = client(transport.clone(), 2);

        match c.to_markdown(&pdf("file.pdf")).await {
            Err(Swift2MdError::Network { source }) => {
                assert_eq!(source.kind(), TransportErrorKind::ConnectionLost)
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn permanent_transport_fault_is_not_retried() {
        let transport = ScriptedTransport::always(|_| {
            Err(TransportError::new(TransportErrorKind::Other, "invalid certificate"))
        });
        let c = client(transport.clone(), 2);

        assert!(matches!(
            c.to_markdown(&pdf("file.pdf")).await,
            Err(Swift2MdError::Network { .. })
        ));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn forbidden_is_not_retried() {
        let transport = ScriptedTransport::always(|_| reply(403, "forbidden"));
        let c = client(transport.clone(), 2);

        match c.to_markdown(&pdf("file.pdf")).await {
            Err(Swift2MdError::Http { status, body }) => {
                assert_eq!(status, 403);
                assert!(body.contains("forbidden"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn success_false_is_api_error_without_retry() {
        let transport = ScriptedTransport::always(|_| {
            reply(
                200,
                r#"{"result":[],"success":false,"errors":[{"message":"invalid token"}],"messages":[]}"#,
            )
        });
        let c = client(transport.clone(), 2);

        match c.to_markdown(&pdf("file.pdf")).await {
            Err(Swift2MdError::Api { messages }) => assert_eq!(messages, vec!["invalid token"]),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_success_body_is_invalid_response() {
        let transport = ScriptedTransport::always(|_| reply(200, "<html>"));
        let c = client(transport.clone(), 2);

        assert!(matches!(
            c.to_markdown(&pdf("file.pdf")).await,
            Err(Swift2MdError::InvalidResponse)
        ));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn supports_concurrent_requests() {
        let transport = ScriptedTransport::always(echo_filename);
        let c = client(transport.clone(), 2);

        let tasks = (0..12).map(|i| {
            let c = c.clone();
            tokio::spawn(async move { c.to_markdown(&pdf(&format!("file{i}.pdf"))).await })
        });
        let results = futures::future::join_all(tasks).await;

        assert_eq!(results.len(), 12);
        for (i, r) in results.into_iter().enumerate() {
            let converted = r.unwrap().unwrap();
            assert_eq!(converted.len(), 1);
            assert_eq!(converted[0].name, format!("file{i}.pdf"));
            assert_eq!(converted[0].markdown, format!("# file{i}.pdf"));
        }
        assert_eq!(transport.calls(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_exponentially() {
        let transport = ScriptedTransport::new(vec![
            reply(503, "a"),
            reply(503, "b"),
            success("done"),
        ]);
        let options = ConvertOptions::builder()
            .max_retry_count(2)
            .retry_base_delay(Duration::from_secs(1))
            .build()
            .unwrap();
        let c = CloudflareClient::with_transport(Credentials::new("acc", "token"), &options, transport.clone());

        let start = tokio::time::Instant::now();
        assert_ok!(c.to_markdown(&pdf("file.pdf")).await);
        // 1s after the first failure, 2s after the second.
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(3), "waited {waited:?}");
        assert!(waited < Duration::from_secs(4), "waited {waited:?}");
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_aborts() {
        let transport = ScriptedTransport::always(|_| reply(503, "unavailable"));
        let options = ConvertOptions::builder()
            .max_retry_count(5)
            .retry_base_delay(Duration::from_secs(30))
            .build()
            .unwrap();
        let c = CloudflareClient::with_transport(Credentials::new("acc", "token"), &options, transport.clone());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let result = c.to_markdown_with_cancel(&pdf("file.pdf"), &cancel).await;
        assert!(matches!(result, Err(Swift2MdError::Cancelled)));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn cancellation_aborts_pending_exchange() {
        let c = client(Arc::new(HangingTransport), 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = c.to_markdown_with_cancel(&pdf("file.pdf"), &cancel).await;
        assert!(matches!(result, Err(Swift2MdError::Cancelled)));
    }

    #[test]
    fn endpoint_uses_base_url_and_account() {
        let options = ConvertOptions::builder()
            .api_base_url("http://localhost:8080/client/v4/")
            .build()
            .unwrap();
        let c = CloudflareClient::with_transport(
            Credentials::new("abc123", "t"),
            &options,
            Arc::new(UnreachableTransport),
        );
        assert_eq!(c.endpoint(), "http://localhost:8080/client/v4/accounts/abc123/ai/tomarkdown");
    }
}
