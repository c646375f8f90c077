//! Conversion entry points.
//!
//! [`MarkdownConverter`] is the public face of the library. Every entry point
//! funnels into [`CloudflareClient::to_markdown_with_cancel`] after doing its
//! own input work (download, file read) and validating formats up front, so a
//! bad filename never costs a network round-trip.

use crate::config::{ConvertOptions, Credentials};
use crate::error::{Result, Swift2MdError};
use crate::format::SupportedFormat;
use crate::output::{ConversionResult, UploadFile};
use crate::pipeline::client::CloudflareClient;
use crate::pipeline::input;
use bytes::Bytes;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Main entry point for converting files to Markdown using Workers AI.
///
/// Cheap to clone and safe to share across tasks.
///
/// # Example
/// ```rust,no_run
/// use swift2md::{Credentials, ConvertOptions, MarkdownConverter};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = MarkdownConverter::new(Credentials::from_env()?, ConvertOptions::default())?;
/// let result = converter.convert_file("report.pdf").await?;
/// println!("{}", result.markdown);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    client: CloudflareClient,
}

impl MarkdownConverter {
    /// Create a converter with its own HTTP connection pool.
    pub fn new(credentials: Credentials, options: ConvertOptions) -> Result<Self> {
        Ok(Self::from_client(CloudflareClient::new(credentials, &options)?))
    }

    /// Create a converter from raw credential values and a timeout.
    pub fn with_cloudflare(
        account_id: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let options = ConvertOptions::builder().timeout(timeout).build()?;
        Self::new(Credentials::new(account_id, api_token), options)
    }

    /// Wrap an already-configured client (e.g. one over a custom transport).
    pub fn from_client(client: CloudflareClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CloudflareClient {
        &self.client
    }

    /// Convert a local path or an HTTP(S) URL.
    pub async fn convert(&self, input: &str) -> Result<ConversionResult> {
        self.convert_with_cancel(input, &CancellationToken::new())
            .await
    }

    /// Like [`convert`](Self::convert), aborting when `cancel` fires.
    pub async fn convert_with_cancel(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult> {
        let start = Instant::now();
        info!("Starting conversion: {}", input);

        let result = if input::is_url(input) {
            self.convert_url_with_cancel(input, cancel).await?
        } else {
            self.convert_file_with_cancel(Path::new(input), cancel)
                .await?
        };

        info!(
            "Conversion complete: {} ({} tokens, {} chars) in {}ms",
            result.name,
            result.tokens,
            result.markdown.len(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    /// Download a remote resource and convert it.
    ///
    /// # Errors
    /// - [`Swift2MdError::Network`] if the download fails at the transport level
    /// - [`Swift2MdError::Http`] if the download answers with a non-2xx status
    /// - everything [`convert_bytes`](Self::convert_bytes) can return
    pub async fn convert_url(&self, url: &str) -> Result<ConversionResult> {
        self.convert_url_with_cancel(url, &CancellationToken::new())
            .await
    }

    pub async fn convert_url_with_cancel(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult> {
        info!("Downloading {}", url);
        let fetch = self.client.transport().fetch(url, self.client.timeout());
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Swift2MdError::Cancelled),
            r = fetch => r?,
        };

        if !response.is_success() {
            return Err(Swift2MdError::Http {
                status: response.status,
                body: response.text(),
            });
        }

        let filename = input::infer_filename(url, response.content_type.as_deref());
        debug!("Downloaded {} bytes as {}", response.body.len(), filename);
        self.convert_bytes_with_cancel(response.body, &filename, cancel)
            .await
    }

    /// Convert in-memory data, using `filename` for format detection.
    ///
    /// # Errors
    /// - [`Swift2MdError::UnsupportedFormat`] if `filename` has no supported extension
    /// - [`Swift2MdError::InvalidResponse`] if the API returned no result
    pub async fn convert_bytes(
        &self,
        data: impl Into<Bytes>,
        filename: &str,
    ) -> Result<ConversionResult> {
        self.convert_bytes_with_cancel(data, filename, &CancellationToken::new())
            .await
    }

    pub async fn convert_bytes_with_cancel(
        &self,
        data: impl Into<Bytes>,
        filename: &str,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult> {
        ensure_supported(filename)?;
        let files = [UploadFile::new(data, filename)];
        self.client
            .to_markdown_with_cancel(&files, cancel)
            .await?
            .into_iter()
            .next()
            .ok_or(Swift2MdError::InvalidResponse)
    }

    /// Read a local file and convert it.
    ///
    /// # Errors
    /// - [`Swift2MdError::FileRead`] if the file cannot be read
    /// - everything [`convert_bytes`](Self::convert_bytes) can return
    pub async fn convert_file(&self, path: impl AsRef<Path>) -> Result<ConversionResult> {
        self.convert_file_with_cancel(path.as_ref(), &CancellationToken::new())
            .await
    }

    pub async fn convert_file_with_cancel(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult> {
        let data = input::read_local(path).await?;
        self.convert_bytes_with_cancel(data, &input::file_name(path), cancel)
            .await
    }

    /// Convert several files in one API request.
    ///
    /// Every filename is validated before anything is sent; results come back
    /// in the order the API returns them.
    pub async fn convert_batch(&self, files: &[UploadFile]) -> Result<Vec<ConversionResult>> {
        self.convert_batch_with_cancel(files, &CancellationToken::new())
            .await
    }

    pub async fn convert_batch_with_cancel(
        &self,
        files: &[UploadFile],
        cancel: &CancellationToken,
    ) -> Result<Vec<ConversionResult>> {
        for file in files {
            ensure_supported(&file.filename)?;
        }
        self.client.to_markdown_with_cancel(files, cancel).await
    }

    /// Convert a path or URL and write the Markdown to `output_path`.
    pub async fn convert_to_file(
        &self,
        input: &str,
        output_path: impl AsRef<Path>,
    ) -> Result<ConversionResult> {
        let result = self.convert(input).await?;
        save_markdown(output_path.as_ref(), &result.markdown).await?;
        Ok(result)
    }
}

/// Write Markdown to `path`, creating parent directories.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn save_markdown(path: &Path, markdown: &str) -> Result<()> {
    let write_err = |source| Swift2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {} chars to {}", markdown.len(), path.display());
    Ok(())
}

fn ensure_supported(filename: &str) -> Result<SupportedFormat> {
    SupportedFormat::from_filename(filename)
        .ok_or_else(|| Swift2MdError::UnsupportedFormat(filename.to_string()))
}
