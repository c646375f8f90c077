//! # swift2md
//!
//! Convert documents, spreadsheets and images to Markdown with the Cloudflare
//! Workers AI `toMarkdown` endpoint.
//!
//! ## Why this crate?
//!
//! `toMarkdown` handles seventeen formats (PDF, Office and OpenDocument files,
//! HTML, XML, CSV, Numbers and common image types) behind one multipart
//! upload. This crate wraps it with format validation before upload, retry
//! with exponential backoff for transient failures, cancellation, and typed
//! errors that keep the HTTP status and API messages around.
//!
//! ## Pipeline Overview
//!
//! ```text
//! path / URL / bytes
//!  │
//!  ├─ 1. Input      read the file or download the URL, pick an upload name
//!  ├─ 2. Validate   filename extension → SupportedFormat (fails fast)
//!  ├─ 3. Encode     one multipart/form-data body, reused on every attempt
//!  ├─ 4. Upload     POST with bounded retry on 429 / 5xx / transient faults
//!  └─ 5. Decode     {result, success, errors, messages} → ConversionResult
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swift2md::{ConvertOptions, Credentials, MarkdownConverter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads CLOUDFLARE_ACCOUNT_ID / CLOUDFLARE_API_TOKEN
//!     let converter = MarkdownConverter::new(Credentials::from_env()?, ConvertOptions::default())?;
//!     let result = converter.convert_url("https://example.com/report.pdf").await?;
//!     println!("{}", result.markdown);
//!     eprintln!("{} tokens", result.tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `swift2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! swift2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConvertOptions, ConvertOptionsBuilder, Credentials};
pub use convert::MarkdownConverter;
pub use error::{Result, Swift2MdError, TransportError, TransportErrorKind};
pub use format::SupportedFormat;
pub use output::{ConversionResult, UploadFile};
pub use pipeline::client::CloudflareClient;
pub use pipeline::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use tokio_util::sync::CancellationToken;
