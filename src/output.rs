//! Value types exchanged with callers: files going up, Markdown coming back.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One in-memory file to upload.
///
/// The filename drives format detection and is echoed back by the API in
/// [`ConversionResult::name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub bytes: Bytes,
    pub filename: String,
}

impl UploadFile {
    pub fn new(bytes: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }
}

/// One converted file returned by Workers AI.
///
/// On the wire the Markdown lives in a field called `data`; it is exposed here
/// as `markdown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// File name as reported by the API.
    pub name: String,
    /// MIME type detected by the API.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Tokens consumed by the conversion.
    pub tokens: u64,
    /// Markdown output.
    #[serde(rename = "data")]
    pub markdown: String,
}
