//! Input resolution: read local files and name downloaded resources.
//!
//! Workers AI detects formats from the uploaded filename, so every input must
//! end up with a name carrying a supported extension. Local files already
//! have one; downloads are named from the URL path when it looks right, else
//! from the response's `Content-Type`.

use crate::error::Swift2MdError;
use crate::format::SupportedFormat;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use std::path::Path;
use tracing::debug;

/// Check if the input string looks like an HTTP(S) URL.
pub fn is_url(input: &str) -> bool {
    let lower = input.get(..8).unwrap_or(input).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Last non-empty path segment of a URL, percent-decoded, or `""` when there
/// is none.
pub fn url_file_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        })
        .unwrap_or_default()
}

/// Pick the upload filename for a downloaded resource.
///
/// 1. the URL's last segment, if its extension is supported;
/// 2. `downloaded.{ext}` from the declared content type, if recognised;
/// 3. the URL's last segment as-is, left for format validation to reject.
pub fn infer_filename(url: &str, content_type: Option<&str>) -> String {
    let candidate = url_file_name(url);
    if SupportedFormat::from_filename(&candidate).is_some() {
        return candidate;
    }

    if let Some(format) = content_type.and_then(SupportedFormat::from_mime_type) {
        let name = format!("downloaded.{}", format.file_extension());
        debug!("Named {} as {} from content type", url, name);
        return name;
    }

    candidate
}

/// Base name of a path, as used for format detection.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read a local file into memory.
pub async fn read_local(path: &Path) -> Result<Bytes, Swift2MdError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|source| Swift2MdError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Read {} bytes from {}", data.len(), path.display());
    Ok(Bytes::from(data))
}
