//! `multipart/form-data` encoding for the upload request.
//!
//! The body is framed by hand rather than through reqwest's streaming form
//! because the retry loop must resend the exact same bytes: a streamed form
//! is consumed on first send and would regenerate its boundary on rebuild.
//! [`MultipartForm::finish`] yields an immutable [`Bytes`] that every attempt
//! shares.

use bytes::{BufMut, Bytes, BytesMut};
use std::borrow::Cow;
use uuid::Uuid;

/// Builder for a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: BytesMut,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// Start a form with a fresh random boundary.
    pub fn new() -> Self {
        Self::with_boundary(format!("Boundary-{}", Uuid::new_v4().simple()))
    }

    /// Start a form with a caller-chosen boundary.
    ///
    /// The boundary must not occur inside any part's content.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: BytesMut::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value of the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Append one file part. Parts appear in the body in call order.
    ///
    /// `"`, CR and LF in `field_name` and `filename` are percent-escaped the
    /// way browsers encode form submissions, so caller-supplied names cannot
    /// break the part headers.
    pub fn add_file(&mut self, data: &[u8], field_name: &str, filename: &str, mime_type: &str) {
        let field_name = escape_quoted(field_name);
        let filename = escape_quoted(filename);
        self.body.reserve(data.len() + 128);
        self.body.put_slice(b"--");
        self.body.put_slice(self.boundary.as_bytes());
        self.body.put_slice(b"\r\n");
        self.body.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        self.body
            .put_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
        self.body.put_slice(data);
        self.body.put_slice(b"\r\n");
    }

    /// Append the closing delimiter and freeze the body.
    pub fn finish(mut self) -> Bytes {
        self.body.put_slice(b"--");
        self.body.put_slice(self.boundary.as_bytes());
        self.body.put_slice(b"--\r\n");
        self.body.freeze()
    }
}

fn escape_quoted(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', '\r', '\n']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace('"', "%22")
            .replace('\r', "%0D")
            .replace('\n', "%0A"),
    )
}
