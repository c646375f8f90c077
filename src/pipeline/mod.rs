//! Pipeline stages for file-to-Markdown conversion.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ multipart ──▶ client ──▶ transport ──▶ envelope
//! (path/URL)  (encode)    (retry)    (HTTP)        (decode)
//! ```
//!
//! 1. [`input`]:     read local files and name downloaded resources
//! 2. [`multipart`]: frame the files into one `multipart/form-data` body
//! 3. [`client`]:    drive the upload with retry/backoff; owns the attempt loop
//! 4. [`retry`]:     decide which outcomes are retried and how long to wait
//! 5. [`transport`]: the only stage with network I/O, injectable for tests
//! 6. [`envelope`]:  decode the JSON response into results or an API error

pub mod client;
pub(crate) mod envelope;
pub mod input;
pub mod multipart;
pub mod retry;
pub mod transport;
