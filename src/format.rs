//! File formats accepted by the Workers AI `toMarkdown` endpoint.
//!
//! Two independent lookups exist because callers often hold only one signal:
//! a local file has a name but no declared type, while a downloaded resource
//! may have a `Content-Type` header but an opaque URL path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// File formats supported by Workers AI `toMarkdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedFormat {
    Pdf,
    Jpeg,
    Png,
    Webp,
    Svg,
    Html,
    Xml,
    Csv,
    Docx,
    Xlsx,
    Xlsm,
    Xlsb,
    Xls,
    Et,
    Ods,
    Odt,
    Numbers,
}

impl SupportedFormat {
    /// Every supported format, in declaration order.
    pub const ALL: [SupportedFormat; 17] = [
        SupportedFormat::Pdf,
        SupportedFormat::Jpeg,
        SupportedFormat::Png,
        SupportedFormat::Webp,
        SupportedFormat::Svg,
        SupportedFormat::Html,
        SupportedFormat::Xml,
        SupportedFormat::Csv,
        SupportedFormat::Docx,
        SupportedFormat::Xlsx,
        SupportedFormat::Xlsm,
        SupportedFormat::Xlsb,
        SupportedFormat::Xls,
        SupportedFormat::Et,
        SupportedFormat::Ods,
        SupportedFormat::Odt,
        SupportedFormat::Numbers,
    ];

    /// MIME type used when uploading this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            SupportedFormat::Pdf => "application/pdf",
            SupportedFormat::Jpeg => "image/jpeg",
            SupportedFormat::Png => "image/png",
            SupportedFormat::Webp => "image/webp",
            SupportedFormat::Svg => "image/svg+xml",
            SupportedFormat::Html => "text/html",
            SupportedFormat::Xml => "application/xml",
            SupportedFormat::Csv => "text/csv",
            SupportedFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            SupportedFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            SupportedFormat::Xlsm => "application/vnd.ms-excel.sheet.macroEnabled.12",
            SupportedFormat::Xlsb => "application/vnd.ms-excel.sheet.binary.macroEnabled.12",
            // WPS spreadsheets upload under the generic Excel type.
            SupportedFormat::Xls | SupportedFormat::Et => "application/vnd.ms-excel",
            SupportedFormat::Ods => "application/vnd.oasis.opendocument.spreadsheet",
            SupportedFormat::Odt => "application/vnd.oasis.opendocument.text",
            SupportedFormat::Numbers => "application/vnd.apple.numbers",
        }
    }

    /// Canonical file extension (without the dot).
    pub fn file_extension(self) -> &'static str {
        match self {
            SupportedFormat::Pdf => "pdf",
            SupportedFormat::Jpeg => "jpeg",
            SupportedFormat::Png => "png",
            SupportedFormat::Webp => "webp",
            SupportedFormat::Svg => "svg",
            SupportedFormat::Html => "html",
            SupportedFormat::Xml => "xml",
            SupportedFormat::Csv => "csv",
            SupportedFormat::Docx => "docx",
            SupportedFormat::Xlsx => "xlsx",
            SupportedFormat::Xlsm => "xlsm",
            SupportedFormat::Xlsb => "xlsb",
            SupportedFormat::Xls => "xls",
            SupportedFormat::Et => "et",
            SupportedFormat::Ods => "ods",
            SupportedFormat::Odt => "odt",
            SupportedFormat::Numbers => "numbers",
        }
    }

    /// Infer the format from a filename's extension (case-insensitive).
    ///
    /// `jpg` is accepted as JPEG and `htm` as HTML. Returns `None` when the
    /// name has no extension or the extension is not supported.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "" => None,
            "jpg" => Some(SupportedFormat::Jpeg),
            "htm" => Some(SupportedFormat::Html),
            other => Self::ALL
                .into_iter()
                .find(|f| f.file_extension() == other),
        }
    }

    /// Infer the format from a MIME type such as a `Content-Type` header.
    ///
    /// Parameters after `;` (e.g. `charset`) are ignored and matching is
    /// case-insensitive. Known aliases are accepted alongside canonical types.
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let normalized = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let format = match normalized.as_str() {
            "application/pdf" => SupportedFormat::Pdf,
            "image/jpeg" | "image/jpg" => SupportedFormat::Jpeg,
            "image/png" => SupportedFormat::Png,
            "image/webp" => SupportedFormat::Webp,
            "image/svg+xml" => SupportedFormat::Svg,
            "text/html" | "application/xhtml+xml" => SupportedFormat::Html,
            "application/xml" | "text/xml" => SupportedFormat::Xml,
            "text/csv" | "application/csv" => SupportedFormat::Csv,
            "application/vnd.ms-excel" => SupportedFormat::Xls,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                SupportedFormat::Docx
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                SupportedFormat::Xlsx
            }
            "application/vnd.ms-excel.sheet.macroenabled.12" => SupportedFormat::Xlsm,
            "application/vnd.ms-excel.sheet.binary.macroenabled.12" => SupportedFormat::Xlsb,
            "application/x-iwork-numbers-sffnumbers" | "application/vnd.apple.numbers" => {
                SupportedFormat::Numbers
            }
            "application/vnd.oasis.opendocument.spreadsheet" => SupportedFormat::Ods,
            "application/vnd.oasis.opendocument.text" => SupportedFormat::Odt,
            _ => return None,
        };
        Some(format)
    }
}

impl fmt::Display for SupportedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_extension())
    }
}
