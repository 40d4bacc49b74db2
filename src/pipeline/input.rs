//! Input normalisation: turn a boundary `{ base64, mimeType }` pair into a
//! validated [`PageInput`].
//!
//! Everything here runs before any remote call, so a bad request never costs
//! an OCR round-trip. The caller may send either bare base64 or a full
//! `data:<mime>;base64,<data>` URL; in the latter case the embedded MIME type
//! wins over the `mimeType` field.

use crate::error::PipelineError;
use base64::{prelude::BASE64_STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// MIME type assumed when the caller does not send one.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// One image or PDF as it arrives at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImage {
    #[serde(default)]
    pub base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl RawImage {
    pub fn new(base64: impl Into<String>, mime_type: Option<&str>) -> Self {
        Self {
            base64: base64.into(),
            mime_type: mime_type.map(str::to_string),
        }
    }

    /// Wrap raw file bytes, e.g. a file read by the CLI.
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self::new(BASE64_STANDARD.encode(bytes), Some(mime_type))
    }
}

/// Which OCR document slot the page goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type == "application/pdf" {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }
}

/// A validated page: decoded bytes plus a supported MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInput {
    bytes: Vec<u8>,
    mime_type: String,
}

impl PageInput {
    /// Validate and decode a boundary image.
    pub fn from_raw(raw: &RawImage) -> Result<Self, PipelineError> {
        let payload = raw.base64.trim();
        if payload.is_empty() {
            return Err(PipelineError::validation("Please provide base64 image data"));
        }

        let (mime_type, data) = match parse_data_url(payload) {
            Some((mime, data)) => (mime, data),
            None if payload.starts_with("data:") => {
                return Err(PipelineError::validation(
                    "Malformed data URL: expected data:<mime>;base64,<data>",
                ))
            }
            None => (
                raw.mime_type
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_MIME_TYPE),
                payload,
            ),
        };

        let mime_type = normalise_mime(mime_type)?;
        let bytes = decode_base64(data)?;
        if bytes.is_empty() {
            return Err(PipelineError::validation("Please provide base64 image data"));
        }
        debug!("Decoded {} input ({} bytes)", mime_type, bytes.len());
        Ok(Self { bytes, mime_type })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_mime(&self.mime_type)
    }

    pub fn is_pdf(&self) -> bool {
        self.kind() == DocumentKind::Pdf
    }

    /// Standard base64 of the bytes, for vision-chat image attachments.
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.bytes)
    }

    /// `data:` URL embedding the page, for the OCR request.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

static RE_DATA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^data:(?P<mime_type>[^;,]+);base64,(?P<data>.+)$").unwrap()
});

/// Split a `data:` URL into its MIME type and base64 payload.
pub fn parse_data_url(data_url: &str) -> Option<(&str, &str)> {
    let caps = RE_DATA_URL.captures(data_url)?;
    let mime_type = caps.name("mime_type")?.as_str();
    let data = caps.name("data")?.as_str();
    Some((mime_type, data))
}

/// Lower-case the MIME type and reject anything that is not an image or PDF.
fn normalise_mime(mime_type: &str) -> Result<String, PipelineError> {
    let mime = mime_type.trim().to_ascii_lowercase();
    let supported = mime == "application/pdf"
        || mime
            .strip_prefix("image/")
            .is_some_and(|subtype| !subtype.is_empty());
    if supported {
        Ok(mime)
    } else {
        Err(PipelineError::Validation(format!(
            "Unsupported file type '{}'. Send an image or a PDF.",
            mime_type.trim()
        )))
    }
}

fn decode_base64(data: &str) -> Result<Vec<u8>, PipelineError> {
    // Line-wrapped base64 (MIME style) is common from browsers and CLIs.
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64_STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| PipelineError::Validation(format!("Invalid base64 data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_B64: &str = "iVBORw0KGgo=";

    #[test]
    fn missing_mime_defaults_to_png() {
        let page = PageInput::from_raw(&RawImage::new(PNG_B64, None)).unwrap();
        assert_eq!(page.mime_type(), "image/png");
        assert_eq!(page.kind(), DocumentKind::Image);
    }

    #[test]
    fn data_url_mime_wins() {
        let raw = RawImage::new(format!("data:application/pdf;base64,{PNG_B64}"), Some("image/png"));
        let page = PageInput::from_raw(&raw).unwrap();
        assert!(page.is_pdf());
        assert_eq!(page.kind(), DocumentKind::Pdf);
    }

    #[test]
    fn data_url_round_trips_payload() {
        let page = PageInput::from_raw(&RawImage::new(PNG_B64, Some("image/jpeg"))).unwrap();
        assert_eq!(page.to_data_url(), format!("data:image/jpeg;base64,{PNG_B64}"));
    }

    #[test]
    fn rejects_unsupported_mime() {
        let err = PageInput::from_raw(&RawImage::new(PNG_B64, Some("text/plain"))).unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert!(err.message().contains("text/plain"));
        assert!(PageInput::from_raw(&RawImage::new(PNG_B64, Some("image/"))).is_err());
    }

    #[test]
    fn rejects_empty_and_garbage_payloads() {
        assert!(PageInput::from_raw(&RawImage::new("   ", None)).is_err());
        assert!(PageInput::from_raw(&RawImage::new("not base64!!", None)).is_err());
        assert!(PageInput::from_raw(&RawImage::new("data:image/png,abc", None)).is_err());
    }

    #[test]
    fn tolerates_wrapped_base64_and_upper_case_mime() {
        let raw = RawImage::new("iVBORw0K\nGgo=", Some("IMAGE/PNG"));
        let page = PageInput::from_raw(&raw).unwrap();
        assert_eq!(page.mime_type(), "image/png");
        assert_eq!(page.bytes().len(), 8);
    }

    #[test]
    fn raw_image_deserialises_camel_case() {
        let raw: RawImage =
            serde_json::from_str(r#"{"base64":"abc","mimeType":"image/webp"}"#).unwrap();
        assert_eq!(raw.mime_type.as_deref(), Some("image/webp"));
    }
}
