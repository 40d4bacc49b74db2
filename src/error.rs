//! Error types for the toolhub-ocr library.
//!
//! Three layers of errors reflect three audiences:
//!
//! * Stage errors ([`crate::pipeline::ocr::OcrError`],
//!   [`crate::pipeline::llm::ChatError`], [`crate::pipeline::sanitize::FormatError`],
//!   [`crate::pipeline::reshape::ReshapeError`] and [`UpstreamError`]) describe what
//!   went wrong inside one stage. They never leave the library.
//!
//! * [`PageError`] is **non-fatal**: one page of a multi-page request failed
//!   after its retries, but the other pages are fine. It is stored inside
//!   [`crate::output::OcrResult`] so callers can inspect partial success.
//!
//! * [`PipelineError`] is the closed set of kinds the façade returns. Every
//!   stage error is mapped onto it before it reaches the HTTP layer, which
//!   renders it as an [`ErrorBody`] with a fixed status code.

use crate::pipeline::reshape::ReshapeError;
use crate::pipeline::sanitize::FormatError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors returned by the pipeline façade.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::OcrResult`] rather than propagated here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Caller input is missing or malformed. Never retried.
    #[error("{0}")]
    Validation(String),

    /// A remote OCR or chat call exceeded its time budget on every attempt.
    #[error("{0}")]
    UpstreamTimeout(String),

    /// A remote OCR or chat call failed on every attempt, or every page of a
    /// multi-page request failed.
    #[error("{0}")]
    UpstreamFailure(String),

    /// Model output could not be coerced into the expected shape.
    #[error("{0}")]
    UnrecoverableFormat(String),

    /// The pipeline completed but produced no usable rows or text.
    #[error("{0}")]
    NoDataFound(String),

    /// Some pages succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::AggregatedText::into_strict`] when the
    /// caller wants to treat any page failure as an error.
    #[error("{} of {total} pages failed during extraction (pages {})", .failed_pages.len(), join_pages(.failed_pages))]
    PartialPageFailure {
        failed_pages: Vec<usize>,
        total: usize,
    },
}

fn join_pages(pages: &[usize]) -> String {
    pages
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PipelineError {
    /// Short machine-readable kind, sent as the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UpstreamTimeout(_) => "upstream_timeout",
            Self::UpstreamFailure(_) => "upstream_failure",
            Self::UnrecoverableFormat(_) => "unrecoverable_format",
            Self::NoDataFound(_) => "no_data_found",
            Self::PartialPageFailure { .. } => "partial_page_failure",
        }
    }

    /// HTTP status equivalent.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::UnrecoverableFormat(_) | Self::NoDataFound(_) => 400,
            Self::UpstreamFailure(_) | Self::PartialPageFailure { .. } => 502,
            Self::UpstreamTimeout(_) => 504,
        }
    }

    /// Human-readable detail, sent as the `message` field.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code().to_string(),
            message: self.message(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// A remote call that failed after its retry policy was exhausted.
///
/// Only the last attempt's failure is kept.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// The last attempt hit the per-attempt timeout.
    #[error("{service} call timed out after {timeout_ms}ms ({attempts} attempts)")]
    Timeout {
        service: &'static str,
        timeout_ms: u64,
        attempts: u32,
    },

    /// The last attempt returned an error.
    #[error("{service} call failed after {attempts} attempts: {detail}")]
    Failed {
        service: &'static str,
        attempts: u32,
        detail: String,
    },
}

impl From<UpstreamError> for PipelineError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Timeout { .. } => PipelineError::UpstreamTimeout(e.to_string()),
            UpstreamError::Failed { .. } => PipelineError::UpstreamFailure(e.to_string()),
        }
    }
}

impl From<FormatError> for PipelineError {
    fn from(e: FormatError) -> Self {
        PipelineError::UnrecoverableFormat(e.to_string())
    }
}

impl From<ReshapeError> for PipelineError {
    fn from(e: ReshapeError) -> Self {
        match e {
            ReshapeError::Upstream(inner) => inner.into(),
            ReshapeError::Format(inner) => inner.into(),
            ReshapeError::NoData => {
                PipelineError::NoDataFound("Could not extract structured data".to_string())
            }
        }
    }
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::OcrResult`] when a page fails.
/// The overall extraction continues unless ALL pages fail.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageError {
    /// OCR call failed on every attempt.
    #[error("Page {page}: OCR failed after {attempts} attempts: {detail}")]
    OcrFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },

    /// OCR call timed out on the final attempt.
    #[error("Page {page}: OCR timed out after {timeout_ms}ms")]
    Timeout { page: usize, timeout_ms: u64 },
}

impl PageError {
    /// Attach a 1-indexed page number to an exhausted upstream call.
    pub fn from_upstream(page: usize, err: &UpstreamError) -> Self {
        match err {
            UpstreamError::Timeout { timeout_ms, .. } => PageError::Timeout {
                page,
                timeout_ms: *timeout_ms,
            },
            UpstreamError::Failed {
                attempts, detail, ..
            } => PageError::OcrFailed {
                page,
                attempts: *attempts,
                detail: detail.clone(),
            },
        }
    }
}

/// Construction-time errors: bad settings or an unusable provider.
///
/// These surface while building a [`crate::Pipeline`], never per request.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The chat provider could not be created (unknown name, missing key, ...).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// No API key for the OCR endpoint.
    #[error("No OCR API key configured.\nSet {env_var} or pass --ocr-api-key.")]
    MissingApiKey { env_var: &'static str },

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = PipelineError::PartialPageFailure {
            failed_pages: vec![2, 5],
            total: 6,
        };
        let msg = e.to_string();
        assert!(msg.contains("2 of 6"), "got: {msg}");
        assert!(msg.contains("pages 2, 5"), "got: {msg}");
    }

    #[test]
    fn status_codes_follow_severity() {
        assert_eq!(PipelineError::validation("x").status_code(), 400);
        assert_eq!(PipelineError::NoDataFound("x".into()).status_code(), 400);
        assert_eq!(
            PipelineError::UnrecoverableFormat("x".into()).status_code(),
            400
        );
        assert_eq!(PipelineError::UpstreamFailure("x".into()).status_code(), 502);
        assert_eq!(PipelineError::UpstreamTimeout("x".into()).status_code(), 504);
    }

    #[test]
    fn upstream_timeout_maps_to_timeout_kind() {
        let e: PipelineError = UpstreamError::Timeout {
            service: "OCR",
            timeout_ms: 120_000,
            attempts: 3,
        }
        .into();
        assert_eq!(e.code(), "upstream_timeout");
        assert!(e.message().contains("120000ms"));
    }

    #[test]
    fn upstream_failure_keeps_last_detail() {
        let e: PipelineError = UpstreamError::Failed {
            service: "OCR",
            attempts: 3,
            detail: "HTTP 503: overloaded".into(),
        }
        .into();
        assert_eq!(e.code(), "upstream_failure");
        assert!(e.message().contains("HTTP 503: overloaded"));
    }

    #[test]
    fn error_body_shape() {
        let body = PipelineError::validation("Please provide base64 image data").to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], "Please provide base64 image data");
    }

    #[test]
    fn page_error_from_upstream() {
        let e = PageError::from_upstream(
            4,
            &UpstreamError::Failed {
                service: "OCR",
                attempts: 3,
                detail: "boom".into(),
            },
        );
        assert_eq!(
            e,
            PageError::OcrFailed {
                page: 4,
                attempts: 3,
                detail: "boom".into()
            }
        );
        assert!(e.to_string().starts_with("Page 4"));
    }
}
