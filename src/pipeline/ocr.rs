//! Remote vision-OCR client.
//!
//! [`OcrBackend`] is one raw call to the OCR service: no retry, no timeout.
//! [`OcrClient`] wraps any backend with the configured [`RetryPolicy`] and
//! joins the returned page fragments. Production uses [`MistralOcr`]; tests
//! inject their own backends.

use crate::config::{PipelineConfig, RetryPolicy, OCR_API_KEY_ENV};
use crate::error::{ConfigError, UpstreamError};
use crate::pipeline::input::{DocumentKind, PageInput};
use crate::pipeline::retry::with_retry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Failure of a single OCR attempt.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

/// One OCR request against a remote service.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Recognise `page` and return its text fragments in order.
    async fn recognize(&self, page: &PageInput) -> Result<Vec<String>, OcrError>;
}

// ── Mistral OCR ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: OcrDocument,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OcrDocument {
    ImageUrl { image_url: String },
    DocumentUrl { document_url: String },
}

impl OcrDocument {
    fn for_page(page: &PageInput) -> Self {
        let url = page.to_data_url();
        match page.kind() {
            DocumentKind::Image => OcrDocument::ImageUrl { image_url: url },
            DocumentKind::Pdf => OcrDocument::DocumentUrl { document_url: url },
        }
    }
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
}

#[derive(Debug, Deserialize)]
struct OcrPage {
    #[serde(default)]
    markdown: String,
}

/// Longest slice of an error body kept in [`OcrError::Http`].
const ERROR_BODY_PREVIEW: usize = 500;

/// Mistral `/v1/ocr` over HTTPS.
pub struct MistralOcr {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl MistralOcr {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        // Timeouts are applied per attempt by the retry helper.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build from config, falling back to `MISTRAL_API_KEY` for the key.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .ocr_api_key
            .clone()
            .or_else(|| std::env::var(OCR_API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey {
                env_var: OCR_API_KEY_ENV,
            })?;
        Self::new(&config.ocr_endpoint, &config.ocr_model, api_key)
    }
}

#[async_trait]
impl OcrBackend for MistralOcr {
    async fn recognize(&self, page: &PageInput) -> Result<Vec<String>, OcrError> {
        let request = OcrRequest {
            model: &self.model,
            document: OcrDocument::for_page(page),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Http {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        let parsed: OcrResponse = response
            .json()
            .await
            .map_err(|e| OcrError::InvalidResponse(e.to_string()))?;

        Ok(parsed.pages.into_iter().map(|p| p.markdown).collect())
    }
}

// ── Retrying client ──────────────────────────────────────────────────────────

/// An [`OcrBackend`] with retry and timeout applied.
#[derive(Clone)]
pub struct OcrClient {
    backend: Arc<dyn OcrBackend>,
    policy: RetryPolicy,
}

impl OcrClient {
    pub fn new(backend: Arc<dyn OcrBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Extract the text of one page.
    ///
    /// Page fragments are joined with a blank line; a response with no
    /// fragments yields an empty string.
    pub async fn extract_text(&self, page: &PageInput) -> Result<String, UpstreamError> {
        let fragments = with_retry("OCR", &self.policy, |attempt| {
            debug!(
                "OCR attempt {} ({}, {} bytes)",
                attempt,
                page.mime_type(),
                page.bytes().len()
            );
            self.backend.recognize(page)
        })
        .await?;

        let text = fragments.join("\n\n");
        debug!("OCR returned {} fragments, {} chars", fragments.len(), text.len());
        Ok(text)
    }
}
