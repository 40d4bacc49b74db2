//! Configuration types for the extraction pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. One struct holds every knob so a configured
//! pipeline can be shared read-only across requests and logged as a whole.

use crate::error::ConfigError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default OCR endpoint (Mistral document OCR).
pub const DEFAULT_OCR_ENDPOINT: &str = "https://api.mistral.ai/v1/ocr";

/// Default OCR model.
pub const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";

/// Default chat provider, resolved through `edgequake_llm::ProviderFactory`.
pub const DEFAULT_CHAT_PROVIDER: &str = "mistral";

/// Default chat model used for reshaping and writing.
pub const DEFAULT_CHAT_MODEL: &str = "mistral-large-latest";

/// Default vision-chat model used for the image-to-CSV path.
pub const DEFAULT_VISION_MODEL: &str = "pixtral-large-latest";

/// Environment variable holding the OCR API key.
pub const OCR_API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Retry and timeout policy for one kind of remote call.
///
/// Attempts are separated by a fixed pause (no exponential growth): the
/// remote services rate-limit per key, and a flat delay keeps the worst-case
/// latency of a request predictable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Default: 3.
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds. Default: 2000.
    pub backoff_ms: u64,
    /// Wall-clock ceiling for one attempt in milliseconds. Default: 120 000.
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 2000,
            timeout_ms: 120_000,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Sampling settings for one chat prompt family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Configuration for the extraction pipeline.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use toolhub_ocr::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .ocr_max_attempts(3)
///     .page_pause_ms(500)
///     .chat_model("mistral-large-latest")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// OCR endpoint URL. Default: [`DEFAULT_OCR_ENDPOINT`].
    pub ocr_endpoint: String,

    /// OCR model identifier. Default: [`DEFAULT_OCR_MODEL`].
    pub ocr_model: String,

    /// Bearer token for the OCR endpoint. If None, read from
    /// [`OCR_API_KEY_ENV`] when the production client is built.
    pub ocr_api_key: Option<String>,

    /// Retry policy for OCR calls. Default: 3 attempts, 2 s apart, 120 s each.
    pub ocr_retry: RetryPolicy,

    /// Retry policy for chat calls (reshape, CSV, writing).
    pub chat_retry: RetryPolicy,

    /// Pause between successive pages of a multi-page request. Default: 500 ms.
    ///
    /// Pages run one at a time and this pause keeps the per-key request rate
    /// under the OCR service's limit. It is not applied after the last page.
    pub page_pause_ms: u64,

    /// Chat provider name (e.g. "mistral", "openai"). Default: "mistral".
    pub chat_provider: String,

    /// Chat model for reshaping and writing. Default: [`DEFAULT_CHAT_MODEL`].
    pub chat_model: String,

    /// Vision-capable chat model for image-to-CSV. Default: [`DEFAULT_VISION_MODEL`].
    pub vision_model: String,

    /// HTML reshape sampling. Default: 0.1 / 16 000 tokens.
    pub html: ChatSettings,

    /// Table reshape sampling. Default: 0.05 / 8 192 tokens.
    pub table: ChatSettings,

    /// Vision CSV sampling. Default: 0.1 / 4 096 tokens.
    pub csv: ChatSettings,

    /// Writing assistant sampling. Default: 0.7 / 4 096 tokens.
    pub writing: ChatSettings,

    /// Optional per-page progress callback for multi-page extraction.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            ocr_model: DEFAULT_OCR_MODEL.to_string(),
            ocr_api_key: None,
            ocr_retry: RetryPolicy::default(),
            chat_retry: RetryPolicy::default(),
            page_pause_ms: 500,
            chat_provider: DEFAULT_CHAT_PROVIDER.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            html: ChatSettings {
                temperature: 0.1,
                max_tokens: 16_000,
            },
            table: ChatSettings {
                temperature: 0.05,
                max_tokens: 8192,
            },
            csv: ChatSettings {
                temperature: 0.1,
                max_tokens: 4096,
            },
            writing: ChatSettings {
                temperature: 0.7,
                max_tokens: 4096,
            },
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("ocr_endpoint", &self.ocr_endpoint)
            .field("ocr_model", &self.ocr_model)
            .field("ocr_api_key", &self.ocr_api_key.as_ref().map(|_| "<redacted>"))
            .field("ocr_retry", &self.ocr_retry)
            .field("chat_retry", &self.chat_retry)
            .field("page_pause_ms", &self.page_pause_ms)
            .field("chat_provider", &self.chat_provider)
            .field("chat_model", &self.chat_model)
            .field("vision_model", &self.vision_model)
            .field("html", &self.html)
            .field("table", &self.table)
            .field("csv", &self.csv)
            .field("writing", &self.writing)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn page_pause(&self) -> Duration {
        Duration::from_millis(self.page_pause_ms)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn ocr_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_endpoint = url.into();
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn ocr_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.ocr_api_key = Some(key.into());
        self
    }

    pub fn ocr_max_attempts(mut self, n: u32) -> Self {
        self.config.ocr_retry.max_attempts = n.max(1);
        self
    }

    pub fn ocr_backoff_ms(mut self, ms: u64) -> Self {
        self.config.ocr_retry.backoff_ms = ms;
        self
    }

    pub fn ocr_timeout_ms(mut self, ms: u64) -> Self {
        self.config.ocr_retry.timeout_ms = ms.max(1);
        self
    }

    pub fn chat_max_attempts(mut self, n: u32) -> Self {
        self.config.chat_retry.max_attempts = n.max(1);
        self
    }

    pub fn chat_backoff_ms(mut self, ms: u64) -> Self {
        self.config.chat_retry.backoff_ms = ms;
        self
    }

    pub fn chat_timeout_ms(mut self, ms: u64) -> Self {
        self.config.chat_retry.timeout_ms = ms.max(1);
        self
    }

    pub fn page_pause_ms(mut self, ms: u64) -> Self {
        self.config.page_pause_ms = ms;
        self
    }

    pub fn chat_provider(mut self, name: impl Into<String>) -> Self {
        self.config.chat_provider = name.into();
        self
    }

    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = model.into();
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = model.into();
        self
    }

    pub fn writing_temperature(mut self, t: f32) -> Self {
        self.config.writing.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let c = &self.config;
        if c.ocr_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("OCR endpoint must not be empty".into()));
        }
        if !c.ocr_endpoint.starts_with("http://") && !c.ocr_endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "OCR endpoint must be an HTTP(S) URL, got '{}'",
                c.ocr_endpoint
            )));
        }
        for (name, value) in [
            ("OCR model", &c.ocr_model),
            ("chat provider", &c.chat_provider),
            ("chat model", &c.chat_model),
            ("vision model", &c.vision_model),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        if c.ocr_retry.max_attempts == 0 || c.chat_retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("Max attempts must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_policy() {
        let c = PipelineConfig::default();
        assert_eq!(c.ocr_retry.max_attempts, 3);
        assert_eq!(c.ocr_retry.backoff(), Duration::from_secs(2));
        assert_eq!(c.ocr_retry.timeout(), Duration::from_secs(120));
        assert_eq!(c.page_pause(), Duration::from_millis(500));
        assert_eq!(c.table.max_tokens, 8192);
    }

    #[test]
    fn builder_clamps_attempts() {
        let c = PipelineConfig::builder()
            .ocr_max_attempts(0)
            .build()
            .unwrap();
        assert_eq!(c.ocr_retry.max_attempts, 1);
    }

    #[test]
    fn builder_rejects_non_http_endpoint() {
        let err = PipelineConfig::builder()
            .ocr_endpoint("ftp://example.org/ocr")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("HTTP(S)"), "got: {err}");
    }

    #[test]
    fn builder_rejects_empty_model() {
        assert!(PipelineConfig::builder().chat_model("  ").build().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = PipelineConfig::builder()
            .ocr_api_key("sk-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
