//! Pipeline façade: the single entry point used by the HTTP layer and CLI.
//!
//! [`Pipeline`] owns injected handles to the OCR service and the chat models
//! and wires them into the stages in [`crate::pipeline`]. Every failure is
//! mapped to [`PipelineError`] before it leaves this module.
//!
//! ```text
//! ExtractInput ──▶ validate ──▶ OCR (single) / aggregate (pages) ──▶ [reshape] ──▶ PipelineOutput
//! ```

use crate::config::PipelineConfig;
use crate::error::{ConfigError, PipelineError};
use crate::generate::{WritingTask, Writer};
use crate::output::{AggregatedText, CsvTable, PipelineOutput, TableRow};
use crate::pipeline::aggregate::Aggregator;
use crate::pipeline::csv::CsvExtractor;
use crate::pipeline::input::{PageInput, RawImage};
use crate::pipeline::llm::{ChatBackend, LlmChat};
use crate::pipeline::ocr::{MistralOcr, OcrBackend, OcrClient};
use crate::pipeline::reshape::{ReshapeRequest, Reshaper, TargetShape};
use crate::stream::{page_stream, PageStream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// What the caller sent: one image, or an ordered set of pages.
///
/// Deserialises from either `{ "base64": ..., "mimeType": ... }` or
/// `{ "images": [ ... ] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractInput {
    Pages { images: Vec<RawImage> },
    Single(RawImage),
}

impl ExtractInput {
    /// Decode and validate every page before any remote call is made.
    fn decode(&self) -> Result<Vec<PageInput>, PipelineError> {
        match self {
            ExtractInput::Single(raw) => Ok(vec![PageInput::from_raw(raw)?]),
            ExtractInput::Pages { images } => decode_pages(images),
        }
    }
}

/// Shape of the final output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    /// OCR text only.
    #[default]
    Text,
    /// OCR text plus HTML markup.
    Html,
    /// Table rows inferred from the OCR text.
    Table,
}

/// The extraction pipeline with its remote handles.
///
/// Cheap to clone; share one instance across requests.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    ocr: OcrClient,
    aggregator: Aggregator,
    reshaper: Reshaper,
    csv: CsvExtractor,
    writer: Writer,
}

impl Pipeline {
    /// Build from explicit handles.
    ///
    /// `vision` serves the image-to-CSV path; when `None`, `chat` is used for
    /// it too.
    pub fn new(
        ocr: Arc<dyn OcrBackend>,
        chat: Arc<dyn ChatBackend>,
        vision: Option<Arc<dyn ChatBackend>>,
        config: PipelineConfig,
    ) -> Self {
        let ocr = OcrClient::new(ocr, config.ocr_retry);
        let aggregator = Aggregator::new(
            ocr.clone(),
            config.page_pause(),
            config.progress_callback.clone(),
        );
        let vision = vision.unwrap_or_else(|| Arc::clone(&chat));
        Self {
            aggregator,
            reshaper: Reshaper::new(Arc::clone(&chat), &config),
            csv: CsvExtractor::new(vision, &config),
            writer: Writer::new(chat, &config),
            ocr,
            config,
        }
    }

    /// Build the production handles: Mistral OCR over HTTPS and
    /// `edgequake_llm` providers for chat and vision.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ConfigError> {
        let ocr = MistralOcr::from_config(&config)?;
        let chat = LlmChat::from_factory(&config.chat_provider, &config.chat_model)?;
        let vision = LlmChat::from_factory(&config.chat_provider, &config.vision_model)?;
        info!(
            "Pipeline ready: OCR {} ({}), chat {}/{}, vision {}",
            config.ocr_model,
            config.ocr_endpoint,
            config.chat_provider,
            config.chat_model,
            config.vision_model
        );
        Ok(Self::new(
            Arc::new(ocr),
            Arc::new(chat),
            Some(Arc::new(vision)),
            config,
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run OCR on `input` and, depending on `shape`, reshape the text.
    pub async fn process(
        &self,
        input: &ExtractInput,
        shape: OutputShape,
    ) -> Result<PipelineOutput, PipelineError> {
        let pages = input.decode()?;
        info!("Processing {} page(s) as {:?}", pages.len(), shape);

        let (text, statuses) = match input {
            ExtractInput::Single(_) => (self.ocr_single(&pages[0]).await?, None),
            ExtractInput::Pages { .. } => {
                let aggregated = self.aggregator.extract_pages(pages).await?;
                let statuses = aggregated.statuses();
                (aggregated.text, Some(statuses))
            }
        };

        let target = match shape {
            OutputShape::Text => {
                return Ok(PipelineOutput::Text {
                    text,
                    pages: statuses,
                })
            }
            OutputShape::Html => TargetShape::Html,
            OutputShape::Table => TargetShape::TabularJson,
        };
        let request = ReshapeRequest::new(text, target);
        let reshaped = self.reshaper.reshape(&request).await?;
        Ok(PipelineOutput::from_reshape(request.source_text, reshaped))
    }

    /// OCR one image.
    pub async fn extract_single(&self, image: &RawImage) -> Result<String, PipelineError> {
        let page = PageInput::from_raw(image)?;
        self.ocr_single(&page).await
    }

    /// OCR one image and render its text as HTML. Returns `(text, html)`.
    pub async fn extract_html(&self, image: &RawImage) -> Result<(String, String), PipelineError> {
        let text = self.extract_single(image).await?;
        let html = self.reshaper.to_html(&text).await?;
        Ok((text, html))
    }

    /// OCR one image and infer table rows from its text. Returns the rows and
    /// the character count of the OCR text.
    pub async fn extract_table(
        &self,
        image: &RawImage,
    ) -> Result<(Vec<TableRow>, usize), PipelineError> {
        let text = self.extract_single(image).await?;
        let rows = self.reshaper.to_table(&text).await?;
        Ok((rows, text.chars().count()))
    }

    /// OCR an ordered page set, keeping per-page results.
    pub async fn extract_pages(&self, images: &[RawImage]) -> Result<AggregatedText, PipelineError> {
        let pages = decode_pages(images)?;
        self.aggregator.extract_pages(pages).await
    }

    /// Stream page results as each page completes.
    pub fn stream_pages(&self, images: &[RawImage]) -> Result<PageStream, PipelineError> {
        let pages = decode_pages(images)?;
        Ok(page_stream(
            self.ocr.clone(),
            pages,
            self.config.page_pause(),
            self.config.progress_callback.clone(),
        ))
    }

    /// Read tables off an image with the vision model, as CSV.
    pub async fn extract_csv(&self, image: &RawImage) -> Result<CsvTable, PipelineError> {
        let page = PageInput::from_raw(image)?;
        self.csv.extract(&page).await
    }

    /// Run the writing assistant.
    pub async fn generate(&self, task: WritingTask, text: &str) -> Result<String, PipelineError> {
        self.writer.generate(task, text).await
    }

    async fn ocr_single(&self, page: &PageInput) -> Result<String, PipelineError> {
        let text = self.ocr.extract_text(page).await?;
        debug!("Single page OCR: {} chars", text.len());
        Ok(text)
    }
}

fn decode_pages(images: &[RawImage]) -> Result<Vec<PageInput>, PipelineError> {
    if images.is_empty() {
        return Err(PipelineError::validation("Please provide at least one image"));
    }
    images
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            PageInput::from_raw(raw).map_err(|e| {
                PipelineError::Validation(format!("Page {}: {}", i + 1, e.message()))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_image_json_deserialises() {
        let input: ExtractInput =
            serde_json::from_str(r#"{"base64":"AAAA","mimeType":"image/png"}"#).unwrap();
        assert!(matches!(input, ExtractInput::Single(_)));
    }

    #[test]
    fn page_set_json_deserialises() {
        let input: ExtractInput =
            serde_json::from_str(r#"{"images":[{"base64":"AAAA"},{"base64":"BBBB"}]}"#).unwrap();
        match input {
            ExtractInput::Pages { images } => assert_eq!(images.len(), 2),
            other => panic!("expected Pages, got {other:?}"),
        }
    }

    #[test]
    fn bad_page_is_reported_with_its_number() {
        let images = vec![
            RawImage::new("AAAA", None),
            RawImage::new("AAAA", Some("text/html")),
        ];
        let err = decode_pages(&images).unwrap_err();
        assert!(err.message().starts_with("Page 2:"), "got: {err}");
    }

    #[test]
    fn empty_page_set_is_rejected() {
        assert_eq!(decode_pages(&[]).unwrap_err().code(), "validation_error");
    }

    #[test]
    fn output_shape_defaults_to_text() {
        assert_eq!(OutputShape::default(), OutputShape::Text);
    }
}
