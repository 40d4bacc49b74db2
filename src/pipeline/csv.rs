//! Vision table-to-CSV: one vision-chat call that reads tables straight off
//! the image, skipping the OCR stage.

use crate::config::{ChatSettings, PipelineConfig, RetryPolicy};
use crate::error::PipelineError;
use crate::output::CsvTable;
use crate::pipeline::input::PageInput;
use crate::pipeline::llm::{ChatBackend, ChatRequest};
use crate::pipeline::retry::with_retry;
use crate::prompts::{csv_vision_prompt, NO_TABLE_SENTINEL};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct CsvExtractor {
    vision: Arc<dyn ChatBackend>,
    policy: RetryPolicy,
    settings: ChatSettings,
}

impl CsvExtractor {
    pub fn new(vision: Arc<dyn ChatBackend>, config: &PipelineConfig) -> Self {
        Self {
            vision,
            policy: config.chat_retry,
            settings: config.csv,
        }
    }

    pub async fn extract(&self, page: &PageInput) -> Result<CsvTable, PipelineError> {
        let request = ChatRequest::new(csv_vision_prompt(page.is_pdf()), self.settings)
            .with_image(page.to_base64(), page.mime_type());

        let response = with_retry("Vision", &self.policy, |_| self.vision.complete(&request)).await?;
        let csv = strip_csv_fences(&response);

        if csv.is_empty() || csv == NO_TABLE_SENTINEL {
            return Err(PipelineError::NoDataFound(
                "No table data found in the image".to_string(),
            ));
        }

        let preview = parse_preview(&csv)
            .map_err(|e| PipelineError::UnrecoverableFormat(format!("Could not read CSV: {e}")))?;
        if preview.is_empty() {
            return Err(PipelineError::NoDataFound(
                "No table data found in the image".to_string(),
            ));
        }
        let column_count = preview.first().map_or(0, Vec::len);
        info!("CSV: {} rows x {} columns", preview.len(), column_count);

        Ok(CsvTable {
            row_count: preview.len(),
            column_count,
            preview,
            csv,
        })
    }
}

static RE_CSV_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*```(?:csv)?\s*").unwrap());
static RE_CSV_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());

fn strip_csv_fences(input: &str) -> String {
    let s = RE_CSV_LEADING_FENCE.replace(input.trim(), "");
    let s = RE_CSV_TRAILING_FENCE.replace(&s, "");
    s.trim().to_string()
}

/// Parse CSV into a grid: no header row, ragged rows allowed, cells trimmed,
/// blank lines skipped.
pub fn parse_preview(csv_text: &str) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
