//! Second stage: re-prompt a chat model to reshape OCR text.
//!
//! Two targets:
//!
//! * **HTML**: styled markup with `<sup>`/`<sub>` for simple formulas. Only a
//!   surrounding ```` ```html ```` fence is removed from the response.
//! * **Tabular JSON**: the model infers columns from noisy register text and
//!   answers `{"table": [...]}`. The response goes through
//!   [`crate::pipeline::sanitize`], and the envelope is accepted in three
//!   forms: `{"table": [...]}`, a bare array, or a single row object.
//!
//! Zero rows is reported as [`ReshapeError::NoData`], distinct from a parse
//! failure.

use crate::config::{ChatSettings, PipelineConfig, RetryPolicy};
use crate::error::UpstreamError;
use crate::output::{ReshapeResult, TableRow};
use crate::pipeline::llm::{ChatBackend, ChatRequest};
use crate::pipeline::retry::with_retry;
use crate::pipeline::sanitize::{parse_lenient, FormatError};
use crate::prompts;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Shape the reshape stage should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetShape {
    Html,
    TabularJson,
}

/// OCR text plus the shape it should become.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReshapeRequest {
    pub source_text: String,
    pub target: TargetShape,
}

impl ReshapeRequest {
    pub fn new(source_text: impl Into<String>, target: TargetShape) -> Self {
        Self {
            source_text: source_text.into(),
            target,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReshapeError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("no table rows found in the text")]
    NoData,
}

/// Chat-backed reshaper. Cheap to clone.
#[derive(Clone)]
pub struct Reshaper {
    chat: Arc<dyn ChatBackend>,
    policy: RetryPolicy,
    html: ChatSettings,
    table: ChatSettings,
}

impl Reshaper {
    pub fn new(chat: Arc<dyn ChatBackend>, config: &PipelineConfig) -> Self {
        Self {
            chat,
            policy: config.chat_retry,
            html: config.html,
            table: config.table,
        }
    }

    /// Reshape `request.source_text` into `request.target`.
    pub async fn reshape(&self, request: &ReshapeRequest) -> Result<ReshapeResult, ReshapeError> {
        match request.target {
            TargetShape::Html => Ok(ReshapeResult::Html {
                markup: self.to_html(&request.source_text).await?,
            }),
            TargetShape::TabularJson => Ok(ReshapeResult::TabularJson {
                rows: self.to_table(&request.source_text).await?,
            }),
        }
    }

    /// Render `text` as HTML. Empty text yields empty markup without a call.
    pub(crate) async fn to_html(&self, text: &str) -> Result<String, ReshapeError> {
        if text.trim().is_empty() {
            debug!("Reshape: empty source text, skipping HTML call");
            return Ok(String::new());
        }

        info!("Reshape: HTML from {} chars of OCR text", text.len());
        let request = ChatRequest::new(prompts::html_prompt(text), self.html);
        let response = self.call(&request).await?;
        Ok(strip_html_fences(&response))
    }

    /// Infer table rows from `text`.
    pub(crate) async fn to_table(&self, text: &str) -> Result<Vec<TableRow>, ReshapeError> {
        if text.trim().is_empty() {
            return Err(ReshapeError::NoData);
        }

        info!("Reshape: table from {} chars of OCR text", text.len());
        let request = ChatRequest::new(prompts::table_user_prompt(text), self.table)
            .with_system(prompts::TABLE_SYSTEM_PROMPT);
        let response = self.call(&request).await?;

        let content = match response.trim() {
            "" => r#"{"table":[]}"#,
            trimmed => trimmed,
        };
        let value = parse_lenient(content).inspect_err(|e| {
            warn!("Reshape: unparseable table response: {:?}", e.preview());
        })?;
        let rows = rows_from_value(value)?;
        info!("Reshape: extracted {} rows", rows.len());
        Ok(rows)
    }

    async fn call(&self, request: &ChatRequest) -> Result<String, UpstreamError> {
        with_retry("Chat", &self.policy, |_| self.chat.complete(request)).await
    }
}

static RE_HTML_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*```(?:html)?\s*").unwrap());
static RE_HTML_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());

/// Remove a surrounding ```` ```html ```` / ```` ``` ```` fence.
pub fn strip_html_fences(input: &str) -> String {
    let s = RE_HTML_LEADING_FENCE.replace(input, "");
    let s = RE_HTML_TRAILING_FENCE.replace(&s, "");
    s.trim().to_string()
}

/// Unwrap the table envelope and normalise every row.
///
/// Non-object items are skipped. A scalar at the top level is a format error.
pub fn rows_from_value(value: Value) -> Result<Vec<TableRow>, ReshapeError> {
    let items = match value {
        Value::Object(mut map) => match map.remove("table") {
            Some(Value::Array(items)) => items,
            Some(Value::Object(row)) => vec![Value::Object(row)],
            Some(Value::Null) => Vec::new(),
            Some(other) => return Err(FormatError::unrecoverable(&other.to_string()).into()),
            None => vec![Value::Object(map)],
        },
        Value::Array(items) => items,
        scalar => return Err(FormatError::unrecoverable(&scalar.to_string()).into()),
    };

    let total = items.len();
    let rows: Vec<TableRow> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match item {
            Value::Object(row) => Some(normalise_row(row)),
            other => {
                warn!("Reshape: skipping row {} (not an object: {})", i + 1, other);
                None
            }
        })
        .filter(|row| !row.is_empty())
        .collect();

    if rows.is_empty() {
        debug!("Reshape: 0 of {} items were usable rows", total);
        return Err(ReshapeError::NoData);
    }
    Ok(rows)
}

/// Every cell becomes a JSON string.
fn normalise_row(row: TableRow) -> TableRow {
    row.into_iter()
        .map(|(key, value)| {
            let cell = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, Value::String(cell))
        })
        .collect()
}
