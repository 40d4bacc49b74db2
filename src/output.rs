//! Result types produced by the pipeline.
//!
//! Everything here is request-scoped: built while one request runs and
//! dropped once the response is written.

use crate::error::{PageError, PipelineError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker line placed before each page's text in aggregated output.
pub fn page_marker(page_num: usize) -> String {
    format!("--- Page {page_num} ---")
}

/// OCR outcome for one page of a multi-page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    /// 0-indexed position in the input.
    pub page_index: usize,
    /// Extracted text; empty when the page failed.
    pub text: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PageError>,
}

impl OcrResult {
    pub fn success(page_index: usize, text: String) -> Self {
        Self {
            page_index,
            text,
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(page_index: usize, error: PageError) -> Self {
        Self {
            page_index,
            text: String::new(),
            succeeded: false,
            error: Some(error),
        }
    }

    /// 1-indexed page number, as used in markers and logs.
    pub fn page_num(&self) -> usize {
        self.page_index + 1
    }

    pub fn error_detail(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

/// Per-page status reported alongside multi-page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStatus {
    pub page_index: usize,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Ordered page texts joined with `--- Page N ---` markers.
///
/// Markers always follow input order, whichever pages succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedText {
    pub text: String,
    pub pages: Vec<OcrResult>,
}

impl AggregatedText {
    /// Join page results in `page_index` order.
    pub fn from_pages(mut pages: Vec<OcrResult>) -> Self {
        pages.sort_by_key(|p| p.page_index);
        let text = pages
            .iter()
            .map(|p| format!("{}\n\n{}", page_marker(p.page_num()), p.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        Self { text, pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 1-indexed numbers of the pages that failed.
    pub fn failed_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|p| !p.succeeded)
            .map(OcrResult::page_num)
            .collect()
    }

    pub fn statuses(&self) -> Vec<PageStatus> {
        self.pages
            .iter()
            .map(|p| PageStatus {
                page_index: p.page_index,
                succeeded: p.succeeded,
                error_detail: p.error_detail(),
            })
            .collect()
    }

    /// Treat any failed page as an error.
    pub fn into_strict(self) -> Result<Self, PipelineError> {
        let failed_pages = self.failed_pages();
        if failed_pages.is_empty() {
            Ok(self)
        } else {
            Err(PipelineError::PartialPageFailure {
                failed_pages,
                total: self.pages.len(),
            })
        }
    }
}

/// One table row. Every value is a JSON string; column order is the order
/// the model emitted.
pub type TableRow = Map<String, Value>;

/// Output of the second (reshape) stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ReshapeResult {
    Html { markup: String },
    TabularJson { rows: Vec<TableRow> },
}

/// CSV produced by the vision table extractor, with a parsed preview grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvTable {
    pub csv: String,
    pub preview: Vec<Vec<String>>,
    pub row_count: usize,
    pub column_count: usize,
}

/// Final result returned by [`crate::Pipeline::process`].
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutput {
    /// Plain OCR text. `pages` is set for multi-page input.
    Text {
        text: String,
        pages: Option<Vec<PageStatus>>,
    },
    /// OCR text plus its HTML rendering.
    Html { text: String, html: String },
    /// Rows inferred from the OCR text. `ocr_length` counts characters of the
    /// stage-1 text.
    Table {
        rows: Vec<TableRow>,
        ocr_length: usize,
    },
}

impl PipelineOutput {
    /// Pair the stage-1 `text` with its reshaped form.
    pub fn from_reshape(text: String, reshaped: ReshapeResult) -> Self {
        match reshaped {
            ReshapeResult::Html { markup } => PipelineOutput::Html { text, html: markup },
            ReshapeResult::TabularJson { rows } => PipelineOutput::Table {
                ocr_length: text.chars().count(),
                rows,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(idx: usize) -> OcrResult {
        OcrResult::failure(
            idx,
            PageError::OcrFailed {
                page: idx + 1,
                attempts: 3,
                detail: "HTTP 500".into(),
            },
        )
    }

    #[test]
    fn markers_follow_input_order_even_when_shuffled() {
        let agg = AggregatedText::from_pages(vec![
            OcrResult::success(2, "C".into()),
            OcrResult::success(0, "A".into()),
            failed(1),
        ]);
        assert_eq!(
            agg.text,
            "--- Page 1 ---\n\nA\n\n--- Page 2 ---\n\n\n\n--- Page 3 ---\n\nC"
        );
        assert_eq!(agg.failed_pages(), vec![2]);
    }

    #[test]
    fn statuses_expose_error_detail() {
        let agg = AggregatedText::from_pages(vec![OcrResult::success(0, "A".into()), failed(1)]);
        let statuses = agg.statuses();
        assert!(statuses[0].succeeded);
        assert!(statuses[0].error_detail.is_none());
        assert!(!statuses[1].succeeded);
        assert!(statuses[1]
            .error_detail
            .as_deref()
            .unwrap()
            .contains("HTTP 500"));
    }

    #[test]
    fn strict_mode_reports_failed_pages() {
        let agg = AggregatedText::from_pages(vec![OcrResult::success(0, "A".into()), failed(1)]);
        match agg.into_strict() {
            Err(PipelineError::PartialPageFailure {
                failed_pages,
                total,
            }) => {
                assert_eq!(failed_pages, vec![2]);
                assert_eq!(total, 2);
            }
            other => panic!("expected PartialPageFailure, got {other:?}"),
        }
    }

    #[test]
    fn page_status_serialises_camel_case() {
        let status = PageStatus {
            page_index: 0,
            succeeded: true,
            error_detail: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({"pageIndex": 0, "succeeded": true}));
    }

    #[test]
    fn table_reshape_counts_ocr_chars() {
        let mut row = TableRow::new();
        row.insert("item".into(), Value::String("Thé".into()));
        let out = PipelineOutput::from_reshape(
            "Thé 2".into(),
            ReshapeResult::TabularJson { rows: vec![row] },
        );
        match out {
            PipelineOutput::Table { rows, ocr_length } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(ocr_length, 5);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }
}
