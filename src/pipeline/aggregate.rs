//! Multi-page aggregator: OCR an ordered page set into one text.
//!
//! A page that fails after its retries contributes an empty section and the
//! run continues. Only when every page fails does the call fail, with the
//! first page's error as the detail.

use crate::error::PipelineError;
use crate::output::{AggregatedText, OcrResult};
use crate::pipeline::input::PageInput;
use crate::pipeline::ocr::OcrClient;
use crate::progress::ProgressCallback;
use crate::stream::page_stream;
use futures::StreamExt;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct Aggregator {
    client: OcrClient,
    pause: Duration,
    progress: Option<ProgressCallback>,
}

impl Aggregator {
    pub fn new(client: OcrClient, pause: Duration, progress: Option<ProgressCallback>) -> Self {
        Self {
            client,
            pause,
            progress,
        }
    }

    pub async fn extract_pages(&self, pages: Vec<PageInput>) -> Result<AggregatedText, PipelineError> {
        let total = pages.len();
        if total == 0 {
            return Err(PipelineError::validation("Please provide at least one image"));
        }

        info!("Extracting {} pages", total);
        if let Some(cb) = &self.progress {
            cb.on_extraction_start(total);
        }

        let results: Vec<OcrResult> = page_stream(
            self.client.clone(),
            pages,
            self.pause,
            self.progress.clone(),
        )
        .collect()
        .await;

        let success_count = results.iter().filter(|r| r.succeeded).count();
        if let Some(cb) = &self.progress {
            cb.on_extraction_complete(total, success_count);
        }

        if success_count == 0 {
            let first = results
                .iter()
                .find_map(OcrResult::error_detail)
                .unwrap_or_else(|| "unknown error".to_string());
            warn!("All {} pages failed", total);
            return Err(PipelineError::UpstreamFailure(format!(
                "All {total} pages failed. First error: {first}"
            )));
        }

        if success_count < total {
            warn!("{} of {} pages failed", total - success_count, total);
        } else {
            info!("All {} pages extracted", total);
        }

        Ok(AggregatedText::from_pages(results))
    }
}
