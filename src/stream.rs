//! Streaming OCR API: emit page results as they complete.
//!
//! Large multi-page requests take a while. A stream lets callers show partial
//! results or drive a progress bar instead of waiting for the whole set. The
//! aggregator in [`crate::pipeline::aggregate`] is itself just a consumer of
//! [`page_stream`].
//!
//! Pages are processed strictly one after another, in input order, with a
//! fixed pause between consecutive pages. Each page gets a fresh retry
//! allotment. A page that exhausts its retries is emitted as a failed
//! [`OcrResult`]; the stream never ends early.

use crate::error::PageError;
use crate::output::OcrResult;
use crate::pipeline::input::PageInput;
use crate::pipeline::ocr::OcrClient;
use crate::progress::ProgressCallback;
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// A boxed stream of page results, in input order.
pub type PageStream = Pin<Box<dyn Stream<Item = OcrResult> + Send>>;

/// OCR `pages` one at a time, yielding each page's result as soon as it is
/// known.
///
/// `pause` is slept before every page except the first, so no time is spent
/// after the last page. Progress events go to `progress` when set.
pub fn page_stream(
    client: OcrClient,
    pages: Vec<PageInput>,
    pause: Duration,
    progress: Option<ProgressCallback>,
) -> PageStream {
    let total = pages.len();

    let s = stream::iter(pages.into_iter().enumerate()).then(move |(idx, page)| {
        let client = client.clone();
        let progress = progress.clone();
        async move {
            if idx > 0 && !pause.is_zero() {
                sleep(pause).await;
            }

            let page_num = idx + 1;
            if let Some(cb) = &progress {
                cb.on_page_start(page_num, total);
            }

            match client.extract_text(&page).await {
                Ok(text) => {
                    info!("Page {}/{}: {} chars", page_num, total, text.len());
                    if let Some(cb) = &progress {
                        cb.on_page_complete(page_num, total, text.len());
                    }
                    OcrResult::success(idx, text)
                }
                Err(e) => {
                    let err = PageError::from_upstream(page_num, &e);
                    warn!("{}", err);
                    if let Some(cb) = &progress {
                        cb.on_page_error(page_num, total, &err.to_string());
                    }
                    OcrResult::failure(idx, err)
                }
            }
        }
    });

    Box::pin(s)
}
