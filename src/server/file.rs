//! `/api/file/*`: tables out of images and PDFs.

use super::{json_body, AppState, Success};
use crate::error::PipelineError;
use crate::output::{CsvTable, TableRow};
use crate::pipeline::input::RawImage;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image-to-excel", post(image_to_excel))
        .route("/image-to-csv", post(image_to_csv))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExcelResponse {
    data: Vec<TableRow>,
    row_count: usize,
    ocr_length: usize,
}

/// OCR, then reshape the text into rows.
async fn image_to_excel(
    State(state): State<AppState>,
    payload: Result<Json<RawImage>, JsonRejection>,
) -> Result<Json<Success<ExcelResponse>>, PipelineError> {
    let image = json_body(payload)?;
    info!(
        "Image to Excel request ({})",
        image.mime_type.as_deref().unwrap_or("-")
    );

    let (rows, ocr_length) = state.pipeline().extract_table(&image).await?;
    Ok(Success::new(ExcelResponse {
        row_count: rows.len(),
        data: rows,
        ocr_length,
    }))
}

/// Vision model reads the table directly as CSV.
async fn image_to_csv(
    State(state): State<AppState>,
    payload: Result<Json<RawImage>, JsonRejection>,
) -> Result<Json<Success<CsvTable>>, PipelineError> {
    let image = json_body(payload)?;
    info!(
        "Image to CSV request ({})",
        image.mime_type.as_deref().unwrap_or("-")
    );

    let table = state.pipeline().extract_csv(&image).await?;
    Ok(Success::new(table))
}
