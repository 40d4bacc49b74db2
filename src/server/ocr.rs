//! `/api/ocr/*`: text extraction.

use super::{json_body, AppState, Success};
use crate::error::PipelineError;
use crate::output::PageStatus;
use crate::pipeline::input::RawImage;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/extract", post(extract))
        .route("/extract-single", post(extract_single))
        .route("/status", get(status))
}

#[derive(Debug, Deserialize)]
struct ExtractBody {
    #[serde(default)]
    images: Vec<RawImage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractResponse {
    text: String,
    page_count: usize,
    pages: Vec<PageStatus>,
}

async fn extract(
    State(state): State<AppState>,
    payload: Result<Json<ExtractBody>, JsonRejection>,
) -> Result<Json<Success<ExtractResponse>>, PipelineError> {
    let body = json_body(payload)?;
    if body.images.is_empty() {
        return Err(PipelineError::validation("Please provide an array of images"));
    }
    info!("OCR request for {} images", body.images.len());

    let aggregated = state.pipeline().extract_pages(&body.images).await?;
    Ok(Success::new(ExtractResponse {
        page_count: aggregated.page_count(),
        pages: aggregated.statuses(),
        text: aggregated.text,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractSingleBody {
    #[serde(default)]
    base64: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    return_html: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ExtractSingleResponse {
    Html {
        text: String,
        html: String,
        images: Vec<String>,
    },
    Text {
        text: String,
    },
}

async fn extract_single(
    State(state): State<AppState>,
    payload: Result<Json<ExtractSingleBody>, JsonRejection>,
) -> Result<Json<Success<ExtractSingleResponse>>, PipelineError> {
    let body = json_body(payload)?;
    let image = RawImage {
        base64: body.base64,
        mime_type: body.mime_type,
    };
    info!(
        "Single OCR request (mimeType: {}, html: {})",
        image.mime_type.as_deref().unwrap_or("-"),
        body.return_html
    );

    if !body.return_html {
        let text = state.pipeline().extract_single(&image).await?;
        return Ok(Success::new(ExtractSingleResponse::Text { text }));
    }

    let (text, html) = state.pipeline().extract_html(&image).await?;
    Ok(Success::new(ExtractSingleResponse::Html {
        text,
        html,
        images: Vec::new(),
    }))
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    model: String,
    provider: String,
    capabilities: [&'static str; 4],
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let config = state.pipeline().config();
    Json(StatusResponse {
        status: "ready",
        model: config.ocr_model.clone(),
        provider: "Mistral".to_string(),
        capabilities: [
            "text extraction",
            "document OCR",
            "multi-page processing",
            "HTML formatting",
        ],
    })
}
