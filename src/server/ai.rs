//! `/api/ai/*`: writing assistant.

use super::{json_body, AppState, Success};
use crate::error::PipelineError;
use crate::generate::WritingTask;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/status", get(status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    #[serde(default)]
    prompt_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    paragraphs: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    text: String,
    prompt_type: String,
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<Success<GenerateResponse>>, PipelineError> {
    let body = json_body(payload)?;
    if body.text.trim().is_empty() {
        return Err(PipelineError::validation("Please provide input text"));
    }
    let task = WritingTask::parse(&body.prompt_type, body.paragraphs)?;
    info!("Generating {} content", task.name());

    let text = state.pipeline().generate(task, &body.text).await?;
    Ok(Success::new(GenerateResponse {
        text,
        prompt_type: body.prompt_type,
    }))
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    model: String,
    provider: String,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let config = state.pipeline().config();
    Json(StatusResponse {
        status: "ready",
        model: config.chat_model.clone(),
        provider: config.chat_provider.clone(),
    })
}
