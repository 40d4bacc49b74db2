//! HTTP boundary: axum routes over a shared [`Pipeline`].
//!
//! The handlers only translate between JSON bodies and façade calls. Every
//! failure is a [`PipelineError`], rendered as `{ error, message }` with the
//! status from [`PipelineError::status_code`].
//!
//! When a client disconnects axum drops the handler future, which cancels the
//! in-flight remote call or sleep at its next await point.

mod ai;
mod file;
mod ocr;

use crate::error::PipelineError;
use crate::facade::Pipeline;
use axum::extract::rejection::JsonRejection;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Largest accepted request body: base64 pages are big.
pub const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Origin allowed when none is configured.
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:4200";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Build the full `/api` router.
///
/// `cors_origins` is a comma-separated origin list; `*` allows any origin.
pub fn router(pipeline: Arc<Pipeline>, cors_origins: &str) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/ocr", ocr::router())
        .nest("/api/file", file::router())
        .nest("/api/ai", ai::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(AppState::new(pipeline))
}

/// Serve `app` on `listener` until Ctrl-C.
pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn cors_layer(origins: &str) -> CorsLayer {
    let origins: Vec<&str> = origins
        .split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .collect();

    if origins.is_empty() || origins.contains(&"*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    debug!("CORS origins: {:?}", allowed);

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "ToolHub API is running",
    })
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!("Request failed ({}): {}", self.code(), self);
        } else {
            debug!("Request rejected ({}): {}", self.code(), self);
        }
        (status, Json(self.to_body())).into_response()
    }
}

/// Unwrap a JSON body, turning axum's rejection into a validation error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, PipelineError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| PipelineError::Validation(rejection.body_text()))
}

/// Wrap a response body with `"success": true`.
#[derive(Serialize)]
pub(crate) struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

impl<T: Serialize> Success<T> {
    pub(crate) fn new(body: T) -> Json<Self> {
        Json(Self {
            success: true,
            body,
        })
    }
}
