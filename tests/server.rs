//! HTTP boundary tests: route shapes and the error-to-status mapping.
//!
//! Requests go straight into the router with `oneshot`; no socket is bound.
//!
//! Run with:
//!   cargo test --test server

#![cfg(feature = "server")]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use toolhub_ocr::server::router;
use toolhub_ocr::{
    ChatBackend, ChatError, ChatRequest, OcrBackend, OcrError, PageInput, Pipeline,
    PipelineConfig, RawImage,
};

// ── Scripted backends ────────────────────────────────────────────────────────

/// Echoes page bytes; `FAIL` errors and `HANG` never answers.
struct EchoOcr;

#[async_trait]
impl OcrBackend for EchoOcr {
    async fn recognize(&self, page: &PageInput) -> Result<Vec<String>, OcrError> {
        match page.bytes() {
            b"FAIL" => Err(OcrError::Transport("connection reset".into())),
            b"HANG" => std::future::pending().await,
            bytes => Ok(vec![String::from_utf8_lossy(bytes).into_owned()]),
        }
    }
}

struct FixedChat(&'static str);

#[async_trait]
impl ChatBackend for FixedChat {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, ChatError> {
        Ok(self.0.to_string())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn app(reply: &'static str) -> Router {
    let config = PipelineConfig::builder()
        .ocr_timeout_ms(1_000)
        .build()
        .unwrap();
    let pipeline = Pipeline::new(Arc::new(EchoOcr), Arc::new(FixedChat(reply)), None, config);
    router(Arc::new(pipeline), "*")
}

fn page(text: &str) -> Value {
    let raw = RawImage::from_bytes(text.as_bytes(), "image/png");
    serde_json::to_value(raw).unwrap()
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    use tower::ServiceExt;

    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

// ── Health and status ────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(app(""), Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn ocr_status_names_model() {
    let (status, body) = send(app(""), Method::GET, "/api/ocr/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["model"], "mistral-ocr-latest");
    assert_eq!(body["capabilities"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn ai_status_names_chat_model() {
    let (_, body) = send(app(""), Method::GET, "/api/ai/status", None).await;
    assert_eq!(body["model"], "mistral-large-latest");
    assert_eq!(body["provider"], "mistral");
}

// ── OCR routes ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn extract_single_returns_text_only() {
    let (status, body) = post(app(""), "/api/ocr/extract-single", page("Invoice 42")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "text": "Invoice 42" }));
}

#[tokio::test]
async fn extract_single_with_html() {
    let mut req = page("Hello");
    req["returnHtml"] = json!(true);

    let (status, body) = post(app("<h1>Hello</h1>"), "/api/ocr/extract-single", req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "text": "Hello", "html": "<h1>Hello</h1>", "images": [] })
    );
}

#[tokio::test(start_paused = true)]
async fn extract_pages_reports_each_page() {
    let req = json!({ "images": [page("A"), page("FAIL"), page("C")] });

    let (status, body) = post(app(""), "/api/ocr/extract", req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pageCount"], 3);
    assert_eq!(body["pages"][0]["succeeded"], true);
    assert_eq!(body["pages"][1]["succeeded"], false);
    assert!(body["pages"][1]["errorDetail"].is_string());
    assert!(body["text"].as_str().unwrap().contains("--- Page 3 ---\n\nC"));
}

#[tokio::test]
async fn extract_without_images_is_400() {
    let (status, body) = post(app(""), "/api/ocr/extract", json!({ "images": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["message"], "Please provide an array of images");
}

// ── Error mapping ────────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_json_is_validation_error() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/ocr/extract-single")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = tower::ServiceExt::oneshot(app(""), request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn missing_image_is_validation_error() {
    let (status, body) = post(app(""), "/api/ocr/extract-single", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn unsupported_mime_is_validation_error() {
    let req = json!({ "base64": "aGVsbG8=", "mimeType": "text/plain" });
    let (status, body) = post(app(""), "/api/ocr/extract-single", req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test(start_paused = true)]
async fn ocr_failure_is_502() {
    let (status, body) = post(app(""), "/api/ocr/extract-single", page("FAIL")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream_failure");
    assert!(body["message"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test(start_paused = true)]
async fn ocr_timeout_is_504() {
    let (status, body) = post(app(""), "/api/ocr/extract-single", page("HANG")).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], "upstream_timeout");
}

#[tokio::test]
async fn unparseable_table_is_400() {
    let (status, body) = post(app("no idea"), "/api/file/image-to-excel", page("x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unrecoverable_format");
}

#[tokio::test]
async fn empty_table_is_no_data_found() {
    let (status, body) = post(app(r#"{"table":[]}"#), "/api/file/image-to-excel", page("x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_data_found");
}

// ── File routes ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_to_excel_shape() {
    let reply = r#"{"table":[{"Item":"Tea","Qty":2},{"Item":"Cake","Qty":1}]}"#;

    let (status, body) = post(app(reply), "/api/file/image-to-excel", page("Tea 2\nCake 1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "data": [{ "Item": "Tea", "Qty": "2" }, { "Item": "Cake", "Qty": "1" }],
            "rowCount": 2,
            "ocrLength": 12
        })
    );
}

#[tokio::test]
async fn image_to_csv_shape() {
    let (status, body) = post(app("a,b\n1,2"), "/api/file/image-to-csv", page("x")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["csv"], "a,b\n1,2");
    assert_eq!(body["rowCount"], 2);
    assert_eq!(body["columnCount"], 2);
    assert_eq!(body["preview"], json!([["a", "b"], ["1", "2"]]));
}

// ── AI routes ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_echoes_prompt_type() {
    let req = json!({ "promptType": "summarizing", "text": "A long text." });

    let (status, body) = post(app("Short."), "/api/ai/generate", req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "text": "Short.", "promptType": "summarizing" })
    );
}

#[tokio::test]
async fn generate_without_prompt_type_is_400() {
    let req = json!({ "text": "A long text." });
    let (status, body) = post(app("Short."), "/api/ai/generate", req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide a prompt type");
}

// ── CORS ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn configured_origin_is_allowed() {
    use tower::ServiceExt;

    let pipeline = Pipeline::new(
        Arc::new(EchoOcr),
        Arc::new(FixedChat("")),
        None,
        PipelineConfig::default(),
    );
    let app = router(Arc::new(pipeline), "http://localhost:4200/");
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/health")
        .header(header::ORIGIN, "http://localhost:4200")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:4200"
    );
}
