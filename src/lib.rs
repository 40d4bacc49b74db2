//! # toolhub-ocr
//!
//! OCR extraction with retry and two-stage AI chaining, behind a small REST
//! surface.
//!
//! ## What it does
//!
//! A vision-OCR model reads an image or PDF into raw text. Optionally a second
//! chat model reshapes that text into styled HTML or a table of rows. Model
//! output is noisy, so table responses go through a ladder of JSON repairs
//! before they are trusted. Multi-page requests are processed one page at a
//! time, tolerating individual page failures.
//!
//! ## Pipeline Overview
//!
//! ```text
//! base64 / data URL
//!  │
//!  ├─ 1. Input      validate MIME type, decode
//!  ├─ 2. OCR        Mistral OCR, 3 attempts, 2 s apart, 120 s each
//!  ├─ 3. Aggregate  pages in order, 500 ms apart, "--- Page N ---" markers
//!  ├─ 4. Reshape    chat model → HTML or {"table": [...]}
//!  ├─ 5. Sanitize   fences → outer object → repairs → embedded array
//!  └─ 6. Output     text | text + html | rows
//! ```
//!
//! Two side paths share the same error taxonomy: image-to-CSV through a
//! vision-chat model, and a writing assistant with a closed set of tasks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use toolhub_ocr::{ExtractInput, OutputShape, Pipeline, PipelineConfig, RawImage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads MISTRAL_API_KEY for OCR and chat.
//!     let pipeline = Pipeline::from_config(PipelineConfig::default())?;
//!     let bytes = std::fs::read("register.jpg")?;
//!     let input = ExtractInput::Single(RawImage::from_bytes(&bytes, "image/jpeg"));
//!     let output = pipeline.process(&input, OutputShape::Table).await?;
//!     println!("{output:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum router for the `/api/*` endpoints |
//! | `cli`    | on      | the `toolhub` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable both when using only the library:
//! ```toml
//! toolhub-ocr = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod facade;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ChatSettings, PipelineConfig, PipelineConfigBuilder, RetryPolicy};
pub use error::{ConfigError, ErrorBody, PageError, PipelineError, UpstreamError};
pub use facade::{ExtractInput, OutputShape, Pipeline};
pub use generate::WritingTask;
pub use output::{
    AggregatedText, CsvTable, OcrResult, PageStatus, PipelineOutput, ReshapeResult, TableRow,
};
pub use pipeline::input::{PageInput, RawImage};
pub use pipeline::llm::{ChatBackend, ChatError, ChatRequest};
pub use pipeline::ocr::{OcrBackend, OcrError};
pub use pipeline::reshape::{ReshapeRequest, TargetShape};
pub use pipeline::sanitize::{parse_lenient, sanitize_json, FormatError};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{page_stream, PageStream};
