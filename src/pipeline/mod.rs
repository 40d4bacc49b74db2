//! Pipeline stages for OCR extraction and reshaping.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and remote services can be swapped behind their traits.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ocr ──▶ aggregate ──▶ reshape ──▶ sanitize
//! (base64)  (retry)  (pages)      (chat)      (JSON repair)
//! ```
//!
//! 1. [`input`]     validate MIME type and decode base64 / data URLs
//! 2. [`ocr`]       one OCR call per page through [`retry`]
//! 3. [`aggregate`] sequential pages with page markers, partial failure tolerated
//! 4. [`reshape`]   re-prompt a chat model for HTML or table rows
//! 5. [`sanitize`]  repair ladder for JSON-ish model output
//!
//! [`csv`] is a side path: one vision-chat call that reads tables as CSV.

pub mod aggregate;
pub mod csv;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod reshape;
pub mod retry;
pub mod sanitize;
