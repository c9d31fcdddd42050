//! Pipeline stages for CV text extraction and analysis.
//!
//! Each submodule implements exactly one step. The extraction engines sit
//! behind [`TextExtractor`] so the coordinator in [`crate::process`] never
//! sees an engine's API, and tests can substitute scripted fakes.
//!
//! ## Data Flow
//!
//! ```text
//! classify ──▶ (ocr | pdf) ──▶ normalize ──▶ validate ──▶ analysis
//! (type/size)  (engines)       (cleanup)     (≥ 50 chars)  (model call)
//! ```
//!
//! 1. [`classify`] : allow-list and size ceiling; pure, no I/O
//! 2. [`ocr`]      : Tesseract over an image buffer, bounded by a semaphore
//! 3. [`pdf`]      : text layer of a PDF; runs in `spawn_blocking`
//! 4. [`normalize`]: deterministic whitespace/invisible-char cleanup
//! 5. [`analysis`] : the only stage with network I/O

pub mod analysis;
pub mod classify;
pub mod normalize;
pub mod ocr;
pub mod pdf;

use crate::error::ExtractionError;
use crate::progress::ExtractionProgress;
use async_trait::async_trait;
use bytes::Bytes;

/// One asynchronous operation: bytes in, text or a typed failure out.
///
/// Implementations convert every internal fault into [`ExtractionError`];
/// nothing else may escape. `progress` is for reporting only and must not
/// influence the returned value.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(
        &self,
        bytes: Bytes,
        progress: &dyn ExtractionProgress,
    ) -> Result<String, ExtractionError>;
}
