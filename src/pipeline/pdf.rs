//! PDF text extraction: read the text layer of each page, in document order.
//!
//! `pdf-extract` decodes content-stream text operators only. It never runs
//! JavaScript, forms or any other active content, and it works from the
//! in-memory buffer so nothing touches the filesystem.
//!
//! The parser is synchronous, CPU-bound and known to panic on some
//! malformed inputs, so it runs under `spawn_blocking`; a panic surfaces as
//! a `JoinError` and is converted like any other parse failure.

use crate::config::{PageSeparator, PipelineConfig};
use crate::error::ExtractionError;
use crate::pipeline::normalize::normalize_text;
use crate::pipeline::TextExtractor;
use crate::progress::ExtractionProgress;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, warn};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Extracts text from PDF buffers.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    separator: PageSeparator,
    timeout: Option<Duration>,
}

impl PdfExtractor {
    pub fn new(separator: PageSeparator, timeout: Option<Duration>) -> Self {
        Self { separator, timeout }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.page_separator.clone(), config.pdf_timeout())
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(
        &self,
        bytes: Bytes,
        _progress: &dyn ExtractionProgress,
    ) -> Result<String, ExtractionError> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::pdf(
                "not a valid PDF (missing %PDF header)",
            ));
        }

        let separator = self.separator.clone();
        let task = tokio::task::spawn_blocking(move || extract_blocking(&bytes, &separator));

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                warn!("PDF parse exceeded {:?}, abandoning", limit);
                ExtractionError::pdf(format!("timed out after {:?}", limit))
            })?,
            None => task.await,
        };

        joined.map_err(|e| ExtractionError::pdf(format!("parser task failed: {}", e)))?
    }
}

/// Blocking implementation of text extraction.
fn extract_blocking(bytes: &[u8], separator: &PageSeparator) -> Result<String, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractionError::pdf(e.to_string()))?;

    debug!("PDF parsed: {} pages", pages.len());
    Ok(join_pages(&pages, separator))
}

/// Normalise each page, drop the empty ones, and join the rest.
fn join_pages(pages: &[String], separator: &PageSeparator) -> String {
    let mut out = String::new();
    for (idx, raw) in pages.iter().enumerate() {
        let page = normalize_text(raw);
        if page.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str(&separator.render(idx + 1));
        }
        out.push_str(&page);
    }
    out
}
