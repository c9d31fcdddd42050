//! Pipeline coordinator: classify, extract, validate, analyse.
//!
//! One call to [`Pipeline::run`] handles one uploaded document and moves it
//! through a fixed sequence of states:
//!
//! ```text
//! Received ──▶ Classified ──▶ Extracting ──▶ Validated ──▶ Done
//!     │             │              │              │
//!     └─────────────┴──────────────┴──────────────┴──▶ Rejected(first error)
//! ```
//!
//! Stages run strictly in order and the first failure ends the invocation.
//! A `Pipeline` holds only immutable configuration and shared engine handles,
//! so one instance serves any number of concurrent invocations without
//! leaking state between them.

use crate::config::{AnalysisConfig, PipelineConfig};
use crate::error::{ConfigError, PipelineError};
use crate::output::{Analysis, AnalysisReport, ExtractedText, SourceFormat, UploadedDocument};
use crate::pipeline::analysis::{AnalysisGateway, GeminiGateway};
use crate::pipeline::pdf::PdfExtractor;
use crate::pipeline::{classify, ocr, TextExtractor};
use crate::progress::{DocumentProgress, ProgressObserver};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Length of the extracted-text preview written to debug logs.
const PREVIEW_CHARS: usize = 100;

/// The extraction/analysis coordinator.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    ocr: Arc<dyn TextExtractor>,
    pdf: Arc<dyn TextExtractor>,
    gateway: Arc<dyn AnalysisGateway>,
}

impl Pipeline {
    /// Assemble a pipeline from explicit parts. Tests use this to inject
    /// scripted extractors and gateways.
    pub fn new(
        config: PipelineConfig,
        ocr: Arc<dyn TextExtractor>,
        pdf: Arc<dyn TextExtractor>,
        gateway: Arc<dyn AnalysisGateway>,
    ) -> Self {
        Self {
            config,
            ocr,
            pdf,
            gateway,
        }
    }

    /// Production wiring: Tesseract, pdf-extract and the Gemini gateway.
    pub fn from_config(
        config: PipelineConfig,
        analysis: AnalysisConfig,
    ) -> Result<Self, ConfigError> {
        let ocr = ocr::engine_from_config(&config);
        let pdf = Arc::new(PdfExtractor::from_config(&config));
        let gateway = Arc::new(GeminiGateway::new(analysis)?);
        Ok(Self::new(config, ocr, pdf, gateway))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<dyn AnalysisGateway> {
        &self.gateway
    }

    /// Classify, extract and validate, without calling the model.
    pub async fn extract(
        &self,
        doc: &UploadedDocument,
        observer: &dyn ProgressObserver,
    ) -> Result<ExtractedText, PipelineError> {
        let result = self.extract_inner(doc, observer).await;
        finish(doc, &result, observer);
        result
    }

    async fn extract_inner(
        &self,
        doc: &UploadedDocument,
        observer: &dyn ProgressObserver,
    ) -> Result<ExtractedText, PipelineError> {
        let format = self.classify(doc)?;
        self.extract_classified(doc, format, observer).await
    }

    /// Full invocation: extraction followed by analysis.
    ///
    /// Analysis failure discards the extracted text; there is no partial
    /// success.
    pub async fn run(
        &self,
        doc: &UploadedDocument,
        observer: &dyn ProgressObserver,
    ) -> Result<AnalysisReport, PipelineError> {
        let result = self.run_inner(doc, observer).await;
        finish(doc, &result, observer);
        result
    }

    async fn run_inner(
        &self,
        doc: &UploadedDocument,
        observer: &dyn ProgressObserver,
    ) -> Result<AnalysisReport, PipelineError> {
        let start = Instant::now();
        let format = self.classify(doc)?;

        // No credential means every analysis would fail: stop before OCR.
        self.gateway.ensure_ready()?;

        let extracted = self.extract_classified(doc, format, observer).await?;

        observer.on_analysis_start(doc.filename());
        info!("{}: analysing {} chars", doc.filename(), extracted.char_count());
        let narrative = self.gateway.analyze(extracted.text()).await?;

        info!(
            "{}: Done in {}ms ({} chars analysed)",
            doc.filename(),
            start.elapsed().as_millis(),
            extracted.char_count()
        );
        Ok(AnalysisReport::new(doc, extracted, Analysis { narrative }))
    }

    // ── Received → Classified ────────────────────────────────────────────
    fn classify(&self, doc: &UploadedDocument) -> Result<SourceFormat, PipelineError> {
        info!(
            "{}: Received ({}, {} bytes)",
            doc.filename(),
            doc.mime_type(),
            doc.len()
        );
        classify::classify(doc.mime_type(), doc.len(), &self.config)?;

        let format = classify::route(doc.mime_type()).ok_or_else(|| {
            PipelineError::UnsupportedType {
                mime: doc.mime_type().to_string(),
            }
        })?;
        info!("{}: Classified as {}", doc.filename(), format);
        Ok(format)
    }

    // ── Classified → Extracting → Validated ──────────────────────────────
    async fn extract_classified(
        &self,
        doc: &UploadedDocument,
        format: SourceFormat,
        observer: &dyn ProgressObserver,
    ) -> Result<ExtractedText, PipelineError> {
        let extractor = match format {
            SourceFormat::Pdf => &self.pdf,
            SourceFormat::Image => &self.ocr,
        };

        observer.on_extraction_start(doc.filename(), format);
        info!("{}: Extracting", doc.filename());
        let start = Instant::now();
        let progress = DocumentProgress::new(doc.filename(), observer);
        let raw = extractor.extract(doc.bytes().clone(), &progress).await?;
        debug!(
            "{}: extractor returned {} chars in {}ms",
            doc.filename(),
            raw.chars().count(),
            start.elapsed().as_millis()
        );

        let text = ExtractedText::validate(&raw, format, self.config.min_chars)?;
        info!(
            "{}: Validated ({} chars)",
            doc.filename(),
            text.char_count()
        );
        debug!("{}: preview: {:?}", doc.filename(), text.preview(PREVIEW_CHARS));
        observer.on_extraction_complete(doc.filename(), text.char_count());
        Ok(text)
    }

    /// Run many documents with bounded concurrency.
    ///
    /// Results come back in input order regardless of completion order.
    pub async fn run_batch(
        &self,
        docs: Vec<UploadedDocument>,
        mode: BatchMode,
        concurrency: usize,
        observer: &dyn ProgressObserver,
    ) -> Vec<BatchItem> {
        let mut items: Vec<(usize, BatchItem)> =
            stream::iter(docs.into_iter().enumerate().map(|(idx, doc)| async move {
                let outcome = match mode {
                    BatchMode::ExtractOnly => {
                        self.extract(&doc, observer).await.map(BatchOutput::Extracted)
                    }
                    BatchMode::Analyze => self.run(&doc, observer).await.map(BatchOutput::Analyzed),
                };
                (
                    idx,
                    BatchItem {
                        filename: doc.filename().to_string(),
                        outcome,
                    },
                )
            }))
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        items.sort_by_key(|(idx, _)| *idx);
        items.into_iter().map(|(_, item)| item).collect()
    }
}

/// Log the terminal state and notify the observer.
fn finish<T>(
    doc: &UploadedDocument,
    result: &Result<T, PipelineError>,
    observer: &dyn ProgressObserver,
) {
    match result {
        Ok(_) => observer.on_finished(doc.filename(), None),
        Err(e) => {
            warn!("{}: Rejected ({:?}): {}", doc.filename(), e.kind(), e);
            observer.on_finished(doc.filename(), Some(&e.to_string()));
        }
    }
}

/// What [`Pipeline::run_batch`] does with each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Stop after validation; no model call, no credential needed.
    ExtractOnly,
    /// Full run including analysis.
    Analyze,
}

#[derive(Debug, Clone)]
pub enum BatchOutput {
    Extracted(ExtractedText),
    Analyzed(AnalysisReport),
}

#[derive(Debug, Clone)]
pub struct BatchItem {
    pub filename: String,
    pub outcome: Result<BatchOutput, PipelineError>,
}
