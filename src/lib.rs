//! # cv-analyzer
//!
//! Extract the text of an uploaded CV (PDF or scanned image) and get
//! structured feedback on it from a generative language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (bytes + declared MIME type)
//!  │
//!  ├─ 1. Classify   allow-list + 10 MiB ceiling, before any extraction
//!  ├─ 2. Extract    PDF text layer (pdf-extract) or OCR (Tesseract, eng+ara+fra)
//!  ├─ 3. Validate   ≥ 50 characters after trimming, else rejected
//!  ├─ 4. Analyse    one call to the model endpoint (Gemini)
//!  └─ 5. Report     filename, size, type, text, length, analysis
//! ```
//!
//! Every stage converts its own faults into a typed error; the first failure
//! ends the invocation and is reported once. See [`error`] for the taxonomy.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cv_analyzer::{AnalysisConfig, Pipeline, PipelineConfig, TracingObserver, UploadedDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let analysis = AnalysisConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let pipeline = Pipeline::from_config(PipelineConfig::default(), analysis)?;
//!
//!     let bytes = std::fs::read("resume.pdf")?;
//!     let doc = UploadedDocument::new("resume.pdf", "application/pdf", bytes);
//!     let report = pipeline.run(&doc, &TracingObserver).await?;
//!     println!("{}", report.ai_analysis);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `server`    | on      | axum HTTP service (`POST /api/upload`) |
//! | `cli`       | on      | the `cv-analyzer` binary (clap, indicatif, tracing-subscriber) |
//! | `tesseract` | off     | link libtesseract instead of running the `tesseract` executable |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    AnalysisConfig, AnalysisConfigBuilder, PageSeparator, PipelineConfig, PipelineConfigBuilder,
    ServerConfig,
};
pub use error::{AnalysisError, ConfigError, ErrorKind, ExtractionError, PipelineError};
pub use output::{Analysis, AnalysisReport, ExtractedText, SourceFormat, UploadedDocument};
pub use pipeline::analysis::{AnalysisGateway, GeminiGateway};
pub use pipeline::TextExtractor;
pub use process::{BatchItem, BatchMode, BatchOutput, Pipeline};
pub use progress::{
    DocumentProgress, ExtractionProgress, NoopObserver, ProgressObserver, TracingObserver,
};
