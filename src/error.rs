//! Error types for the cv-analyzer library.
//!
//! Three layers of error mirror the three stages of a pipeline run:
//!
//! * [`ExtractionError`]: returned by a [`crate::pipeline::TextExtractor`]
//!   when the OCR engine or the PDF parser cannot produce text.
//!
//! * [`AnalysisError`]: returned by a [`crate::pipeline::analysis::AnalysisGateway`]
//!   when the language-model call fails.
//!
//! * [`PipelineError`]: the single terminal error of one pipeline run. It
//!   wraps the two stage errors and adds the coordinator's own rejections
//!   (classification and the minimum-content threshold).
//!
//! Every error reports a flat [`ErrorKind`] so callers (the HTTP handler, the
//! CLI, tests) can branch on the failure category without matching on
//! variant payloads. No raw engine or library error crosses a stage boundary:
//! each stage stringifies its underlying fault into a `detail` field.

use serde::Serialize;
use thiserror::Error;

/// Flat failure category, one per row of the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidFileType,
    TooLarge,
    UnsupportedType,
    OcrFailure,
    PdfParseFailure,
    InsufficientContent,
    MissingCredentials,
    NetworkError,
    ApiError,
    MalformedResponse,
}

impl ErrorKind {
    /// Whether the caller can fix this failure by sending a different file.
    ///
    /// Extraction failures count as client errors: a corrupt image or an
    /// unreadable PDF is a property of the upload, not of the service.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidFileType
                | ErrorKind::TooLarge
                | ErrorKind::UnsupportedType
                | ErrorKind::OcrFailure
                | ErrorKind::PdfParseFailure
                | ErrorKind::InsufficientContent
        )
    }
}

/// Failure reported by a text extractor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// OCR engine error: corrupt image, unsupported codec, engine crash or timeout.
    #[error("OCR extraction failed: {detail}")]
    Ocr { detail: String },

    /// PDF is malformed, encrypted without a text layer, or the parser failed.
    #[error("PDF extraction failed: {detail}")]
    Pdf { detail: String },
}

impl ExtractionError {
    pub fn ocr(detail: impl Into<String>) -> Self {
        ExtractionError::Ocr {
            detail: detail.into(),
        }
    }

    pub fn pdf(detail: impl Into<String>) -> Self {
        ExtractionError::Pdf {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::Ocr { .. } => ErrorKind::OcrFailure,
            ExtractionError::Pdf { .. } => ErrorKind::PdfParseFailure,
        }
    }
}

/// Failure reported by the analysis gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// No credential configured for the model endpoint. Detected before any
    /// network call is attempted.
    #[error("Missing {provider} API key. {hint}")]
    MissingCredentials { provider: String, hint: String },

    /// Connection failure, TLS error, or deadline exceeded.
    #[error("Analysis request failed: {detail}")]
    Network { detail: String },

    /// The endpoint answered with a non-success HTTP status.
    #[error("Analysis service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The endpoint answered 2xx but the body was unparseable or held no text.
    #[error("Analysis service returned an unusable response: {detail}")]
    MalformedResponse { detail: String },
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::MissingCredentials { .. } => ErrorKind::MissingCredentials,
            AnalysisError::Network { .. } => ErrorKind::NetworkError,
            AnalysisError::Api { .. } => ErrorKind::ApiError,
            AnalysisError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    /// Network failures, rate limiting and 5xx responses may succeed on a
    /// later attempt. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            AnalysisError::Network { .. } => true,
            AnalysisError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Terminal error of one pipeline invocation.
///
/// Carries the first failure encountered; failures are never aggregated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    // ── Classification ────────────────────────────────────────────────────
    /// Declared MIME type is not on the allow-list.
    #[error("Invalid file type '{mime}'. Only pdf, png and jpg are allowed")]
    InvalidFileType { mime: String },

    /// Buffer exceeds the size ceiling.
    #[error("File size exceeds {}MB limit", .limit / (1024 * 1024))]
    TooLarge { size: usize, limit: usize },

    /// Allow-listed type with no extractor for it.
    #[error("Unsupported file type '{mime}'")]
    UnsupportedType { mime: String },

    // ── Extraction ────────────────────────────────────────────────────────
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Trimmed text is shorter than the minimum-content threshold.
    #[error("Could not extract meaningful text from file!")]
    InsufficientContent { chars: usize, minimum: usize },

    // ── Analysis ──────────────────────────────────────────────────────────
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidFileType { .. } => ErrorKind::InvalidFileType,
            PipelineError::TooLarge { .. } => ErrorKind::TooLarge,
            PipelineError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            PipelineError::Extraction(e) => e.kind(),
            PipelineError::InsufficientContent { .. } => ErrorKind::InsufficientContent,
            PipelineError::Analysis(e) => e.kind(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind().is_client_error()
    }
}

/// Builder validation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_display_in_megabytes() {
        let e = PipelineError::TooLarge {
            size: 11 * 1024 * 1024,
            limit: 10 * 1024 * 1024,
        };
        assert_eq!(e.to_string(), "File size exceeds 10MB limit");
        assert_eq!(e.kind(), ErrorKind::TooLarge);
    }

    #[test]
    fn insufficient_content_message_is_stable() {
        let e = PipelineError::InsufficientContent {
            chars: 0,
            minimum: 50,
        };
        assert_eq!(e.to_string(), "Could not extract meaningful text from file!");
        assert!(e.is_client_error());
    }

    #[test]
    fn api_error_display_embeds_status() {
        let e = PipelineError::from(AnalysisError::Api {
            status: 503,
            body: "overloaded".into(),
        });
        let msg = e.to_string();
        assert!(msg.contains("503"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::ApiError);
        assert!(!e.is_client_error());
    }

    #[test]
    fn missing_credentials_mentions_api_key() {
        let e = AnalysisError::MissingCredentials {
            provider: "Gemini".into(),
            hint: "Set GEMINI_API_KEY.".into(),
        };
        assert!(e.to_string().starts_with("Missing Gemini API key"));
        assert!(!e.kind().is_client_error());
    }

    #[test]
    fn extraction_failures_are_client_errors() {
        let ocr = PipelineError::from(ExtractionError::ocr("bad codec"));
        let pdf = PipelineError::from(ExtractionError::pdf("no xref"));
        assert_eq!(ocr.kind(), ErrorKind::OcrFailure);
        assert_eq!(pdf.kind(), ErrorKind::PdfParseFailure);
        assert!(ocr.is_client_error() && pdf.is_client_error());
        assert_eq!(ocr.to_string(), "OCR extraction failed: bad codec");
    }

    #[test]
    fn transient_classification() {
        assert!(AnalysisError::Network { detail: "reset".into() }.is_transient());
        assert!(AnalysisError::Api { status: 503, body: String::new() }.is_transient());
        assert!(AnalysisError::Api { status: 429, body: String::new() }.is_transient());
        assert!(!AnalysisError::Api { status: 401, body: String::new() }.is_transient());
        assert!(!AnalysisError::MalformedResponse { detail: "empty".into() }.is_transient());
    }
}
