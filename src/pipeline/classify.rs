//! Document classification: accept or reject before any extraction work.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::SourceFormat;

/// Check the declared MIME type against the allow-list, then the size
/// against the ceiling. The type is checked first so a 50 MB `.exe` is
/// reported as the wrong type rather than as too large.
pub fn classify(mime: &str, size: usize, config: &PipelineConfig) -> Result<(), PipelineError> {
    if !is_allowed(mime, config) {
        return Err(PipelineError::InvalidFileType {
            mime: mime.to_string(),
        });
    }
    check_size(size, config.max_file_size)
}

/// Size check on its own, for callers that learn the length before the
/// type (streamed uploads, file metadata).
pub fn check_size(size: usize, limit: usize) -> Result<(), PipelineError> {
    if size > limit {
        return Err(PipelineError::TooLarge { size, limit });
    }
    Ok(())
}

fn is_allowed(mime: &str, config: &PipelineConfig) -> bool {
    config
        .allowed_types
        .iter()
        .any(|t| t.eq_ignore_ascii_case(mime))
}

/// Pick the extractor for an accepted type.
///
/// `application/pdf` goes to the PDF extractor and any `image/*` to OCR.
/// `None` means the allow-list admitted a type nothing can read.
pub fn route(mime: &str) -> Option<SourceFormat> {
    let mime = mime.to_ascii_lowercase();
    if mime == "application/pdf" {
        Some(SourceFormat::Pdf)
    } else if mime.starts_with("image/") {
        Some(SourceFormat::Image)
    } else {
        None
    }
}
