//! Value types flowing through one pipeline invocation.
//!
//! All of these are request-scoped: created when an upload arrives, dropped
//! once the response is written. Nothing here is shared between invocations.

use crate::error::PipelineError;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// A single uploaded file, exactly as received.
///
/// The buffer is reference-counted so extractors that hop onto a blocking
/// thread can take a cheap clone instead of copying the payload.
#[derive(Clone)]
pub struct UploadedDocument {
    bytes: Bytes,
    mime_type: String,
    filename: String,
}

impl UploadedDocument {
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            filename: filename.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Declared MIME type, as sent by the client.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Which extractor produced a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Image,
    Pdf,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Image => f.write_str("image"),
            SourceFormat::Pdf => f.write_str("pdf"),
        }
    }
}

/// Text that passed the minimum-content check.
///
/// The only constructor is [`ExtractedText::validate`], so holding a value of
/// this type proves the text is at least `min_chars` characters long after
/// trimming. Short text is turned into
/// [`PipelineError::InsufficientContent`] and never surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedText {
    text: String,
    char_count: usize,
    source_format: SourceFormat,
}

impl ExtractedText {
    /// Trim `raw` and accept it if it holds at least `min_chars` characters.
    ///
    /// Characters are Unicode scalar values, so Arabic or accented text counts
    /// one per letter rather than one per byte.
    pub fn validate(
        raw: &str,
        source_format: SourceFormat,
        min_chars: usize,
    ) -> Result<Self, PipelineError> {
        let text = raw.trim();
        let char_count = text.chars().count();
        if char_count < min_chars {
            return Err(PipelineError::InsufficientContent {
                chars: char_count,
                minimum: min_chars,
            });
        }
        Ok(Self {
            text: text.to_string(),
            char_count,
            source_format,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn source_format(&self) -> SourceFormat {
        self.source_format
    }

    /// First `n` characters, for log lines.
    pub fn preview(&self, n: usize) -> String {
        self.text.chars().take(n).collect()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Model output. Opaque: the pipeline neither parses nor validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub narrative: String,
}

/// Terminal success value of a full pipeline run.
///
/// Serialises to the `data` object of the upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub filename: String,
    pub file_size: usize,
    pub file_type: String,
    pub extracted_text: String,
    pub text_length: usize,
    pub ai_analysis: String,
}

impl AnalysisReport {
    pub fn new(doc: &UploadedDocument, extracted: ExtractedText, analysis: Analysis) -> Self {
        let text_length = extracted.char_count();
        Self {
            filename: doc.filename().to_string(),
            file_size: doc.len(),
            file_type: doc.mime_type().to_string(),
            extracted_text: extracted.into_text(),
            text_length,
            ai_analysis: analysis.narrative,
        }
    }
}
