//! Configuration for the extraction pipeline and the analysis gateway.
//!
//! Both configs are plain values built once at process start (by the binary,
//! from flags and environment) and handed to the components that need them.
//! Library code never reads the process environment on its own, so tests can
//! inject any credential or endpoint they like.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Trimmed character count below which extracted text is rejected.
pub const DEFAULT_MIN_CHARS: usize = 50;

/// MIME types accepted by default.
pub const DEFAULT_ALLOWED_TYPES: [&str; 4] =
    ["image/png", "image/jpeg", "image/jpg", "application/pdf"];

/// Tesseract language set. CVs arrive in any of these scripts and the MIME
/// type says nothing about which one, so all three are loaded together.
pub const DEFAULT_OCR_LANGUAGES: &str = "eng+ara+fra";

/// Settings for classification and extraction.
///
/// # Example
/// ```rust
/// use cv_analyzer::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .min_chars(80)
///     .ocr_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.min_chars, 80);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upload ceiling in bytes. Default: 10 MiB.
    pub max_file_size: usize,

    /// Declared MIME types accepted by the classifier.
    pub allowed_types: Vec<String>,

    /// Minimum trimmed character count. Default: 50.
    pub min_chars: usize,

    /// Separator placed between PDF pages. Default: blank line.
    pub page_separator: PageSeparator,

    /// Tesseract `-l` argument. Default: `eng+ara+fra`.
    pub ocr_languages: String,

    /// Path or name of the `tesseract` executable.
    pub tesseract_path: String,

    /// Engine permits: how many OCR jobs may run at once. Extra jobs queue.
    pub ocr_concurrency: usize,

    /// Deadline for one OCR call. `None` waits for the engine indefinitely.
    pub ocr_timeout_secs: Option<u64>,

    /// Deadline for one PDF parse. `None` waits indefinitely.
    pub pdf_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(|s| s.to_string()).collect(),
            min_chars: DEFAULT_MIN_CHARS,
            page_separator: PageSeparator::default(),
            ocr_languages: DEFAULT_OCR_LANGUAGES.to_string(),
            tesseract_path: "tesseract".to_string(),
            ocr_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2),
            ocr_timeout_secs: None,
            pdf_timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn ocr_timeout(&self) -> Option<Duration> {
        self.ocr_timeout_secs.map(Duration::from_secs)
    }

    pub fn pdf_timeout(&self) -> Option<Duration> {
        self.pdf_timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn min_chars(mut self, n: usize) -> Self {
        self.config.min_chars = n;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn ocr_languages(mut self, langs: impl Into<String>) -> Self {
        self.config.ocr_languages = langs.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<String>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn ocr_concurrency(mut self, n: usize) -> Self {
        self.config.ocr_concurrency = n.max(1);
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = Some(secs);
        self
    }

    pub fn pdf_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pdf_timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let c = &self.config;
        if c.max_file_size == 0 {
            return Err(ConfigError("max_file_size must be > 0".into()));
        }
        if c.allowed_types.is_empty() {
            return Err(ConfigError("allowed_types must not be empty".into()));
        }
        if c.min_chars == 0 {
            return Err(ConfigError("min_chars must be ≥ 1".into()));
        }
        if c.ocr_languages.trim().is_empty() {
            return Err(ConfigError("ocr_languages must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// How to separate pages in text extracted from a PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Blank line between pages. (default)
    #[default]
    BlankLine,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// Page marker: "\n\n--- Page N ---\n\n"
    PageMarker,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed *before* `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::BlankLine => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::PageMarker => format!("\n\n--- Page {} ---\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

// ── Analysis ─────────────────────────────────────────────────────────────

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Settings for the language-model call.
///
/// `api_key` is optional here so a process can start without one; the
/// gateway reports [`crate::error::AnalysisError::MissingCredentials`] before
/// attempting any request.
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Credential for the model endpoint.
    pub api_key: Option<String>,

    /// Model identifier. Default: `gemini-2.0-flash`.
    pub model: String,

    /// Endpoint root. Overridable for proxies and tests.
    pub base_url: String,

    /// Sampling temperature. Default: 0.4.
    pub temperature: f32,

    /// Output token cap. Default: 4096.
    pub max_output_tokens: u32,

    /// Replaces the built-in review instructions when set.
    pub system_prompt: Option<String>,

    /// Deadline for one HTTP attempt. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,

    /// Extra attempts on transient failures. Default: 0 (single attempt).
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt.
    pub retry_backoff_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            temperature: 0.4,
            max_output_tokens: 4096,
            system_prompt: None,
            timeout_secs: None,
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl AnalysisConfig {
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// True when a non-blank credential is present.
    pub fn has_credentials(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ConfigError("model must not be empty".into()));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ConfigError(format!(
                "base_url must be an http(s) URL, got '{}'",
                c.base_url
            )));
        }
        if c.max_output_tokens == 0 {
            return Err(ConfigError("max_output_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// Bind address and CORS switch for the HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind. Default: `0.0.0.0`.
    pub host: String,

    /// TCP port. Default: 3001.
    pub port: u16,

    /// Allow any origin. Default: true.
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            enable_cors: true,
        }
    }
}
