//! Analysis gateway: send extracted text to a generative model, get feedback.
//!
//! The gateway is the only network-facing stage. [`AnalysisGateway`] is the
//! seam: the coordinator depends on the trait, the binary wires in
//! [`GeminiGateway`], and tests substitute scripted fakes.
//!
//! ## Failure mapping
//!
//! | Condition                          | Error                  |
//! |------------------------------------|------------------------|
//! | no API key configured              | `MissingCredentials`   |
//! | connect / TLS / deadline failure   | `Network`              |
//! | non-2xx status                     | `Api { status, body }` |
//! | 2xx with unparseable or empty body | `MalformedResponse`    |
//!
//! A single attempt is made by default. With `max_retries > 0`, transient
//! failures (network, 429, 5xx) are retried with exponential backoff
//! (`retry_backoff_ms * 2^attempt`).

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, ConfigError};
use crate::prompts::build_analysis_prompt;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Longest upstream error body kept in an [`AnalysisError::Api`].
const MAX_ERROR_BODY: usize = 500;

/// Text in, model narrative or typed failure out.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Fail fast when the gateway cannot possibly succeed (no credential).
    ///
    /// Called by the coordinator before any extraction work so a
    /// misconfigured process does not burn OCR time on every upload.
    fn ensure_ready(&self) -> Result<(), AnalysisError> {
        Ok(())
    }

    async fn analyze(&self, text: &str) -> Result<String, AnalysisError>;
}

/// Google Gemini `generateContent` over HTTPS.
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    client: reqwest::Client,
    config: AnalysisConfig,
}

impl GeminiGateway {
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError(format!("HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str, AnalysisError> {
        match self.config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(AnalysisError::MissingCredentials {
                provider: "Gemini".to_string(),
                hint: "Set GEMINI_API_KEY.".to_string(),
            }),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    async fn send_once(
        &self,
        key: &str,
        body: &serde_json::Value,
    ) -> Result<String, AnalysisError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", key)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let text = response.text().await.map_err(network_error)?;

        if !status.is_success() {
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }
        parse_response(&text)
    }
}

#[async_trait]
impl AnalysisGateway for GeminiGateway {
    fn ensure_ready(&self) -> Result<(), AnalysisError> {
        self.api_key().map(|_| ())
    }

    async fn analyze(&self, text: &str) -> Result<String, AnalysisError> {
        let key = self.api_key()?;
        let prompt = build_analysis_prompt(text, self.config.system_prompt.as_deref());
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            }
        });

        let mut attempt: u32 = 0;
        loop {
            match self.send_once(key, &body).await {
                Ok(narrative) => {
                    debug!(
                        "Analysis complete: {} chars after {} retries",
                        narrative.chars().count(),
                        attempt
                    );
                    return Ok(narrative);
                }
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = backoff_ms(self.config.retry_backoff_ms, attempt);
                    warn!(
                        "Analysis attempt {} failed: {}; retry {}/{} after {}ms",
                        attempt, e, attempt, self.config.max_retries, backoff
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// saturating instead of overflowing.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    let factor = 2u64
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    base.saturating_mul(factor)
}

fn network_error(e: reqwest::Error) -> AnalysisError {
    let detail = if e.is_timeout() {
        format!("request timed out: {}", e)
    } else {
        e.to_string()
    };
    AnalysisError::Network { detail }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

// ── Response parsing ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn parse_response(body: &str) -> Result<String, AnalysisError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| AnalysisError::MalformedResponse {
            detail: format!("invalid JSON: {}", e),
        })?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AnalysisError::MalformedResponse {
            detail: format!("prompt blocked: {}", reason),
        });
    }

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::MalformedResponse {
            detail: "no candidates in response".to_string(),
        })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
        return Err(AnalysisError::MalformedResponse {
            detail: format!("empty completion (finish reason: {})", reason),
        });
    }
    Ok(text)
}
