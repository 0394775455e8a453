//! Inference client: send assembled parts, return the report text.
//!
//! This module is intentionally thin — all prompt content lives in
//! [`crate::prompts`] and all part layout in [`crate::pipeline::request`],
//! so wire-format and transport concerns stay isolated here.
//!
//! ## One attempt, no retries
//!
//! A failed call surfaces immediately. Grading is a manual, interactive
//! flow: the user looks at the error and presses submit again, which is a
//! fresh submission. Automatic retry would only delay that feedback.
//!
//! ## Disabling extended deliberation
//!
//! `generationConfig.thinkingConfig.thinkingBudget: 0` pins the model to
//! direct-answer mode. Gap-fill comparison is pattern matching, not
//! multi-step reasoning; thinking tokens roughly triple latency and cost
//! here for no measurable accuracy gain.

use crate::config::GradingConfig;
use crate::error::GradeError;
use crate::pipeline::request::RequestPart;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Boxed future returned by [`InferenceClient::generate`].
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, GradeError>> + Send + 'a>>;

/// The seam between the pipeline and the remote model.
///
/// An explicit, injectable instance — constructed by the caller and passed
/// to the session — so tests substitute a scripted double and no hidden
/// process-wide client exists.
pub trait InferenceClient: Send + Sync {
    /// Send one request built from `parts`; resolve to the response's
    /// primary text or fail. Exactly one attempt.
    fn generate<'a>(&'a self, parts: &'a [RequestPart]) -> GenerateFuture<'a>;
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: &'a [RequestPart],
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: usize,
    #[serde(rename = "thinkingConfig")]
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
struct ThinkingConfig {
    #[serde(rename = "thinkingBudget")]
    thinking_budget: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate the first candidate's text parts.
    fn primary_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ── HTTP client ──────────────────────────────────────────────────────────

/// [`InferenceClient`] over the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GradingConfig,
}

impl GeminiClient {
    /// Build a client from the given config.
    ///
    /// An empty API key is accepted here: the endpoint rejects the first
    /// request with an auth error, which surfaces as
    /// [`GradeError::Transport`] exactly like any other remote failure.
    pub fn new(config: GradingConfig) -> Result<Self, GradeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| GradeError::Transport {
                detail: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate_inner(&self, parts: &[RequestPart]) -> Result<String, GradeError> {
        let start = Instant::now();
        let body = GenerateContentRequest {
            contents: [Content { parts }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_output_tokens,
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        debug!("Sending {} parts to {}", parts.len(), self.config.model);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() {
                    format!("timed out after {}s", self.config.api_timeout_secs)
                } else {
                    e.to_string()
                };
                warn!("Inference call failed: {detail}");
                GradeError::Transport { detail }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = format!("HTTP {}: {}", status, truncate(&body, 300));
            warn!("Inference call rejected: {detail}");
            return Err(GradeError::Transport { detail });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| GradeError::Transport {
                detail: format!("malformed response body: {e}"),
            })?;

        let text = parsed.primary_text().ok_or(GradeError::EmptyResponse)?;
        debug!(
            "Received {} chars in {:?}",
            text.len(),
            start.elapsed()
        );
        Ok(text)
    }
}

impl InferenceClient for GeminiClient {
    fn generate<'a>(&'a self, parts: &'a [RequestPart]) -> GenerateFuture<'a> {
        Box::pin(self.generate_inner(parts))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
