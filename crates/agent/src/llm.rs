//! Outbound LLM transport.
//!
//! `LlmClient` is the seam the extraction pipeline talks to; the rest of the
//! crate never sees HTTP. `GeminiClient` is the production implementation,
//! with bounded retries for the rate-limit and overload responses the Gemini
//! API is known to return under load.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use reserva_core::config::AnalyzerConfig;

const RETRY_BASE_DELAY_SECONDS: u64 = 2;
const RETRY_MAX_DELAY_SECONDS: u64 = 10;

/// Answer temperature is kept low: the analyzer must transcribe, not create.
const GENERATION_TEMPERATURE: f32 = 0.1;
const MAX_OUTPUT_TOKENS: u32 = 1024;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: secrecy::SecretString,
    timeout: Duration,
    max_attempts: u32,
}

impl GeminiClient {
    /// Builds a client from the analyzer config section. Returns `None` when
    /// no API key is configured, which the strategy chain reads as "analyzer
    /// not applicable".
    pub fn from_config(config: &AnalyzerConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let base_url = config.base_url.as_deref()?.trim_end_matches('/').to_string();
        Some(Self {
            client: reqwest::Client::new(),
            base_url,
            model: config.model.clone(),
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
            max_attempts: config.max_retries.max(1),
        })
    }

    async fn try_complete(&self, url: &str, body: &GenerateContentRequest<'_>) -> RequestOutcome {
        let response = match self
            .client
            .post(url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return RequestOutcome::Transport(e),
        };

        let status = response.status().as_u16();
        if status >= 400 {
            let detail = response.text().await.unwrap_or_default();
            return RequestOutcome::Rejected { status, detail };
        }

        match response.json::<GenerateContentResponse>().await {
            Ok(parsed) => match parsed.into_text() {
                Some(text) => RequestOutcome::Completed(text),
                None => RequestOutcome::Empty,
            },
            Err(e) => RequestOutcome::Transport(e),
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest::single_turn(prompt);

        let mut attempt = 1;
        loop {
            match self.try_complete(&url, &body).await {
                RequestOutcome::Completed(text) => return Ok(text),
                RequestOutcome::Empty => {
                    anyhow::bail!("analyzer response contained no candidates")
                }
                RequestOutcome::Rejected { status, detail } => {
                    if attempt >= self.max_attempts || !is_retryable(status, &detail) {
                        anyhow::bail!("analyzer request rejected with status {status}: {detail}");
                    }
                    let delay = compute_backoff(attempt);
                    tracing::warn!(
                        status,
                        attempt,
                        delay_secs = delay.as_secs(),
                        "analyzer overloaded, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                RequestOutcome::Transport(e) => {
                    if attempt >= self.max_attempts {
                        return Err(anyhow::Error::new(e).context("analyzer request failed"));
                    }
                    let delay = compute_backoff(attempt);
                    tracing::warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "analyzer transport error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
            attempt += 1;
        }
    }
}

enum RequestOutcome {
    Completed(String),
    Empty,
    Rejected { status: u16, detail: String },
    Transport(reqwest::Error),
}

/// Rate limits and overload are worth retrying; everything else (bad key,
/// malformed request) will not improve on a second attempt.
fn is_retryable(status: u16, detail: &str) -> bool {
    matches!(status, 429 | 503) || detail.contains("overloaded") || detail.contains("UNAVAILABLE")
}

fn compute_backoff(attempt: u32) -> Duration {
    let mut delay = RETRY_BASE_DELAY_SECONDS;
    for _ in 1..attempt {
        delay = delay.saturating_mul(2);
    }
    Duration::from_secs(delay.min(RETRY_MAX_DELAY_SECONDS))
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

impl<'a> GenerateContentRequest<'a> {
    fn single_turn(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent { parts: vec![RequestPart { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: GENERATION_TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: "application/json",
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()
            .map(|part| part.text)
    }
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}
