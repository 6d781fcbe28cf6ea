//! Gemini REST client

use crate::client::ModelClient;
use crate::config::GenerationConfig;
use crate::error::{BlockReason, UpstreamError};
use crate::response::{FinishReason, LlmResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public endpoint of the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const RETRY_INFO_TYPE: &str = "type.googleapis.com/google.rpc.RetryInfo";

/// Calls `generateContent` over HTTPS.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build Gemini HTTP client: {e}"))?;
        Ok(Self {
            api_key: api_key.into().trim().to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn upstream_error(response: reqwest::Response) -> UpstreamError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        parse_error_body(status.as_u16(), &body)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, UpstreamError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationSettings {
                max_output_tokens: config.max_output_tokens,
                temperature: config.temperature,
                top_p: config.top_p,
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::message(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::message(format!("failed to parse Gemini response: {e}")))?;
        Ok(normalize_response(parsed))
    }

    async fn list_models(&self) -> Result<Vec<String>, UpstreamError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/models", self.base_url))
                .header("x-goog-api-key", &self.api_key)
                .query(&[("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| UpstreamError::message(e.to_string()))?;
            if !response.status().is_success() {
                return Err(Self::upstream_error(response).await);
            }

            let page: ModelList = response
                .json()
                .await
                .map_err(|e| UpstreamError::message(format!("failed to parse model list: {e}")))?;
            names.extend(generation_models(&page));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(names)
    }
}

/// Reduces a raw response to [`LlmResponse`].
fn normalize_response(response: GenerateResponse) -> LlmResponse {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            let block = match reason.as_str() {
                "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" => BlockReason::Safety,
                _ => BlockReason::Other,
            };
            return LlmResponse::blocked(block);
        }
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return LlmResponse::default();
    };

    let finish_reason = candidate.finish_reason.as_deref().map(FinishReason::from_name);
    let blocked = finish_reason.as_ref().and_then(FinishReason::block_reason);
    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    LlmResponse {
        text,
        finish_reason,
        blocked,
    }
}

/// Builds an [`UpstreamError`] from an error response body.
fn parse_error_body(status: u16, body: &str) -> UpstreamError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return UpstreamError::message(body.trim().to_string()).with_status(status);
    };

    let detail = envelope.error;
    let mut error =
        UpstreamError::message(detail.message).with_status(detail.code.unwrap_or(status));
    if let Some(status_text) = detail.status {
        error = error.with_status_text(status_text);
    }
    if let Some(delay) = detail
        .details
        .iter()
        .filter(|d| d.kind.as_deref() == Some(RETRY_INFO_TYPE))
        .find_map(|d| d.retry_delay.as_deref().and_then(parse_duration))
    {
        error = error.with_retry_delay(delay);
    }
    error
}

/// Parses protobuf JSON durations such as `"17s"` or `"0.5s"`.
fn parse_duration(value: &str) -> Option<Duration> {
    let seconds: f64 = value.strip_suffix('s')?.parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

fn generation_models(page: &ModelList) -> impl Iterator<Item = String> + '_ {
    page.models
        .iter()
        .filter(|m| {
            m.supported_generation_methods
                .iter()
                .any(|method| method == "generateContent")
        })
        .map(|m| m.name.rsplit('/').next().unwrap_or(&m.name).to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationSettings,
    safety_settings: Vec<SafetySetting<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct SafetySetting<'a> {
    category: &'a str,
    threshold: &'a str,
}

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
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<u16>,
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetailEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetailEntry {
    #[serde(rename = "@type")]
    kind: Option<String>,
    retry_delay: Option<String>,
}
