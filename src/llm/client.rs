use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Failure of a single generation call
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The provider rejected the model identifier (unknown or not authorized)
    #[error("model {model} unavailable: {message}")]
    ModelUnavailable { model: String, message: String },
    /// Timeout, transport error, malformed or empty response
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

impl GenerationError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::GenerationFailed(message.into())
    }

    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. })
    }
}

/// The sole LLM boundary of the pipeline
#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    /// Generate text for a prompt with the given model identifier
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<String, GenerationError>;
}

/// Default ranked model list, most preferred first
pub const DEFAULT_MODELS: &[&str] = &[
    "models/gemini-2.5-flash",
    "models/gemini-2.0-flash-exp",
    "models/gemini-2.0-flash",
    "models/gemini-flash-latest",
];

/// Configuration for the Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key (from GEMINI_API_KEY env var)
    pub api_key: String,
    /// Preferred model (from GEMINI_WRITER_MODEL), tried before the ranked list
    pub preferred_model: Option<String>,
    pub base_url: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// Per-request timeout
    pub timeout: Duration,
    /// How many times a rate-limited request is re-issued after backing off
    pub max_rate_limit_retries: u32,
}

impl GeminiConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY environment variable not set")?;
        let preferred_model = std::env::var("GEMINI_WRITER_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty());

        Ok(Self {
            preferred_model,
            ..Self::new(api_key)
        })
    }

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            preferred_model: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.7,
            max_output_tokens: 8192,
            timeout: Duration::from_secs(180),
            max_rate_limit_retries: 2,
        }
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, model_id: &str) -> String {
        let model = if model_id.starts_with("models/") {
            model_id.to_string()
        } else {
            format!("models/{}", model_id)
        };
        format!("{}/{}:generateContent", self.config.base_url, model)
    }

    async fn send_once(&self, prompt: &str, model_id: &str) -> Result<Attempt, GenerationError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint(model_id))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::failed(format!("request to Gemini API failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let header = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok());
            return Ok(Attempt::RateLimited(retry_delay(header)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body, model_id));
        }

        let response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::failed(format!("malformed Gemini response: {}", e)))?;

        let text = response.text();
        if text.trim().is_empty() {
            return Err(GenerationError::failed(match response.block_reason() {
                Some(reason) => format!("empty response (blocked: {})", reason),
                None => "empty response".to_string(),
            }));
        }

        Ok(Attempt::Text(text))
    }
}

enum Attempt {
    Text(String),
    RateLimited(Duration),
}

#[async_trait]
impl TextGenerationClient for GeminiClient {
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<String, GenerationError> {
        let mut rate_limited = 0;

        loop {
            match self.send_once(prompt, model_id).await? {
                Attempt::Text(text) => {
                    debug!("{} returned {} chars", model_id, text.chars().count());
                    return Ok(text);
                }
                Attempt::RateLimited(delay) if rate_limited < self.config.max_rate_limit_retries => {
                    rate_limited += 1;
                    warn!(
                        "{} rate limited, retrying in {:.1}s ({}/{})",
                        model_id,
                        delay.as_secs_f64(),
                        rate_limited,
                        self.config.max_rate_limit_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Attempt::RateLimited(_) => {
                    return Err(GenerationError::failed(format!(
                        "{} still rate limited after {} retries",
                        model_id, rate_limited
                    )));
                }
            }
        }
    }
}

/// Backoff for a 429, from the `Retry-After` seconds value clamped to 0.5..=60s
fn retry_delay(header: Option<&str>) -> Duration {
    let seconds = header
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(1.0);
    Duration::from_secs_f64(seconds.max(0.5).min(60.0))
}

/// Map an unsuccessful HTTP response to the error taxonomy
fn classify_error(status: StatusCode, body: &str, model_id: &str) -> GenerationError {
    let model_rejected = status == StatusCode::NOT_FOUND
        || status == StatusCode::FORBIDDEN
        || body.contains("NOT_FOUND")
        || body.contains("PERMISSION_DENIED");

    if model_rejected {
        GenerationError::ModelUnavailable {
            model: model_id.to_string(),
            message: format!("{} - {}", status, body.trim()),
        }
    } else {
        GenerationError::failed(format!("Gemini API error: {} - {}", status, body.trim()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default()
    }

    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_response() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "첫 부분이다. "}, {"text": "둘째 부분이다."}],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        }"#;

        let response: GenerateResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.text(), "첫 부분이다. 둘째 부분이다.");
        assert!(response.block_reason().is_none());
    }

    #[test]
    fn test_blocked_response_has_no_text() {
        let json = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;

        let response: GenerateResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.text(), "");
        assert_eq!(response.block_reason(), Some("SAFETY"));
    }

    #[test]
    fn test_classify_error() {
        let not_found = classify_error(
            StatusCode::NOT_FOUND,
            r#"{"error": {"status": "NOT_FOUND"}}"#,
            "models/gemini-x",
        );
        assert!(not_found.is_model_unavailable());

        let forbidden = classify_error(StatusCode::FORBIDDEN, "", "models/gemini-x");
        assert!(forbidden.is_model_unavailable());

        let denied = classify_error(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"status": "PERMISSION_DENIED"}}"#,
            "models/gemini-x",
        );
        assert!(matches!(
            denied,
            GenerationError::ModelUnavailable { ref model, .. } if model == "models/gemini-x"
        ));

        let server = classify_error(StatusCode::INTERNAL_SERVER_ERROR, "oops", "models/gemini-x");
        assert!(!server.is_model_unavailable());
        assert!(server.to_string().contains("500"));
    }

    #[test]
    fn test_retry_delay() {
        assert_eq!(retry_delay(None), Duration::from_secs(1));
        assert_eq!(retry_delay(Some("0.1")), Duration::from_millis(500));
        assert_eq!(retry_delay(Some("120")), Duration::from_secs(60));
        assert_eq!(retry_delay(Some(" 7 ")), Duration::from_secs(7));
        assert_eq!(retry_delay(Some("Wed, 21 Oct 2026 07:28:00 GMT")), Duration::from_secs(1));
    }

    #[test]
    fn test_endpoint_adds_models_prefix() {
        let client = GeminiClient::new(GeminiConfig::new("key".to_string())).unwrap();

        assert_eq!(
            client.endpoint("gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            client.endpoint("models/gemini-2.0-flash"),
            client.endpoint("gemini-2.0-flash")
        );
    }
}
