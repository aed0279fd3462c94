//! Core `TextBackend` trait and `ApiBackend` implementation.
//!
//! `ApiBackend` calls any OpenAI-compatible `/v1/chat/completions` endpoint
//! (OpenAI, Groq, Ollama in OpenAI mode, LM Studio, vLLM, …).  All connection
//! details come from [`GeneratorConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{credential, GeneratorConfig};

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Errors that can occur while calling the generative backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("backend request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse backend response: {0}")]
    Parse(String),

    /// The backend returned a response with no usable text content.
    #[error("backend returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// TextBackend trait
// ---------------------------------------------------------------------------

/// Async trait for a generative text backend.
///
/// Implementors must be `Send + Sync` so they can be held behind
/// `Arc<dyn TextBackend>`.
#[async_trait]
pub trait TextBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError>;
}

// ---------------------------------------------------------------------------
// ApiBackend
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct ApiBackend {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl ApiBackend {
    /// Build an `ApiBackend` from configuration.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`.
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl TextBackend for ApiBackend {
    /// The `Authorization: Bearer …` header is attached only when an API key
    /// is configured.
    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user",   "content": user   }
            ],
            "stream":      false,
            "temperature": self.config.temperature,
            "max_tokens":  1024
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = credential(self.config.api_key.clone()) {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(BackendError::EmptyResponse)?
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(BackendError::EmptyResponse);
        }

        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
