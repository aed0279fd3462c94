//! Narration synthesis.
//!
//! [`SpeechSynthesizer`] turns the package narration into an audio file.
//! [`ElevenLabsSynthesizer`] streams the ElevenLabs text-to-speech response
//! straight to disk.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::{credential, SpeechConfig};

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech API key is not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("speech API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("speech synthesis returned no audio")]
    EmptyAudio,

    #[error("failed to write audio: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SpeechError {
    fn from(e: reqwest::Error) -> Self {
        SpeechError::Request(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into `output`, returning the number of bytes written.
    async fn synthesize(&self, text: &str, output: &Path) -> Result<u64, SpeechError>;
}

// ---------------------------------------------------------------------------
// ElevenLabsSynthesizer
// ---------------------------------------------------------------------------

pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl ElevenLabsSynthesizer {
    pub fn from_config(config: &SpeechConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.voice_id
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<u64, SpeechError> {
        let api_key = credential(self.config.api_key.clone()).ok_or(SpeechError::MissingApiKey)?;

        log::info!(
            "speech: synthesizing narration ({} chars)",
            text.chars().count()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", api_key)
            .header("accept", "audio/mpeg")
            .json(&serde_json::json!({
                "text": text,
                "model_id": self.config.model_id,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(output).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(SpeechError::EmptyAudio);
        }

        log::info!("speech: saved {} ({written} bytes)", output.display());
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
