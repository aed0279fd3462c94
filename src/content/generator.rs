//! Content generation with schema-gated retries.
//!
//! ```text
//! attempt 1 ──▶ backend ──▶ strip fences ──▶ parse ──▶ validate ──▶ Accepted
//!                                              │           │
//!                                              └── Rejected(violations) ──▶ attempt 2 (+feedback)
//! backend error ──▶ Failed ──▶ next attempt (no feedback)
//! all attempts used ──▶ GenerationError::Exhausted
//! ```
//!
//! Nothing is persisted here; the caller saves the accepted package.

use std::sync::Arc;

use thiserror::Error;

use crate::source::WordRecord;

use super::backend::{BackendError, TextBackend};
use super::package::ContentPackage;
use super::prompt::{strip_fences, PromptBuilder};
use super::schema::{describe, Violation};

// ---------------------------------------------------------------------------
// GenerationError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no valid content after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: String },
}

// ---------------------------------------------------------------------------
// Attempt
// ---------------------------------------------------------------------------

/// Result of one backend round trip.
#[derive(Debug)]
pub enum Attempt {
    /// The candidate passed validation.
    Accepted(ContentPackage),
    /// The candidate was parsed but broke the schema (or was not JSON).
    Rejected(Vec<Violation>),
    /// The backend itself failed.
    Failed(BackendError),
}

// ---------------------------------------------------------------------------
// ContentGenerator
// ---------------------------------------------------------------------------

pub struct ContentGenerator {
    backend: Arc<dyn TextBackend>,
    prompts: PromptBuilder,
    max_attempts: u32,
}

impl ContentGenerator {
    /// `max_attempts` is clamped to at least one.
    pub fn new(backend: Arc<dyn TextBackend>, max_attempts: u32) -> Self {
        Self {
            backend,
            prompts: PromptBuilder::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// One backend call plus validation.
    pub async fn attempt(&self, word: &WordRecord, feedback: &[Violation]) -> Attempt {
        let (system, user) = self.prompts.build_chat(word, feedback);

        let raw = match self.backend.complete(&system, &user).await {
            Ok(raw) => raw,
            Err(e) => return Attempt::Failed(e),
        };

        let candidate: serde_json::Value = match serde_json::from_str(strip_fences(&raw)) {
            Ok(value) => value,
            Err(e) => {
                return Attempt::Rejected(vec![Violation {
                    field: "package",
                    reason: format!("response is not valid JSON ({e})"),
                }])
            }
        };

        match ContentPackage::from_value(&candidate) {
            Ok(package) => Attempt::Accepted(package),
            Err(violations) => Attempt::Rejected(violations),
        }
    }

    /// Generate a validated package, retrying up to the attempt budget.
    pub async fn generate(&self, word: &WordRecord) -> Result<ContentPackage, GenerationError> {
        let mut feedback: Vec<Violation> = Vec::new();
        let mut last = String::from("no attempt made");

        for attempt in 1..=self.max_attempts {
            log::info!(
                "content: generating package for {:?} (attempt {attempt}/{})",
                word.word,
                self.max_attempts
            );

            match self.attempt(word, &feedback).await {
                Attempt::Accepted(package) => return Ok(package),
                Attempt::Rejected(violations) => {
                    last = describe(&violations);
                    log::warn!("content: attempt {attempt} rejected: {last}");
                    feedback = violations;
                }
                Attempt::Failed(e) => {
                    last = e.to_string();
                    log::warn!("content: attempt {attempt} failed: {last}");
                    feedback.clear();
                }
            }
        }

        Err(GenerationError::Exhausted {
            attempts: self.max_attempts,
            last,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
