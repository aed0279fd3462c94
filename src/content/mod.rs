//! Content generation and the schema-gated handoff.
//!
//! This module provides:
//! * [`validate`] — pure schema check returning every violated field.
//! * [`ContentPackage`] — the validated, immutable handoff artifact.
//! * [`TextBackend`] — async trait implemented by generative backends.
//! * [`ApiBackend`] — OpenAI-compatible chat-completions backend.
//! * [`ContentGenerator`] — bounded generate → validate → retry loop.
//! * [`PromptBuilder`] — builds generation prompts with corrective feedback.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wotd_reel::config::AppConfig;
//! use wotd_reel::content::{ApiBackend, ContentGenerator};
//! use wotd_reel::source::WordRecord;
//!
//! # async fn example(word: WordRecord) {
//! let config = AppConfig::default();
//! let generator = ContentGenerator::new(
//!     Arc::new(ApiBackend::from_config(&config.generator)),
//!     config.generator.max_attempts,
//! );
//! let package = generator.generate(&word).await.unwrap();
//! package.save_to(std::path::Path::new("data_bridge.json")).unwrap();
//! # }
//! ```

pub mod backend;
pub mod generator;
pub mod package;
pub mod prompt;
pub mod schema;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use backend::{ApiBackend, BackendError, TextBackend};
pub use generator::{Attempt, ContentGenerator, GenerationError};
pub use package::{ContentPackage, PackageError};
pub use prompt::{strip_fences, PromptBuilder};
pub use schema::{describe, validate, ValidationResult, Violation};
