//! Word acquisition.
//!
//! * [`WordRecord`] — raw word data handed to the content generator.
//! * [`WordSource`] — async trait for live sources.
//! * [`DictionaryScraper`] — scrapes the Dictionary.com word of the day.
//! * [`FallbackSet`] — static local records used when the live source fails.
//! * [`SourceAcquirer`] — live-first acquisition with alert + fallback.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wotd_reel::alert::EmailAlerter;
//! use wotd_reel::config::{AppConfig, AppPaths};
//! use wotd_reel::source::{DictionaryScraper, FallbackSet, SourceAcquirer};
//!
//! # async fn example() {
//! let config = AppConfig::default();
//! let paths = AppPaths::new(".");
//! let acquirer = SourceAcquirer::new(
//!     Arc::new(DictionaryScraper::from_config(&config.source)),
//!     FallbackSet::from_file(&paths.fallback_file),
//!     Arc::new(EmailAlerter::from_config(&config.alert)),
//! );
//! let acquired = acquirer.acquire().await.unwrap();
//! println!("{} (fallback: {})", acquired.record.word, acquired.fallback);
//! # }
//! ```

pub mod acquirer;
pub mod dictionary;
pub mod fallback;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use acquirer::{AcquiredWord, SourceAcquirer};
pub use dictionary::{parse_wotd_page, DictionaryScraper};
pub use fallback::FallbackSet;

// ---------------------------------------------------------------------------
// WordRecord
// ---------------------------------------------------------------------------

/// Raw word-of-the-day data.  Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    pub word: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phonetic: Option<String>,
    pub definitions: Vec<String>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP transport or status error from the live source.
    #[error("request failed: {0}")]
    Request(String),

    #[error("live source timed out")]
    Timeout,

    /// The page arrived but did not contain a usable word.
    #[error("could not parse word of the day: {0}")]
    Parse(String),

    /// The local fallback set is missing, unreadable or empty.
    #[error("no fallback word available: {0}")]
    FallbackUnavailable(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// WordSource trait
// ---------------------------------------------------------------------------

/// A live word source.  Any error makes the acquirer fall back.
#[async_trait]
pub trait WordSource: Send + Sync {
    async fn fetch(&self) -> Result<WordRecord, SourceError>;
}
