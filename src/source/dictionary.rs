//! Dictionary.com word-of-the-day scraper.
//!
//! The page embeds the current word as JSON inside
//! `<script id="json-current-wotd">`.  [`parse_wotd_page`] pulls that blob out
//! and maps it onto a [`WordRecord`]; the HTTP side is a single GET.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::config::SourceConfig;

use super::{SourceError, WordRecord, WordSource};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Number of definition lines every record carries.
const DEFINITION_COUNT: usize = 3;

static WOTD_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<script[^>]*\bid\s*=\s*["']json-current-wotd["'][^>]*>(.*?)</script>"#)
        .expect("static regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static regex"));

// ---------------------------------------------------------------------------
// DictionaryScraper
// ---------------------------------------------------------------------------

pub struct DictionaryScraper {
    client: reqwest::Client,
    url: String,
}

impl DictionaryScraper {
    pub fn from_config(config: &SourceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl WordSource for DictionaryScraper {
    async fn fetch(&self) -> Result<WordRecord, SourceError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Request(format!("HTTP {status} from {}", self.url)));
        }

        let html = response.text().await?;
        let record = parse_wotd_page(&html)?;
        log::info!(
            "source: scraped {:?} ({} definitions)",
            record.word,
            record.definitions.len()
        );
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Extract a [`WordRecord`] from the word-of-the-day page HTML.
///
/// Definitions are built from the part of speech + definition, the example
/// sentence and the explanation body, then padded or truncated to exactly
/// three entries.
///
/// ```
/// use wotd_reel::source::parse_wotd_page;
///
/// let html = r#"<script id="json-current-wotd">{"headword":"Sonder","definition":"a realization","partOfSpeech":"noun"}</script>"#;
/// let rec = parse_wotd_page(html).unwrap();
/// assert_eq!(rec.word, "sonder");
/// assert_eq!(rec.definitions[0], "(noun) a realization");
/// assert_eq!(rec.definitions.len(), 3);
/// ```
pub fn parse_wotd_page(html: &str) -> Result<WordRecord, SourceError> {
    let blob = WOTD_SCRIPT
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| SourceError::Parse("embedded word-of-the-day JSON not found".into()))?
        .as_str();

    let data: serde_json::Value =
        serde_json::from_str(blob.trim()).map_err(|e| SourceError::Parse(e.to_string()))?;

    let word = data["headword"]
        .as_str()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SourceError::Parse("missing headword".into()))?;

    let phonetic = data["pronunciation"]["phonetic"]["html"]
        .as_str()
        .map(strip_tags)
        .filter(|s| !s.is_empty())
        .map(|s| format!("[{s}]"));

    let mut definitions = Vec::new();

    let definition = text_field(&data, "definition");
    let pos = text_field(&data, "partOfSpeech");
    match (pos, definition) {
        (Some(pos), Some(def)) => definitions.push(format!("({pos}) {def}")),
        (None, Some(def)) => definitions.push(def),
        _ => {}
    }
    if let Some(example) = text_field(&data, "exampleSentence") {
        definitions.push(format!("Example: {example}"));
    }
    if let Some(body) = text_field(&data, "body") {
        definitions.push(body);
    }

    if definitions.is_empty() {
        return Err(SourceError::Parse(format!("no definitions for {word:?}")));
    }

    while definitions.len() < DEFINITION_COUNT {
        definitions.push(format!(
            "Used in context: The word '{word}' enriches any sentence."
        ));
    }
    definitions.truncate(DEFINITION_COUNT);

    Ok(WordRecord {
        word,
        phonetic,
        definitions,
    })
}

fn text_field(data: &serde_json::Value, key: &str) -> Option<String> {
    data[key]
        .as_str()
        .map(strip_tags)
        .filter(|s| !s.is_empty())
}

fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
