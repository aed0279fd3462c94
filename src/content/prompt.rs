//! Prompt builder for content-package generation.
//!
//! [`PromptBuilder::build_chat`] returns a `(system_msg, user_msg)` pair for
//! an OpenAI-compatible chat endpoint.  On a retry the previous attempt's
//! violations are appended to the user message as corrective context.

use crate::source::WordRecord;

use super::schema::{Violation, MAX_NARRATION_CHARS, ON_SCREEN_COUNT};

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const SYSTEM_INSTRUCTION: &str = "\
You are a witty scientific communicator.
Use the provided word and 3 definitions to write a 15-second script.
Tone: Fast-paced, high-intelligence, slightly snarky.";

const OUTPUT_SCHEMA: &str = r##"{
  "word": "string - the word of the day, lowercase, one token",
  "definitions": "list of 3 definition strings",
  "narration": "string - max 240 characters, the spoken script",
  "on_screen_text": "list of exactly 2 short punchy phrases",
  "background_hex": "a dark, cinematic hex color code (e.g. #1a1a2e)"
}"##;

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds generation prompts.
///
/// ```rust
/// use wotd_reel::content::PromptBuilder;
/// use wotd_reel::source::WordRecord;
///
/// let word = WordRecord {
///     word: "sonder".into(),
///     phonetic: None,
///     definitions: vec!["a".into(), "b".into(), "c".into()],
/// };
/// let (system, user) = PromptBuilder::new().build_chat(&word, &[]);
/// assert!(system.contains("scientific communicator"));
/// assert!(user.contains("Word: sonder"));
/// ```
#[derive(Debug, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a **(system_msg, user_msg)** pair.
    ///
    /// `feedback` holds the violations of the previous attempt; empty on the
    /// first attempt.
    pub fn build_chat(&self, word: &WordRecord, feedback: &[Violation]) -> (String, String) {
        let mut user_msg = String::with_capacity(1024);

        user_msg.push_str(&format!("Word: {}\n", word.word));
        user_msg.push_str(&format!(
            "Phonetic: {}\n",
            word.phonetic.as_deref().unwrap_or("")
        ));
        user_msg.push_str("Definitions:\n");
        for (i, def) in word.definitions.iter().enumerate() {
            user_msg.push_str(&format!("  {}. {}\n", i + 1, def));
        }

        user_msg.push_str("\nReturn ONLY valid JSON with these exact keys:\n");
        user_msg.push_str(OUTPUT_SCHEMA);
        user_msg.push_str(&format!(
            "\n\nConstraints:\n\
             - word must be the word above, lowercase, a single token\n\
             - definitions must have exactly 3 items\n\
             - narration must be <= {MAX_NARRATION_CHARS} characters\n\
             - on_screen_text must have exactly {ON_SCREEN_COUNT} items\n\
             - background_hex must be a dark color (every channel below #444444)\n\
             - No markdown fences, no commentary, raw JSON only.\n"
        ));

        if !feedback.is_empty() {
            user_msg.push_str("\nYour previous answer was rejected:\n");
            for violation in feedback {
                user_msg.push_str(&format!("- {violation}\n"));
            }
            user_msg.push_str("Fix every item above and answer again.\n");
        }

        (SYSTEM_INSTRUCTION.to_string(), user_msg)
    }
}

/// Strip an optional markdown code fence around a model response.
///
/// ```
/// use wotd_reel::content::strip_fences;
///
/// assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
/// assert_eq!(strip_fences("  {\"a\":1} "), "{\"a\":1}");
/// ```
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. `json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
