//! Structural contract for generated content packages.
//!
//! [`validate`] is a pure function over an untyped JSON candidate.  It checks
//! every field and reports all violations at once so the generator can feed
//! the complete list back to the backend as corrective context.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Exact number of definitions a package carries.
pub const DEFINITION_COUNT: usize = 3;
/// Exact number of on-screen phrases a package carries.
pub const ON_SCREEN_COUNT: usize = 2;
/// Narration ceiling, in characters.
pub const MAX_NARRATION_CHARS: usize = 240;
/// Every RGB channel of the background must be strictly below this value.
pub const DARK_CHANNEL_CEILING: u8 = 0x44;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("static regex"));

// ---------------------------------------------------------------------------
// Violation / ValidationResult
// ---------------------------------------------------------------------------

/// One violated field and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub reason: String,
}

impl Violation {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Outcome of [`validate`]: empty means the candidate is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_result(self) -> Result<(), Vec<Violation>> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self.violations)
        }
    }
}

/// Join violations into a single `; `-separated line.
pub fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

/// Check `candidate` against the content package contract.
///
/// ```
/// use wotd_reel::content::validate;
///
/// let candidate = serde_json::json!({
///     "word": "sonder",
///     "definitions": ["a", "b", "c"],
///     "narration": "Everyone you pass has a life as vivid as yours.",
///     "on_screen_text": ["You are an extra", "in their movie"],
///     "background_hex": "#1a1a2e"
/// });
/// assert!(validate(&candidate).is_ok());
/// ```
pub fn validate(candidate: &serde_json::Value) -> ValidationResult {
    let mut violations = Vec::new();

    if !candidate.is_object() {
        violations.push(Violation::new("package", "expected a JSON object"));
        return ValidationResult { violations };
    }

    match candidate["word"].as_str() {
        None => violations.push(Violation::new("word", "missing or not a string")),
        Some(word) => {
            if word.is_empty() {
                violations.push(Violation::new("word", "must not be empty"));
            } else if word.split_whitespace().count() != 1 || word.trim() != word {
                violations.push(Violation::new("word", "must be a single token"));
            }
            if word != word.to_lowercase() {
                violations.push(Violation::new("word", "must be lowercase"));
            }
        }
    }

    check_string_list(
        candidate,
        "definitions",
        DEFINITION_COUNT,
        &mut violations,
    );

    match candidate["narration"].as_str() {
        None => violations.push(Violation::new("narration", "missing or not a string")),
        Some(narration) => {
            let chars = narration.chars().count();
            if narration.trim().is_empty() {
                violations.push(Violation::new("narration", "must not be empty"));
            } else if chars > MAX_NARRATION_CHARS {
                violations.push(Violation::new(
                    "narration",
                    format!("{chars} characters, maximum is {MAX_NARRATION_CHARS}"),
                ));
            }
        }
    }

    check_string_list(
        candidate,
        "on_screen_text",
        ON_SCREEN_COUNT,
        &mut violations,
    );

    match candidate["background_hex"].as_str() {
        None => violations.push(Violation::new("background_hex", "missing or not a string")),
        Some(hex) => {
            if !HEX_COLOR.is_match(hex) {
                violations.push(Violation::new(
                    "background_hex",
                    format!("{hex:?} is not '#' followed by 6 hex digits"),
                ));
            } else if !is_dark(hex) {
                violations.push(Violation::new(
                    "background_hex",
                    format!("{hex} is too light, every channel must be below #444444"),
                ));
            }
        }
    }

    ValidationResult { violations }
}

fn check_string_list(
    candidate: &serde_json::Value,
    field: &'static str,
    expected: usize,
    violations: &mut Vec<Violation>,
) {
    let Some(items) = candidate[field].as_array() else {
        violations.push(Violation::new(field, "missing or not a list"));
        return;
    };

    if items.len() != expected {
        violations.push(Violation::new(
            field,
            format!("has {} items, expected exactly {expected}", items.len()),
        ));
    }
    if items
        .iter()
        .any(|item| item.as_str().map_or(true, |s| s.trim().is_empty()))
    {
        violations.push(Violation::new(field, "every item must be a non-empty string"));
    }
}

/// `hex` must already match the `#rrggbb` pattern.
fn is_dark(hex: &str) -> bool {
    (0..3).all(|i| {
        let start = 1 + i * 2;
        u8::from_str_radix(&hex[start..start + 2], 16)
            .map_or(false, |channel| channel < DARK_CHANNEL_CEILING)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
