//! The persisted content package handoff.
//!
//! A [`ContentPackage`] can only be obtained through [`ContentPackage::from_value`]
//! or [`ContentPackage::load_from`], both of which run the schema validator,
//! so an unvalidated package can never reach [`ContentPackage::save_to`].
//!
//! On disk the package is pretty-printed JSON with the keys `word`,
//! `definitions`, `narration`, `on_screen_text` and `background_hex`; the
//! render scene and the speech synthesizer read that file independently.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::schema::{describe, validate, Violation};

// ---------------------------------------------------------------------------
// PackageError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("content package I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("content package is not valid JSON: {0}")]
    Json(String),

    #[error("content package violates schema: {}", describe(.0))]
    Invalid(Vec<Violation>),
}

// ---------------------------------------------------------------------------
// ContentPackage
// ---------------------------------------------------------------------------

/// Validated, immutable content for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentPackage {
    word: String,
    definitions: Vec<String>,
    narration: String,
    on_screen_text: Vec<String>,
    #[serde(rename = "background_hex")]
    background_color: String,
}

/// Field-for-field mirror used only after validation succeeded.
#[derive(Deserialize)]
struct RawPackage {
    word: String,
    definitions: Vec<String>,
    narration: String,
    on_screen_text: Vec<String>,
    background_hex: String,
}

impl ContentPackage {
    /// Validate an untyped candidate and build the package from it.
    ///
    /// Unknown extra keys are ignored.
    pub fn from_value(candidate: &serde_json::Value) -> Result<Self, Vec<Violation>> {
        validate(candidate).into_result()?;

        let raw: RawPackage = serde_json::from_value(candidate.clone()).map_err(|e| {
            vec![Violation {
                field: "package",
                reason: e.to_string(),
            }]
        })?;

        Ok(Self {
            word: raw.word,
            definitions: raw.definitions,
            narration: raw.narration,
            on_screen_text: raw.on_screen_text,
            background_color: raw.background_hex,
        })
    }

    /// Read and re-validate a persisted package.
    pub fn load_from(path: &Path) -> Result<Self, PackageError> {
        let data = std::fs::read_to_string(path).map_err(|source| PackageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&data).map_err(|e| PackageError::Json(e.to_string()))?;
        Self::from_value(&value).map_err(PackageError::Invalid)
    }

    /// Persist as pretty JSON.
    ///
    /// Written to a sibling temp file first and renamed into place so readers
    /// never observe a half-written package.
    pub fn save_to(&self, path: &Path) -> Result<(), PackageError> {
        let io_err = |source| PackageError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| PackageError::Json(e.to_string()))?;

        let staging = path.with_extension("json.partial");
        std::fs::write(&staging, json).map_err(io_err)?;
        std::fs::rename(&staging, path).map_err(io_err)?;
        Ok(())
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn definitions(&self) -> &[String] {
        &self.definitions
    }

    pub fn narration(&self) -> &str {
        &self.narration
    }

    pub fn on_screen_text(&self) -> &[String] {
        &self.on_screen_text
    }

    pub fn background_color(&self) -> &str {
        &self.background_color
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
