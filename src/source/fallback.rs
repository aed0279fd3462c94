//! Static local fallback records.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;

use super::{SourceError, WordRecord};

enum Origin {
    File(PathBuf),
    Records(Vec<WordRecord>),
}

/// Fixed collection of pre-validated word records.
///
/// A file-backed set is read lazily, only when a fallback is actually needed.
pub struct FallbackSet {
    origin: Origin,
}

impl FallbackSet {
    /// Set backed by a JSON array of [`WordRecord`]s.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self {
            origin: Origin::File(path.as_ref().to_path_buf()),
        }
    }

    /// In-memory set.
    pub fn from_records(records: Vec<WordRecord>) -> Self {
        Self {
            origin: Origin::Records(records),
        }
    }

    /// Read every entry.
    pub fn load(&self) -> Result<Vec<WordRecord>, SourceError> {
        match &self.origin {
            Origin::Records(records) => Ok(records.clone()),
            Origin::File(path) => {
                let data = std::fs::read_to_string(path).map_err(|e| {
                    SourceError::FallbackUnavailable(format!("{}: {e}", path.display()))
                })?;
                serde_json::from_str(&data).map_err(|e| {
                    SourceError::FallbackUnavailable(format!("{}: {e}", path.display()))
                })
            }
        }
    }

    /// Pick one entry at random.
    ///
    /// # Errors
    ///
    /// [`SourceError::FallbackUnavailable`] when the set cannot be read or is
    /// empty.
    pub fn pick(&self) -> Result<WordRecord, SourceError> {
        let entries = self.load()?;
        entries
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| SourceError::FallbackUnavailable("fallback set is empty".into()))
    }
}
