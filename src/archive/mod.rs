//! Archiving and transient-file cleanup.
//!
//! * [`Archiver::archive`] files an artifact under `permanent_archive/YYYY-MM-DD/`.
//! * [`Archiver::cleanup`] removes the transient working area, but only when
//!   the artifact exists and is strictly larger than the configured minimum.
//!   A missing or suspiciously small artifact leaves every input in place.
//! * [`RunJournal`] appends rejection and completion entries to `HANDOVER.md`.

pub mod journal;

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::{AppPaths, ArchiveConfig};

pub use journal::RunJournal;

// ---------------------------------------------------------------------------
// ArchiveError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("artifact {0} does not exist")]
    MissingArtifact(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ---------------------------------------------------------------------------
// CleanupOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Transient files removed; the artifact had `bytes` bytes.
    Removed { bytes: u64 },
    /// No artifact at the given path; nothing removed.
    SkippedMissing,
    /// Artifact at or below the minimum size; nothing removed.
    SkippedTooSmall { bytes: u64 },
}

impl CleanupOutcome {
    pub fn removed(&self) -> bool {
        matches!(self, CleanupOutcome::Removed { .. })
    }
}

// ---------------------------------------------------------------------------
// Archiver
// ---------------------------------------------------------------------------

pub struct Archiver {
    archive_dir: PathBuf,
    transient_dir: PathBuf,
    min_artifact_bytes: u64,
}

impl Archiver {
    pub fn new(
        archive_dir: impl Into<PathBuf>,
        transient_dir: impl Into<PathBuf>,
        min_artifact_bytes: u64,
    ) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            transient_dir: transient_dir.into(),
            min_artifact_bytes,
        }
    }

    pub fn from_config(config: &ArchiveConfig, paths: &AppPaths) -> Self {
        Self::new(&paths.archive_dir, &paths.temp_dir, config.min_artifact_bytes)
    }

    /// Move `artifact` into the archive folder for `date`, returning the new
    /// path.  Falls back to copy + delete across filesystems.
    pub fn archive(&self, artifact: &Path, date: NaiveDate) -> Result<PathBuf, ArchiveError> {
        if !artifact.is_file() {
            return Err(ArchiveError::MissingArtifact(artifact.to_path_buf()));
        }

        let dest_dir = self.archive_dir.join(date.format("%Y-%m-%d").to_string());
        std::fs::create_dir_all(&dest_dir).map_err(io_at(&dest_dir))?;

        let name = artifact
            .file_name()
            .ok_or_else(|| ArchiveError::MissingArtifact(artifact.to_path_buf()))?;
        let dest = dest_dir.join(name);

        if std::fs::rename(artifact, &dest).is_err() {
            std::fs::copy(artifact, &dest).map_err(io_at(&dest))?;
            std::fs::remove_file(artifact).map_err(io_at(artifact))?;
        }

        log::info!("archive: {} -> {}", artifact.display(), dest.display());
        Ok(dest)
    }

    /// Remove the transient working area if `artifact` clears the size gate.
    pub fn cleanup(&self, artifact: &Path) -> Result<CleanupOutcome, ArchiveError> {
        let bytes = match std::fs::metadata(artifact) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return Ok(CleanupOutcome::SkippedMissing),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!(
                    "cleanup: {} missing, keeping transient files",
                    artifact.display()
                );
                return Ok(CleanupOutcome::SkippedMissing);
            }
            Err(e) => return Err(io_at(artifact)(e)),
        };

        if bytes <= self.min_artifact_bytes {
            log::warn!(
                "cleanup: {} is only {bytes} bytes (minimum {}), keeping transient files",
                artifact.display(),
                self.min_artifact_bytes
            );
            return Ok(CleanupOutcome::SkippedTooSmall { bytes });
        }

        match std::fs::remove_dir_all(&self.transient_dir) {
            Ok(()) => log::info!("cleanup: removed {}", self.transient_dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("cleanup: {} already clean", self.transient_dir.display())
            }
            Err(e) => return Err(io_at(&self.transient_dir)(e)),
        }
        Ok(CleanupOutcome::Removed { bytes })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MIN: u64 = 1024;

    fn setup() -> (tempfile::TempDir, Archiver, PathBuf) {
        let dir = tempdir().unwrap();
        let temp = dir.path().join("temp");
        std::fs::create_dir_all(temp.join("frames")).unwrap();
        std::fs::write(temp.join("frames/frame000000.png"), b"png").unwrap();
        std::fs::write(temp.join("audio.mp3"), b"id3").unwrap();

        let archiver = Archiver::new(dir.path().join("permanent_archive"), &temp, MIN);
        (dir, archiver, temp)
    }

    fn artifact(dir: &Path, bytes: u64) -> PathBuf {
        let path = dir.join("exports/word_of_the_day.mp4");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, vec![0u8; bytes as usize]).unwrap();
        path
    }

    #[test]
    fn cleanup_runs_above_threshold() {
        let (dir, archiver, temp) = setup();
        let video = artifact(dir.path(), MIN + 1);

        let outcome = archiver.cleanup(&video).unwrap();
        assert_eq!(outcome, CleanupOutcome::Removed { bytes: MIN + 1 });
        assert!(!temp.exists());
        assert!(video.exists());
    }

    #[test]
    fn cleanup_skipped_one_byte_below_threshold() {
        let (dir, archiver, temp) = setup();
        let video = artifact(dir.path(), MIN - 1);

        let outcome = archiver.cleanup(&video).unwrap();
        assert_eq!(outcome, CleanupOutcome::SkippedTooSmall { bytes: MIN - 1 });
        assert!(temp.join("audio.mp3").exists());
    }

    #[test]
    fn cleanup_skipped_exactly_at_threshold() {
        let (dir, archiver, temp) = setup();
        let video = artifact(dir.path(), MIN);

        assert!(!archiver.cleanup(&video).unwrap().removed());
        assert!(temp.exists());
    }

    #[test]
    fn cleanup_skipped_without_artifact() {
        let (dir, archiver, temp) = setup();
        let outcome = archiver.cleanup(&dir.path().join("exports/none.mp4")).unwrap();
        assert_eq!(outcome, CleanupOutcome::SkippedMissing);
        assert!(temp.exists());
    }

    #[test]
    fn archive_files_under_date() {
        let (dir, archiver, _) = setup();
        let video = artifact(dir.path(), 10);
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        let dest = archiver.archive(&video, date).unwrap();
        assert_eq!(
            dest,
            dir.path()
                .join("permanent_archive/2026-03-14/word_of_the_day.mp4")
        );
        assert!(dest.exists());
        assert!(!video.exists());
    }

    #[test]
    fn archive_missing_artifact_fails() {
        let (dir, archiver, _) = setup();
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(matches!(
            archiver.archive(&dir.path().join("nope.mp4"), date),
            Err(ArchiveError::MissingArtifact(_))
        ));
    }
}
