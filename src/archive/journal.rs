//! Append-only markdown run journal (`HANDOVER.md`).

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

pub struct RunJournal {
    path: PathBuf,
}

impl RunJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, section: &str) -> std::io::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        write!(file, "\n{section}")
    }

    pub fn record_rejection(&self, artifact: &Path, at: DateTime<Local>) -> std::io::Result<()> {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| artifact.display().to_string());
        self.append(&format!(
            "## Rejection Log\n\n- **{}**: User rejected video `{name}`\n",
            at.to_rfc3339()
        ))
    }

    /// `archive_path` is shown relative to `root` when it lies beneath it.
    pub fn record_completion(
        &self,
        archive_path: &Path,
        root: &Path,
        at: DateTime<Local>,
    ) -> std::io::Result<()> {
        let shown = archive_path.strip_prefix(root).unwrap_or(archive_path);
        self.append(&format!(
            "\n---\n\n## Project Lifecycle: Completed\n\n\
             - **Completed at**: {}\n\
             - **Archived video**: `{}`\n\
             - **Status**: Distribution complete. Temp files cleaned.\n",
            at.to_rfc3339(),
            shown.display()
        ))
    }
}
