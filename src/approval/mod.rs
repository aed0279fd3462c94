//! Human approval gate.
//!
//! ```text
//! find_latest_artifact(exports/) ──▶ ApprovalGate::present
//!                                       ├─ record = Pending
//!                                       ├─ Reviewer::review  (preview + y/n prompt, unbounded wait)
//!                                       └─ record = Approved | Rejected  (terminal)
//! ```
//!
//! `Rejected` is a normal outcome, not an error.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;

use crate::config::ApprovalConfig;

pub const APPROVAL_PROMPT: &str = "Approve this video for upload? (y/n)";

// ---------------------------------------------------------------------------
// ApprovalError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("no .mp4 artifact found in {0}")]
    NoArtifact(PathBuf),

    #[error("input closed before a decision was made")]
    InputClosed,

    #[error("no decision recorded for {0}")]
    Undecided(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// ApprovalRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pending,
    Approved,
    Rejected,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Pending => "pending",
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }
}

/// One human decision about one artifact.
#[derive(Debug, Clone)]
pub struct ApprovalRecord {
    pub artifact_path: PathBuf,
    pub decision: Decision,
    pub presented_at: DateTime<Local>,
    /// Set when the record leaves `Pending`.
    pub decided_at: Option<DateTime<Local>>,
}

impl ApprovalRecord {
    pub fn pending(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            decision: Decision::Pending,
            presented_at: Local::now(),
            decided_at: None,
        }
    }

    /// Finalize a pending record.  A decided record is returned unchanged.
    pub fn decide(mut self, decision: Decision) -> Self {
        if self.decision == Decision::Pending && decision != Decision::Pending {
            self.decision = decision;
            self.decided_at = Some(Local::now());
        }
        self
    }

    pub fn is_approved(&self) -> bool {
        self.decision == Decision::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.decision == Decision::Rejected
    }
}

// ---------------------------------------------------------------------------
// Reviewer
// ---------------------------------------------------------------------------

/// Obtains a decision for an artifact.  May block indefinitely.
#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn review(&self, artifact: &Path) -> Result<Decision, ApprovalError>;
}

/// Ask on `output` and read answers from `input` until one is `y` or `n`.
pub fn prompt_decision<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
) -> Result<Decision, ApprovalError> {
    let mut line = String::new();
    loop {
        write!(output, "{APPROVAL_PROMPT} ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(ApprovalError::InputClosed);
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(Decision::Approved),
            "n" | "no" => return Ok(Decision::Rejected),
            _ => writeln!(output, "Please answer y or n.")?,
        }
    }
}

/// Opens the artifact in a viewer, then prompts on the terminal.
pub struct ConsoleReviewer {
    preview_command: String,
}

impl ConsoleReviewer {
    pub fn from_config(config: &ApprovalConfig) -> Self {
        Self {
            preview_command: config.preview_command.trim().to_string(),
        }
    }

    async fn preview(&self, artifact: &Path) {
        if self.preview_command.is_empty() {
            return;
        }
        let result = tokio::process::Command::new(&self.preview_command)
            .arg(artifact)
            .status()
            .await;
        match result {
            Ok(status) if status.success() => {
                log::info!("approval: opened {} for review", artifact.display())
            }
            Ok(status) => log::warn!("approval: {} exited with {status}", self.preview_command),
            Err(e) => log::warn!("approval: could not run {}: {e}", self.preview_command),
        }
    }
}

#[async_trait]
impl Reviewer for ConsoleReviewer {
    async fn review(&self, artifact: &Path) -> Result<Decision, ApprovalError> {
        self.preview(artifact).await;

        tokio::task::spawn_blocking(|| {
            let stdin = std::io::stdin();
            prompt_decision(stdin.lock(), std::io::stdout())
        })
        .await
        .map_err(|e| ApprovalError::Io(std::io::Error::other(e)))?
    }
}

// ---------------------------------------------------------------------------
// ApprovalGate
// ---------------------------------------------------------------------------

pub struct ApprovalGate {
    reviewer: Arc<dyn Reviewer>,
}

impl ApprovalGate {
    pub fn new(reviewer: Arc<dyn Reviewer>) -> Self {
        Self { reviewer }
    }

    pub async fn present(&self, artifact: &Path) -> Result<ApprovalRecord, ApprovalError> {
        let record = ApprovalRecord::pending(artifact);
        log::info!("approval: awaiting decision on {}", artifact.display());

        let decision = self.reviewer.review(artifact).await?;
        let record = record.decide(decision);

        log::info!("approval: {}", record.decision.label());
        Ok(record)
    }
}

/// Most recently modified `*.mp4` directly under `dir`.
pub fn find_latest_artifact(dir: &Path) -> Result<PathBuf, ApprovalError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApprovalError::NoArtifact(dir.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let is_mp4 = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("mp4"))
            .unwrap_or(false);
        if !is_mp4 || !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| ApprovalError::NoArtifact(dir.to_path_buf()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    struct FixedReviewer(Decision);

    #[async_trait]
    impl Reviewer for FixedReviewer {
        async fn review(&self, _artifact: &Path) -> Result<Decision, ApprovalError> {
            Ok(self.0)
        }
    }

    #[test]
    fn prompt_repeats_until_valid_answer() {
        let mut out = Vec::new();
        let decision = prompt_decision(Cursor::new("maybe\n\nY\n"), &mut out).unwrap();

        assert_eq!(decision, Decision::Approved);
        let shown = String::from_utf8(out).unwrap();
        assert_eq!(shown.matches(APPROVAL_PROMPT).count(), 3);
        assert_eq!(shown.matches("Please answer y or n.").count(), 2);
    }

    #[test]
    fn prompt_accepts_no() {
        let decision = prompt_decision(Cursor::new(" n \n"), Vec::new()).unwrap();
        assert_eq!(decision, Decision::Rejected);
    }

    #[test]
    fn prompt_eof_is_an_error() {
        let err = prompt_decision(Cursor::new("what\n"), Vec::new()).unwrap_err();
        assert!(matches!(err, ApprovalError::InputClosed));
    }

    #[test]
    fn decided_record_is_terminal() {
        let record = ApprovalRecord::pending("/x.mp4").decide(Decision::Rejected);
        assert!(record.is_rejected());
        assert!(record.decided_at.is_some());

        let again = record.clone().decide(Decision::Approved);
        assert!(again.is_rejected());
        assert_eq!(again.decided_at, record.decided_at);
    }

    #[tokio::test]
    async fn gate_records_reviewer_decision() {
        let gate = ApprovalGate::new(Arc::new(FixedReviewer(Decision::Approved)));
        let record = gate.present(Path::new("/exports/a.mp4")).await.unwrap();

        assert!(record.is_approved());
        assert_eq!(record.artifact_path, Path::new("/exports/a.mp4"));
        assert!(record.decided_at.unwrap() >= record.presented_at);
    }

    #[test]
    fn latest_artifact_by_mtime() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old.mp4");
        let new = dir.path().join("new.mp4");
        std::fs::write(&old, b"a").unwrap();
        std::fs::write(&new, b"b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"c").unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        assert_eq!(find_latest_artifact(dir.path()).unwrap(), new);
    }

    #[test]
    fn empty_exports_is_no_artifact() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            find_latest_artifact(dir.path()),
            Err(ApprovalError::NoArtifact(_))
        ));
        assert!(matches!(
            find_latest_artifact(&dir.path().join("missing")),
            Err(ApprovalError::NoArtifact(_))
        ));
    }
}
