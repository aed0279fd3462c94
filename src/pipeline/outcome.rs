//! Tagged stage outcomes, fatal reasons and the user-facing run report.
//!
//! Every stage adapter returns a [`StageOutcome`]; the orchestrator turns it
//! into "continue", "recover" or "abort" in exactly one place.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::approval::ApprovalError;
use crate::archive::{ArchiveError, CleanupOutcome};
use crate::content::{describe, GenerationError, PackageError, Violation};
use crate::distribute::DistributionResult;
use crate::merge::MergeError;
use crate::render::RenderError;
use crate::source::SourceError;
use crate::speech::SpeechError;

use super::state::Stage;

// ---------------------------------------------------------------------------
// StageOutcome
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StageOutcome<T> {
    /// The stage succeeded; carry its product forward.
    Advance(T),
    /// The stage's input was rejected in a way the run can repair.
    Recoverable(Vec<Violation>),
    /// The run cannot continue.
    Fatal(FatalError),
}

impl<T> StageOutcome<T> {
    pub fn from_result<E>(result: Result<T, E>, fatal: impl FnOnce(E) -> FatalError) -> Self {
        match result {
            Ok(value) => StageOutcome::Advance(value),
            Err(e) => StageOutcome::Fatal(fatal(e)),
        }
    }
}

/// What the orchestrator does next after a stage.
#[derive(Debug)]
pub enum Flow<T> {
    Continue(T),
    Recover(Vec<Violation>),
}

// ---------------------------------------------------------------------------
// FatalError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FatalError {
    #[error("acquisition failed: {0}")]
    AcquisitionFailed(#[source] SourceError),

    #[error("generation failed: {0}")]
    GenerationFailed(#[source] GenerationError),

    #[error("content package could not be saved: {0}")]
    PackageUnavailable(#[source] PackageError),

    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(#[source] SpeechError),

    #[error("{0}")]
    RenderTimeout(#[source] RenderError),

    #[error("render failed: {0}")]
    RenderFailed(#[source] RenderError),

    #[error("merge failed: {0}")]
    MergeFailed(#[source] MergeError),

    #[error("{0}")]
    NoArtifact(#[source] ApprovalError),

    #[error("approval failed: {0}")]
    ApprovalFailed(#[source] ApprovalError),

    #[error("distribution input unavailable: {0}")]
    DistributionInput(#[source] PackageError),

    #[error("archive failed: {0}")]
    ArchiveFailed(#[source] ArchiveError),

    #[error("{}", describe(.violations))]
    Unrecovered {
        stage: Stage,
        violations: Vec<Violation>,
    },
}

impl FatalError {
    /// The stage the run was aborted at.
    pub fn stage(&self) -> Stage {
        match self {
            FatalError::AcquisitionFailed(_) => Stage::Acquire,
            FatalError::GenerationFailed(_) | FatalError::PackageUnavailable(_) => Stage::Generate,
            FatalError::SynthesisFailed(_) => Stage::Synthesize,
            FatalError::RenderTimeout(_) | FatalError::RenderFailed(_) => Stage::Render,
            FatalError::MergeFailed(_) => Stage::Merge,
            FatalError::NoArtifact(_) | FatalError::ApprovalFailed(_) => Stage::Approve,
            FatalError::DistributionInput(_) => Stage::Distribute,
            FatalError::ArchiveFailed(_) => Stage::Archive,
            FatalError::Unrecovered { stage, .. } => *stage,
        }
    }

    /// Map a watcher error onto the timeout / other split.
    pub fn from_render(e: RenderError) -> Self {
        if e.is_timeout() {
            FatalError::RenderTimeout(e)
        } else {
            FatalError::RenderFailed(e)
        }
    }

    pub fn from_approval(e: ApprovalError) -> Self {
        match e {
            ApprovalError::NoArtifact(_) => FatalError::NoArtifact(e),
            other => FatalError::ApprovalFailed(other),
        }
    }
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Terminal result of one CLI command.
#[derive(Debug)]
pub enum RunReport {
    /// `produce` finished with a merged artifact.
    Produced {
        word: String,
        fallback: bool,
        frames: usize,
        artifact: PathBuf,
    },
    /// The reviewer rejected the artifact; nothing was published.
    Rejected {
        artifact: PathBuf,
        cleanup: CleanupOutcome,
    },
    /// At least one platform published, or every platform skipped; the
    /// artifact is archived.  Platforms that failed are listed in `results`.
    Distributed {
        results: Vec<DistributionResult>,
        archived: PathBuf,
        cleanup: CleanupOutcome,
    },
    /// Some platform failed and none published; the artifact stays in exports.
    DistributionIncomplete {
        results: Vec<DistributionResult>,
        artifact: PathBuf,
    },
    Aborted { stage: Stage, reason: String },
}

impl RunReport {
    /// Multi-line causes (encoder stderr, API bodies) are folded onto one line.
    pub fn aborted(error: &FatalError) -> Self {
        let reason = error
            .to_string()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");
        RunReport::Aborted {
            stage: error.stage(),
            reason,
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            RunReport::Produced { .. } | RunReport::Rejected { .. } => true,
            RunReport::Distributed { results, .. } => !results.iter().any(|r| r.is_failed()),
            RunReport::DistributionIncomplete { .. } | RunReport::Aborted { .. } => false,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn results(&self) -> &[DistributionResult] {
        match self {
            RunReport::Distributed { results, .. }
            | RunReport::DistributionIncomplete { results, .. } => results,
            _ => &[],
        }
    }
}

fn write_results(f: &mut fmt::Formatter<'_>, results: &[DistributionResult]) -> fmt::Result {
    for r in results {
        writeln!(f, "  {r}")?;
    }
    Ok(())
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunReport::Produced {
                word,
                fallback,
                frames,
                artifact,
            } => {
                let source = if *fallback { " (fallback word)" } else { "" };
                write!(
                    f,
                    "produced {:?}{source}: {frames} frames -> {}",
                    word,
                    artifact.display()
                )
            }
            RunReport::Rejected { artifact, cleanup } => write!(
                f,
                "rejected {}; nothing published (cleanup: {cleanup:?})",
                artifact.display()
            ),
            RunReport::Distributed {
                results,
                archived,
                cleanup,
            } => {
                if self.is_success() {
                    writeln!(f, "distribution complete:")?;
                } else {
                    writeln!(f, "distribution partial (failed platforms were not retried):")?;
                }
                write_results(f, results)?;
                write!(f, "archived {} (cleanup: {cleanup:?})", archived.display())
            }
            RunReport::DistributionIncomplete { results, artifact } => {
                writeln!(f, "distribution incomplete:")?;
                write_results(f, results)?;
                write!(
                    f,
                    "nothing published; {} kept in place, fix the failing platform and re-run approve",
                    artifact.display()
                )
            }
            RunReport::Aborted { stage, reason } => write!(f, "aborted at {stage}: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
