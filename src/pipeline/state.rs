//! Run stages and the per-run aggregate.
//!
//! ```text
//! produce:  Acquire ─▶ Generate ─▶ { Render ∥ Synthesize } ─▶ Merge
//! approve:  Approve ─▶ Distribute ─▶ Archive
//! ```

use std::fmt;
use std::path::PathBuf;

use crate::approval::ApprovalRecord;
use crate::content::ContentPackage;
use crate::distribute::DistributionResult;
use crate::render::RenderJob;
use crate::source::AcquiredWord;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquire,
    Generate,
    Synthesize,
    Render,
    Merge,
    Approve,
    Distribute,
    Archive,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Generate => "generate",
            Stage::Synthesize => "synthesize",
            Stage::Render => "render",
            Stage::Merge => "merge",
            Stage::Approve => "approve",
            Stage::Distribute => "distribute",
            Stage::Archive => "archive",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// PipelineRun
// ---------------------------------------------------------------------------

/// Everything one run has produced so far.  Dropped when the run ends.
#[derive(Debug, Default)]
pub struct PipelineRun {
    pub word: Option<AcquiredWord>,
    pub package: Option<ContentPackage>,
    pub render: Option<RenderJob>,
    pub artifact: Option<PathBuf>,
    pub approval: Option<ApprovalRecord>,
    pub results: Vec<DistributionResult>,
    current: Option<Stage>,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, stage: Stage) {
        log::info!("pipeline: ── {stage} ──");
        self.current = Some(stage);
    }

    /// The stage most recently entered.
    pub fn stage(&self) -> Option<Stage> {
        self.current
    }

    /// Whether the word came from the fallback set.
    pub fn used_fallback(&self) -> bool {
        self.word.as_ref().map(|w| w.fallback).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_tracks_current_stage() {
        let mut run = PipelineRun::new();
        assert_eq!(run.stage(), None);
        run.enter(Stage::Render);
        assert_eq!(run.stage(), Some(Stage::Render));
        assert_eq!(Stage::Render.to_string(), "render");
    }

    #[test]
    fn fallback_flag_defaults_false() {
        assert!(!PipelineRun::new().used_fallback());
    }
}
