//! Stage sequencing for the two CLI commands.
//!
//! * [`Stage`] / [`PipelineRun`] — stage labels and the per-run aggregate.
//! * [`StageOutcome`] / [`FatalError`] — tagged stage results.
//! * [`RunReport`] — what the binary prints and turns into an exit code.
//! * [`PipelineOrchestrator`] — the sequencer itself.

pub mod outcome;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use outcome::{FatalError, Flow, RunReport, StageOutcome};
pub use runner::{Collaborators, PipelineOrchestrator};
pub use state::{PipelineRun, Stage};
