//! Render watching.
//!
//! The renderer is an external program that writes PNG frames into a
//! directory and gives no reliable completion signal.  Completion is inferred
//! from the frame count holding steady:
//!
//! * [`RenderJob`] / [`RenderStatus`] — the pure debounce state machine.
//! * [`RenderWatcher`] — async poll loop with deadline and cancellation.
//! * [`CommandLauncher`] / [`RenderSession`] — the real child process.
//! * [`collect_frames`] — hands finished frames to the merger.

pub mod frames;
pub mod session;
pub mod state;
pub mod watcher;

use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// RenderError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer could not be launched: {0}")]
    Launch(String),

    #[error("render timed out after {waited:?} with no frames produced")]
    NoFrames { waited: Duration },

    #[error("render stalled at {frames} frame(s) and timed out after {waited:?}")]
    Stalled { frames: usize, waited: Duration },

    #[error("render cancelled")]
    Cancelled,

    #[error("frame directory error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RenderError::NoFrames { .. } | RenderError::Stalled { .. })
    }
}

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use frames::{collect_frames, count_frames, reset_dir, FRAME_PATTERN};
pub use session::{CommandLauncher, RenderCommand, RenderSession};
pub use state::{RenderJob, RenderStatus, WatchPolicy};
pub use watcher::{DirectoryFrames, FrameCounter, RenderLauncher, RenderProcess, RenderWatcher};
