//! Render-completion state machine.
//!
//! [`RenderJob::observe`] is the single transition function, fed one frame
//! count per poll tick:
//!
//! ```text
//!            count increased / count == 0
//!          ┌──────────────────────────────┐
//!          ▼                              │
//!      Running ──unchanged, > 0──▶ Stabilizing ──stable_ticks == threshold──▶ Complete
//!          │                              │
//!          └────── elapsed > timeout ─────┴──────────────────────────────────▶ TimedOut
//! ```
//!
//! `Complete` and `TimedOut` are absorbing.  Completion is evaluated before
//! the deadline on the same tick.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::time::Instant;

use crate::config::RenderConfig;

use super::RenderError;

// ---------------------------------------------------------------------------
// RenderStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Frames are still appearing (or none have appeared yet).
    Running,
    /// The count has been positive and unchanged for at least one poll.
    Stabilizing,
    Complete,
    TimedOut,
}

impl RenderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderStatus::Complete | RenderStatus::TimedOut)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RenderStatus::Running => "Running",
            RenderStatus::Stabilizing => "Stabilizing",
            RenderStatus::Complete => "Complete",
            RenderStatus::TimedOut => "TimedOut",
        }
    }
}

// ---------------------------------------------------------------------------
// WatchPolicy
// ---------------------------------------------------------------------------

/// Timing knobs of the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchPolicy {
    pub poll_interval: Duration,
    /// Consecutive unchanged, positive-count polls required for completion.
    pub debounce_threshold: u32,
    /// Hard ceiling measured from launch.
    pub timeout: Duration,
}

impl WatchPolicy {
    /// Zero values are clamped (1 ms interval, threshold 1).
    pub fn new(poll_interval: Duration, debounce_threshold: u32, timeout: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            debounce_threshold: debounce_threshold.max(1),
            timeout,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            config.debounce_threshold,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

// ---------------------------------------------------------------------------
// RenderJob
// ---------------------------------------------------------------------------

/// State of one watched render.  Owned and mutated only by the watcher.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Wall-clock launch time, for reporting.
    pub launched_at: DateTime<Local>,
    started_at: Instant,
    output_directory: PathBuf,
    frame_count: usize,
    stable_ticks: u32,
    status: RenderStatus,
}

impl RenderJob {
    pub fn new(output_directory: impl Into<PathBuf>, started_at: Instant) -> Self {
        Self {
            launched_at: Local::now(),
            started_at,
            output_directory: output_directory.into(),
            frame_count: 0,
            stable_ticks: 0,
            status: RenderStatus::Running,
        }
    }

    /// Apply one poll observation and return the resulting status.
    ///
    /// A terminal job ignores further observations.
    pub fn observe(&mut self, count: usize, now: Instant, policy: &WatchPolicy) -> RenderStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        if count > 0 && count == self.frame_count {
            self.stable_ticks += 1;
            self.status = if self.stable_ticks >= policy.debounce_threshold {
                RenderStatus::Complete
            } else {
                RenderStatus::Stabilizing
            };
        } else {
            // Progress, a shrinking directory, or still nothing on disk.
            self.stable_ticks = 0;
            self.status = RenderStatus::Running;
        }
        self.frame_count = count;

        if self.status != RenderStatus::Complete && self.elapsed(now) > policy.timeout {
            self.status = RenderStatus::TimedOut;
        }
        self.status
    }

    /// Force the job into `TimedOut` (deadline fired between ticks).
    pub fn expire(&mut self) {
        if !self.status.is_terminal() {
            self.status = RenderStatus::TimedOut;
        }
    }

    /// The error describing a timed-out job, distinguishing zero progress
    /// from a stall after partial progress.
    pub fn timeout_error(&self, now: Instant) -> RenderError {
        let waited = self.elapsed(now);
        if self.frame_count == 0 {
            RenderError::NoFrames { waited }
        } else {
            RenderError::Stalled {
                frames: self.frame_count,
                waited,
            }
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn stable_ticks(&self) -> u32 {
        self.stable_ticks
    }

    pub fn status(&self) -> RenderStatus {
        self.status
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
