//! Async render watcher.
//!
//! Launches the renderer, polls the frame directory on a fixed interval and
//! feeds each count into [`RenderJob::observe`].  The process is torn down on
//! every exit path.
//!
//! ```text
//! launch ──▶ loop select! (biased)
//!              ├─ cancel        ──▶ Err(Cancelled)
//!              ├─ tick ─▶ count ─▶ observe ─▶ Complete  ──▶ Ok(job)
//!              │                           └▶ TimedOut  ──▶ Err(NoFrames | Stalled)
//!              └─ deadline      ──▶ Err(NoFrames | Stalled)
//! teardown(process)
//! ```

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::frames::count_frames;
use super::state::{RenderJob, RenderStatus, WatchPolicy};
use super::RenderError;

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Counts the frames the renderer has produced so far.
#[async_trait]
pub trait FrameCounter: Send + Sync {
    fn directory(&self) -> &Path;
    async fn count(&self) -> io::Result<usize>;
}

/// A running renderer.
#[async_trait]
pub trait RenderProcess: Send {
    /// `Some(description)` once the process has exited on its own.
    fn exited(&mut self) -> Option<String>;
    /// Stop the process and everything it spawned.  Idempotent.
    async fn teardown(&mut self);
}

#[async_trait]
pub trait RenderLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn RenderProcess>, RenderError>;
}

// ---------------------------------------------------------------------------
// DirectoryFrames
// ---------------------------------------------------------------------------

/// Recursive `*.png` count of a directory, run off the async executor.
#[derive(Debug, Clone)]
pub struct DirectoryFrames {
    dir: PathBuf,
}

impl DirectoryFrames {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FrameCounter for DirectoryFrames {
    fn directory(&self) -> &Path {
        &self.dir
    }

    async fn count(&self) -> io::Result<usize> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || count_frames(&dir))
            .await
            .map_err(io::Error::other)?
    }
}

// ---------------------------------------------------------------------------
// RenderWatcher
// ---------------------------------------------------------------------------

pub struct RenderWatcher {
    policy: WatchPolicy,
}

impl RenderWatcher {
    pub fn new(policy: WatchPolicy) -> Self {
        Self { policy }
    }

    /// Launch and watch one render until it completes, times out or is
    /// cancelled.
    pub async fn run(
        &self,
        launcher: &dyn RenderLauncher,
        frames: &dyn FrameCounter,
        cancel: &CancellationToken,
    ) -> Result<RenderJob, RenderError> {
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }

        let mut process = launcher.launch().await?;
        let mut job = RenderJob::new(frames.directory(), Instant::now());
        log::info!(
            "render: watching {} (poll {:?}, threshold {}, timeout {:?})",
            frames.directory().display(),
            self.policy.poll_interval,
            self.policy.debounce_threshold,
            self.policy.timeout
        );

        let result = self.watch(&mut job, process.as_mut(), frames, cancel).await;
        process.teardown().await;

        match &result {
            Ok(()) => log::info!(
                "render: complete with {} frame(s) after {:?}",
                job.frame_count(),
                job.elapsed(Instant::now())
            ),
            Err(e) => log::error!("render: {e}"),
        }
        result.map(|()| job)
    }

    async fn watch(
        &self,
        job: &mut RenderJob,
        process: &mut dyn RenderProcess,
        frames: &dyn FrameCounter,
        cancel: &CancellationToken,
    ) -> Result<(), RenderError> {
        let expiry = tokio::time::sleep(self.policy.timeout);
        tokio::pin!(expiry);

        let mut ticker = tokio::time::interval(self.policy.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut exit_reported = false;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(RenderError::Cancelled),

                _ = ticker.tick() => {
                    let count = frames.count().await?;

                    if !exit_reported {
                        if let Some(status) = process.exited() {
                            log::warn!("render: renderer exited early ({status}); still watching frames");
                            exit_reported = true;
                        }
                    }

                    let now = Instant::now();
                    match job.observe(count, now, &self.policy) {
                        RenderStatus::Complete => return Ok(()),
                        RenderStatus::TimedOut => return Err(job.timeout_error(now)),
                        status => log::debug!(
                            "render: {count} frame(s), {} ({} stable)",
                            status.label(),
                            job.stable_ticks()
                        ),
                    }
                }

                _ = &mut expiry => {
                    job.expire();
                    return Err(job.timeout_error(Instant::now()));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Returns scripted counts, repeating the last one forever.
    struct ScriptedFrames {
        counts: Mutex<Vec<usize>>,
        polls: AtomicUsize,
        dir: PathBuf,
    }

    impl ScriptedFrames {
        fn new(counts: Vec<usize>) -> Self {
            Self {
                counts: Mutex::new(counts),
                polls: AtomicUsize::new(0),
                dir: PathBuf::from("/tmp/render-out"),
            }
        }
    }

    #[async_trait]
    impl FrameCounter for ScriptedFrames {
        fn directory(&self) -> &Path {
            &self.dir
        }

        async fn count(&self) -> io::Result<usize> {
            let i = self.polls.fetch_add(1, Ordering::SeqCst);
            let counts = self.counts.lock().unwrap();
            Ok(*counts.get(i).or(counts.last()).unwrap_or(&0))
        }
    }

    /// Increases by one frame on every poll.
    struct GrowingFrames(AtomicUsize, PathBuf);

    #[async_trait]
    impl FrameCounter for GrowingFrames {
        fn directory(&self) -> &Path {
            &self.1
        }

        async fn count(&self) -> io::Result<usize> {
            Ok(self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    struct FakeProcess {
        torn_down: Arc<AtomicBool>,
        exit_early: bool,
    }

    #[async_trait]
    impl RenderProcess for FakeProcess {
        fn exited(&mut self) -> Option<String> {
            self.exit_early.then(|| "exit status: 0".to_string())
        }

        async fn teardown(&mut self) {
            self.torn_down.store(true, Ordering::SeqCst);
        }
    }

    struct FakeLauncher {
        torn_down: Arc<AtomicBool>,
        exit_early: bool,
        fail: bool,
    }

    impl FakeLauncher {
        fn new() -> Self {
            Self {
                torn_down: Arc::new(AtomicBool::new(false)),
                exit_early: false,
                fail: false,
            }
        }

        fn torn_down(&self) -> bool {
            self.torn_down.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RenderLauncher for FakeLauncher {
        async fn launch(&self) -> Result<Box<dyn RenderProcess>, RenderError> {
            if self.fail {
                return Err(RenderError::Launch("node: not found".into()));
            }
            Ok(Box::new(FakeProcess {
                torn_down: self.torn_down.clone(),
                exit_early: self.exit_early,
            }))
        }
    }

    fn watcher(threshold: u32, timeout_secs: u64) -> RenderWatcher {
        RenderWatcher::new(WatchPolicy::new(
            Duration::from_secs(1),
            threshold,
            Duration::from_secs(timeout_secs),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn completes_once_count_is_stable() {
        let launcher = FakeLauncher::new();
        let frames = ScriptedFrames::new(vec![0, 5, 10, 10, 10, 10]);

        let job = watcher(3, 180)
            .run(&launcher, &frames, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.status(), RenderStatus::Complete);
        assert_eq!(job.frame_count(), 10);
        assert_eq!(frames.polls.load(Ordering::SeqCst), 6);
        assert!(launcher.torn_down());
    }

    #[tokio::test(start_paused = true)]
    async fn never_completes_while_growing() {
        let launcher = FakeLauncher::new();
        let frames = GrowingFrames(AtomicUsize::new(0), PathBuf::from("/tmp/out"));

        let err = watcher(1, 10)
            .run(&launcher, &frames, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Stalled { .. }), "got {err:?}");
        assert!(err.is_timeout());
        assert!(launcher.torn_down());
    }

    #[tokio::test(start_paused = true)]
    async fn no_frames_times_out_as_no_frames() {
        let launcher = FakeLauncher::new();
        let frames = ScriptedFrames::new(vec![0]);

        let err = watcher(3, 5)
            .run(&launcher, &frames, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::NoFrames { .. }), "got {err:?}");
        assert!(launcher.torn_down());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_tears_down() {
        let launcher = FakeLauncher::new();
        let frames = ScriptedFrames::new(vec![1, 2, 3]);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let err = watcher(10, 180).run(&launcher, &frames, &cancel).await.unwrap_err();
        assert!(matches!(err, RenderError::Cancelled));
        assert!(launcher.torn_down());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_launch_does_not_launch() {
        let launcher = FakeLauncher::new();
        let frames = ScriptedFrames::new(vec![1]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = watcher(1, 10).run(&launcher, &frames, &cancel).await.unwrap_err();
        assert!(matches!(err, RenderError::Cancelled));
        assert_eq!(frames.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_is_reported() {
        let launcher = FakeLauncher {
            fail: true,
            ..FakeLauncher::new()
        };
        let frames = ScriptedFrames::new(vec![1]);

        let err = watcher(1, 10)
            .run(&launcher, &frames, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Launch(_)));
        assert_eq!(frames.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn early_exit_does_not_abort_watch() {
        let launcher = FakeLauncher {
            exit_early: true,
            ..FakeLauncher::new()
        };
        let frames = ScriptedFrames::new(vec![4, 4]);

        let job = watcher(1, 60)
            .run(&launcher, &frames, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(job.frame_count(), 4);
    }

    #[tokio::test]
    async fn directory_counter_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("b.png"), b"x").unwrap();

        let counter = DirectoryFrames::new(dir.path());
        assert_eq!(counter.count().await.unwrap(), 2);
        assert_eq!(counter.directory(), dir.path());
    }
}
