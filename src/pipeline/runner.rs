//! Pipeline orchestrator.
//!
//! [`PipelineOrchestrator`] sequences the stages of both CLI commands.  Each
//! collaborator call is wrapped into a [`StageOutcome`] and settled by
//! [`PipelineOrchestrator::decide`], the only place that chooses between
//! continuing, recovering and aborting.
//!
//! # `produce`
//!
//! ```text
//! [cached package?] ──invalid──▶ Recover ──┐
//!        │ valid                           ▼
//!        │                   acquire ─▶ generate ─▶ save data_bridge.json
//!        ▼                                              │
//!  tokio::join!( RenderWatcher::run , synthesize narration )
//!        │   (synthesis failure cancels the render)
//!        ▼
//!  collect frames ─▶ merge ─▶ exports/word_of_the_day.mp4
//! ```
//!
//! # `approve`
//!
//! ```text
//! newest exports/*.mp4 ─▶ ApprovalGate
//!    ├─ Rejected ─▶ journal + cleanup ─▶ exit 0
//!    ├─ Pending  ─▶ abort at approve ─▶ exit 1
//!    └─ Approved ─▶ Distributor (all platforms, concurrently)
//!                     ├─ Failed, none Published ─▶ keep artifact ─▶ exit 1
//!                     └─ otherwise ─▶ archive ─▶ cleanup ─▶ journal
//!                                     (exit 1 if any platform Failed)
//! ```

use std::io;
use std::sync::Arc;

use chrono::Local;
use tokio_util::sync::CancellationToken;

use crate::alert::EmailAlerter;
use crate::approval::{find_latest_artifact, ApprovalError, ApprovalGate, ConsoleReviewer};
use crate::archive::{Archiver, RunJournal};
use crate::config::{AppConfig, AppPaths};
use crate::content::{describe, ApiBackend, ContentGenerator, ContentPackage, PackageError, Violation};
use crate::distribute::{Distributor, InstagramPublisher, Outcome, Publisher, TikTokPublisher};
use crate::merge::{AvMerger, Merger};
use crate::render::{
    collect_frames, CommandLauncher, DirectoryFrames, FrameCounter, RenderError, RenderLauncher,
    RenderWatcher, WatchPolicy,
};
use crate::source::{DictionaryScraper, FallbackSet, SourceAcquirer};
use crate::speech::{ElevenLabsSynthesizer, SpeechError, SpeechSynthesizer};

use super::outcome::{FatalError, Flow, RunReport, StageOutcome};
use super::state::{PipelineRun, Stage};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Every external collaborator the orchestrator drives.
pub struct Collaborators {
    pub acquirer: SourceAcquirer,
    pub generator: ContentGenerator,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub launcher: Arc<dyn RenderLauncher>,
    pub frames: Arc<dyn FrameCounter>,
    pub watcher: RenderWatcher,
    pub merger: Arc<dyn Merger>,
    pub gate: ApprovalGate,
    pub distributor: Distributor,
    pub archiver: Archiver,
    pub journal: RunJournal,
}

impl Collaborators {
    /// Production collaborators, with all credentials taken from `config`.
    pub fn from_config(config: &AppConfig, paths: &AppPaths) -> Self {
        let launcher = CommandLauncher::from_config(&config.render, &paths.root);
        let frames = DirectoryFrames::new(launcher.output_dir());

        let publishers: Vec<Arc<dyn Publisher>> = vec![
            Arc::new(TikTokPublisher::from_config(&config.distribution.tiktok)),
            Arc::new(InstagramPublisher::from_config(&config.distribution.instagram)),
        ];

        Self {
            acquirer: SourceAcquirer::new(
                Arc::new(DictionaryScraper::from_config(&config.source)),
                FallbackSet::from_file(&paths.fallback_file),
                Arc::new(EmailAlerter::from_config(&config.alert)),
            ),
            generator: ContentGenerator::new(
                Arc::new(ApiBackend::from_config(&config.generator)),
                config.generator.max_attempts,
            ),
            synthesizer: Arc::new(ElevenLabsSynthesizer::from_config(&config.speech)),
            launcher: Arc::new(launcher),
            frames: Arc::new(frames),
            watcher: RenderWatcher::new(WatchPolicy::from_config(&config.render)),
            merger: Arc::new(AvMerger::from_config(&config.merge)),
            gate: ApprovalGate::new(Arc::new(ConsoleReviewer::from_config(&config.approval))),
            distributor: Distributor::new(
                publishers,
                config.distribution.extra_hashtags.clone(),
            ),
            archiver: Archiver::from_config(&config.archive, paths),
            journal: RunJournal::new(&paths.journal_file),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Runs one `produce` or `approve` pass at a time.
///
/// ```rust,no_run
/// use tokio_util::sync::CancellationToken;
/// use wotd_reel::config::{AppConfig, AppPaths};
/// use wotd_reel::pipeline::PipelineOrchestrator;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let orchestrator = PipelineOrchestrator::from_config(&config, AppPaths::new("."));
/// let report = orchestrator.produce(false, &CancellationToken::new()).await;
/// println!("{report}");
/// std::process::exit(report.exit_code());
/// # }
/// ```
pub struct PipelineOrchestrator {
    paths: AppPaths,
    parts: Collaborators,
}

impl PipelineOrchestrator {
    pub fn new(paths: AppPaths, parts: Collaborators) -> Self {
        Self { paths, parts }
    }

    pub fn from_config(config: &AppConfig, paths: AppPaths) -> Self {
        let parts = Collaborators::from_config(config, &paths);
        Self::new(paths, parts)
    }

    // -----------------------------------------------------------------------
    // Decision point
    // -----------------------------------------------------------------------

    /// Settle one stage outcome.
    fn decide<T>(&self, stage: Stage, outcome: StageOutcome<T>) -> Result<Flow<T>, FatalError> {
        match outcome {
            StageOutcome::Advance(value) => {
                log::debug!("pipeline: {stage} ok");
                Ok(Flow::Continue(value))
            }
            StageOutcome::Recoverable(violations) => {
                log::warn!("pipeline: {stage} recoverable: {}", describe(&violations));
                Ok(Flow::Recover(violations))
            }
            StageOutcome::Fatal(e) => {
                log::error!("pipeline: {stage} failed: {e}");
                Err(e)
            }
        }
    }

    /// [`decide`](Self::decide) for stages with no recovery path.
    fn advance<T>(&self, stage: Stage, outcome: StageOutcome<T>) -> Result<T, FatalError> {
        match self.decide(stage, outcome)? {
            Flow::Continue(value) => Ok(value),
            Flow::Recover(violations) => Err(FatalError::Unrecovered { stage, violations }),
        }
    }

    // -----------------------------------------------------------------------
    // produce
    // -----------------------------------------------------------------------

    /// Acquire → generate → render ∥ synthesize → merge.
    ///
    /// With `reuse_cached`, a valid persisted package (and narration, when
    /// present) replaces acquisition, generation and synthesis.
    pub async fn produce(&self, reuse_cached: bool, cancel: &CancellationToken) -> RunReport {
        let mut run = PipelineRun::new();
        match self.produce_run(&mut run, reuse_cached, cancel).await {
            Ok(report) => report,
            Err(e) => RunReport::aborted(&e),
        }
    }

    async fn produce_run(
        &self,
        run: &mut PipelineRun,
        reuse_cached: bool,
        cancel: &CancellationToken,
    ) -> Result<RunReport, FatalError> {
        let cached = if reuse_cached {
            run.enter(Stage::Generate);
            self.cached_package()?
        } else {
            None
        };

        let (package, audio_cached) = match cached {
            Some(package) => (package, self.paths.audio_file.is_file()),
            None => (self.fresh_package(run).await?, false),
        };
        run.package = Some(package.clone());

        run.enter(Stage::Render);
        let render_cancel = cancel.child_token();
        let render = self.parts.watcher.run(
            self.parts.launcher.as_ref(),
            self.parts.frames.as_ref(),
            &render_cancel,
        );
        let speech = async {
            if audio_cached {
                log::info!("pipeline: reusing {}", self.paths.audio_file.display());
                return Ok::<(), SpeechError>(());
            }
            let result = self
                .parts
                .synthesizer
                .synthesize(package.narration(), &self.paths.audio_file)
                .await;
            if result.is_err() {
                render_cancel.cancel();
            }
            result.map(|_| ())
        };
        let (rendered, spoken) = tokio::join!(render, speech);

        self.advance(
            Stage::Synthesize,
            StageOutcome::from_result(spoken, FatalError::SynthesisFailed),
        )?;
        let job = self.advance(
            Stage::Render,
            StageOutcome::from_result(rendered, FatalError::from_render),
        )?;

        let source = job.output_directory().to_path_buf();
        let dest = self.paths.frames_dir.clone();
        let collected = tokio::task::spawn_blocking(move || collect_frames(&source, &dest))
            .await
            .map_err(io::Error::other)
            .and_then(|r| r);
        let frames = self.advance(
            Stage::Render,
            StageOutcome::from_result(collected, |e| FatalError::RenderFailed(RenderError::Io(e))),
        )?;
        log::info!("pipeline: {frames} frame(s) staged in {}", self.paths.frames_dir.display());
        run.render = Some(job);

        run.enter(Stage::Merge);
        let merged = self.advance(
            Stage::Merge,
            StageOutcome::from_result(
                self.parts
                    .merger
                    .merge(&self.paths.frames_dir, &self.paths.audio_file, &self.paths.export_file)
                    .await,
                FatalError::MergeFailed,
            ),
        )?;
        run.artifact = Some(merged.path.clone());

        Ok(RunReport::Produced {
            word: package.word().to_string(),
            fallback: run.used_fallback(),
            frames,
            artifact: merged.path,
        })
    }

    /// The persisted package, or `None` when it must be regenerated.
    fn cached_package(&self) -> Result<Option<ContentPackage>, FatalError> {
        let outcome = match ContentPackage::load_from(&self.paths.content_package) {
            Ok(package) => StageOutcome::Advance(package),
            Err(PackageError::Invalid(violations)) => StageOutcome::Recoverable(violations),
            Err(e) => StageOutcome::Recoverable(vec![Violation {
                field: "package",
                reason: e.to_string(),
            }]),
        };

        match self.decide(Stage::Generate, outcome)? {
            Flow::Continue(package) => {
                log::info!("pipeline: reusing cached package for {:?}", package.word());
                Ok(Some(package))
            }
            Flow::Recover(_) => {
                log::info!("pipeline: cached package unusable, generating a fresh one");
                Ok(None)
            }
        }
    }

    async fn fresh_package(&self, run: &mut PipelineRun) -> Result<ContentPackage, FatalError> {
        run.enter(Stage::Acquire);
        let acquired = self.advance(
            Stage::Acquire,
            StageOutcome::from_result(
                self.parts.acquirer.acquire().await,
                FatalError::AcquisitionFailed,
            ),
        )?;
        run.word = Some(acquired.clone());

        run.enter(Stage::Generate);
        let package = self.advance(
            Stage::Generate,
            StageOutcome::from_result(
                self.parts.generator.generate(&acquired.record).await,
                FatalError::GenerationFailed,
            ),
        )?;
        self.advance(
            Stage::Generate,
            StageOutcome::from_result(
                package.save_to(&self.paths.content_package),
                FatalError::PackageUnavailable,
            ),
        )?;
        log::info!(
            "pipeline: saved package for {:?} to {}",
            package.word(),
            self.paths.content_package.display()
        );
        Ok(package)
    }

    // -----------------------------------------------------------------------
    // approve
    // -----------------------------------------------------------------------

    /// Approval gate → distribution → archive + cleanup.
    pub async fn approve(&self) -> RunReport {
        let mut run = PipelineRun::new();
        match self.approve_run(&mut run).await {
            Ok(report) => report,
            Err(e) => RunReport::aborted(&e),
        }
    }

    async fn approve_run(&self, run: &mut PipelineRun) -> Result<RunReport, FatalError> {
        run.enter(Stage::Approve);
        let artifact = self.advance(
            Stage::Approve,
            StageOutcome::from_result(
                find_latest_artifact(&self.paths.exports_dir),
                FatalError::from_approval,
            ),
        )?;
        let record = self.advance(
            Stage::Approve,
            StageOutcome::from_result(
                self.parts.gate.present(&artifact).await,
                FatalError::from_approval,
            ),
        )?;
        let approved = record.is_approved();
        let rejected = record.is_rejected();
        run.approval = Some(record);

        if rejected {
            if let Err(e) = self.parts.journal.record_rejection(&artifact, Local::now()) {
                log::warn!("pipeline: could not write {}: {e}", self.parts.journal.path().display());
            }
            run.enter(Stage::Archive);
            let cleanup = self.advance(
                Stage::Archive,
                StageOutcome::from_result(
                    self.parts.archiver.cleanup(&artifact),
                    FatalError::ArchiveFailed,
                ),
            )?;
            return Ok(RunReport::Rejected { artifact, cleanup });
        }
        if !approved {
            return Err(FatalError::ApprovalFailed(ApprovalError::Undecided(artifact)));
        }

        run.enter(Stage::Distribute);
        let package = self.advance(
            Stage::Distribute,
            StageOutcome::from_result(
                ContentPackage::load_from(&self.paths.content_package),
                FatalError::DistributionInput,
            ),
        )?;
        let results = self.parts.distributor.publish(&package, &artifact).await;
        run.results = results.clone();

        // Keep the artifact only when nothing went live.
        let published = results.iter().any(|r| r.outcome == Outcome::Published);
        if !published && results.iter().any(|r| r.is_failed()) {
            log::warn!(
                "pipeline: nothing published, leaving {} in place",
                artifact.display()
            );
            return Ok(RunReport::DistributionIncomplete { results, artifact });
        }

        run.enter(Stage::Archive);
        let now = Local::now();
        let archived = self.advance(
            Stage::Archive,
            StageOutcome::from_result(
                self.parts.archiver.archive(&artifact, now.date_naive()),
                FatalError::ArchiveFailed,
            ),
        )?;
        let cleanup = self.advance(
            Stage::Archive,
            StageOutcome::from_result(
                self.parts.archiver.cleanup(&archived),
                FatalError::ArchiveFailed,
            ),
        )?;
        if let Err(e) = self
            .parts
            .journal
            .record_completion(&archived, &self.paths.root, now)
        {
            log::warn!("pipeline: could not write {}: {e}", self.parts.journal.path().display());
        }

        Ok(RunReport::Distributed {
            results,
            archived,
            cleanup,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
