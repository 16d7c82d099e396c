//! Core types for the orchestrator pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Settings;
use crate::lipsync::{LipSyncEngine, Wav2LipCli};
use crate::logging::JobLogger;
use crate::models::{JobOptions, JobStatus, LipSyncOptions, SourceKind};
use crate::references::{ReferenceCatalog, ReferenceResult};
use crate::synthesis::{F5TtsCli, SynthesisResult, TtsEngine};
use crate::video::{DurationMatcher, MatchReport, VideoDurationMatcher};

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (fraction in 0.0..=1.0, description)
pub type ProgressCallback = Box<dyn Fn(f64, &str) + Send + Sync>;

/// Forwards milestones to a callback, dropping any that would go backwards.
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    last: Mutex<Option<f64>>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: Mutex::new(None),
        }
    }

    pub fn report(&self, fraction: f64, description: &str) {
        let fraction = fraction.clamp(0.0, 1.0);
        let mut last = self.last.lock();
        if matches!(*last, Some(prev) if fraction < prev) {
            return;
        }
        *last = Some(fraction);
        if let Some(ref callback) = self.callback {
            callback(fraction, description);
        }
    }
}

/// External collaborators of a job.
#[derive(Clone)]
pub struct Engines {
    pub tts: Arc<dyn TtsEngine>,
    pub lipsync: Arc<dyn LipSyncEngine>,
    pub matcher: Arc<dyn DurationMatcher>,
    pub catalog: Arc<ReferenceCatalog>,
}

impl Engines {
    /// Real command line adapters plus the catalog named in `[paths]`.
    pub fn from_settings(settings: &Settings) -> ReferenceResult<Self> {
        let catalog = ReferenceCatalog::load(Path::new(&settings.paths.references_file))?;
        Ok(Self {
            tts: Arc::new(F5TtsCli::new(settings.tts.clone())),
            lipsync: Arc::new(Wav2LipCli::new(settings.lipsync.clone())),
            matcher: Arc::new(VideoDurationMatcher::new(settings.video.clone())),
            catalog: Arc::new(catalog),
        })
    }
}

/// Read-only context passed to pipeline steps.
///
/// Contains job inputs and shared resources that steps can read
/// but not modify. Mutable state goes in `JobState`.
pub struct Context {
    /// Application settings.
    pub settings: Settings,
    pub job_id: String,
    /// Text to speak.
    pub text: String,
    /// Face image or video.
    pub source_media: PathBuf,
    pub source_kind: SourceKind,
    pub options: JobOptions,
    /// Job-specific working directory (under temp_root).
    pub work_dir: PathBuf,
    /// Output directory for the final video.
    pub output_dir: PathBuf,
    /// Per-job logger.
    pub logger: Arc<JobLogger>,
    pub engines: Engines,
    progress: ProgressReporter,
}

impl Context {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Settings,
        job_id: impl Into<String>,
        text: impl Into<String>,
        source_media: PathBuf,
        options: JobOptions,
        work_dir: PathBuf,
        output_dir: PathBuf,
        logger: Arc<JobLogger>,
        engines: Engines,
    ) -> Self {
        let source_kind = SourceKind::detect(&source_media);
        Self {
            settings,
            job_id: job_id.into(),
            text: text.into(),
            source_media,
            source_kind,
            options,
            work_dir,
            output_dir,
            logger,
            engines,
            progress: ProgressReporter::new(None),
        }
    }

    /// Set the progress reporter.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Report a milestone to the callback (if set) and the job log.
    pub fn report_progress(&self, fraction: f64, description: &str) {
        self.logger.progress(fraction, description);
        self.progress.report(fraction, description);
    }

    /// Speech speed for this job.
    pub fn speed(&self) -> f32 {
        self.options.speed.unwrap_or(self.settings.tts.speed)
    }

    /// Lip-sync bundle for this job.
    pub fn lipsync_options(&self) -> LipSyncOptions {
        self.options
            .lipsync
            .clone()
            .unwrap_or_else(|| self.settings.lipsync.default_options())
    }
}

/// Mutable job state that accumulates results from pipeline steps.
///
/// Steps add new data but do not overwrite what earlier steps recorded.
#[derive(Debug, Clone, Default)]
pub struct JobState {
    /// Unique job identifier.
    pub job_id: String,
    /// When the job started.
    pub started_at: Option<String>,
    pub status: JobStatus,
    /// Combined audio (from SynthesizeAudio).
    pub synthesis: Option<SynthesisResult>,
    /// Video handed to lip-sync; the source itself for still images.
    pub matched_video: Option<PathBuf>,
    /// Present when frames were actually extended.
    pub match_report: Option<MatchReport>,
    /// Lip-sync result inside the work directory.
    pub lipsync_output: Option<PathBuf>,
    /// Lip-sync attempts made so far.
    pub attempt_count: u32,
    /// Final video in the output directory.
    pub output_video: Option<PathBuf>,
    /// Last engine output seen on failure.
    pub last_diagnostic: Option<String>,
}

impl JobState {
    /// Create a new job state with the given ID.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Move to `status`; transitions only go forward.
    pub fn advance(&mut self, status: JobStatus) {
        if status >= self.status && !self.status.is_terminal() {
            self.status = status;
        }
    }

    pub fn fail(&mut self) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Failed;
        }
    }

    pub fn has_synthesis(&self) -> bool {
        self.synthesis.is_some()
    }
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (preconditions not met, but not an error).
    Skipped(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_moves_forward() {
        let mut state = JobState::new("job-1");
        assert_eq!(state.status, JobStatus::Pending);

        state.advance(JobStatus::MatchingVideo);
        state.advance(JobStatus::SynthesizingAudio);
        assert_eq!(state.status, JobStatus::MatchingVideo);

        state.fail();
        state.advance(JobStatus::Succeeded);
        assert_eq!(state.status, JobStatus::Failed);
    }

    #[test]
    fn progress_never_goes_backwards() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::new(Some(Box::new(move |f: f64, d: &str| {
            sink.lock().push((f, d.to_string()));
        })));

        reporter.report(0.0, "Initializing...");
        reporter.report(0.6, "Synchronizing Lips...");
        reporter.report(0.2, "Generating Audio...");
        reporter.report(0.6, "Retrying...");
        reporter.report(1.0, "Generation Complete!");

        let fractions: Vec<f64> = seen.lock().iter().map(|(f, _)| *f).collect();
        assert_eq!(fractions, vec![0.0, 0.6, 0.6, 1.0]);
    }
}
