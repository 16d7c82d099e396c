//! Job coordinator: validation, job setup, pipeline run, finalization.
//!
//! `PipelineCoordinator` is the public entry point. One call to `run`
//! processes one job synchronously:
//!
//! - validates the inputs before touching the filesystem
//! - creates `temp_root/<job_id>/` and a per-job logger
//! - runs the standard pipeline
//! - moves the result to `output_folder/avatar_<job_id>.mp4`
//! - removes the work directory, whatever the outcome

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use super::errors::{PipelineError, PipelineResult};
use super::types::{Context, Engines, JobState, ProgressCallback, ProgressReporter};
use super::create_avatar_pipeline;
use crate::config::Settings;
use crate::logging::{JobLogger, LogConfig};
use crate::models::{JobOptions, JobStatus};

/// Shared log line callback; wrapped into a per-job `GuiLogCallback`.
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Everything known about one finished job.
#[derive(Debug)]
pub struct JobReport {
    pub job_id: String,
    pub state: JobState,
    pub result: PipelineResult<PathBuf>,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.state.status == JobStatus::Succeeded
    }
}

/// Runs avatar jobs one at a time.
pub struct PipelineCoordinator {
    settings: Settings,
    engines: Engines,
    log_callback: Option<LogCallback>,
}

impl PipelineCoordinator {
    pub fn new(settings: Settings, engines: Engines) -> Self {
        Self {
            settings,
            engines,
            log_callback: None,
        }
    }

    /// Coordinator using the real engines and the configured catalog.
    pub fn from_settings(settings: Settings) -> PipelineResult<Self> {
        let engines = Engines::from_settings(&settings)
            .map_err(|e| PipelineError::configuration_failed(e.to_string()))?;
        Ok(Self::new(settings, engines))
    }

    /// Forward every job log line to `callback`.
    pub fn with_log_callback(mut self, callback: LogCallback) -> Self {
        self.log_callback = Some(callback);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn engines(&self) -> &Engines {
        &self.engines
    }

    /// Generate a talking video for `text` spoken by the face in `source_media`.
    pub fn run(
        &self,
        text: &str,
        source_media: &Path,
        options: JobOptions,
    ) -> PipelineResult<PathBuf> {
        self.run_job(text, source_media, options, None).result
    }

    /// Like `run`, reporting milestones and returning the final job state.
    pub fn run_job(
        &self,
        text: &str,
        source_media: &Path,
        options: JobOptions,
        progress: Option<ProgressCallback>,
    ) -> JobReport {
        let job_id = Uuid::new_v4().to_string();
        let mut state = JobState::new(&job_id);
        let progress = ProgressReporter::new(progress);

        progress.report(0.0, "Initializing...");
        tracing::info!("Starting avatar job {}", job_id);

        if let Err(e) = validate(&job_id, text, source_media, &options) {
            tracing::warn!("{}", e);
            state.fail();
            return JobReport {
                job_id,
                state,
                result: Err(e),
            };
        }

        let result = self.execute(&job_id, text, source_media, options, progress, &mut state);
        if result.is_err() {
            state.fail();
        }

        JobReport {
            job_id,
            state,
            result,
        }
    }

    fn execute(
        &self,
        job_id: &str,
        text: &str,
        source_media: &Path,
        options: JobOptions,
        progress: ProgressReporter,
        state: &mut JobState,
    ) -> PipelineResult<PathBuf> {
        let paths = &self.settings.paths;
        let work_dir = Path::new(&paths.temp_root).join(job_id);
        let output_dir = PathBuf::from(&paths.output_folder);

        fs::create_dir_all(&work_dir).map_err(|e| {
            PipelineError::setup_failed(job_id, format!("Failed to create work directory: {}", e))
        })?;

        let gui_callback = self.log_callback.clone().map(|callback| {
            Box::new(move |line: &str| callback(line)) as crate::logging::GuiLogCallback
        });
        let logger = match JobLogger::new(
            job_id,
            &paths.logs_folder,
            LogConfig::from_settings(&self.settings.logging),
            gui_callback,
        ) {
            Ok(l) => Arc::new(l),
            Err(e) => {
                remove_work_dir(&work_dir);
                return Err(PipelineError::setup_failed(
                    job_id,
                    format!("Failed to create logger: {}", e),
                ));
            }
        };

        let ctx = Context::new(
            self.settings.clone(),
            job_id,
            text,
            source_media.to_path_buf(),
            options,
            work_dir.clone(),
            output_dir,
            logger.clone(),
            self.engines.clone(),
        )
        .with_progress(progress);

        logger.section(&format!("Avatar job {}", job_id));
        logger.info(&format!("Source: {} ({:?})", source_media.display(), ctx.source_kind));
        logger.info(&format!("Text: {} character(s)", text.chars().count()));

        let pipeline = create_avatar_pipeline();
        let result = pipeline
            .run(&ctx, state)
            .and_then(|_| finalize(&ctx, state));

        match result {
            Ok(ref path) => {
                state.advance(JobStatus::Succeeded);
                ctx.report_progress(1.0, "Generation Complete!");
                logger.success(&format!("Output: {}", path.display()));
            }
            Err(ref e) => {
                state.fail();
                logger.error(&e.user_message());
                if let Some(diagnostic) = e.diagnostic() {
                    logger.error(&format!("Last engine output:\n{}", diagnostic));
                }
            }
        }

        remove_work_dir(&work_dir);
        logger.close();
        result
    }
}

/// Reject bad inputs before any work directory or log file exists.
fn validate(
    job_id: &str,
    text: &str,
    source_media: &Path,
    options: &JobOptions,
) -> PipelineResult<()> {
    if text.trim().is_empty() {
        return Err(PipelineError::validation_failed(job_id, "Text is empty"));
    }
    if !source_media.is_file() {
        return Err(PipelineError::validation_failed(
            job_id,
            format!("Source media not found: {}", source_media.display()),
        ));
    }
    if let Some(ref reference) = options.reference_override {
        if !reference.audio_path.is_file() {
            return Err(PipelineError::validation_failed(
                job_id,
                format!(
                    "Reference audio not found: {}",
                    reference.audio_path.display()
                ),
            ));
        }
        if reference.transcript.trim().is_empty() {
            return Err(PipelineError::validation_failed(
                job_id,
                "Reference audio given without its transcript",
            ));
        }
    }
    if let Some(speed) = options.speed {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(PipelineError::validation_failed(
                job_id,
                format!("Invalid speech speed: {}", speed),
            ));
        }
    }
    Ok(())
}

/// Move the lip-sync result to `output_dir/avatar_<job_id>.mp4`.
fn finalize(ctx: &Context, state: &mut JobState) -> PipelineResult<PathBuf> {
    let produced = state.lipsync_output.clone().ok_or_else(|| {
        PipelineError::setup_failed(&ctx.job_id, "Pipeline finished without an output video")
    })?;

    fs::create_dir_all(&ctx.output_dir).map_err(|e| {
        PipelineError::setup_failed(&ctx.job_id, format!("Failed to create output directory: {}", e))
    })?;

    let final_path = ctx.output_dir.join(format!("avatar_{}.mp4", ctx.job_id));
    move_file(&produced, &final_path).map_err(|e| {
        PipelineError::setup_failed(&ctx.job_id, format!("Failed to move output video: {}", e))
    })?;

    state.output_video = Some(final_path.clone());
    Ok(final_path)
}

/// Rename, falling back to copy + delete across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

fn remove_work_dir(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to clean up {}: {}", dir.display(), e);
        }
    }
}
