//! MatchVideo step - stretches the source video to the audio length.

use crate::models::{JobStatus, SourceKind};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::synthesis::wav;
use crate::video::VideoError;

const MATCHED_VIDEO_FILE: &str = "matched_video.mp4";

/// Duration matching. Still images pass through untouched since the
/// lip-sync engine animates them directly.
pub struct MatchVideoStep;

impl MatchVideoStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MatchVideoStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MatchVideoStep {
    fn name(&self) -> &str {
        "MatchVideo"
    }

    fn status(&self) -> JobStatus {
        JobStatus::MatchingVideo
    }

    fn milestone(&self) -> (f64, &str) {
        (0.4, "Matching Video Duration...")
    }

    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        if !state.has_synthesis() {
            return Err(StepError::invalid_input("No synthesized audio"));
        }
        if !ctx.source_media.is_file() {
            return Err(StepError::invalid_input(format!(
                "Source media not found: {}",
                ctx.source_media.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        if ctx.source_kind == SourceKind::Image {
            state.matched_video = Some(ctx.source_media.clone());
            return Ok(StepOutcome::Skipped(
                "still image source, no frames to extend".to_string(),
            ));
        }

        let audio = state
            .synthesis
            .as_ref()
            .map(|s| s.combined_audio_path.clone())
            .ok_or_else(|| StepError::invalid_input("No synthesized audio"))?;

        // Measured from the file actually handed to lip-sync
        let duration =
            wav::duration_secs(&audio).map_err(|e| VideoError::AudioUnreadable {
                path: audio.clone(),
                reason: e.to_string(),
            })?;
        ctx.logger
            .info(&format!("Target duration from audio: {:.3}s", duration));

        let output = ctx.work_dir.join(MATCHED_VIDEO_FILE);
        let report = ctx
            .engines
            .matcher
            .extend(&ctx.source_media, duration, &output)?;

        ctx.logger.info(&format!(
            "Matched video: {} source frames -> {} frames (target {} at {:.3} fps)",
            report.source_frames, report.frames_written, report.target_frames, report.fps
        ));

        state.matched_video = Some(report.output_path.clone());
        state.match_report = Some(report);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.matched_video {
            Some(ref path) if path.is_file() => Ok(()),
            Some(ref path) => Err(StepError::invalid_output(format!(
                "Matched video missing: {}",
                path.display()
            ))),
            None => Err(StepError::invalid_output("Matched video not recorded")),
        }
    }
}
