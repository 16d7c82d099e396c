//! LipSync step - runs the lip-sync engine with bounded retries.

use std::thread;

use crate::lipsync::LipSyncRequest;
use crate::models::JobStatus;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

const LIPSYNC_OUTPUT_FILE: &str = "lipsync_output.mp4";

/// Lip-sync with retry in place.
///
/// Each failed attempt is logged with its diagnostic; after
/// `lipsync.max_attempts` failures the last one is returned.
pub struct LipSyncStep;

impl LipSyncStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LipSyncStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for LipSyncStep {
    fn name(&self) -> &str {
        "LipSync"
    }

    fn status(&self) -> JobStatus {
        JobStatus::RunningLipSync
    }

    fn milestone(&self) -> (f64, &str) {
        (0.6, "Synchronizing Lips...")
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.matched_video.is_none() {
            return Err(StepError::invalid_input("No video to synchronize"));
        }
        if !state.has_synthesis() {
            return Err(StepError::invalid_input("No synthesized audio"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let (Some(video), Some(synthesis)) = (state.matched_video.clone(), state.synthesis.as_ref())
        else {
            return Err(StepError::invalid_input("No video or audio to synchronize"));
        };
        let audio = synthesis.combined_audio_path.clone();

        let options = ctx.lipsync_options();
        let output = ctx.work_dir.join(LIPSYNC_OUTPUT_FILE);
        let request = LipSyncRequest {
            video: &video,
            audio: &audio,
            options: &options,
            output: &output,
        };

        let max_attempts = ctx.settings.lipsync.max_attempts.max(1);
        let delay = ctx.settings.lipsync.retry_delay();
        let engine = &ctx.engines.lipsync;

        ctx.logger.info(&format!(
            "Lip-sync with {} (quality {}, nosmooth {}, variant {})",
            engine.name(),
            options.quality,
            options.nosmooth,
            options.engine_variant
        ));

        loop {
            state.attempt_count += 1;
            let attempt = state.attempt_count;
            ctx.logger
                .info(&format!("Lip-sync attempt {}/{}", attempt, max_attempts));

            match engine.run(&request) {
                Ok(path) => {
                    state.lipsync_output = Some(path);
                    return Ok(StepOutcome::Success);
                }
                Err(e) => {
                    ctx.logger
                        .warn(&format!("Lip-sync attempt {} failed: {}", attempt, e));
                    if let Some(diagnostic) = e.diagnostic() {
                        ctx.logger.output_block(diagnostic, true);
                        state.last_diagnostic = Some(diagnostic.to_string());
                    }

                    if attempt >= max_attempts {
                        ctx.logger.show_tail("Lip-sync output");
                        return Err(StepError::lip_sync(attempt, e));
                    }
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
            }
        }
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.lipsync_output {
            Some(ref path) if path.is_file() => Ok(()),
            Some(ref path) => Err(StepError::invalid_output(format!(
                "Lip-sync output missing: {}",
                path.display()
            ))),
            None => Err(StepError::invalid_output("Lip-sync output not recorded")),
        }
    }
}
