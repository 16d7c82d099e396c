//! SynthesizeAudio step - voices the job text into one WAV file.

use crate::models::JobStatus;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::references::ReferenceSelector;
use crate::synthesis::SentenceSynthesizer;

/// Directory (under the job work dir) receiving the synthesized audio.
const AUDIO_DIR: &str = "audio";

pub struct SynthesizeAudioStep;

impl SynthesizeAudioStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SynthesizeAudioStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SynthesizeAudioStep {
    fn name(&self) -> &str {
        "SynthesizeAudio"
    }

    fn status(&self) -> JobStatus {
        JobStatus::SynthesizingAudio
    }

    fn milestone(&self) -> (f64, &str) {
        (0.2, "Generating Audio...")
    }

    fn validate_input(&self, ctx: &Context, _state: &JobState) -> StepResult<()> {
        if ctx.text.trim().is_empty() {
            return Err(StepError::invalid_input("Text is empty"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let output_dir = ctx.work_dir.join(AUDIO_DIR);
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| StepError::io_error("creating audio directory", e))?;

        let selector = ReferenceSelector::new(ctx.engines.catalog.clone());
        let synthesizer =
            SentenceSynthesizer::new(ctx.engines.tts.clone(), selector).with_speed(ctx.speed());

        ctx.logger.info(&format!(
            "Synthesizing with {} (speed {})",
            ctx.engines.tts.name(),
            ctx.speed()
        ));
        if let Some(ref reference) = ctx.options.reference_override {
            ctx.logger.info(&format!(
                "Using reference override: {}",
                reference.audio_path.display()
            ));
        }

        let result = synthesizer.synthesize_with(
            &ctx.text,
            &output_dir,
            ctx.options.reference_override.as_ref(),
        )?;

        ctx.logger.info(&format!(
            "Synthesized {} sentence(s), {:.2}s of audio in {:.1}s (references: {})",
            result.sentence_count,
            result.duration_secs,
            result.total_synthesis_time.as_secs_f64(),
            result.references_used.join(", ")
        ));

        state.synthesis = Some(result);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match state.synthesis {
            Some(ref result) if result.combined_audio_path.is_file() => Ok(()),
            Some(ref result) => Err(StepError::invalid_output(format!(
                "Combined audio missing: {}",
                result.combined_audio_path.display()
            ))),
            None => Err(StepError::invalid_output("Synthesis result not recorded")),
        }
    }
}
