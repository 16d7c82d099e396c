//! Pipeline orchestrator for coordinating avatar jobs.
//!
//! Each job runs a fixed sequence of steps that validate, execute, and
//! record their results in a `JobState`.
//!
//! # Architecture
//!
//! ```text
//! PipelineCoordinator
//!     └── Pipeline
//!             ├── Step: SynthesizeAudio  (0.2)
//!             ├── Step: MatchVideo       (0.4)
//!             └── Step: LipSync          (0.6, retried in place)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use avatar_core::config::Settings;
//! use avatar_core::models::JobOptions;
//! use avatar_core::orchestrator::PipelineCoordinator;
//!
//! let coordinator = PipelineCoordinator::from_settings(Settings::default()).unwrap();
//! let video = coordinator
//!     .run("Hello there. How are you?", Path::new("face.mp4"), JobOptions::default())
//!     .unwrap();
//! println!("Wrote {}", video.display());
//! ```

mod coordinator;
mod errors;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use coordinator::{JobReport, LogCallback, PipelineCoordinator};
pub use errors::{ErrorKind, PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{LipSyncStep, MatchVideoStep, SynthesizeAudioStep};
pub use types::{Context, Engines, JobState, ProgressCallback, ProgressReporter, StepOutcome};

/// Create the standard avatar pipeline with all steps in order.
///
/// 1. SynthesizeAudio - voice the text sentence by sentence
/// 2. MatchVideo - bounce-loop the source video to the audio length
/// 3. LipSync - run the lip-sync engine with retries
pub fn create_avatar_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(SynthesizeAudioStep::new())
        .with_step(MatchVideoStep::new())
        .with_step(LipSyncStep::new())
}
