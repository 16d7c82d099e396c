//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Stage → Engine failure → Diagnostic

use std::io;

use thiserror::Error;

use crate::lipsync::LipSyncError;
use crate::references::ReferenceError;
use crate::synthesis::SynthesisError;
use crate::video::VideoError;

/// Failure category, used to decide retry policy and caller messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad job input. Never retried.
    Validation,
    /// Missing or broken catalog/settings. Never retried.
    Configuration,
    Synthesis,
    VideoProcessing,
    /// Lip-sync failed after exhausting its attempts.
    LipSync,
    /// Work directory, logger or output file handling.
    Setup,
}

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage failed during execution.
    #[error("Job '{job_id}' failed at stage '{stage}': {source}")]
    StepFailed {
        job_id: String,
        stage: String,
        #[source]
        source: StepError,
    },

    /// Input validation failed before the pipeline started.
    #[error("Job '{job_id}' failed validation: {message}")]
    ValidationFailed { job_id: String, message: String },

    /// Reference catalog or engine configuration could not be loaded.
    #[error("Configuration error: {message}")]
    ConfigurationFailed { message: String },

    /// Failed to set up or finalize the job (directories, logger, output move).
    #[error("Job '{job_id}' setup failed: {message}")]
    SetupFailed { job_id: String, message: String },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(
        job_id: impl Into<String>,
        stage: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_id: job_id.into(),
            stage: stage.into(),
            source,
        }
    }

    /// Create a validation failed error.
    pub fn validation_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    pub fn configuration_failed(message: impl Into<String>) -> Self {
        Self::ConfigurationFailed {
            message: message.into(),
        }
    }

    /// Create a setup failed error.
    pub fn setup_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::StepFailed { source, .. } => source.kind(),
            PipelineError::ValidationFailed { .. } => ErrorKind::Validation,
            PipelineError::ConfigurationFailed { .. } => ErrorKind::Configuration,
            PipelineError::SetupFailed { .. } => ErrorKind::Setup,
        }
    }

    /// Name of the failing stage, if the failure happened inside one.
    pub fn stage(&self) -> Option<&str> {
        match self {
            PipelineError::StepFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Last engine output attached to the failure.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            PipelineError::StepFailed { source, .. } => source.diagnostic(),
            _ => None,
        }
    }

    /// Reason suitable for showing to the person who submitted the job.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::StepFailed { source, .. } => source.user_message(),
            PipelineError::ValidationFailed { message, .. } => format!("Invalid input: {}", message),
            PipelineError::ConfigurationFailed { message } => {
                format!("Configuration error: {}", message)
            }
            PipelineError::SetupFailed { message, .. } => format!("Job setup failed: {}", message),
        }
    }
}

/// Error from a pipeline stage with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Video(#[from] VideoError),

    /// Lip-sync failed on every attempt; `source` is the last failure.
    #[error("Lip-sync failed after {attempts} attempt(s): {source}")]
    LipSync {
        attempts: u32,
        #[source]
        source: LipSyncError,
    },

    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn lip_sync(attempts: u32, source: LipSyncError) -> Self {
        Self::LipSync { attempts, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Synthesis(SynthesisError::Reference(_)) => ErrorKind::Configuration,
            StepError::Synthesis(_) => ErrorKind::Synthesis,
            StepError::Video(_) => ErrorKind::VideoProcessing,
            StepError::LipSync { .. } => ErrorKind::LipSync,
            StepError::InvalidInput(_) | StepError::InvalidOutput(_) | StepError::IoError { .. } => {
                ErrorKind::Setup
            }
        }
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            StepError::Synthesis(e) => e.diagnostic(),
            StepError::Video(e) => e.diagnostic(),
            StepError::LipSync { source, .. } => source.diagnostic(),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            StepError::Synthesis(SynthesisError::Reference(e)) => {
                format!("Configuration error: {}", e)
            }
            StepError::Synthesis(e) => format!("Audio generation failed: {}", e),
            StepError::Video(e) => format!("Video processing failed: {}", e),
            StepError::LipSync { attempts, source } => format!(
                "Lip synchronization failed after {} attempt(s): {}",
                attempts, source
            ),
            other => format!("Processing failed: {}", other),
        }
    }
}

impl From<ReferenceError> for StepError {
    fn from(e: ReferenceError) -> Self {
        StepError::Synthesis(SynthesisError::Reference(e))
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
