//! Lip-synchronization engine boundary.
//!
//! The engine takes a face video (or still), an audio track and a
//! configuration bundle, and produces a video whose mouth movement follows
//! the audio.

mod config_ini;
mod wav2lip;

pub use config_ini::render_config;
pub use wav2lip::Wav2LipCli;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::LipSyncOptions;

/// One lip-sync invocation.
#[derive(Debug, Clone, Copy)]
pub struct LipSyncRequest<'a> {
    pub video: &'a Path,
    pub audio: &'a Path,
    pub options: &'a LipSyncOptions,
    /// Where the synchronized video must end up.
    pub output: &'a Path,
}

/// Failure of a single lip-sync attempt. Retryable.
#[derive(Error, Debug)]
pub enum LipSyncError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("engine exited with code {exit_code}: {diagnostic}")]
    CommandFailed { exit_code: i32, diagnostic: String },

    #[error("engine produced no output at {path}: {diagnostic}")]
    OutputMissing { path: PathBuf, diagnostic: String },

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl LipSyncError {
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Engine output attached to the failure, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            LipSyncError::CommandFailed { diagnostic, .. }
            | LipSyncError::OutputMissing { diagnostic, .. } => Some(diagnostic),
            _ => None,
        }
    }
}

/// Capability to lip-sync a video to an audio track.
pub trait LipSyncEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Produce `request.output`, returning its path.
    fn run(&self, request: &LipSyncRequest<'_>) -> Result<PathBuf, LipSyncError>;
}
