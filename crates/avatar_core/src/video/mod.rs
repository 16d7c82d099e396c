//! Video duration matching.
//!
//! A source clip is decoded to memory and replayed forward and backward
//! ("bounced") until enough frames exist to cover a target duration, then
//! re-encoded without audio.

mod bounce;
mod encoder;
mod frames;
mod matcher;
mod probe;

pub use bounce::BouncePlan;
pub use encoder::{FfmpegEncoder, FrameSink};
pub use frames::{decode_frames, FrameSequence, FrameSource};
pub use matcher::{extend_frames, DurationMatcher, MatchReport, VideoDurationMatcher};
pub use probe::{parse_fps_fraction, parse_probe_json, probe_video, VideoProperties};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while probing, decoding, bouncing or encoding video.
/// Terminal for the job.
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("ffprobe failed for '{path}': {message}")]
    ProbeFailed { path: PathBuf, message: String },

    #[error("Failed to decode '{path}': {diagnostic}")]
    DecodeFailed { path: PathBuf, diagnostic: String },

    #[error("'{path}' contains no decodable frames")]
    NoFrames { path: PathBuf },

    #[error("Frame {index} has {found} bytes, expected {expected}")]
    FrameSize {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Frame {index} requested from a clip of {count} frames")]
    FrameIndex { index: usize, count: usize },

    #[error("Cannot read audio '{path}': {reason}")]
    AudioUnreadable { path: PathBuf, reason: String },

    #[error("Encoding '{path}' failed: {diagnostic}")]
    EncodeFailed { path: PathBuf, diagnostic: String },

    #[error("Invalid target duration: {0}")]
    InvalidDuration(f64),

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl VideoError {
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// ffmpeg output attached to the failure, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            VideoError::DecodeFailed { diagnostic, .. }
            | VideoError::EncodeFailed { diagnostic, .. } => Some(diagnostic),
            VideoError::ProbeFailed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Number of frames needed to cover `duration_secs` at `fps`.
///
/// Uses the duration as-is; no resampling or rounding of the audio.
pub fn target_frame_count(duration_secs: f64, fps: f64) -> usize {
    let frames = (duration_secs * fps).ceil();
    if frames.is_finite() && frames > 0.0 {
        frames as usize
    } else {
        0
    }
}
