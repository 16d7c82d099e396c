//! Sentence-level speech synthesis.
//!
//! Text is split into sentences, each sentence is voiced by the external
//! TTS engine with the closest-length reference clip, and the resulting
//! waveforms are concatenated into one WAV file.

mod engine;
mod sentences;
mod synthesizer;
pub mod wav;

pub use engine::{F5TtsCli, TtsEngine, TtsError, TtsRequest};
pub use sentences::split_sentences;
pub use synthesizer::{SentenceChunk, SentenceSynthesizer, SynthesisResult, COMBINED_AUDIO_FILE};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::references::ReferenceError;

/// Failure while producing the combined audio. Terminal for the job.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Text contains no sentences")]
    NoSentences,

    #[error("Reference selection failed: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Sentence {index} failed: {source}")]
    SentenceFailed {
        index: usize,
        sentence: String,
        #[source]
        source: TtsError,
    },

    #[error("Failed to read or write WAV '{path}': {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Segment {index} format {found} does not match {expected}")]
    IncompatibleSegments {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl SynthesisError {
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Engine output attached to the failure, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            SynthesisError::SentenceFailed { source, .. } => source.diagnostic(),
            _ => None,
        }
    }
}
