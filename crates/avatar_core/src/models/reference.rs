//! Voice reference clips.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A (transcript, audio) pair the TTS engine imitates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceClip {
    pub id: String,
    pub transcript: String,
    pub audio_path: PathBuf,
    word_count: usize,
}

impl ReferenceClip {
    pub fn new(
        id: impl Into<String>,
        transcript: impl Into<String>,
        audio_path: impl Into<PathBuf>,
    ) -> Self {
        let transcript = transcript.into();
        Self {
            id: id.into(),
            word_count: word_count(&transcript),
            transcript,
            audio_path: audio_path.into(),
        }
    }

    /// Whitespace-delimited word count of the transcript.
    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
