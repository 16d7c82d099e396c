//! Job input structures.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::LipSyncQuality;

/// Caller-supplied reference voice used for every sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceOverride {
    pub audio_path: PathBuf,
    pub transcript: String,
}

impl ReferenceOverride {
    pub fn new(audio_path: impl Into<PathBuf>, transcript: impl Into<String>) -> Self {
        Self {
            audio_path: audio_path.into(),
            transcript: transcript.into(),
        }
    }
}

/// Face-box padding in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub up: i32,
    pub down: i32,
    pub left: i32,
    pub right: i32,
}

/// Configuration bundle handed to the lip-sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LipSyncOptions {
    pub quality: LipSyncQuality,
    /// Disable the engine's face-detection smoothing.
    pub nosmooth: bool,
    pub padding: Padding,
    /// Engine variant tag (e.g. `Wav2Lip`, `Wav2Lip_GAN`).
    pub engine_variant: String,
}

impl Default for LipSyncOptions {
    fn default() -> Self {
        Self {
            quality: LipSyncQuality::Enhanced,
            nosmooth: true,
            padding: Padding::default(),
            engine_variant: "Wav2Lip".to_string(),
        }
    }
}

/// Per-job choices layered over the settings defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobOptions {
    /// Voice to imitate for every sentence instead of catalog selection.
    pub reference_override: Option<ReferenceOverride>,
    /// Lip-sync bundle; `None` uses the `[lipsync]` settings.
    pub lipsync: Option<LipSyncOptions>,
    /// Speech speed; `None` uses the `[tts]` setting.
    pub speed: Option<f32>,
}

impl JobOptions {
    pub fn with_reference_override(mut self, reference: ReferenceOverride) -> Self {
        self.reference_override = Some(reference);
        self
    }

    pub fn with_lipsync(mut self, options: LipSyncOptions) -> Self {
        self.lipsync = Some(options);
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }
}
