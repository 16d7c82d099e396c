//! Core enums used throughout the pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Lifecycle of one avatar job.
///
/// Transitions are strictly forward:
/// `Pending -> SynthesizingAudio -> MatchingVideo -> RunningLipSync -> Succeeded | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Pending,
    SynthesizingAudio,
    MatchingVideo,
    RunningLipSync,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::SynthesizingAudio => "synthesizing audio",
            JobStatus::MatchingVideo => "matching video",
            JobStatus::RunningLipSync => "running lip sync",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Wav2Lip quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LipSyncQuality {
    Fast,
    Improved,
    #[default]
    Enhanced,
}

impl LipSyncQuality {
    /// Value written to the engine's config bundle.
    pub fn engine_name(&self) -> &'static str {
        match self {
            LipSyncQuality::Fast => "Fast",
            LipSyncQuality::Improved => "Improved",
            LipSyncQuality::Enhanced => "Enhanced",
        }
    }

    /// Parse a user-supplied tier name. Unknown names fall back to `Enhanced`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "fast" => LipSyncQuality::Fast,
            "improved" => LipSyncQuality::Improved,
            _ => LipSyncQuality::Enhanced,
        }
    }
}

impl std::fmt::Display for LipSyncQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.engine_name())
    }
}

/// What kind of face media the job was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A still image; the lip-sync engine animates it directly.
    Image,
    /// A video clip that gets duration-matched to the audio.
    Video,
}

impl SourceKind {
    /// Classify a source by its file extension.
    pub fn detect(path: &Path) -> Self {
        match image::ImageFormat::from_path(path) {
            Ok(_) => SourceKind::Image,
            Err(_) => SourceKind::Video,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_is_forward() {
        assert!(JobStatus::Pending < JobStatus::SynthesizingAudio);
        assert!(JobStatus::MatchingVideo < JobStatus::RunningLipSync);
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(!JobStatus::RunningLipSync.is_terminal());
    }

    #[test]
    fn quality_names_map_to_engine_values() {
        assert_eq!(LipSyncQuality::from_name("fast"), LipSyncQuality::Fast);
        assert_eq!(LipSyncQuality::from_name("Improved"), LipSyncQuality::Improved);
        assert_eq!(LipSyncQuality::from_name("bogus"), LipSyncQuality::Enhanced);
        assert_eq!(LipSyncQuality::Fast.engine_name(), "Fast");
    }

    #[test]
    fn source_kind_detects_images() {
        assert_eq!(SourceKind::detect(Path::new("face.png")), SourceKind::Image);
        assert_eq!(SourceKind::detect(Path::new("face.JPG")), SourceKind::Image);
        assert_eq!(SourceKind::detect(Path::new("face.mp4")), SourceKind::Video);
    }
}
