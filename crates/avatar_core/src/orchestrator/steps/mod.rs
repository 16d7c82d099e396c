//! Pipeline step implementations.
//!
//! Each step handles one stage of avatar generation.

mod lipsync;
mod match_video;
mod synthesize;

pub use lipsync::LipSyncStep;
pub use match_video::MatchVideoStep;
pub use synthesize::SynthesizeAudioStep;
