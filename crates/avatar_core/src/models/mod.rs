//! Data models for Talking Avatar.
//!
//! - Enums for job status, lip-sync quality and source media kind
//! - Reference clips used for voice imitation
//! - Job inputs (reference override, lip-sync options)

mod enums;
mod jobs;
mod reference;

pub use enums::{JobStatus, LipSyncQuality, SourceKind};
pub use jobs::{JobOptions, LipSyncOptions, Padding, ReferenceOverride};
pub use reference::{word_count, ReferenceClip};
