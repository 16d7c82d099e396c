//! Voice reference catalog and per-sentence reference selection.
//!
//! The catalog is loaded once from a JSON file and shared read-only
//! (`Arc<ReferenceCatalog>`) by every job.
//!
//! ```json
//! {
//!   "references": [
//!     { "id": "short", "text": "...", "audio": "speaker_353_segment_99.wav" }
//!   ]
//! }
//! ```

mod catalog;
mod selector;

pub use catalog::ReferenceCatalog;
pub use selector::ReferenceSelector;

use std::path::PathBuf;

use thiserror::Error;

/// Catalog and asset misconfiguration. Never retried.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Reference catalog is empty")]
    EmptyCatalog,

    #[error("Failed to read reference catalog '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse reference catalog '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate reference id '{0}'")]
    DuplicateId(String),

    #[error("Reference '{0}' has an empty transcript")]
    EmptyTranscript(String),

    #[error("Reference '{id}' audio not found: {path}")]
    AudioMissing { id: String, path: PathBuf },
}

/// Result type for reference operations.
pub type ReferenceResult<T> = Result<T, ReferenceError>;
