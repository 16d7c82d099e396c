//! Avatar Core - Backend logic for Talking Avatar
//!
//! Turns text plus a face image or video into a talking video: sentence
//! level voice cloning, bounce-loop duration matching and lip-sync.
//! This crate has no UI dependencies and is driven by the CLI.

pub mod config;
pub mod lipsync;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod process;
pub mod references;
pub mod synthesis;
pub mod testing;
pub mod video;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
