//! Configuration management for Talking Avatar.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Defaults for any missing key
//!
//! # Example
//!
//! ```no_run
//! use avatar_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new(".config/avatar.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Output folder: {}", config.settings().paths.output_folder);
//!
//! config.set_value("lipsync.max_attempts", "5").unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, LipSyncSettings, LoggingSettings, PathSettings, Settings, TtsSettings,
    VideoSettings,
};
