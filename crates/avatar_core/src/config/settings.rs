//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::{LipSyncOptions, LipSyncQuality, Padding};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// F5-TTS command line settings.
    #[serde(default)]
    pub tts: TtsSettings,

    /// Duration matching (ffmpeg) settings.
    #[serde(default)]
    pub video: VideoSettings,

    /// Easy-Wav2Lip settings.
    #[serde(default)]
    pub lipsync: LipSyncSettings,
}

/// Output, temp, logs and reference catalog locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder receiving finished avatar videos.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root for job-scoped working directories.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// JSON reference catalog.
    #[serde(default = "default_references_file")]
    pub references_file: String,
}

fn default_output_folder() -> String {
    "avatar_output".to_string()
}

fn default_temp_root() -> String {
    "temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_references_file() -> String {
    "references/config.json".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
            references_file: default_references_file(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Keep engine output out of the log unless a stage fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Engine output lines kept for failure diagnostics.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    #[serde(default)]
    pub level: LogLevel,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            level: LogLevel::default(),
        }
    }
}

/// F5-TTS command line settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    #[serde(default = "default_tts_cli")]
    pub cli_path: String,

    #[serde(default = "default_tts_model")]
    pub model: String,

    #[serde(default = "default_ckpt_file")]
    pub ckpt_file: String,

    #[serde(default = "default_vocab_file")]
    pub vocab_file: String,

    #[serde(default = "default_vocoder")]
    pub vocoder_name: String,

    #[serde(default)]
    pub remove_silence: bool,

    /// Default speech speed multiplier.
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Flow-matching sampling steps.
    #[serde(default = "default_nfe_step")]
    pub nfe_step: u32,

    /// Lowercase generated and reference text before synthesis.
    #[serde(default = "default_true")]
    pub lowercase_text: bool,

    /// File the engine writes into its output directory.
    #[serde(default = "default_tts_output_file")]
    pub output_file_name: String,
}

fn default_tts_cli() -> String {
    "f5-tts_infer-cli".to_string()
}

fn default_tts_model() -> String {
    "F5-TTS".to_string()
}

fn default_ckpt_file() -> String {
    "models/F5-TTS/custom_models/mongolian/model_226800.pt".to_string()
}

fn default_vocab_file() -> String {
    "models/F5-TTS/custom_models/mongolian/vocab.txt".to_string()
}

fn default_vocoder() -> String {
    "vocos".to_string()
}

fn default_speed() -> f32 {
    1.0
}

fn default_nfe_step() -> u32 {
    32
}

fn default_tts_output_file() -> String {
    "infer_cli_out.wav".to_string()
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            cli_path: default_tts_cli(),
            model: default_tts_model(),
            ckpt_file: default_ckpt_file(),
            vocab_file: default_vocab_file(),
            vocoder_name: default_vocoder(),
            remove_silence: false,
            speed: default_speed(),
            nfe_step: default_nfe_step(),
            lowercase_text: true,
            output_file_name: default_tts_output_file(),
        }
    }
}

/// Duration matching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Encoder used for the duration-matched intermediate.
    #[serde(default = "default_codec")]
    pub codec: String,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Stop inside the first forward pass when the source already
    /// covers the target instead of always writing the whole source.
    #[serde(default)]
    pub truncate_first_pass: bool,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_codec() -> String {
    "mpeg4".to_string()
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            codec: default_codec(),
            pixel_format: default_pixel_format(),
            truncate_first_pass: false,
        }
    }
}

/// Easy-Wav2Lip settings and per-job defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LipSyncSettings {
    /// Engine checkout; `config.ini` and `temp/output.mp4` live here.
    #[serde(default = "default_engine_dir")]
    pub engine_dir: String,

    /// Launcher run from `engine_dir`.
    #[serde(default = "default_wrapper_script")]
    pub wrapper_script: String,

    #[serde(default)]
    pub quality: LipSyncQuality,

    #[serde(default = "default_true")]
    pub nosmooth: bool,

    #[serde(default = "default_wav2lip_version")]
    pub wav2lip_version: String,

    #[serde(default)]
    pub pad_up: i32,

    #[serde(default)]
    pub pad_down: i32,

    #[serde(default)]
    pub pad_left: i32,

    #[serde(default)]
    pub pad_right: i32,

    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts.
    #[serde(default)]
    pub retry_delay_ms: u64,
}

fn default_engine_dir() -> String {
    "models/Easy-Wav2Lip".to_string()
}

fn default_wrapper_script() -> String {
    if cfg!(windows) {
        "run_wav2lip.bat".to_string()
    } else {
        "run_wav2lip.sh".to_string()
    }
}

fn default_wav2lip_version() -> String {
    "Wav2Lip".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for LipSyncSettings {
    fn default() -> Self {
        Self {
            engine_dir: default_engine_dir(),
            wrapper_script: default_wrapper_script(),
            quality: LipSyncQuality::default(),
            nosmooth: true,
            wav2lip_version: default_wav2lip_version(),
            pad_up: 0,
            pad_down: 0,
            pad_left: 0,
            pad_right: 0,
            max_attempts: default_max_attempts(),
            retry_delay_ms: 0,
        }
    }
}

impl LipSyncSettings {
    /// Per-job options seeded from these defaults.
    pub fn default_options(&self) -> LipSyncOptions {
        LipSyncOptions {
            quality: self.quality,
            nosmooth: self.nosmooth,
            padding: Padding {
                up: self.pad_up,
                down: self.pad_down,
                left: self.pad_left,
                right: self.pad_right,
            },
            engine_variant: self.wav2lip_version.clone(),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Tts,
    Video,
    LipSync,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Tts,
        ConfigSection::Video,
        ConfigSection::LipSync,
    ];

    /// Section whose table is named `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.table_name() == name)
    }

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Tts => "tts",
            ConfigSection::Video => "video",
            ConfigSection::LipSync => "lipsync",
        }
    }

    /// Comment written above the table.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output, working and catalog locations",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Tts => "F5-TTS command line",
            ConfigSection::Video => "Video duration matching (ffmpeg)",
            ConfigSection::LipSync => "Easy-Wav2Lip engine and retry policy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[lipsync]"));
        assert!(toml.contains("max_attempts = 3"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[lipsync]\nquality = \"fast\"\npad_down = 10\n";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.lipsync.quality, LipSyncQuality::Fast);
        assert_eq!(parsed.lipsync.pad_down, 10);
        assert_eq!(parsed.lipsync.max_attempts, 3);
        assert_eq!(parsed.tts.output_file_name, "infer_cli_out.wav");
        assert_eq!(parsed.tts.nfe_step, 32);
        assert!(parsed.tts.lowercase_text);
        assert!(!parsed.video.truncate_first_pass);
    }

    #[test]
    fn default_options_follow_settings() {
        let mut lipsync = LipSyncSettings::default();
        lipsync.pad_left = 4;
        lipsync.nosmooth = false;

        let options = lipsync.default_options();
        assert_eq!(options.padding.left, 4);
        assert!(!options.nosmooth);
        assert_eq!(options.engine_variant, "Wav2Lip");
    }
}
