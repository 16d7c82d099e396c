//! In-process engine doubles.
//!
//! These stand in for F5-TTS, Easy-Wav2Lip and ffmpeg so the pipeline can
//! be exercised without models or external binaries. They write real
//! files so every downstream check (WAV parsing, file existence, moves)
//! behaves as in production.

use std::fs;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;

use crate::lipsync::{LipSyncEngine, LipSyncError, LipSyncRequest};
use crate::models::{word_count, LipSyncOptions};
use crate::synthesis::{TtsEngine, TtsError, TtsRequest};
use crate::video::{target_frame_count, DurationMatcher, MatchReport, VideoError};

/// File name the tone engine writes, mirroring the F5-TTS CLI.
const TONE_OUTPUT_FILE: &str = "infer_cli_out.wav";

/// Write a mono 16-bit WAV of `frames` samples all equal to `value`.
pub fn write_tone(path: &Path, sample_rate: u32, frames: u32, value: i16) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for _ in 0..frames {
        writer.write_sample(value)?;
    }
    writer.finalize()
}

/// Write an executable `/bin/sh` script standing in for an external tool.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> std::io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// One recorded TTS call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTtsCall {
    pub text: String,
    pub reference_audio: Option<PathBuf>,
    pub reference_text: Option<String>,
    pub speed: f32,
    pub output_dir: PathBuf,
}

/// TTS double writing constant-valued tones.
///
/// Call `n` (1-based) writes samples equal to `n`, one tenth of a second
/// per word, so the order of segments in a concatenation is visible.
pub struct ToneTtsEngine {
    sample_rate: u32,
    fail_on: Option<usize>,
    silent_on: Option<usize>,
    calls: Mutex<Vec<RecordedTtsCall>>,
}

impl ToneTtsEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            fail_on: None,
            silent_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Exit non-zero on call `n` (1-based).
    pub fn failing_on_call(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Exit cleanly on call `n` (1-based) without writing a waveform.
    pub fn silent_on_call(mut self, n: usize) -> Self {
        self.silent_on = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<RecordedTtsCall> {
        self.calls.lock().clone()
    }
}

impl TtsEngine for ToneTtsEngine {
    fn name(&self) -> &str {
        "tone"
    }

    fn synthesize(&self, request: &TtsRequest<'_>) -> Result<PathBuf, TtsError> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(RecordedTtsCall {
                text: request.text.to_string(),
                reference_audio: request.reference_audio.map(Path::to_path_buf),
                reference_text: request.reference_text.map(str::to_string),
                speed: request.speed,
                output_dir: request.output_dir.to_path_buf(),
            });
            calls.len()
        };

        let path = request.output_dir.join(TONE_OUTPUT_FILE);
        if self.fail_on == Some(call) {
            return Err(TtsError::CommandFailed {
                exit_code: 1,
                diagnostic: format!("scripted failure on call {}", call),
            });
        }
        if self.silent_on == Some(call) {
            return Err(TtsError::OutputMissing {
                path,
                diagnostic: String::new(),
            });
        }

        let per_word = (self.sample_rate / 10).max(1);
        let frames = per_word * word_count(request.text).max(1) as u32;
        write_tone(&path, self.sample_rate, frames, call as i16).map_err(|e| {
            TtsError::CommandFailed {
                exit_code: -1,
                diagnostic: e.to_string(),
            }
        })?;
        Ok(path)
    }
}

/// One recorded lip-sync call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLipSyncCall {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub options: LipSyncOptions,
}

/// Lip-sync double that fails a scripted number of times, then succeeds.
pub struct ScriptedLipSyncEngine {
    failures: u32,
    calls: Mutex<Vec<RecordedLipSyncCall>>,
}

impl ScriptedLipSyncEngine {
    /// Succeeds on the first call.
    pub fn new() -> Self {
        Self::failing_times(0)
    }

    /// Fails the first `failures` calls.
    pub fn failing_times(failures: u32) -> Self {
        Self {
            failures,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedLipSyncCall> {
        self.calls.lock().clone()
    }
}

impl Default for ScriptedLipSyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LipSyncEngine for ScriptedLipSyncEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn run(&self, request: &LipSyncRequest<'_>) -> Result<PathBuf, LipSyncError> {
        let attempt = {
            let mut calls = self.calls.lock();
            calls.push(RecordedLipSyncCall {
                video: request.video.to_path_buf(),
                audio: request.audio.to_path_buf(),
                options: request.options.clone(),
            });
            calls.len() as u32
        };

        if attempt <= self.failures {
            return Err(LipSyncError::CommandFailed {
                exit_code: 1,
                diagnostic: format!("scripted failure on attempt {}", attempt),
            });
        }

        if let Some(parent) = request.output.parent() {
            fs::create_dir_all(parent).map_err(|e| LipSyncError::io("creating output directory", e))?;
        }
        fs::write(
            request.output,
            format!("lipsync:{}", request.video.display()),
        )
        .map_err(|e| LipSyncError::io("writing output", e))?;
        Ok(request.output.to_path_buf())
    }
}

/// Duration matcher double: copies the input and records the target.
pub struct CopyDurationMatcher {
    fps: f64,
    fail: bool,
    targets: Mutex<Vec<f64>>,
}

impl CopyDurationMatcher {
    pub fn new() -> Self {
        Self {
            fps: 25.0,
            fail: false,
            targets: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as an undecodable input.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Target durations requested so far.
    pub fn targets(&self) -> Vec<f64> {
        self.targets.lock().clone()
    }
}

impl Default for CopyDurationMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DurationMatcher for CopyDurationMatcher {
    fn extend(
        &self,
        video: &Path,
        target_duration_secs: f64,
        output: &Path,
    ) -> Result<MatchReport, VideoError> {
        self.targets.lock().push(target_duration_secs);

        if self.fail {
            return Err(VideoError::DecodeFailed {
                path: video.to_path_buf(),
                diagnostic: "Invalid data found when processing input".to_string(),
            });
        }

        fs::copy(video, output).map_err(|e| VideoError::io("copying video", e))?;
        let target_frames = target_frame_count(target_duration_secs, self.fps);
        Ok(MatchReport {
            output_path: output.to_path_buf(),
            fps: self.fps,
            source_frames: target_frames,
            target_frames,
            frames_written: target_frames,
        })
    }
}
