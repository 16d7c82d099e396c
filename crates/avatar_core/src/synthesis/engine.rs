//! Text-to-speech engine boundary.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::config::TtsSettings;
use crate::process::{format_command, run_tool};

/// One synthesis call.
#[derive(Debug, Clone, Copy)]
pub struct TtsRequest<'a> {
    pub text: &'a str,
    pub reference_audio: Option<&'a Path>,
    pub reference_text: Option<&'a str>,
    /// Speech speed multiplier.
    pub speed: f32,
    /// Directory the engine writes its single waveform into.
    pub output_dir: &'a Path,
}

/// Failure reported by a TTS engine.
#[derive(Error, Debug)]
pub enum TtsError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("engine exited with code {exit_code}: {diagnostic}")]
    CommandFailed { exit_code: i32, diagnostic: String },

    /// Exit code was 0 but the expected waveform is absent.
    #[error("engine produced no output at {path}: {diagnostic}")]
    OutputMissing { path: PathBuf, diagnostic: String },
}

impl TtsError {
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            TtsError::CommandFailed { diagnostic, .. }
            | TtsError::OutputMissing { diagnostic, .. } => Some(diagnostic),
            TtsError::Spawn { .. } => None,
        }
    }
}

/// Capability to turn one sentence into one waveform file.
pub trait TtsEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Synthesize `request.text`, returning the path of the waveform
    /// written inside `request.output_dir`.
    fn synthesize(&self, request: &TtsRequest<'_>) -> Result<PathBuf, TtsError>;
}

/// F5-TTS `f5-tts_infer-cli` adapter.
#[derive(Debug, Clone)]
pub struct F5TtsCli {
    settings: TtsSettings,
}

impl F5TtsCli {
    pub fn new(settings: TtsSettings) -> Self {
        Self { settings }
    }

    /// Check that the CLI starts (`--help` exits 0).
    pub fn verify_installation(&self) -> bool {
        let mut cmd = Command::new(&self.settings.cli_path);
        cmd.arg("--help");
        match run_tool(&mut cmd) {
            Ok(out) => out.success(),
            Err(e) => {
                tracing::warn!("F5-TTS verification failed: {}", e);
                false
            }
        }
    }

    /// Trimmed, and lowercased unless `lowercase_text` is off.
    fn prepare_text(&self, text: &str) -> String {
        let text = text.trim();
        if self.settings.lowercase_text {
            text.to_lowercase()
        } else {
            text.to_string()
        }
    }

    fn build_command(&self, request: &TtsRequest<'_>) -> Command {
        let s = &self.settings;
        let mut cmd = Command::new(&s.cli_path);
        cmd.arg("--model")
            .arg(&s.model)
            .arg("--ckpt_file")
            .arg(&s.ckpt_file)
            .arg("--vocab_file")
            .arg(&s.vocab_file)
            .arg("--gen_text")
            .arg(self.prepare_text(request.text))
            .arg("--vocoder_name")
            .arg(&s.vocoder_name)
            .arg("--remove_silence")
            .arg(s.remove_silence.to_string())
            .arg("--output_dir")
            .arg(request.output_dir)
            .arg("--speed")
            .arg(request.speed.to_string())
            .arg("--nfe_step")
            .arg(s.nfe_step.to_string());

        if let Some(audio) = request.reference_audio {
            cmd.arg("--ref_audio")
                .arg(audio)
                .arg("--ref_text")
                .arg(self.prepare_text(request.reference_text.unwrap_or("")));
        }

        cmd.env("PYTHONIOENCODING", "utf-8");
        cmd
    }
}

impl TtsEngine for F5TtsCli {
    fn name(&self) -> &str {
        "f5-tts"
    }

    fn synthesize(&self, request: &TtsRequest<'_>) -> Result<PathBuf, TtsError> {
        let mut cmd = self.build_command(request);
        tracing::info!("Running F5-TTS: {}", format_command(&cmd));

        let output = run_tool(&mut cmd).map_err(|source| TtsError::Spawn {
            tool: self.settings.cli_path.clone(),
            source,
        })?;

        if !output.success() {
            return Err(TtsError::CommandFailed {
                exit_code: output.exit_code,
                diagnostic: output.diagnostic(),
            });
        }

        let produced = request.output_dir.join(&self.settings.output_file_name);
        if !produced.is_file() {
            return Err(TtsError::OutputMissing {
                path: produced,
                diagnostic: output.diagnostic(),
            });
        }

        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn command_includes_reference_pair() {
        let engine = F5TtsCli::new(TtsSettings::default());
        let request = TtsRequest {
            text: "Hello there.",
            reference_audio: Some(Path::new("refs/short.wav")),
            reference_text: Some("short ref"),
            speed: 1.25,
            output_dir: Path::new("/tmp/job/sentence_chunks/0"),
        };

        let args = args_of(&engine.build_command(&request));
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();

        assert_eq!(args[pos("--gen_text") + 1], "hello there.");
        assert_eq!(args[pos("--ref_audio") + 1], "refs/short.wav");
        assert_eq!(args[pos("--ref_text") + 1], "short ref");
        assert_eq!(args[pos("--speed") + 1], "1.25");
        assert_eq!(args[pos("--nfe_step") + 1], "32");
        assert_eq!(args[pos("--remove_silence") + 1], "false");
    }

    #[test]
    fn text_case_follows_settings() {
        let request = TtsRequest {
            text: "  Сайн байна уу? ",
            reference_audio: Some(Path::new("ref.wav")),
            reference_text: Some("Short REF"),
            speed: 1.0,
            output_dir: Path::new("out"),
        };

        let lowered = args_of(&F5TtsCli::new(TtsSettings::default()).build_command(&request));
        assert!(lowered.iter().any(|a| a == "сайн байна уу?"));
        assert!(lowered.iter().any(|a| a == "short ref"));

        let mut settings = TtsSettings::default();
        settings.lowercase_text = false;
        settings.nfe_step = 16;
        let kept = args_of(&F5TtsCli::new(settings).build_command(&request));
        assert!(kept.iter().any(|a| a == "Сайн байна уу?"));
        assert!(kept.iter().any(|a| a == "Short REF"));
        assert!(kept.iter().any(|a| a == "16"));
    }

    #[test]
    fn command_omits_reference_when_absent() {
        let engine = F5TtsCli::new(TtsSettings::default());
        let request = TtsRequest {
            text: "Hi.",
            reference_audio: None,
            reference_text: None,
            speed: 1.0,
            output_dir: Path::new("out"),
        };

        let args = args_of(&engine.build_command(&request));
        assert!(!args.iter().any(|a| a == "--ref_audio"));
        assert!(!args.iter().any(|a| a == "--ref_text"));
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let mut settings = TtsSettings::default();
        settings.cli_path = "/nonexistent/f5-tts_infer-cli".to_string();
        let engine = F5TtsCli::new(settings);
        let dir = tempfile::tempdir().unwrap();

        let request = TtsRequest {
            text: "Hi.",
            reference_audio: None,
            reference_text: None,
            speed: 1.0,
            output_dir: dir.path(),
        };
        assert!(matches!(engine.synthesize(&request), Err(TtsError::Spawn { .. })));
        assert!(!engine.verify_installation());
    }
}
