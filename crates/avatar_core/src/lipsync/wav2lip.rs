//! Easy-Wav2Lip command line adapter.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use super::config_ini::render_config;
use super::{LipSyncEngine, LipSyncError, LipSyncRequest};
use crate::config::LipSyncSettings;
use crate::process::{format_command, run_tool};

/// One lock per engine checkout, shared by every adapter in the process.
static ENGINE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

fn engine_lock(engine_dir: &Path) -> Arc<Mutex<()>> {
    let locks = ENGINE_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    locks
        .lock()
        .entry(absolute(engine_dir))
        .or_default()
        .clone()
}

/// Runs the Easy-Wav2Lip wrapper script inside its checkout.
///
/// The engine reads `config.ini` and writes `temp/output.mp4` at fixed
/// locations in `engine_dir`, so a run holds the checkout's lock from
/// writing the config until the output has been copied out. Adapters
/// pointing at the same checkout share that lock.
pub struct Wav2LipCli {
    settings: LipSyncSettings,
    lock: Arc<Mutex<()>>,
}

impl Wav2LipCli {
    pub fn new(settings: LipSyncSettings) -> Self {
        let lock = engine_lock(Path::new(&settings.engine_dir));
        Self { settings, lock }
    }

    pub fn engine_dir(&self) -> &Path {
        Path::new(&self.settings.engine_dir)
    }

    fn wrapper_path(&self) -> PathBuf {
        self.engine_dir().join(&self.settings.wrapper_script)
    }

    fn config_path(&self) -> PathBuf {
        self.engine_dir().join("config.ini")
    }

    /// Fixed location the engine writes its result to.
    pub fn engine_output(&self) -> PathBuf {
        self.engine_dir().join("temp").join("output.mp4")
    }

    /// Check that the engine checkout and its wrapper script exist.
    pub fn verify_installation(&self) -> bool {
        let wrapper = self.wrapper_path();
        if !wrapper.is_file() {
            tracing::warn!("Wav2Lip wrapper not found at {}", wrapper.display());
            return false;
        }
        true
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(absolute(&self.wrapper_path()));
        cmd.current_dir(self.engine_dir())
            .env("PYTHONIOENCODING", "utf-8");
        cmd
    }
}

/// Absolute form of `path`; the engine runs with its own working directory.
fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl LipSyncEngine for Wav2LipCli {
    fn name(&self) -> &str {
        "easy-wav2lip"
    }

    fn run(&self, request: &LipSyncRequest<'_>) -> Result<PathBuf, LipSyncError> {
        let _guard = self.lock.lock();

        let engine_output = self.engine_output();
        if let Some(parent) = engine_output.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LipSyncError::io("creating engine temp directory", e))?;
        }
        // A result left over from an earlier run must not be mistaken for ours
        if engine_output.exists() {
            fs::remove_file(&engine_output)
                .map_err(|e| LipSyncError::io("removing stale engine output", e))?;
        }

        let config = render_config(
            &absolute(request.video),
            &absolute(request.audio),
            request.options,
        );
        fs::write(self.config_path(), config)
            .map_err(|e| LipSyncError::io("writing config.ini", e))?;

        let mut cmd = self.build_command();
        tracing::info!("Running Wav2Lip: {}", format_command(&cmd));

        let output = run_tool(&mut cmd).map_err(|source| LipSyncError::Spawn {
            tool: self.wrapper_path().display().to_string(),
            source,
        })?;

        if !output.success() {
            return Err(LipSyncError::CommandFailed {
                exit_code: output.exit_code,
                diagnostic: output.diagnostic(),
            });
        }

        if !engine_output.is_file() {
            return Err(LipSyncError::OutputMissing {
                path: engine_output,
                diagnostic: output.diagnostic(),
            });
        }

        if let Some(parent) = request.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| LipSyncError::io("creating output directory", e))?;
            }
        }
        fs::copy(&engine_output, request.output)
            .map_err(|e| LipSyncError::io("copying engine output", e))?;

        tracing::info!("Copied Wav2Lip output to {}", request.output.display());
        Ok(request.output.to_path_buf())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::models::LipSyncOptions;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::{tempdir, TempDir};

    fn engine_with_script(body: &str) -> (TempDir, Wav2LipCli) {
        let dir = tempdir().unwrap();
        let script = dir.path().join("run_wav2lip.sh");
        fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let settings = LipSyncSettings {
            engine_dir: dir.path().display().to_string(),
            wrapper_script: "run_wav2lip.sh".to_string(),
            ..LipSyncSettings::default()
        };
        (dir, Wav2LipCli::new(settings))
    }

    fn run(engine: &Wav2LipCli, output: &Path) -> Result<PathBuf, LipSyncError> {
        run_video(engine, Path::new("face.mp4"), output)
    }

    fn run_video(engine: &Wav2LipCli, video: &Path, output: &Path) -> Result<PathBuf, LipSyncError> {
        let options = LipSyncOptions::default();
        engine.run(&LipSyncRequest {
            video,
            audio: Path::new("speech.wav"),
            options: &options,
            output,
        })
    }

    #[test]
    fn copies_engine_output_to_job_path() {
        let (dir, engine) = engine_with_script("mkdir -p temp && echo synced > temp/output.mp4");
        let out = dir.path().join("job").join("lipsync.mp4");

        let produced = run(&engine, &out).unwrap();

        assert_eq!(produced, out);
        assert_eq!(fs::read_to_string(&out).unwrap(), "synced\n");
        let ini = fs::read_to_string(dir.path().join("config.ini")).unwrap();
        assert!(ini.contains("quality = Enhanced"));
        assert!(engine.verify_installation());
    }

    #[test]
    fn nonzero_exit_carries_diagnostic() {
        let (dir, engine) = engine_with_script("echo 'CUDA out of memory' >&2\nexit 3");
        let err = run(&engine, &dir.path().join("out.mp4")).unwrap_err();

        match err {
            LipSyncError::CommandFailed { exit_code, diagnostic } => {
                assert_eq!(exit_code, 3);
                assert_eq!(diagnostic, "CUDA out of memory");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stale_output_is_not_reused() {
        let (dir, engine) = engine_with_script("echo 'no face detected'");
        fs::create_dir_all(dir.path().join("temp")).unwrap();
        fs::write(dir.path().join("temp").join("output.mp4"), "old").unwrap();

        let err = run(&engine, &dir.path().join("out.mp4")).unwrap_err();
        assert!(matches!(err, LipSyncError::OutputMissing { .. }));
        assert_eq!(err.diagnostic(), Some("no face detected"));
    }

    #[test]
    fn adapters_on_one_checkout_take_turns() {
        // Echoes back whichever video the config named once the run is under way
        let (dir, first) = engine_with_script(
            "sleep 1\nmkdir -p temp\ngrep video_file config.ini > temp/output.mp4",
        );
        let second = Wav2LipCli::new(first.settings.clone());
        let first_out = dir.path().join("first.mp4");
        let second_out = dir.path().join("second.mp4");

        std::thread::scope(|scope| {
            let a = scope.spawn(|| run_video(&first, Path::new("a.mp4"), &first_out));
            std::thread::sleep(std::time::Duration::from_millis(300));
            let b = scope.spawn(|| run_video(&second, Path::new("b.mp4"), &second_out));
            a.join().unwrap().unwrap();
            b.join().unwrap().unwrap();
        });

        let first_text = fs::read_to_string(&first_out).unwrap();
        let second_text = fs::read_to_string(&second_out).unwrap();
        assert!(first_text.contains("a.mp4"), "{first_text}");
        assert!(second_text.contains("b.mp4"), "{second_text}");
    }

    #[test]
    fn missing_wrapper_fails_verification() {
        let dir = tempdir().unwrap();
        let settings = LipSyncSettings {
            engine_dir: dir.path().display().to_string(),
            ..LipSyncSettings::default()
        };
        let engine = Wav2LipCli::new(settings);
        assert!(!engine.verify_installation());
        assert!(matches!(
            run(&engine, &dir.path().join("out.mp4")),
            Err(LipSyncError::Spawn { .. })
        ));
    }
}
