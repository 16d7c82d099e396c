//! Talking Avatar command-line front-end.
//!
//! ```text
//! talking-avatar init-config
//! talking-avatar check
//! talking-avatar set lipsync.max_attempts 5
//! talking-avatar generate --text "Hello there." --source face.mp4
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use avatar_core::config::{ConfigManager, Settings};
use avatar_core::lipsync::Wav2LipCli;
use avatar_core::logging::init_tracing;
use avatar_core::models::{JobOptions, LipSyncQuality, Padding, ReferenceOverride};
use avatar_core::orchestrator::{PipelineCoordinator, ProgressCallback};
use avatar_core::process::run_tool;
use avatar_core::references::ReferenceCatalog;
use avatar_core::synthesis::F5TtsCli;

/// Generate talking-head videos from text and a face image or video
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file
    #[arg(short, long, global = true, default_value = ".config/avatar.toml", env = "AVATAR_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate one talking video
    Generate(GenerateArgs),

    /// Write a settings file with default values
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Verify the external engines and the reference catalog
    Check,

    /// Change one setting, e.g. `set lipsync.quality fast`
    Set {
        /// Setting as section.key
        key: String,

        /// New value
        value: String,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Text to speak
    #[arg(short, long, conflicts_with = "text_file", required_unless_present = "text_file")]
    text: Option<String>,

    /// Read the text to speak from a file
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Face image or video
    #[arg(short, long)]
    source: PathBuf,

    /// Reference voice recording used for every sentence
    #[arg(long, requires = "reference_text")]
    reference_audio: Option<PathBuf>,

    /// Transcript of the reference voice recording
    #[arg(long, requires = "reference_audio")]
    reference_text: Option<String>,

    /// Lip-sync quality (fast, improved, enhanced)
    #[arg(short, long)]
    quality: Option<String>,

    /// Face padding as up,down,left,right
    #[arg(long, value_delimiter = ',', num_args = 4)]
    padding: Option<Vec<i32>>,

    /// Keep face-detection smoothing on
    #[arg(long)]
    smooth: bool,

    /// Speech speed multiplier
    #[arg(long)]
    speed: Option<f32>,

    /// Lip-sync attempts before giving up
    #[arg(long)]
    attempts: Option<u32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::InitConfig { force } => init_config(&cli.config, force),
        Commands::Set { key, value } => set_value(&cli.config, &key, &value),
        Commands::Check => {
            let settings = load_settings(&cli.config)?;
            check(&settings)
        }
        Commands::Generate(args) => {
            let settings = load_settings(&cli.config)?;
            generate(settings, args)
        }
    }
}

fn load_settings(path: &Path) -> Result<Settings> {
    let mut manager = ConfigManager::new(path);
    manager
        .load_or_create()
        .with_context(|| format!("loading settings from {}", path.display()))?;
    init_tracing(manager.settings().logging.level);
    manager
        .ensure_dirs_exist()
        .context("creating output, temp and log folders")?;
    Ok(manager.settings().clone())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let manager = ConfigManager::new(path);
    manager
        .save()
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

fn set_value(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut manager = ConfigManager::new(path);
    manager
        .load_or_create()
        .with_context(|| format!("loading settings from {}", path.display()))?;
    let section = manager
        .set_value(key, value)
        .with_context(|| format!("updating {}", path.display()))?;
    println!("Updated [{}] in {}", section.table_name(), path.display());
    Ok(())
}

fn check(settings: &Settings) -> Result<()> {
    let mut failures = 0;

    let mut report = |name: &str, ok: bool, detail: String| {
        let mark = if ok { "ok" } else { "MISSING" };
        println!("{:<10} {:<8} {}", name, mark, detail);
        if !ok {
            failures += 1;
        }
    };

    let tts = F5TtsCli::new(settings.tts.clone());
    report("f5-tts", tts.verify_installation(), settings.tts.cli_path.clone());

    let lipsync = Wav2LipCli::new(settings.lipsync.clone());
    report(
        "wav2lip",
        lipsync.verify_installation(),
        lipsync.engine_dir().display().to_string(),
    );

    for tool in [&settings.video.ffmpeg_path, &settings.video.ffprobe_path] {
        let ok = run_tool(Command::new(tool).arg("-version"))
            .map(|out| out.success())
            .unwrap_or(false);
        report("ffmpeg", ok, tool.clone());
    }

    match ReferenceCatalog::load(Path::new(&settings.paths.references_file)) {
        Ok(catalog) => report(
            "catalog",
            true,
            format!("{} reference(s)", catalog.len()),
        ),
        Err(e) => report("catalog", false, e.to_string()),
    }

    if failures > 0 {
        bail!("{} check(s) failed", failures);
    }
    Ok(())
}

fn generate(mut settings: Settings, args: GenerateArgs) -> Result<()> {
    let text = match (args.text, args.text_file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("reading text from {}", path.display()))?,
        (None, None) => bail!("either --text or --text-file is required"),
    };

    if let Some(attempts) = args.attempts {
        settings.lipsync.max_attempts = attempts;
    }

    let mut lipsync = settings.lipsync.default_options();
    if let Some(ref quality) = args.quality {
        lipsync.quality = LipSyncQuality::from_name(quality);
    }
    if let Some(padding) = args.padding {
        lipsync.padding = Padding {
            up: padding[0],
            down: padding[1],
            left: padding[2],
            right: padding[3],
        };
    }
    if args.smooth {
        lipsync.nosmooth = false;
    }

    let mut options = JobOptions::default().with_lipsync(lipsync);
    if let (Some(audio), Some(transcript)) = (args.reference_audio, args.reference_text) {
        options = options.with_reference_override(ReferenceOverride::new(audio, transcript));
    }
    if let Some(speed) = args.speed {
        options = options.with_speed(speed);
    }

    let coordinator = PipelineCoordinator::from_settings(settings)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?
        .with_log_callback(Arc::new(|line: &str| tracing::debug!("{}", line)));

    let progress: ProgressCallback = Box::new(|fraction: f64, description: &str| {
        println!("[{:>3.0}%] {}", fraction * 100.0, description);
    });

    let report = coordinator.run_job(&text, &args.source, options, Some(progress));
    match report.result {
        Ok(path) => {
            println!("Wrote {}", path.display());
            Ok(())
        }
        Err(e) => {
            if let Some(diagnostic) = e.diagnostic() {
                eprintln!("{}", diagnostic);
            }
            bail!("{} (job {})", e.user_message(), report.job_id)
        }
    }
}
