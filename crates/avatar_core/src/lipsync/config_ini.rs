//! Easy-Wav2Lip `config.ini` rendering.

use std::fmt::Write;
use std::path::Path;

use crate::models::LipSyncOptions;

/// One INI section: name plus ordered key/value pairs.
struct Section {
    name: &'static str,
    entries: Vec<(&'static str, String)>,
}

/// Render the configuration bundle the engine reads on start-up.
///
/// Keys are written lower-case; the engine reads them case-insensitively.
pub fn render_config(video: &Path, audio: &Path, options: &LipSyncOptions) -> String {
    let bool_str = |b: bool| if b { "True" } else { "False" }.to_string();

    let sections = [
        Section {
            name: "OPTIONS",
            entries: vec![
                ("video_file", video.display().to_string()),
                ("vocal_file", audio.display().to_string()),
                ("quality", options.quality.engine_name().to_string()),
                ("output_height", "full resolution".to_string()),
                ("wav2lip_version", options.engine_variant.clone()),
                ("use_previous_tracking_data", bool_str(true)),
                ("nosmooth", options.nosmooth.to_string()),
                ("preview_window", bool_str(false)),
            ],
        },
        Section {
            name: "PADDING",
            entries: vec![
                ("u", options.padding.up.to_string()),
                ("d", options.padding.down.to_string()),
                ("l", options.padding.left.to_string()),
                ("r", options.padding.right.to_string()),
            ],
        },
        Section {
            name: "MASK",
            entries: vec![
                ("size", "1".to_string()),
                ("feathering", "1".to_string()),
                ("mouth_tracking", bool_str(false)),
                ("debug_mask", bool_str(false)),
            ],
        },
        Section {
            name: "OTHER",
            entries: vec![
                ("batch_process", bool_str(false)),
                ("output_suffix", "_w2l".to_string()),
                ("include_settings_in_suffix", bool_str(true)),
                ("preview_input", bool_str(false)),
                ("preview_settings", bool_str(false)),
                ("frame_to_preview", "1".to_string()),
            ],
        },
    ];

    let mut out = String::new();
    for section in sections {
        let _ = writeln!(out, "[{}]", section.name);
        for (key, value) in section.entries {
            let _ = writeln!(out, "{} = {}", key, value);
        }
        out.push('\n');
    }
    out
}
