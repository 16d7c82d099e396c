//! Video property detection via ffprobe.

use std::path::Path;
use std::process::Command;

use super::VideoError;
use crate::process::run_tool;

/// Properties needed to decode and re-encode a clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoProperties {
    /// Bytes in one RGB24 frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Parse an ffprobe rate such as `"30000/1001"` or `"25"`.
pub fn parse_fps_fraction(s: &str) -> Option<f64> {
    let fps = match s.split_once('/') {
        Some((num, denom)) => {
            let num: f64 = num.trim().parse().ok()?;
            let denom: f64 = denom.trim().parse().ok()?;
            if denom == 0.0 {
                return None;
            }
            num / denom
        }
        None => s.trim().parse().ok()?,
    };
    (fps > 0.0 && fps.is_finite()).then_some(fps)
}

/// Probe the first video stream of `path`.
pub fn probe_video(ffprobe: &str, path: &Path) -> Result<VideoProperties, VideoError> {
    let mut cmd = Command::new(ffprobe);
    cmd.args([
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=r_frame_rate,width,height",
        "-of",
        "json",
    ])
    .arg(path);

    let output = run_tool(&mut cmd).map_err(|source| VideoError::Spawn {
        tool: ffprobe.to_string(),
        source,
    })?;

    if !output.success() {
        return Err(VideoError::ProbeFailed {
            path: path.to_path_buf(),
            message: output.diagnostic(),
        });
    }

    let props = parse_probe_json(&output.stdout).map_err(|message| VideoError::ProbeFailed {
        path: path.to_path_buf(),
        message,
    })?;

    tracing::info!(
        "[VideoProps] {}: {}x{} @ {:.3} fps",
        path.display(),
        props.width,
        props.height,
        props.fps
    );
    Ok(props)
}

/// Extract fps and dimensions from ffprobe JSON output.
pub fn parse_probe_json(json: &str) -> Result<VideoProperties, String> {
    let data: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("Failed to parse ffprobe JSON: {}", e))?;

    let stream = data
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .ok_or_else(|| "No video stream found".to_string())?;

    let fps = stream
        .get("r_frame_rate")
        .and_then(|v| v.as_str())
        .and_then(parse_fps_fraction)
        .ok_or_else(|| "Missing or invalid r_frame_rate".to_string())?;

    let dimension = |key: &str| {
        stream
            .get(key)
            .and_then(|v| v.as_u64())
            .filter(|&v| v > 0)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| format!("Missing or invalid {}", key))
    };

    Ok(VideoProperties {
        fps,
        width: dimension("width")?,
        height: dimension("height")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fractional_rates() {
        assert_eq!(parse_fps_fraction("25/1"), Some(25.0));
        assert_eq!(parse_fps_fraction("25"), Some(25.0));
        let ntsc = parse_fps_fraction("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_fps_fraction("0/0"), None);
        assert_eq!(parse_fps_fraction("abc"), None);
    }

    #[test]
    fn parses_stream_properties() {
        let json = r#"{"programs":[],"streams":[{"width":640,"height":480,"r_frame_rate":"25/1"}]}"#;
        let props = parse_probe_json(json).unwrap();
        assert_eq!(
            props,
            VideoProperties {
                fps: 25.0,
                width: 640,
                height: 480
            }
        );
        assert_eq!(props.frame_bytes(), 640 * 480 * 3);
    }

    #[test]
    fn rejects_missing_stream() {
        assert!(parse_probe_json(r#"{"streams":[]}"#).is_err());
        assert!(parse_probe_json(r#"{"streams":[{"width":0,"height":2,"r_frame_rate":"25/1"}]}"#).is_err());
        assert!(parse_probe_json("not json").is_err());
    }

    #[test]
    fn missing_ffprobe_is_a_spawn_error() {
        let result = probe_video("/nonexistent/ffprobe", Path::new("clip.mp4"));
        assert!(matches!(result, Err(VideoError::Spawn { .. })));
    }
}
