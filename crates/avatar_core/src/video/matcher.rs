//! Stretch a clip to cover a target duration.

use std::fs;
use std::path::{Path, PathBuf};

use super::bounce::BouncePlan;
use super::encoder::{FfmpegEncoder, FrameSink};
use super::frames::{decode_frames, FrameSource};
use super::probe::probe_video;
use super::{target_frame_count, VideoError};
use crate::config::VideoSettings;

/// Outcome of a duration match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    pub output_path: PathBuf,
    pub fps: f64,
    pub source_frames: usize,
    /// `ceil(target_duration * fps)`.
    pub target_frames: usize,
    pub frames_written: usize,
}

impl MatchReport {
    /// Frames written beyond the target.
    pub fn overshoot(&self) -> usize {
        self.frames_written.saturating_sub(self.target_frames)
    }
}

/// Capability to produce a video at least `target_duration_secs` long.
pub trait DurationMatcher: Send + Sync {
    fn extend(
        &self,
        video: &Path,
        target_duration_secs: f64,
        output: &Path,
    ) -> Result<MatchReport, VideoError>;
}

/// Write the frames of `plan` from `source` into `sink`, then finish it.
pub fn extend_frames<S>(
    source: &S,
    plan: BouncePlan,
    mut sink: Box<dyn FrameSink + '_>,
) -> Result<usize, VideoError>
where
    S: FrameSource + ?Sized,
{
    for index in plan {
        sink.write_frame(source.frame(index)?)?;
    }
    sink.finish()
}

/// ffmpeg-backed matcher using in-memory frames and bounce looping.
#[derive(Debug, Clone)]
pub struct VideoDurationMatcher {
    settings: VideoSettings,
}

impl VideoDurationMatcher {
    pub fn new(settings: VideoSettings) -> Self {
        Self { settings }
    }

    fn plan(&self, frame_count: usize, target: usize) -> BouncePlan {
        if self.settings.truncate_first_pass {
            BouncePlan::truncated(frame_count, target)
        } else {
            BouncePlan::new(frame_count, target)
        }
    }

    fn run(
        &self,
        video: &Path,
        target_duration_secs: f64,
        output: &Path,
    ) -> Result<MatchReport, VideoError> {
        let props = probe_video(&self.settings.ffprobe_path, video)?;
        let frames = decode_frames(&self.settings.ffmpeg_path, video, props)?;

        let source_frames = frames.frame_count();
        let target_frames = target_frame_count(target_duration_secs, props.fps);
        let plan = self.plan(source_frames, target_frames);

        tracing::info!(
            "Extending {} frames to cover {:.3}s ({} frames at {:.3} fps), writing {}",
            source_frames,
            target_duration_secs,
            target_frames,
            props.fps,
            plan.total()
        );

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| VideoError::io("creating output directory", e))?;
            }
        }

        let encoder = FfmpegEncoder::spawn(&self.settings, props, output)?;
        let frames_written = extend_frames(&frames, plan, Box::new(encoder))?;

        let report = MatchReport {
            output_path: output.to_path_buf(),
            fps: props.fps,
            source_frames,
            target_frames,
            frames_written,
        };
        if report.overshoot() > 0 {
            tracing::debug!(
                "Matched video overshoots target by {} frames",
                report.overshoot()
            );
        }
        Ok(report)
    }
}

impl DurationMatcher for VideoDurationMatcher {
    fn extend(
        &self,
        video: &Path,
        target_duration_secs: f64,
        output: &Path,
    ) -> Result<MatchReport, VideoError> {
        if !target_duration_secs.is_finite() || target_duration_secs < 0.0 {
            return Err(VideoError::InvalidDuration(target_duration_secs));
        }

        let result = self.run(video, target_duration_secs, output);
        if result.is_err() && output.exists() {
            let _ = fs::remove_file(output);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::frames::FrameSequence;
    use crate::video::probe::VideoProperties;
    use std::sync::{Arc, Mutex};

    /// Records the first byte of every frame written.
    struct RecordingSink {
        seen: Arc<Mutex<Vec<u8>>>,
    }

    impl FrameSink for RecordingSink {
        fn write_frame(&mut self, frame: &[u8]) -> Result<(), VideoError> {
            self.seen.lock().unwrap().push(frame[0]);
            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<usize, VideoError> {
            Ok(self.seen.lock().unwrap().len())
        }
    }

    /// Clip whose frame `i` is filled with byte `i`.
    fn labelled_clip(count: usize) -> FrameSequence {
        let props = VideoProperties {
            fps: 25.0,
            width: 1,
            height: 1,
        };
        let frames = (0..count).map(|i| vec![i as u8; 3]).collect();
        FrameSequence::new(frames, props)
    }

    fn run_plan(clip: &FrameSequence, plan: BouncePlan) -> (usize, Vec<u8>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink { seen: seen.clone() };
        let written = extend_frames(clip, plan, Box::new(sink)).unwrap();
        let order = seen.lock().unwrap().clone();
        (written, order)
    }

    #[test]
    fn two_seconds_stretched_to_four() {
        let clip = labelled_clip(50);
        let target = target_frame_count(4.0, 25.0);
        let (written, order) = run_plan(&clip, BouncePlan::new(clip.frame_count(), target));

        assert!(written >= 100);
        assert_eq!(order.len(), written);
        for pair in order.windows(2) {
            assert_ne!(pair[0], pair[1], "turn frame repeated");
        }
    }

    #[test]
    fn short_target_keeps_whole_clip() {
        let clip = labelled_clip(50);
        let target = target_frame_count(1.0, 25.0);
        let (written, _) = run_plan(&clip, BouncePlan::new(clip.frame_count(), target));
        assert_eq!(written, 50);
    }

    #[test]
    fn truncated_policy_stops_at_target() {
        let clip = labelled_clip(50);
        let target = target_frame_count(1.0, 25.0);
        let (written, order) = run_plan(&clip, BouncePlan::truncated(clip.frame_count(), target));
        assert_eq!(written, 25);
        assert_eq!(order.last(), Some(&24));
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let clip = labelled_clip(13);
        let first = run_plan(&clip, BouncePlan::new(13, 61));
        let second = run_plan(&clip, BouncePlan::new(13, 61));
        assert_eq!(first, second);
    }

    #[test]
    fn report_overshoot() {
        let report = MatchReport {
            output_path: PathBuf::from("matched.mp4"),
            fps: 25.0,
            source_frames: 50,
            target_frames: 25,
            frames_written: 50,
        };
        assert_eq!(report.overshoot(), 25);
    }

    #[test]
    fn rejects_invalid_duration() {
        let matcher = VideoDurationMatcher::new(VideoSettings::default());
        let result = matcher.extend(Path::new("clip.mp4"), f64::NAN, Path::new("out.mp4"));
        assert!(matches!(result, Err(VideoError::InvalidDuration(_))));
    }

    #[test]
    fn missing_tools_fail_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let settings = VideoSettings {
            ffprobe_path: "/nonexistent/ffprobe".to_string(),
            ..VideoSettings::default()
        };
        let matcher = VideoDurationMatcher::new(settings);
        let output = dir.path().join("matched.mp4");

        let result = matcher.extend(Path::new("clip.mp4"), 2.0, &output);
        assert!(matches!(result, Err(VideoError::Spawn { .. })));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    mod with_fake_tools {
        use super::*;
        use crate::testing::write_script;
        use tempfile::{tempdir, TempDir};

        /// ffprobe reporting a 1x1 clip at 25 fps and an ffmpeg that decodes
        /// to the bytes of `frames.raw` and encodes by copying stdin.
        fn fake_tools(frames: &[u8], encode_exit: i32) -> (TempDir, VideoSettings) {
            let dir = tempdir().unwrap();
            let raw = dir.path().join("frames.raw");
            fs::write(&raw, frames).unwrap();

            let ffprobe = write_script(
                dir.path(),
                "ffprobe",
                r#"echo '{"streams":[{"r_frame_rate":"25/1","width":1,"height":1}]}'"#,
            )
            .unwrap();
            let ffmpeg = write_script(
                dir.path(),
                "ffmpeg",
                &format!(
                    "for last; do :; done\ncase \"$*\" in\n  *pipe:1*) cat '{}' ;;\n  *) cat > \"$last\"; exit {} ;;\nesac",
                    raw.display(),
                    encode_exit
                ),
            )
            .unwrap();

            let settings = VideoSettings {
                ffmpeg_path: ffmpeg.to_string_lossy().into_owned(),
                ffprobe_path: ffprobe.to_string_lossy().into_owned(),
                ..VideoSettings::default()
            };
            (dir, settings)
        }

        /// 50 frames of 1x1 RGB24, frame `i` filled with byte `i`.
        fn labelled_raw() -> Vec<u8> {
            (0..50u8).flat_map(|i| [i; 3]).collect()
        }

        #[test]
        fn two_second_clip_covers_four_seconds() {
            let (dir, settings) = fake_tools(&labelled_raw(), 0);
            let clip = dir.path().join("face.mp4");
            fs::write(&clip, b"container").unwrap();
            let output = dir.path().join("work").join("matched.mp4");

            let report = VideoDurationMatcher::new(settings)
                .extend(&clip, 4.0, &output)
                .unwrap();

            assert_eq!(report.fps, 25.0);
            assert_eq!(report.source_frames, 50);
            assert_eq!(report.target_frames, 100);
            assert_eq!(report.frames_written, 100);
            assert_eq!(report.output_path, output);

            let encoded = fs::read(&output).unwrap();
            assert_eq!(encoded.len(), 300);
            let order: Vec<u8> = encoded.chunks(3).map(|px| px[0]).collect();
            let expected: Vec<u8> = BouncePlan::new(50, 100).map(|i| i as u8).collect();
            assert_eq!(order, expected);
            // Forward pass, then back down without repeating frame 49
            assert_eq!(&order[48..52], &[48, 49, 48, 47]);
        }

        #[test]
        fn failed_encode_removes_partial_output() {
            let (dir, settings) = fake_tools(&labelled_raw(), 1);
            let clip = dir.path().join("face.mp4");
            fs::write(&clip, b"container").unwrap();
            let output = dir.path().join("matched.mp4");

            let result = VideoDurationMatcher::new(settings).extend(&clip, 1.0, &output);

            assert!(matches!(result, Err(VideoError::EncodeFailed { .. })));
            assert!(!output.exists());
        }

        #[test]
        fn empty_decode_is_reported() {
            let (dir, settings) = fake_tools(&[], 0);
            let clip = dir.path().join("face.mp4");
            fs::write(&clip, b"container").unwrap();

            let result = VideoDurationMatcher::new(settings).extend(
                &clip,
                1.0,
                &dir.path().join("matched.mp4"),
            );
            assert!(matches!(result, Err(VideoError::NoFrames { .. })));
        }
    }
}
