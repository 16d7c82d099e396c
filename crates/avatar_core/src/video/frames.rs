//! Decoded frame storage.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use super::probe::VideoProperties;
use super::VideoError;
use crate::process::{StderrTail, DIAGNOSTIC_LINES};

/// Random access to decoded RGB24 frames.
///
/// The bounce plan only asks for frames by index, so an implementation
/// may hold every frame in memory or seek a decoder on demand.
pub trait FrameSource {
    fn frame_count(&self) -> usize;

    fn frame(&self, index: usize) -> Result<&[u8], VideoError>;

    fn properties(&self) -> VideoProperties;
}

/// All frames of a clip held in memory.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<Vec<u8>>,
    props: VideoProperties,
}

impl FrameSequence {
    pub fn new(frames: Vec<Vec<u8>>, props: VideoProperties) -> Self {
        Self { frames, props }
    }

    /// Split a raw RGB24 stream into frames. A trailing partial frame is dropped.
    pub fn from_raw(raw: &[u8], props: VideoProperties) -> Self {
        let frame_bytes = props.frame_bytes().max(1);
        let frames = raw
            .chunks_exact(frame_bytes)
            .map(|chunk| chunk.to_vec())
            .collect();
        Self::new(frames, props)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for FrameSequence {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self, index: usize) -> Result<&[u8], VideoError> {
        self.frames
            .get(index)
            .map(Vec::as_slice)
            .ok_or(VideoError::FrameIndex {
                index,
                count: self.frames.len(),
            })
    }

    fn properties(&self) -> VideoProperties {
        self.props
    }
}

/// Decode every frame of `path` to RGB24 through an ffmpeg pipe.
pub fn decode_frames(
    ffmpeg: &str,
    path: &Path,
    props: VideoProperties,
) -> Result<FrameSequence, VideoError> {
    let mut cmd = Command::new(ffmpeg);
    cmd.args(["-v", "error", "-nostdin", "-i"])
        .arg(path)
        .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-an", "pipe:1"]);

    tracing::debug!("Running FFmpeg (decode): {:?}", cmd);

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| VideoError::Spawn {
            tool: ffmpeg.to_string(),
            source,
        })?;

    let stderr = StderrTail::spawn(child.stderr.take(), DIAGNOSTIC_LINES);
    let mut stdout = child.stdout.take().ok_or_else(|| VideoError::DecodeFailed {
        path: path.to_path_buf(),
        diagnostic: "Failed to capture FFmpeg stdout".to_string(),
    })?;

    let mut raw = Vec::new();
    if let Err(e) = stdout.read_to_end(&mut raw) {
        let _ = child.kill();
        let _ = child.wait();
        return Err(VideoError::io("reading decoded frames", e));
    }

    let status = child
        .wait()
        .map_err(|e| VideoError::io("waiting for FFmpeg", e))?;
    let diagnostic = stderr.finish();

    if !status.success() {
        return Err(VideoError::DecodeFailed {
            path: path.to_path_buf(),
            diagnostic: if diagnostic.is_empty() {
                format!("ffmpeg exited with {}", status)
            } else {
                diagnostic
            },
        });
    }

    let sequence = FrameSequence::from_raw(&raw, props);
    if sequence.is_empty() {
        return Err(VideoError::NoFrames {
            path: path.to_path_buf(),
        });
    }

    tracing::info!(
        "Decoded {} frames ({}x{}) from {}",
        sequence.frame_count(),
        props.width,
        props.height,
        path.display()
    );
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> VideoProperties {
        VideoProperties {
            fps: 25.0,
            width: 2,
            height: 1,
        }
    }

    #[test]
    fn from_raw_splits_whole_frames() {
        // 2x1 RGB24 = 6 bytes per frame; 3 frames plus 2 stray bytes
        let raw: Vec<u8> = (0..20).collect();
        let seq = FrameSequence::from_raw(&raw, tiny());

        assert_eq!(seq.frame_count(), 3);
        assert_eq!(seq.frame(1).unwrap(), &[6, 7, 8, 9, 10, 11]);
        assert!(matches!(
            seq.frame(3),
            Err(VideoError::FrameIndex { index: 3, count: 3 })
        ));
    }

    #[test]
    fn missing_ffmpeg_is_a_spawn_error() {
        let result = decode_frames("/nonexistent/ffmpeg", Path::new("clip.mp4"), tiny());
        assert!(matches!(result, Err(VideoError::Spawn { .. })));
    }

    #[cfg(unix)]
    mod with_fake_ffmpeg {
        use super::*;
        use crate::testing::write_script;
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;
        use tempfile::tempdir;

        #[test]
        fn noisy_stderr_does_not_stall_decoding() {
            let dir = tempdir().unwrap();
            // ~150 KB of warnings, well past a pipe buffer, before any frame data
            let ffmpeg = write_script(
                dir.path(),
                "ffmpeg",
                "i=0\nwhile [ $i -lt 4000 ]; do echo \"[h264 @ 0x1] warning number $i\" >&2; i=$((i+1)); done\nprintf 'abcdef'",
            )
            .unwrap();

            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                let result = decode_frames(ffmpeg.to_str().unwrap(), Path::new("clip.mp4"), tiny());
                let _ = tx.send(result);
            });

            let seq = rx
                .recv_timeout(Duration::from_secs(30))
                .expect("decoder stalled")
                .unwrap();
            assert_eq!(seq.frame_count(), 1);
            assert_eq!(seq.frame(0).unwrap(), b"abcdef");
        }

        #[test]
        fn failure_carries_stderr_tail() {
            let dir = tempdir().unwrap();
            let ffmpeg = write_script(
                dir.path(),
                "ffmpeg",
                "echo 'first line' >&2\necho 'moov atom not found' >&2\nexit 1",
            )
            .unwrap();

            let err = decode_frames(ffmpeg.to_str().unwrap(), Path::new("clip.mp4"), tiny())
                .unwrap_err();
            match err {
                VideoError::DecodeFailed { diagnostic, .. } => {
                    assert_eq!(diagnostic, "first line\nmoov atom not found")
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
