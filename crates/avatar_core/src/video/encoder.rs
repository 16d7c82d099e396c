//! Frame encoding through an ffmpeg stdin pipe.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use super::probe::VideoProperties;
use super::VideoError;
use crate::config::VideoSettings;
use crate::process::{StderrTail, DIAGNOSTIC_LINES};

/// Consumer of ordered RGB24 frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &[u8]) -> Result<(), VideoError>;

    /// Flush and close the output. Returns the number of frames written.
    fn finish(self: Box<Self>) -> Result<usize, VideoError>;
}

/// Encodes raw frames with ffmpeg at fixed fps and dimensions, no audio.
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: StderrTail,
    output: PathBuf,
    frame_bytes: usize,
    written: usize,
}

impl FfmpegEncoder {
    pub fn spawn(
        settings: &VideoSettings,
        props: VideoProperties,
        output: &Path,
    ) -> Result<Self, VideoError> {
        let mut cmd = Command::new(&settings.ffmpeg_path);
        cmd.args(["-y", "-v", "error", "-nostats"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{}x{}", props.width, props.height))
            .arg("-r")
            .arg(format!("{}", props.fps))
            .args(["-i", "pipe:0", "-an"])
            .arg("-c:v")
            .arg(&settings.codec)
            .arg("-pix_fmt")
            .arg(&settings.pixel_format)
            .arg(output);

        tracing::debug!("Running FFmpeg (encode): {:?}", cmd);

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| VideoError::Spawn {
                tool: settings.ffmpeg_path.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stderr = StderrTail::spawn(child.stderr.take(), DIAGNOSTIC_LINES);
        Ok(Self {
            child,
            stdin,
            stderr,
            output: output.to_path_buf(),
            frame_bytes: props.frame_bytes(),
            written: 0,
        })
    }
}

impl FrameSink for FfmpegEncoder {
    fn write_frame(&mut self, frame: &[u8]) -> Result<(), VideoError> {
        if frame.len() != self.frame_bytes {
            return Err(VideoError::FrameSize {
                index: self.written,
                expected: self.frame_bytes,
                found: frame.len(),
            });
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| VideoError::EncodeFailed {
            path: self.output.clone(),
            diagnostic: "encoder input already closed".to_string(),
        })?;

        if let Err(e) = stdin.write_all(frame) {
            // ffmpeg exited early; its stderr explains why
            self.stdin = None;
            return Err(VideoError::EncodeFailed {
                path: self.output.clone(),
                diagnostic: format!("write failed: {}", e),
            });
        }
        self.written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<usize, VideoError> {
        let Self {
            mut child,
            stdin,
            stderr,
            output: path,
            written,
            ..
        } = *self;
        // Closing stdin signals end of stream
        drop(stdin);

        let status = child
            .wait()
            .map_err(|e| VideoError::io("waiting for FFmpeg", e))?;
        let diagnostic = stderr.finish();

        if !status.success() {
            return Err(VideoError::EncodeFailed {
                path,
                diagnostic: if diagnostic.is_empty() {
                    format!("ffmpeg exited with {}", status)
                } else {
                    diagnostic
                },
            });
        }

        tracing::info!("Encoded {} frames to {}", written, path.display());
        Ok(written)
    }
}
