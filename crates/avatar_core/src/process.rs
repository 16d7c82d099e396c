//! Blocking invocation of external tools.
//!
//! The TTS engine, the lip-sync engine and ffmpeg/ffprobe are all run
//! to completion on the calling thread; their captured output becomes
//! the diagnostic attached to any failure.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader};
use std::process::{ChildStderr, Command, Stdio};
use std::thread::{self, JoinHandle};

/// Number of output lines kept as a failure diagnostic.
pub const DIAGNOSTIC_LINES: usize = 15;

/// Captured result of one tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last lines of stderr, falling back to stdout when stderr is empty.
    pub fn diagnostic(&self) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        tail_lines(source, DIAGNOSTIC_LINES)
    }
}

/// Run a command to completion, capturing stdout and stderr.
pub fn run_tool(cmd: &mut Command) -> io::Result<ToolOutput> {
    tracing::debug!("Running: {}", format_command(cmd));

    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    Ok(ToolOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Drains a child's stderr on a background thread, keeping only its tail.
///
/// Needed whenever the caller is busy with stdin or stdout of the same
/// child: an undrained stderr pipe fills up and stalls both processes.
pub struct StderrTail {
    handle: Option<JoinHandle<String>>,
}

impl StderrTail {
    /// Start draining `stderr`; the last `max_lines` non-blank lines are kept.
    pub fn spawn(stderr: Option<ChildStderr>, max_lines: usize) -> Self {
        let handle = stderr.map(|stderr| {
            thread::spawn(move || {
                let mut tail: VecDeque<String> = VecDeque::with_capacity(max_lines);
                for line in BufReader::new(stderr).split(b'\n') {
                    let Ok(line) = line else { break };
                    let line = String::from_utf8_lossy(&line).trim_end().to_string();
                    if line.trim().is_empty() || max_lines == 0 {
                        continue;
                    }
                    if tail.len() == max_lines {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Vec::from(tail).join("\n")
            })
        });
        Self { handle }
    }

    /// Wait for the stream to close and return the collected lines.
    pub fn finish(self) -> String {
        self.handle
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }
}

/// Render a command line for logging.
pub fn format_command(cmd: &Command) -> String {
    let mut parts = vec![quote(&cmd.get_program().to_string_lossy())];
    parts.extend(cmd.get_args().map(|a| quote(&a.to_string_lossy())));
    parts.join(" ")
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// Keep the last `max_lines` non-blank lines of `text`.
pub fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
