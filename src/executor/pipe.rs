//! Internal utilities for streaming command output to logs.
//!
//! This module handles reading from stdout/stderr pipes and logging
//! the output in real-time during command execution.

use std::io::{BufRead, BufReader, Read};

use super::LineFilter;

/// Type of output stream for logging purposes.
#[derive(Clone, Copy)]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Extracts a human-readable message from a thread panic.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Reads from a pipe and logs each line in real-time.
///
/// - stdout is logged at INFO level, stderr at WARN level, so container and
///   installer progress is visible while it runs.
/// - lines pass through `filter` first when one is given.
/// - Binary data uses lossy UTF-8 conversion
/// - I/O errors stop reading but don't fail command execution
///   (command success is determined by exit status)
pub(super) fn read_pipe_to_log<R: Read>(
    pipe: Option<R>,
    stream_type: StreamType,
    filter: Option<LineFilter>,
) {
    let Some(pipe) = pipe else {
        tracing::error!(
            stream = %stream_type,
            "pipe was None (unexpected: Stdio::piped() was set), no output will be captured"
        );
        return;
    };

    let mut reader = BufReader::new(pipe);
    let mut line_buf = Vec::new();

    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break,
            Ok(_) => {
                let log_content = line_buf.strip_suffix(b"\n").unwrap_or(&line_buf);
                log_line(log_content, stream_type, filter);
            }
            Err(e) => {
                tracing::error!(stream = %stream_type, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }
}

/// Applies `filter` to a line, returning the rewritten text if it matched.
fn relabel(line: &str, filter: Option<LineFilter>) -> Option<String> {
    filter.and_then(|f| f(line))
}

/// Logs a complete line at the appropriate level.
///
/// Trailing CR is trimmed to handle CRLF line endings. Lines rewritten by
/// `filter` are status lines and go out at INFO whichever stream carried them.
fn log_line(line: &[u8], stream_type: StreamType, filter: Option<LineFilter>) {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim_end_matches('\r');
    if let Some(rewritten) = relabel(trimmed, filter) {
        tracing::info!("{}", rewritten);
        return;
    }
    match stream_type {
        StreamType::Stdout => tracing::info!(stream = %stream_type, "{}", trimmed),
        StreamType::Stderr => tracing::warn!(stream = %stream_type, "{}", trimmed),
    }
}
