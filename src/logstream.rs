//! The Log Streamer: line-oriented, size-bounded log emission.
//! The only explicit state machine in the core:
//! `streaming -> truncated` on hitting the byte budget, `streaming -> done`
//! on EOF, `truncated -> done` immediately after the notice line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

pub const MAX_LOG_BYTES: u64 = 100 * 1024 * 1024;

const TRUNCATION_NOTICE: &str = "*** log truncated: byte limit reached ***\n";

enum State {
    Streaming,
    Truncated,
    Done,
}

pub struct LogStreamer {
    max_bytes: u64,
}

impl Default for LogStreamer {
    fn default() -> Self {
        Self { max_bytes: MAX_LOG_BYTES }
    }
}

impl LogStreamer {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Streams `path` to `sink` line-by-line without ever buffering the
    /// whole file. A partial final line with no terminator is emitted as-is.
    pub fn stream(&self, path: &Path, sink: &mut dyn Write) -> io::Result<()> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut emitted: u64 = 0;
        let mut state = State::Streaming;

        loop {
            state = match state {
                State::Streaming => {
                    let mut line = Vec::new();
                    let read = reader.read_until(b'\n', &mut line)?;
                    if read == 0 {
                        State::Done
                    } else if emitted.saturating_add(line.len() as u64) > self.max_bytes {
                        State::Truncated
                    } else {
                        sink.write_all(&line)?;
                        emitted += line.len() as u64;
                        State::Streaming
                    }
                }
                State::Truncated => {
                    sink.write_all(TRUNCATION_NOTICE.as_bytes())?;
                    State::Done
                }
                State::Done => break,
            };
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn streams_full_file_when_under_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current.log");
        fs::write(&path, "line one\nline two\n").unwrap();

        let mut out = Vec::new();
        LogStreamer::default().stream(&path, &mut out).unwrap();
        assert_eq!(out, b"line one\nline two\n");
    }

    #[test]
    fn partial_last_line_without_terminator_is_emitted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current.log");
        fs::write(&path, "line one\nno newline").unwrap();

        let mut out = Vec::new();
        LogStreamer::default().stream(&path, &mut out).unwrap();
        assert_eq!(out, b"line one\nno newline");
    }

    #[test]
    fn truncates_and_appends_single_notice_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current.log");
        fs::write(&path, "aaaaaaaaaa\nbbbbbbbbbb\ncccccccccc\n").unwrap();

        let mut out = Vec::new();
        LogStreamer::new(15).stream(&path, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("aaaaaaaaaa\n"));
        assert_eq!(text.matches("***").count(), 2);
        assert!(!text.contains("cccccccccc"));
    }
}
