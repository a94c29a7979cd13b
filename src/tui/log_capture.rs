//! Log capture for TUI mode
//!
//! A shared ring buffer implementing `MakeWriter` so tracing-subscriber
//! writes log lines here instead of stderr, which would corrupt the ratatui
//! alternate screen. The status bar surfaces the most recent line.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Lines kept for the status bar; older lines fall off the front.
const CAPACITY: usize = 200;

/// Thread-safe ring buffer of recent log lines.
#[derive(Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<VecDeque<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: String) {
        // Recover from a poisoned mutex; logging must not cascade failures.
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if guard.len() >= CAPACITY {
            guard.pop_front();
        }
        guard.push_back(line);
    }

    /// The most recently captured line, if any.
    pub fn last(&self) -> Option<String> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.back().cloned()
    }
}

/// Writer that assembles byte chunks into complete lines.
pub struct LineWriter {
    buffer: LogBuffer,
    pending: Vec<u8>,
}

impl LineWriter {
    fn flush_lines(&mut self) {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            self.buffer.push(text);
        }
    }
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.flush_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            let text = String::from_utf8_lossy(&self.pending).into_owned();
            self.buffer.push(text);
            self.pending.clear();
        }
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let _ = Write::flush(self);
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            buffer: self.clone(),
            pending: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_returns_newest_line() {
        let buf = LogBuffer::new();
        assert!(buf.last().is_none());

        let mut writer = buf.make_writer();
        write!(writer, "first\nsecond\n").unwrap();

        assert_eq!(buf.last().as_deref(), Some("second"));
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let buf = LogBuffer::new();
        for i in 0..250 {
            buf.push(format!("line {}", i));
        }
        let guard = buf.inner.lock().unwrap();
        assert_eq!(guard.len(), CAPACITY);
        assert_eq!(guard.front().unwrap(), "line 50");
    }

    #[test]
    fn test_partial_line_flushes_on_drop() {
        let buf = LogBuffer::new();
        {
            let mut writer = buf.make_writer();
            write!(writer, "no newline").unwrap();
            assert!(buf.last().is_none());
        }
        assert_eq!(buf.last().as_deref(), Some("no newline"));
    }
}
