//! Output capture policy
//!
//! Decides, per configuration, whether the emulated program's output is
//! buffered for later comparison or streamed straight through.

use std::io::Write;

/// Accumulates or passes through captured program output
pub struct OutputSink {
    capture: bool,
    buffer: String,
    writer: Box<dyn Write + Send>,
}

impl OutputSink {
    /// Sink writing through to stdout
    pub fn stdout(capture: bool) -> Self {
        Self::with_writer(capture, Box::new(std::io::stdout()))
    }

    /// Sink with an injected pass-through destination
    pub fn with_writer(capture: bool, writer: Box<dyn Write + Send>) -> Self {
        Self {
            capture,
            buffer: String::new(),
            writer,
        }
    }

    /// Append program output: retained when capturing, otherwise written
    /// immediately to the pass-through destination.
    pub fn append(&mut self, text: &str) {
        if self.capture {
            self.buffer.push_str(text);
        } else {
            self.write_through(text);
        }
    }

    /// Drain any retained buffer content to the pass-through destination.
    ///
    /// Idempotent: with an empty buffer this is a no-op. Invoked before a
    /// timeout is reported so partial results remain visible.
    pub fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let buffered = std::mem::take(&mut self.buffer);
        self.write_through(&buffered);
    }

    /// Write directly to the pass-through destination, bypassing capture
    pub fn write_through(&mut self, text: &str) {
        let _ = self.writer.write_all(text.as_bytes());
        let _ = self.writer.flush();
    }

    /// The retained buffer, for the comparison boundary
    pub fn captured(&self) -> &str {
        &self.buffer
    }
}
