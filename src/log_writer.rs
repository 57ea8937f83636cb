//! Line-oriented logging of raw process output
//!
//! `LineLogWriter` sits where an `io::Write` is expected and turns the byte
//! stream into one log call per line as soon as each line terminates, so
//! builder output shows up live instead of after the process exits.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Receives complete lines from a [`LineLogWriter`].
pub trait LineSink: Send {
    fn line(&mut self, line: &str);
}

/// Emits each line as an info-level tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LineSink for TracingSink {
    fn line(&mut self, line: &str) {
        info!("{}", line);
    }
}

/// Byte sink that emits a line for every `\n` or `\r` byte.
///
/// Each terminator byte emits independently, so `\r\n` produces the line and
/// then one empty line. The terminator itself is dropped; it is never
/// carried over to the start of the next line. Bytes are buffered undecoded
/// until the line ends, so a UTF-8 character split across two `write` calls
/// is decoded intact.
pub struct LineLogWriter<S: LineSink> {
    buffer: Vec<u8>,
    sink: S,
}

impl<S: LineSink> LineLogWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            buffer: Vec::new(),
            sink,
        }
    }

    fn emit(&mut self) {
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        self.sink.line(&line);
    }

    /// Emit any unterminated trailing output as a final line.
    pub fn flush_partial(&mut self) {
        if !self.buffer.is_empty() {
            self.emit();
        }
    }
}

impl<S: LineSink> Write for LineLogWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if byte == b'\n' || byte == b'\r' {
                self.emit();
            } else {
                self.buffer.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_partial();
        Ok(())
    }
}

/// A [`LineLogWriter`] shared between concurrent stream readers.
///
/// Every `write` holds the lock for the whole buffer, so partial lines from
/// stdout and stderr never interleave inside one emitted line.
#[derive(Clone)]
pub struct SharedLineWriter {
    inner: Arc<Mutex<LineLogWriter<Box<dyn LineSink>>>>,
}

impl SharedLineWriter {
    pub fn new(sink: impl LineSink + 'static) -> Self {
        let sink: Box<dyn LineSink> = Box::new(sink);
        Self {
            inner: Arc::new(Mutex::new(LineLogWriter::new(sink))),
        }
    }

    /// Writer that logs builder output through tracing
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    fn lock(&self) -> MutexGuard<'_, LineLogWriter<Box<dyn LineSink>>> {
        // A panic inside a sink leaves the buffer consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write_bytes(&self, bytes: &[u8]) {
        // Writing into the buffer never fails.
        let _ = self.lock().write(bytes);
    }

    pub fn flush_partial(&self) {
        self.lock().flush_partial();
    }
}

impl LineSink for Box<dyn LineSink> {
    fn line(&mut self, line: &str) {
        (**self).line(line)
    }
}

/// Sink that records lines in memory
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct MemorySink {
    pub lines: Arc<Mutex<Vec<String>>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl LineSink for MemorySink {
    fn line(&mut self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
