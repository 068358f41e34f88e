//! In-process ring buffer that collects log lines.
//!
//! Hosts that have no stderr to look at (an embedded surface, a test harness)
//! register a [`DiagnosticsLog`] globally; [`crate::tracing_sub`] then routes
//! every formatted tracing event into it.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock};

use crate::constants::DEFAULT_DIAGNOSTIC_LINES;

static GLOBAL_LOG: OnceLock<DiagnosticsLog> = OnceLock::new();

pub fn set_global_diagnostics(log: DiagnosticsLog) -> bool {
    GLOBAL_LOG.set(log).is_ok()
}

pub fn global_diagnostics() -> Option<DiagnosticsLog> {
    GLOBAL_LOG.get().cloned()
}

#[derive(Debug)]
struct LineBuffer {
    lines: VecDeque<String>,
    max_lines: usize,
}

impl LineBuffer {
    fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
        }
    }

    fn push_line(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }
}

#[derive(Clone, Debug)]
pub struct DiagnosticsLog {
    inner: Arc<Mutex<LineBuffer>>,
}

impl Default for DiagnosticsLog {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTIC_LINES)
    }
}

impl DiagnosticsLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LineBuffer::new(max_lines))),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        if let Ok(mut buffer) = self.inner.lock() {
            buffer.push_line(line.into());
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|buffer| buffer.lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut buffer) = self.inner.lock() {
            buffer.lines.clear();
        }
    }

    pub fn writer(&self) -> DiagnosticsWriter {
        DiagnosticsWriter::new(self.clone())
    }
}

/// `io::Write` adapter that splits its input into lines.
#[derive(Debug)]
pub struct DiagnosticsWriter {
    log: DiagnosticsLog,
    pending: Vec<u8>,
}

impl DiagnosticsWriter {
    pub fn new(log: DiagnosticsLog) -> Self {
        Self {
            log,
            pending: Vec::new(),
        }
    }

    fn flush_pending(&mut self, force: bool) {
        if self.pending.is_empty() {
            return;
        }
        let end = if force {
            self.pending.len()
        } else {
            match self.pending.iter().rposition(|b| *b == b'\n') {
                Some(pos) => pos + 1,
                None => return,
            }
        };
        let drained: Vec<u8> = self.pending.drain(..end).collect();
        let text = String::from_utf8_lossy(&drained);
        for line in text.split('\n').filter(|line| !line.is_empty()) {
            self.log.push(line);
        }
    }
}

impl Write for DiagnosticsWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.flush_pending(false);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_pending(true);
        Ok(())
    }
}

impl Drop for DiagnosticsWriter {
    fn drop(&mut self) {
        self.flush_pending(true);
    }
}
