//! Decision trace accumulation and sinks
//!
//! When trace mode is on, every decision builds a human-readable account
//! of the checks it walked through, flushed in one block to the log sink
//! and optionally appended to a size-rotated trace file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Per-decision trace buffer. Inactive buffers make `log` a no-op so the
/// hot path pays nothing when tracing is off.
#[derive(Debug, Default)]
pub struct TraceLog {
    active: bool,
    lines: Vec<String>,
}

impl TraceLog {
    pub fn new(active: bool) -> Self {
        Self {
            active,
            lines: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn log(&mut self, indent: usize, message: impl AsRef<str>) {
        if self.active {
            self.lines
                .push(format!("{}{}", "  ".repeat(indent), message.as_ref()));
        }
    }

    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

/// Append-only trace file rotated once it exceeds `max_bytes`.
#[derive(Debug, Clone)]
pub struct TraceFile {
    path: PathBuf,
    max_bytes: u64,
}

impl TraceFile {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            path: path.into(),
            max_bytes,
        }
    }

    pub fn append(&self, text: &str) {
        if let Err(err) = self.try_append(text) {
            tracing::warn!(path = %self.path.display(), error = %err, "trace file write failed");
        }
    }

    fn try_append(&self, text: &str) -> std::io::Result<()> {
        if let Ok(meta) = std::fs::metadata(&self.path) {
            if meta.len() >= self.max_bytes {
                let rotated = self.path.with_extension("old");
                std::fs::rename(&self.path, rotated)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_log_collects_nothing() {
        let mut trace = TraceLog::new(false);
        trace.log(0, "hidden");
        assert!(trace.take().is_empty());
    }

    #[test]
    fn test_active_log_indents() {
        let mut trace = TraceLog::new(true);
        trace.log(0, "top");
        trace.log(2, "nested");
        assert_eq!(trace.take(), vec!["top".to_string(), "    nested".to_string()]);
    }

    #[test]
    fn test_take_drains_buffer() {
        let mut trace = TraceLog::new(true);
        trace.log(0, "once");
        assert_eq!(trace.take().len(), 1);
        assert!(trace.take().is_empty());
    }
}
