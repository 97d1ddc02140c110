//! In-memory log capture
//!
//! The table owns the terminal, so tracing output goes into a bounded ring
//! buffer that the host can show one line at a time in its status bar.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

pub const DEFAULT_CAPACITY: usize = 1000;

const FALLBACK_TARGET: &str = "general";

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            at: Local::now(),
            level,
            target: target.into(),
            message: message.into(),
        }
    }

    /// "12:01:33 WARN table_view: message"
    pub fn status_line(&self) -> String {
        format!(
            "{} {} {}: {}",
            self.at.format("%H:%M:%S"),
            self.level,
            self.target,
            self.message
        )
    }
}

/// Bounded, shareable log history; clones see the same entries
#[derive(Clone)]
pub struct LogRingBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Default for LogRingBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl LogRingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn latest(&self) -> Option<LogEntry> {
        self.entries().back().cloned()
    }

    /// Up to `count` entries, oldest first, at or above `min_level` severity
    pub fn recent(&self, count: usize, min_level: Level) -> Vec<LogEntry> {
        let entries = self.entries();
        let mut picked: Vec<_> = entries
            .iter()
            .rev()
            .filter(|e| e.level <= min_level)
            .take(count)
            .cloned()
            .collect();
        picked.reverse();
        picked
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Splits a compact fmt line ("LEVEL target: message") into its parts
fn split_compact_line(line: &str) -> (Level, &str, &str) {
    let Some((level, rest)) = line
        .split_once(' ')
        .and_then(|(head, rest)| head.parse::<Level>().ok().map(|l| (l, rest.trim_start())))
    else {
        return (Level::INFO, FALLBACK_TARGET, line);
    };

    match rest.split_once(':') {
        // targets never contain spaces
        Some((target, msg)) if !target.is_empty() && !target.contains(' ') => {
            (level, target, msg.trim())
        }
        _ => (level, FALLBACK_TARGET, rest),
    }
}

/// `MakeWriter` feeding formatted events into a [`LogRingBuffer`]
#[derive(Clone)]
pub struct RingBufferWriter {
    buffer: LogRingBuffer,
}

impl RingBufferWriter {
    pub fn new(buffer: LogRingBuffer) -> Self {
        Self { buffer }
    }
}

impl std::io::Write for RingBufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (level, target, msg) = split_compact_line(line);
            self.buffer.push(LogEntry::new(level, target, msg));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for RingBufferWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install a global subscriber writing into a fresh ring buffer.
///
/// `RUST_LOG` overrides the default `info` filter. If a subscriber is already
/// installed it is kept and the returned buffer stays empty.
pub fn init_tracing() -> LogRingBuffer {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let buffer = LogRingBuffer::default();

    let fmt_layer = fmt::layer()
        .with_writer(RingBufferWriter::new(buffer.clone()))
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .without_time()
        .compact();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
    {
        tracing::info!(target: "table_view", "Logging initialized");
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_ring_buffer_is_bounded() {
        let buffer = LogRingBuffer::with_capacity(3);
        for i in 0..5 {
            buffer.push(LogEntry::new(Level::INFO, "t", format!("m{}", i)));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.latest().unwrap().message, "m4");
        let recent = buffer.recent(10, Level::TRACE);
        assert_eq!(recent.first().unwrap().message, "m2");
    }

    #[test]
    fn test_recent_filters_by_severity() {
        let buffer = LogRingBuffer::default();
        buffer.push(LogEntry::new(Level::WARN, "selection", "a"));
        buffer.push(LogEntry::new(Level::DEBUG, "pane_sync", "b"));
        buffer.push(LogEntry::new(Level::ERROR, "layout", "c"));

        let messages: Vec<_> = buffer
            .recent(10, Level::WARN)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["a", "c"]);
    }

    #[test]
    fn test_writer_splits_compact_lines() {
        let buffer = LogRingBuffer::default();
        let mut writer = RingBufferWriter::new(buffer.clone());
        writer
            .write_all(b" WARN selection: native selection changed\n")
            .unwrap();
        writer.write_all(b"plain text\n").unwrap();

        let entries = buffer.recent(10, Level::TRACE);
        assert_eq!(entries[0].level, Level::WARN);
        assert_eq!(entries[0].target, "selection");
        assert_eq!(entries[0].message, "native selection changed");
        assert_eq!(entries[1].target, FALLBACK_TARGET);
        assert_eq!(entries[1].message, "plain text");
        assert!(entries[0].status_line().ends_with("WARN selection: native selection changed"));
    }
}
