//! Durable log sinks for telemetry entries.
//!
//! A sink receives every entry of every channel of a registry, in the order
//! each channel produced them. Sinks are shared across channels and must
//! tolerate calls from the control thread while observers hold the registry.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;

use super::channel::LogEntry;
use crate::error::{TelemetryError, TelemetryResult};

/// Destination for durable telemetry entries.
pub trait LogSink: Send + Sync {
    /// Append one entry for channel `key`.
    fn append(&self, key: &str, entry: &LogEntry) -> TelemetryResult<()>;

    /// Force appended entries down to storage.
    fn flush(&self) -> TelemetryResult<()> {
        Ok(())
    }
}

/// Sink that drops everything. Channels still keep their in-memory log.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn append(&self, _key: &str, _entry: &LogEntry) -> TelemetryResult<()> {
        Ok(())
    }
}

/// Sink collecting `(key, entry)` pairs in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(String, LogEntry)>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything appended so far.
    pub fn records(&self) -> Vec<(String, LogEntry)> {
        self.records.lock().clone()
    }

    /// Entries appended for `key`.
    pub fn entries_for(&self, key: &str) -> Vec<LogEntry> {
        self.records
            .lock()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, e)| *e)
            .collect()
    }

    /// Total entries appended.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True if nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl LogSink for MemorySink {
    fn append(&self, key: &str, entry: &LogEntry) -> TelemetryResult<()> {
        self.records.lock().push((key.to_string(), *entry));
        Ok(())
    }
}

/// One line of a JSON-lines telemetry log.
#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    key: &'a str,
    seq: u64,
    timestamp_us: u64,
    value: f64,
}

/// Sink writing one JSON object per line to a file opened in append mode.
///
/// ```text
/// {"key":"/shooter/encoder_angle","seq":0,"timestamp_us":1042,"value":12.5}
/// ```
///
/// Unbuffered: each line reaches the file in a single `write` before
/// `append` returns. [`flush`](LogSink::flush) additionally syncs the file
/// data to disk. JSON has no NaN or infinity, so non-finite values are
/// rejected with [`TelemetryError::NonFinite`] instead of being written as
/// `null`.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open (or create) `path` for appending, creating parent directories.
    ///
    /// # Errors
    /// `TelemetryError::Io` if the directory or file cannot be created.
    pub fn create(path: &Path) -> TelemetryResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Log file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for JsonLinesSink {
    fn append(&self, key: &str, entry: &LogEntry) -> TelemetryResult<()> {
        if !entry.value.is_finite() {
            return Err(TelemetryError::NonFinite {
                key: key.to_string(),
                value: entry.value,
            });
        }
        let record = LogRecord {
            key,
            seq: entry.seq,
            timestamp_us: entry.timestamp_us,
            value: entry.value,
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        self.file.lock().write_all(&line)?;
        Ok(())
    }

    fn flush(&self) -> TelemetryResult<()> {
        self.file.lock().sync_data().map_err(TelemetryError::from)
    }
}
