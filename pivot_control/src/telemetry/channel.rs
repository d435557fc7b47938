//! Named live value + append-only log.
//!
//! The live value and the in-memory log sit behind one lock, so an observer
//! never sees a value that is missing from the log or vice versa. The
//! durable sink is called under the same lock: entries of one channel reach
//! the sink in sequence order even with several writers.
//!
//! The in-memory log is a ring of the most recent `history_capacity`
//! entries. Sequence numbers keep counting across evictions; the durable
//! sink holds the full history.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::sink::LogSink;
use crate::error::TelemetryResult;

/// One appended value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Per-channel sequence number, starting at 0.
    pub seq: u64,
    /// Microseconds since the owning registry was created.
    pub timestamp_us: u64,
    /// Value written.
    pub value: f64,
}

#[derive(Debug)]
struct ChannelState {
    value: Option<f64>,
    log: VecDeque<LogEntry>,
    next_seq: u64,
}

/// Telemetry channel. Obtained from
/// [`TelemetryRegistry::publish`](super::TelemetryRegistry::publish).
pub struct TelemetryChannel {
    key: String,
    default: f64,
    epoch: Instant,
    capacity: usize,
    sink: Arc<dyn LogSink>,
    state: Mutex<ChannelState>,
    write_failures: AtomicU64,
    failure_reported: AtomicBool,
}

impl TelemetryChannel {
    pub(crate) fn new(
        key: String,
        default: f64,
        epoch: Instant,
        capacity: usize,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            key,
            default,
            epoch,
            capacity,
            sink,
            state: Mutex::new(ChannelState {
                value: None,
                log: VecDeque::with_capacity(capacity.min(1024)),
                next_seq: 0,
            }),
            write_failures: AtomicU64::new(0),
            failure_reported: AtomicBool::new(false),
        }
    }

    /// Full key, `<namespace>/<name>`.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Update the live value and append it to the log.
    ///
    /// The live value and in-memory log are always updated. The returned
    /// error only reports a durable sink failure; the first failure per
    /// channel is logged at `warn`.
    pub fn set(&self, value: f64) -> TelemetryResult<()> {
        let mut state = self.state.lock();
        let entry = LogEntry {
            seq: state.next_seq,
            timestamp_us: self.epoch.elapsed().as_micros() as u64,
            value,
        };
        state.next_seq += 1;
        state.value = Some(value);
        if state.log.len() == self.capacity {
            state.log.pop_front();
        }
        state.log.push_back(entry);

        let result = self.sink.append(&self.key, &entry);
        drop(state);

        if let Err(ref e) = result {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
            if !self.failure_reported.swap(true, Ordering::Relaxed) {
                warn!(key = %self.key, error = %e, "telemetry log append failed; live value kept");
            }
        }
        result
    }

    /// Most recent value, or the default if never set.
    pub fn get(&self) -> f64 {
        self.state.lock().value.unwrap_or(self.default)
    }

    /// Value returned by [`get`](Self::get) before the first `set`.
    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// True once `set` has been called.
    pub fn is_set(&self) -> bool {
        self.state.lock().value.is_some()
    }

    /// Snapshot of the retained in-memory log, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.state.lock().log.iter().copied().collect()
    }

    /// Most recent log entry.
    pub fn last_entry(&self) -> Option<LogEntry> {
        self.state.lock().log.back().copied()
    }

    /// Number of retained log entries.
    pub fn len(&self) -> usize {
        self.state.lock().log.len()
    }

    /// True if nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.state.lock().log.is_empty()
    }

    /// Total `set` calls, including entries evicted from memory.
    pub fn total_written(&self) -> u64 {
        self.state.lock().next_seq
    }

    /// Maximum number of entries kept in memory.
    pub fn history_capacity(&self) -> usize {
        self.capacity
    }

    /// Count of failed durable appends.
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for TelemetryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryChannel")
            .field("key", &self.key)
            .field("value", &self.get())
            .field("len", &self.len())
            .finish()
    }
}
