//! Telemetry namespace shared by the subsystems of one process.
//!
//! Constructed once at startup and handed to each subsystem (constructor
//! injection). No global state, so tests can build as many isolated
//! registries as they like.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::debug;

use pivot_common::consts::TELEMETRY_HISTORY_CAPACITY;
use pivot_common::telemetry::channel_key;

use super::channel::TelemetryChannel;
use super::sink::{LogSink, NullSink};
use crate::error::TelemetryResult;

/// Registry of telemetry channels under one namespace.
pub struct TelemetryRegistry {
    namespace: String,
    epoch: Instant,
    history_capacity: usize,
    sink: Arc<dyn LogSink>,
    channels: RwLock<BTreeMap<String, Arc<TelemetryChannel>>>,
}

impl TelemetryRegistry {
    /// Registry forwarding every entry to `sink`.
    pub fn new(namespace: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            namespace: namespace.into(),
            epoch: Instant::now(),
            history_capacity: TELEMETRY_HISTORY_CAPACITY,
            sink,
            channels: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry keeping logs in memory only.
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(namespace, Arc::new(NullSink))
    }

    /// Entries each channel keeps in memory (minimum 1). Applies to channels
    /// published afterwards.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    /// In-memory log capacity handed to new channels.
    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    /// Key prefix of every channel.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register `name` with default value `0.0`.
    ///
    /// Idempotent: publishing an existing name returns the existing channel.
    pub fn publish(&self, name: &str) -> Arc<TelemetryChannel> {
        self.publish_with_default(name, 0.0)
    }

    /// Register `name` with the value `get()` returns before the first `set`.
    ///
    /// If the channel already exists its original default is kept.
    pub fn publish_with_default(&self, name: &str, default: f64) -> Arc<TelemetryChannel> {
        let key = channel_key(&self.namespace, name);
        if let Some(existing) = self.channels.read().get(&key) {
            return Arc::clone(existing);
        }

        let mut channels = self.channels.write();
        let channel = channels.entry(key).or_insert_with_key(|key| {
            debug!(key = %key, default_value = default, "telemetry channel published");
            Arc::new(TelemetryChannel::new(
                key.clone(),
                default,
                self.epoch,
                self.history_capacity,
                Arc::clone(&self.sink),
            ))
        });
        Arc::clone(channel)
    }

    /// Look up a channel by name (without namespace).
    pub fn get(&self, name: &str) -> Option<Arc<TelemetryChannel>> {
        let key = channel_key(&self.namespace, name);
        self.channels.read().get(&key).cloned()
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }

    /// Current `(key, value)` of every channel, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, f64)> {
        self.channels
            .read()
            .iter()
            .map(|(k, ch)| (k.clone(), ch.get()))
            .collect()
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    /// True if no channel is registered.
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    /// Flush the durable sink.
    pub fn flush(&self) -> TelemetryResult<()> {
        self.sink.flush()
    }
}

impl std::fmt::Debug for TelemetryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryRegistry")
            .field("namespace", &self.namespace)
            .field("channels", &self.keys())
            .finish()
    }
}
