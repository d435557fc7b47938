//! Telemetry root.
//!
//! Every measured and commanded quantity is a named [`TelemetryChannel`]:
//! a live value readable by observers plus an append-only log mirrored to a
//! durable [`LogSink`]. Channels come from an injected [`TelemetryRegistry`].

pub mod channel;
pub mod registry;
pub mod sink;

pub use channel::{LogEntry, TelemetryChannel};
pub use registry::TelemetryRegistry;
pub use sink::{JsonLinesSink, LogSink, MemorySink, NullSink};
