//! Error types of the pivot control core.
//!
//! None of these reach the host scheduler as a hard failure. The subsystem
//! turns each into an [`AxisFault`](pivot_common::fault::AxisFault) flag.

use thiserror::Error;

/// Absolute position source could not produce a usable reading.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SensorFault {
    /// Source reports no signal (e.g. duty-cycle input lost).
    #[error("absolute encoder disconnected")]
    Disconnected,

    /// Source has not refreshed its value in time.
    #[error("absolute encoder reading stale for {cycles} cycles")]
    Stale {
        /// Cycles since the last fresh value.
        cycles: u32,
    },

    /// Source produced NaN or infinity.
    #[error("absolute encoder returned non-finite reading {value}")]
    NonFinite {
        /// Offending raw value.
        value: f64,
    },

    /// Reference-angle supplier produced NaN or infinity.
    #[error("reference angle supplier returned non-finite value {value}")]
    NonFiniteReference {
        /// Offending reference value [deg].
        value: f64,
    },
}

/// Setpoint rejected by the controller; the previous target stays active.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("invalid target {value}: setpoint must be finite")]
pub struct InvalidTarget {
    /// Rejected value.
    pub value: f64,
}

/// Durable telemetry append failed. The live value is updated regardless.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Underlying file or stream error.
    #[error("telemetry I/O error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Entry could not be encoded.
    #[error("telemetry encoding error: {source}")]
    Encode {
        /// Source JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Value has no representation in the sink format.
    #[error("telemetry value {value} for {key} is not finite")]
    NonFinite {
        /// Channel key.
        key: String,
        /// Rejected value.
        value: f64,
    },

    /// Sink refuses writes (closed, full, detached).
    #[error("telemetry sink unavailable: {0}")]
    SinkUnavailable(String),
}

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;
