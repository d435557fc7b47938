//! Prelude module for common re-exports.
//!
//! `use pivot_common::prelude::*;` brings in the types almost every pivot
//! crate needs.

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig, Validate};
pub use crate::rotation::{CycleConfig, PivotConfig, RotationConfig, TelemetryConfig};

// ─── Faults ─────────────────────────────────────────────────────────
pub use crate::fault::AxisFault;

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{CONTROL_PERIOD_S, CYCLE_TIME_US, DEFAULT_NAMESPACE, DEGREES_PER_TURN};
