//! Workspace-wide constants.
//!
//! Single source of truth for default gains, numeric limits and channel
//! naming. Config structs fall back to these through serde defaults.

// ─── Rotation gains (kRotate*) ──────────────────────────────────────

/// Default proportional gain [output / degree].
pub const ROTATE_KP: f64 = 0.02;

/// Default integral gain [output / (degree · s)].
pub const ROTATE_KI: f64 = 0.001;

/// Default derivative gain [output · s / degree].
pub const ROTATE_KD: f64 = 0.0005;

/// Default at-target tolerance [degree].
pub const ROTATE_TOLERANCE: f64 = 1.0;

/// Default integral zone [degree]. Beyond this error the I term is dropped.
pub const ROTATE_I_ZONE: f64 = 5.0;

/// Default integrator lower bound, expressed as an I-term contribution.
pub const ROTATE_INTEGRAL_MIN: f64 = -1.0;

/// Default integrator upper bound, expressed as an I-term contribution.
pub const ROTATE_INTEGRAL_MAX: f64 = 1.0;

/// Default output magnitude limit (duty-cycle scale).
pub const ROTATE_OUTPUT_LIMIT: f64 = 1.0;

// ─── Timing ─────────────────────────────────────────────────────────

/// Nominal controller period [s] (50 Hz scheduler).
pub const CONTROL_PERIOD_S: f64 = 0.02;

/// Lower bound for the controller period [s].
pub const CONTROL_PERIOD_MIN: f64 = 0.001;

/// Upper bound for the controller period [s].
pub const CONTROL_PERIOD_MAX: f64 = 1.0;

/// Default host cycle time [µs].
pub const CYCLE_TIME_US: u64 = 20_000;

/// Minimum host cycle time [µs].
pub const CYCLE_TIME_US_MIN: u64 = 1_000;

/// Maximum host cycle time [µs].
pub const CYCLE_TIME_US_MAX: u64 = 1_000_000;

// ─── Sensor ─────────────────────────────────────────────────────────

/// Degrees per full encoder turn.
pub const DEGREES_PER_TURN: f64 = 360.0;

// ─── Telemetry ──────────────────────────────────────────────────────

/// Default telemetry namespace of the shooter pivot.
pub const DEFAULT_NAMESPACE: &str = "/shooter";

/// Entries each telemetry channel keeps in memory.
pub const TELEMETRY_HISTORY_CAPACITY: usize = 10_000;

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/pivot.toml";
