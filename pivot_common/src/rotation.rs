//! Configuration structures for the pivot rotation axis.
//!
//! All sections use `serde::Deserialize` for TOML loading. Every section
//! except `[shared]` falls back to the defaults in [`crate::consts`], so a
//! minimal file only needs a service name.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig, Validate};
use crate::consts::{
    CONTROL_PERIOD_MAX, CONTROL_PERIOD_MIN, CONTROL_PERIOD_S, CYCLE_TIME_US, CYCLE_TIME_US_MAX,
    CYCLE_TIME_US_MIN, DEFAULT_NAMESPACE, ROTATE_I_ZONE, ROTATE_INTEGRAL_MAX, ROTATE_INTEGRAL_MIN,
    ROTATE_KD, ROTATE_KI, ROTATE_KP, ROTATE_OUTPUT_LIMIT, ROTATE_TOLERANCE,
    TELEMETRY_HISTORY_CAPACITY,
};

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete pivot service configuration (`pivot.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotConfig {
    /// Common service fields.
    pub shared: SharedConfig,
    /// Rotation controller tuning.
    #[serde(default)]
    pub rotation: RotationConfig,
    /// Telemetry namespace and durable log location.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Host driver loop timing.
    #[serde(default)]
    pub cycle: CycleConfig,
}

impl Validate for PivotConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.rotation.validate()?;
        self.telemetry.validate()?;
        self.cycle.validate()
    }
}

// ─── Rotation ───────────────────────────────────────────────────────

/// Rotation PID tuning (`kRotateP`, `kRotateI`, `kRotateD`,
/// `kRotateTolerance`, `kRotateIZone`) plus output shaping.
///
/// Gains are fixed once the controller is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Proportional gain.
    #[serde(default = "default_kp")]
    pub kp: f64,
    /// Integral gain (0 = disabled).
    #[serde(default = "default_ki")]
    pub ki: f64,
    /// Derivative gain (0 = disabled).
    #[serde(default = "default_kd")]
    pub kd: f64,
    /// At-target window [deg].
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Error magnitude above which the integral is cleared [deg].
    #[serde(default = "default_i_zone")]
    pub i_zone: f64,
    /// Lower I-term contribution bound.
    #[serde(default = "default_integral_min")]
    pub integral_min: f64,
    /// Upper I-term contribution bound.
    #[serde(default = "default_integral_max")]
    pub integral_max: f64,
    /// Nominal step period [s].
    #[serde(default = "default_period")]
    pub period: f64,
    /// Output magnitude limit. Anything beyond is clamped and flagged.
    #[serde(default = "default_output_limit")]
    pub output_limit: f64,
}

fn default_kp() -> f64 {
    ROTATE_KP
}
fn default_ki() -> f64 {
    ROTATE_KI
}
fn default_kd() -> f64 {
    ROTATE_KD
}
fn default_tolerance() -> f64 {
    ROTATE_TOLERANCE
}
fn default_i_zone() -> f64 {
    ROTATE_I_ZONE
}
fn default_integral_min() -> f64 {
    ROTATE_INTEGRAL_MIN
}
fn default_integral_max() -> f64 {
    ROTATE_INTEGRAL_MAX
}
fn default_period() -> f64 {
    CONTROL_PERIOD_S
}
fn default_output_limit() -> f64 {
    ROTATE_OUTPUT_LIMIT
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            kp: ROTATE_KP,
            ki: ROTATE_KI,
            kd: ROTATE_KD,
            tolerance: ROTATE_TOLERANCE,
            i_zone: ROTATE_I_ZONE,
            integral_min: ROTATE_INTEGRAL_MIN,
            integral_max: ROTATE_INTEGRAL_MAX,
            period: CONTROL_PERIOD_S,
            output_limit: ROTATE_OUTPUT_LIMIT,
        }
    }
}

impl RotationConfig {
    /// Pure proportional tuning with every other term disabled.
    pub fn proportional(kp: f64) -> Self {
        Self {
            kp,
            ki: 0.0,
            kd: 0.0,
            ..Self::default()
        }
    }
}

impl Validate for RotationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("integral_min", self.integral_min),
            ("integral_max", self.integral_max),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "rotation.{name} must be finite, got {value}"
                )));
            }
        }
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "rotation.tolerance {} must be a finite value >= 0",
                self.tolerance
            )));
        }
        // i_zone may be infinite: "integral always active".
        if self.i_zone.is_nan() || self.i_zone < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "rotation.i_zone {} must be >= 0",
                self.i_zone
            )));
        }
        if self.integral_min > self.integral_max {
            return Err(ConfigError::ValidationError(format!(
                "rotation.integral_min {} exceeds integral_max {}",
                self.integral_min, self.integral_max
            )));
        }
        if !(CONTROL_PERIOD_MIN..=CONTROL_PERIOD_MAX).contains(&self.period) {
            return Err(ConfigError::ValidationError(format!(
                "rotation.period {} out of range [{}, {}]",
                self.period, CONTROL_PERIOD_MIN, CONTROL_PERIOD_MAX
            )));
        }
        if !(self.output_limit > 0.0 && self.output_limit.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "rotation.output_limit {} must be a finite value > 0",
                self.output_limit
            )));
        }
        Ok(())
    }
}

// ─── Telemetry ──────────────────────────────────────────────────────

/// Telemetry namespace and durable log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Key prefix of every channel (e.g. `/shooter`).
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// JSON-lines log file. `None` keeps the log in memory only.
    #[serde(default)]
    pub log_path: Option<String>,
    /// Entries each channel keeps in memory. Older entries survive only in
    /// the durable log.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_history_capacity() -> usize {
    TELEMETRY_HISTORY_CAPACITY
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            log_path: None,
            history_capacity: TELEMETRY_HISTORY_CAPACITY,
        }
    }
}

impl Validate for TelemetryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.namespace.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "telemetry.namespace '{}' must start with '/'",
                self.namespace
            )));
        }
        if self.namespace.len() > 1 && self.namespace.ends_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "telemetry.namespace '{}' must not end with '/'",
                self.namespace
            )));
        }
        if matches!(self.log_path.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "telemetry.log_path cannot be empty".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "telemetry.history_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Cycle ──────────────────────────────────────────────────────────

/// Host driver loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Tick period [µs].
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u64,
}

fn default_cycle_time_us() -> u64 {
    CYCLE_TIME_US
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: CYCLE_TIME_US,
        }
    }
}

impl CycleConfig {
    /// Tick period as a `Duration`.
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_micros(self.cycle_time_us)
    }
}

impl Validate for CycleConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(CYCLE_TIME_US_MIN..=CYCLE_TIME_US_MAX).contains(&self.cycle_time_us) {
            return Err(ConfigError::ValidationError(format!(
                "cycle.cycle_time_us {} out of range [{}, {}]",
                self.cycle_time_us, CYCLE_TIME_US_MIN, CYCLE_TIME_US_MAX
            )));
        }
        Ok(())
    }
}
