//! Rotation position controller.
//!
//! Tracks an angle setpoint with [`pid_compute`] and shapes the result for
//! the actuator:
//!
//! ```text
//! Idle ──set_target──► Seeking ◄──|e| > tol──► AtTarget
//!   ▲                     │                      │
//!   └──────── stop ───────┴──────────────────────┘
//! ```
//!
//! `stop()` retains the target: the next `compute` resumes seeking it.
//! Non-finite outputs are never returned; out-of-limit outputs are clamped.
//! Both cases raise the overflow marker read by the subsystem.

use tracing::{debug, warn};

use pivot_common::rotation::RotationConfig;

use super::pid::{PidGains, PidState, pid_compute};
use crate::error::InvalidTarget;

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// No target, or stopped. Output is zero.
    #[default]
    Idle,
    /// Error outside tolerance.
    Seeking,
    /// Error within tolerance.
    AtTarget,
}

/// Single-axis rotation PID controller.
#[derive(Debug, Clone)]
pub struct RotationController {
    gains: PidGains,
    tolerance: f64,
    period: f64,
    output_limit: f64,
    pid: PidState,
    target: Option<f64>,
    last_error: Option<f64>,
    last_output: f64,
    overflowed: bool,
    state: ControllerState,
}

impl RotationController {
    /// Build from validated rotation config. Gains are fixed afterwards.
    pub fn new(config: &RotationConfig) -> Self {
        Self {
            gains: PidGains {
                kp: config.kp,
                ki: config.ki,
                kd: config.kd,
                i_zone: config.i_zone,
                integral_min: config.integral_min,
                integral_max: config.integral_max,
            },
            tolerance: config.tolerance,
            period: config.period,
            output_limit: config.output_limit,
            pid: PidState::default(),
            target: None,
            last_error: None,
            last_output: 0.0,
            overflowed: false,
            state: ControllerState::Idle,
        }
    }

    /// Set the setpoint [deg]. Any finite value is accepted.
    ///
    /// `at_target()` reads false until the next `compute`.
    ///
    /// # Errors
    /// `InvalidTarget` for NaN/infinite values; the previous target is kept.
    pub fn set_target(&mut self, angle_degrees: f64) -> Result<(), InvalidTarget> {
        if !angle_degrees.is_finite() {
            return Err(InvalidTarget {
                value: angle_degrees,
            });
        }
        if self.target != Some(angle_degrees) {
            debug!(
                previous = ?self.target,
                target_deg = angle_degrees,
                "rotation target set"
            );
        }
        self.target = Some(angle_degrees);
        self.last_error = None;
        self.transition(ControllerState::Seeking);
        Ok(())
    }

    /// Run one PID step against `current_angle` [deg] and return the output.
    ///
    /// Returns `0.0` while no target has ever been set.
    pub fn compute(&mut self, current_angle: f64) -> f64 {
        let Some(target) = self.target else {
            self.last_output = 0.0;
            self.overflowed = false;
            return 0.0;
        };

        if !current_angle.is_finite() {
            return self.fail_safe("non-finite measurement", current_angle);
        }

        let error = target - current_angle;
        let raw = pid_compute(&mut self.pid, &self.gains, error, self.period);
        self.last_error = Some(error);

        if !raw.is_finite() {
            return self.fail_safe("non-finite PID output", raw);
        }

        let output = if raw.abs() > self.output_limit {
            self.overflowed = true;
            raw.clamp(-self.output_limit, self.output_limit)
        } else {
            self.overflowed = false;
            raw
        };

        let next = if error.abs() <= self.tolerance {
            ControllerState::AtTarget
        } else {
            ControllerState::Seeking
        };
        self.transition(next);

        self.last_output = output;
        output
    }

    /// True iff the most recent `compute` saw `|error| ≤ tolerance`.
    ///
    /// False before the first `compute`, after a target change and after
    /// `stop()`.
    pub fn at_target(&self) -> bool {
        matches!(self.last_error, Some(e) if e.abs() <= self.tolerance)
    }

    /// Zero the output and clear integral/derivative memory. Target is kept.
    pub fn stop(&mut self) {
        self.pid.reset();
        self.last_error = None;
        self.last_output = 0.0;
        self.overflowed = false;
        self.transition(ControllerState::Idle);
    }

    /// Back to the freshly constructed state: no target, no PID memory.
    pub fn reset(&mut self) {
        self.stop();
        if self.target.take().is_some() {
            debug!("rotation target cleared");
        }
    }

    /// Current setpoint.
    pub fn target(&self) -> Option<f64> {
        self.target
    }

    /// Output of the last `compute` (zero after `stop`).
    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    /// Error of the last `compute`.
    pub fn last_error(&self) -> Option<f64> {
        self.last_error
    }

    /// True if the last `compute` clamped or discarded its output.
    pub fn output_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// At-target window [deg].
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Output magnitude limit.
    pub fn output_limit(&self) -> f64 {
        self.output_limit
    }

    /// PID gains.
    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// PID internal state.
    pub fn pid_state(&self) -> &PidState {
        &self.pid
    }

    fn fail_safe(&mut self, reason: &'static str, value: f64) -> f64 {
        warn!(reason, value, "rotation output discarded, integrator reset");
        self.pid.reset();
        self.last_error = None;
        self.last_output = 0.0;
        self.overflowed = true;
        self.transition(ControllerState::Seeking);
        0.0
    }

    fn transition(&mut self, next: ControllerState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "rotation controller state");
            self.state = next;
        }
    }
}
