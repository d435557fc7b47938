//! PID step with integral zone and bounded integrator.
//!
//! - P: `kp · e`
//! - I: accumulated `e · dt`, cleared whenever `|e| > i_zone`, clamped so the
//!   I contribution stays within `[integral_min, integral_max]`.
//! - D: `kd · (e − e_prev) / dt`, zero on the first step after a reset.
//!
//! Zero Ki disables integral; zero Kd disables derivative.

/// Internal state of the PID controller.
///
/// Must be reset (via [`PidState::reset`]) whenever the loop is stopped so
/// that a resumed loop neither inherits stale integral nor kicks on the
/// derivative.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    /// Accumulated `error · dt` [deg·s].
    integral: f64,
    /// Error of the previous step, `None` right after a reset.
    prev_error: Option<f64>,
}

impl PidState {
    /// Reset all internal state.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Accumulated `error · dt` [deg·s].
    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Error of the previous step.
    #[inline]
    pub fn prev_error(&self) -> Option<f64> {
        self.prev_error
    }
}

/// PID gains and integrator shaping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (0 = disabled).
    pub ki: f64,
    /// Derivative gain (0 = disabled).
    pub kd: f64,
    /// Error magnitude above which the integral is cleared.
    pub i_zone: f64,
    /// Lower bound of the I contribution.
    pub integral_min: f64,
    /// Upper bound of the I contribution.
    pub integral_max: f64,
}

impl PidGains {
    /// Integrator bounds in `error · dt` units, ordered low to high.
    #[inline]
    fn accumulator_bounds(&self) -> (f64, f64) {
        let a = self.integral_min / self.ki;
        let b = self.integral_max / self.ki;
        if a <= b { (a, b) } else { (b, a) }
    }
}

/// Compute one PID step.
///
/// # Arguments
/// - `state`: Mutable PID state.
/// - `gains`: PID gains.
/// - `error`: Setpoint − measurement [deg].
/// - `dt`: Step period [s].
///
/// # Returns
/// Raw PID output, unclamped. Output limiting happens in the caller.
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }

    // ── P term ──────────────────────────────────────────────
    let p_term = gains.kp * error;

    // ── I term (integral zone + bounded accumulator) ────────
    let i_term = if gains.ki != 0.0 {
        if error.abs() > gains.i_zone {
            state.integral = 0.0;
        } else {
            let (lo, hi) = gains.accumulator_bounds();
            let next = state.integral + error * dt;
            state.integral = if lo.is_nan() || hi.is_nan() {
                next
            } else {
                next.clamp(lo, hi)
            };
        }
        gains.ki * state.integral
    } else {
        state.integral = 0.0;
        0.0
    };

    // ── D term ──────────────────────────────────────────────
    let d_term = match state.prev_error {
        Some(prev) if gains.kd != 0.0 => gains.kd * (error - prev) / dt,
        _ => 0.0,
    };

    state.prev_error = Some(error);

    p_term + i_term + d_term
}

// ─── Tests ──────────────────────────────────────────────────────────
