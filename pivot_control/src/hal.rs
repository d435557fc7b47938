//! Hardware boundary of the pivot axis.
//!
//! The control core only ever talks to these traits. Vendor bindings
//! (motor controller firmware, duty-cycle encoder polling) live outside this
//! crate; [`simulation`] provides an in-process backend for bench runs and
//! tests.
//!
//! # Timing Contracts
//!
//! | Operation | Max Duration | Blocking |
//! |-----------|--------------|----------|
//! | `read_turns()` | negligible (cached read) | never |
//! | `degrees()` | negligible | never |
//! | `apply()` / flywheel setters | negligible | never |

pub mod simulation;

use crate::error::SensorFault;

/// Absolute rotational position source reporting fractional turns.
pub trait AbsoluteEncoder: Send {
    /// Latest reading in turns, nominally `[0, 1)`.
    ///
    /// # Errors
    /// `SensorFault` if the source is disconnected or stale.
    fn read_turns(&self) -> Result<f64, SensorFault>;
}

/// Supplier of a dynamic reference angle (e.g. the arm the pivot rides on).
pub trait ReferenceAngle: Send {
    /// Current reference angle [deg].
    fn degrees(&self) -> f64;
}

impl<F> ReferenceAngle for F
where
    F: Fn() -> f64 + Send,
{
    fn degrees(&self) -> f64 {
        self()
    }
}

/// Rotation motor command sink.
///
/// Receives a bounded, always-finite output on the controller's scale.
pub trait ActuatorSink: Send {
    /// Apply `output` until the next call.
    fn apply(&mut self, output: f64);
}

/// Shooter flywheel command sink.
pub trait FlywheelSink: Send {
    /// Closed-loop velocity request.
    fn set_velocity(&mut self, velocity: f64);

    /// Open-loop duty request.
    fn set_duty(&mut self, duty: f64);
}

/// Flywheel sink that discards every command. Used when no flywheel exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFlywheel;

impl FlywheelSink for NoFlywheel {
    fn set_velocity(&mut self, _velocity: f64) {}

    fn set_duty(&mut self, _duty: f64) {}
}
