//! Control engine root.
//!
//! Position control for the pivot axis: a PID step with integral zone and
//! bounded integrator, wrapped by a controller that owns the setpoint,
//! tolerance check and output limiting.

pub mod pid;
pub mod rotation;

pub use pid::{PidGains, PidState, pid_compute};
pub use rotation::{ControllerState, RotationController};
