//! Pivot physics simulator.
//!
//! A [`SimulatedPivot`] is a shared handle to one second-order rotational
//! plant. The encoder and motor handles it hands out observe and drive that
//! same plant, so a control loop can be closed entirely in-process:
//!
//! ```text
//! velocity += (gain · command − damping · velocity) · dt
//! angle    += velocity · dt
//! ```
//!
//! The encoder reports `angle / 360` wrapped into `[0, 1)`, matching a
//! through-bore absolute encoder.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use pivot_common::consts::DEGREES_PER_TURN;

use super::{AbsoluteEncoder, ActuatorSink, FlywheelSink};
use crate::error::SensorFault;

/// Physical parameters of the simulated pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantParams {
    /// Angular acceleration per unit command [deg/s²].
    pub gain: f64,
    /// Viscous damping [1/s].
    pub damping: f64,
    /// Starting angle [deg].
    pub initial_angle: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            gain: 2000.0,
            damping: 8.0,
            initial_angle: 10.0,
        }
    }
}

#[derive(Debug)]
struct PlantState {
    params: PlantParams,
    angle: f64,
    velocity: f64,
    command: f64,
    connected: bool,
    frozen: bool,
    stale_reads: u32,
    raw_override: Option<f64>,
}

impl PlantState {
    fn advance(&mut self, dt_s: f64) {
        let accel = self.params.gain * self.command - self.params.damping * self.velocity;
        // Semi-implicit Euler: velocity first.
        self.velocity += accel * dt_s;
        self.angle += self.velocity * dt_s;
    }

    fn turns(&self) -> f64 {
        (self.angle / DEGREES_PER_TURN).rem_euclid(1.0)
    }
}

/// Shared handle to a simulated pivot plant.
#[derive(Debug, Clone)]
pub struct SimulatedPivot {
    state: Arc<Mutex<PlantState>>,
}

impl SimulatedPivot {
    /// Create a plant at rest at `params.initial_angle`.
    pub fn new(params: PlantParams) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlantState {
                params,
                angle: params.initial_angle,
                velocity: 0.0,
                command: 0.0,
                connected: true,
                frozen: false,
                stale_reads: 0,
                raw_override: None,
            })),
        }
    }

    /// Encoder observing this plant.
    pub fn encoder(&self) -> SimEncoder {
        SimEncoder {
            state: Arc::clone(&self.state),
        }
    }

    /// Motor driving this plant.
    pub fn motor(&self) -> SimMotor {
        SimMotor {
            state: Arc::clone(&self.state),
        }
    }

    /// Integrate the plant over `dt` using the last applied command.
    pub fn advance(&self, dt: Duration) {
        let mut s = self.state.lock();
        s.advance(dt.as_secs_f64());
        trace!(
            angle = s.angle,
            velocity = s.velocity,
            command = s.command,
            "pivot plant advanced"
        );
    }

    /// True mechanical angle [deg], not wrapped.
    pub fn angle(&self) -> f64 {
        self.state.lock().angle
    }

    /// Angular velocity [deg/s].
    pub fn velocity(&self) -> f64 {
        self.state.lock().velocity
    }

    /// Last command applied by the motor handle.
    pub fn command(&self) -> f64 {
        self.state.lock().command
    }

    /// Connect or disconnect the encoder signal.
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// Freeze the encoder signal. While frozen every read reports
    /// [`SensorFault::Stale`] with the number of reads since the freeze.
    pub fn set_frozen(&self, frozen: bool) {
        let mut s = self.state.lock();
        s.frozen = frozen;
        s.stale_reads = 0;
    }

    /// Force the encoder to report `raw` regardless of the plant angle.
    pub fn set_raw_override(&self, raw: Option<f64>) {
        self.state.lock().raw_override = raw;
    }

    /// Teleport the plant to `angle` at rest.
    pub fn set_angle(&self, angle: f64) {
        let mut s = self.state.lock();
        s.angle = angle;
        s.velocity = 0.0;
    }
}

/// Absolute encoder view of a [`SimulatedPivot`].
#[derive(Debug, Clone)]
pub struct SimEncoder {
    state: Arc<Mutex<PlantState>>,
}

impl AbsoluteEncoder for SimEncoder {
    fn read_turns(&self) -> Result<f64, SensorFault> {
        let mut s = self.state.lock();
        if !s.connected {
            return Err(SensorFault::Disconnected);
        }
        if s.frozen {
            s.stale_reads = s.stale_reads.saturating_add(1);
            return Err(SensorFault::Stale {
                cycles: s.stale_reads,
            });
        }
        Ok(s.raw_override.unwrap_or_else(|| s.turns()))
    }
}

/// Motor view of a [`SimulatedPivot`].
#[derive(Debug, Clone)]
pub struct SimMotor {
    state: Arc<Mutex<PlantState>>,
}

impl ActuatorSink for SimMotor {
    fn apply(&mut self, output: f64) {
        self.state.lock().command = output;
    }
}

/// Last commands seen by a [`SimFlywheel`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlywheelCommand {
    /// Last velocity request.
    pub velocity: Option<f64>,
    /// Last duty request.
    pub duty: Option<f64>,
}

/// Flywheel that records its commands.
#[derive(Debug, Clone, Default)]
pub struct SimFlywheel {
    last: Arc<Mutex<FlywheelCommand>>,
}

impl SimFlywheel {
    /// Create a flywheel with no command recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent commands.
    pub fn last(&self) -> FlywheelCommand {
        *self.last.lock()
    }
}

impl FlywheelSink for SimFlywheel {
    fn set_velocity(&mut self, velocity: f64) {
        let mut last = self.last.lock();
        last.velocity = Some(velocity);
        last.duty = None;
    }

    fn set_duty(&mut self, duty: f64) {
        let mut last = self.last.lock();
        last.duty = Some(duty);
        last.velocity = None;
    }
}
