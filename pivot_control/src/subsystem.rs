//! Shooter pivot subsystem (composition root).
//!
//! Owns the angle sensor, rotation controller, actuator sinks and the fixed
//! telemetry channel set. One [`PositionSubsystem::step`] per control cycle:
//!
//! 1. **Sense**: sample the encoder once; publish raw, no-offset and offset
//!    angle.
//! 2. **Decide**: per [`RotationMode`], compute the PID output, forward the
//!    stored open-loop output, or command zero.
//! 3. **Actuate**: publish `rotate_angle`, apply to the motor, publish the
//!    fault word.
//!
//! Faults never escape `step()`. They are folded into an [`AxisFault`] word
//! and surfaced through the `faults` channel and `tracing` events.

use std::sync::Arc;

use tracing::{debug, info, warn};

use pivot_common::fault::AxisFault;
use pivot_common::rotation::RotationConfig;
use pivot_common::telemetry as names;

use crate::control::{ControllerState, RotationController};
use crate::error::InvalidTarget;
use crate::hal::{ActuatorSink, FlywheelSink, NoFlywheel};
use crate::sensor::{AngleSensor, SensorSample};
use crate::telemetry::{TelemetryChannel, TelemetryRegistry};

/// Source of the rotation motor command.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RotationMode {
    /// Motor held at zero.
    #[default]
    Idle,
    /// PID output towards the controller target.
    ClosedLoop,
    /// Direct output, limited to the controller's output limit at each step.
    OpenLoop {
        /// Requested output.
        output: f64,
    },
}

/// The fixed channel set of the pivot.
#[derive(Debug, Clone)]
pub struct PivotChannels {
    pub shoot_velocity: Arc<TelemetryChannel>,
    pub shoot_voltage: Arc<TelemetryChannel>,
    pub rotate_angle: Arc<TelemetryChannel>,
    pub rotate_target: Arc<TelemetryChannel>,
    pub encoder_value: Arc<TelemetryChannel>,
    pub encoder_angle_no_offset: Arc<TelemetryChannel>,
    pub encoder_angle: Arc<TelemetryChannel>,
    pub faults: Arc<TelemetryChannel>,
}

impl PivotChannels {
    /// Publish (or look up) every pivot channel in `registry`.
    pub fn publish(registry: &TelemetryRegistry) -> Self {
        Self {
            shoot_velocity: registry.publish(names::SHOOT_VELOCITY),
            shoot_voltage: registry.publish(names::SHOOT_VOLTAGE),
            rotate_angle: registry.publish(names::ROTATE_ANGLE),
            rotate_target: registry.publish(names::ROTATE_TARGET),
            encoder_value: registry.publish(names::ENCODER_VALUE),
            encoder_angle_no_offset: registry.publish(names::ENCODER_ANGLE_NO_OFFSET),
            encoder_angle: registry.publish(names::ENCODER_ANGLE),
            faults: registry.publish(names::FAULTS),
        }
    }
}

/// Write `value` to `channel`, latching a telemetry fault on sink failure.
#[inline]
fn record(faults: &mut AxisFault, channel: &TelemetryChannel, value: f64) {
    if channel.set(value).is_err() {
        faults.insert(AxisFault::TELEMETRY_WRITE_FAILURE);
    }
}

/// Single-axis pivot position subsystem.
pub struct PositionSubsystem {
    sensor: AngleSensor,
    controller: RotationController,
    actuator: Box<dyn ActuatorSink>,
    flywheel: Box<dyn FlywheelSink>,
    channels: PivotChannels,
    mode: RotationMode,
    faults: AxisFault,
    last_sample: SensorSample,
    last_output: f64,
}

impl PositionSubsystem {
    /// Wire sensor, controller and channels together. The motor starts idle
    /// and the command channels are seeded with zero.
    pub fn new(
        config: &RotationConfig,
        sensor: AngleSensor,
        actuator: Box<dyn ActuatorSink>,
        registry: &TelemetryRegistry,
    ) -> Self {
        let mut subsystem = Self {
            sensor,
            controller: RotationController::new(config),
            actuator,
            flywheel: Box::new(NoFlywheel),
            channels: PivotChannels::publish(registry),
            mode: RotationMode::Idle,
            faults: AxisFault::empty(),
            last_sample: SensorSample::default(),
            last_output: 0.0,
        };
        subsystem.seed_telemetry();
        info!(
            namespace = registry.namespace(),
            kp = config.kp,
            ki = config.ki,
            kd = config.kd,
            tolerance = config.tolerance,
            "pivot subsystem initialised"
        );
        subsystem
    }

    /// Attach the shooter flywheel.
    pub fn with_flywheel(mut self, flywheel: Box<dyn FlywheelSink>) -> Self {
        self.flywheel = flywheel;
        self
    }

    /// Write zero to every command channel and the current fault word.
    pub fn seed_telemetry(&mut self) {
        let mut faults = self.faults;
        let ch = &self.channels;
        for channel in [
            &ch.shoot_velocity,
            &ch.shoot_voltage,
            &ch.rotate_angle,
            &ch.rotate_target,
        ] {
            record(&mut faults, channel, 0.0);
        }
        let word = faults.as_telemetry();
        record(&mut faults, &ch.faults, word);
        self.faults = faults;
    }

    /// Run one control cycle.
    pub fn step(&mut self) {
        let mut faults = self.faults & AxisFault::LATCHED_MASK;

        // ── Sense ──
        let sample = self.sensor.sample();
        self.last_sample = sample;
        record(&mut faults, &self.channels.encoder_value, sample.raw);
        record(
            &mut faults,
            &self.channels.encoder_angle_no_offset,
            sample.angle_no_offset,
        );
        record(&mut faults, &self.channels.encoder_angle, sample.angle);

        // ── Decide ──
        let limit = self.controller.output_limit();
        let output = match self.mode {
            RotationMode::Idle => 0.0,
            RotationMode::ClosedLoop if !sample.is_valid() => {
                if self.controller.state() != ControllerState::Idle {
                    self.controller.stop();
                }
                0.0
            }
            RotationMode::ClosedLoop => {
                let out = self.controller.compute(sample.angle);
                if self.controller.output_overflowed() {
                    faults.insert(AxisFault::OUTPUT_OVERFLOW);
                }
                out
            }
            RotationMode::OpenLoop { output } => {
                if !output.is_finite() {
                    faults.insert(AxisFault::OUTPUT_OVERFLOW);
                    0.0
                } else if output.abs() > limit {
                    faults.insert(AxisFault::OUTPUT_OVERFLOW);
                    output.clamp(-limit, limit)
                } else {
                    output
                }
            }
        };
        if !sample.is_valid() {
            faults.insert(AxisFault::SENSOR_FAULT);
        }

        // ── Actuate ──
        self.last_output = output;
        record(&mut faults, &self.channels.rotate_angle, output);
        self.actuator.apply(output);

        self.update_faults(faults);
        self.publish_faults();
    }

    /// Seek `target_degrees` in closed loop.
    ///
    /// # Errors
    /// `InvalidTarget` for non-finite targets: the previous target and mode
    /// stay active and `INVALID_TARGET` is latched until the next accepted
    /// command.
    pub fn command(&mut self, target_degrees: f64) -> Result<(), InvalidTarget> {
        let mut faults = self.faults;
        let result = match self.controller.set_target(target_degrees) {
            Ok(()) => {
                faults.remove(AxisFault::INVALID_TARGET);
                if self.mode != RotationMode::ClosedLoop {
                    debug!(from = ?self.mode, "rotation mode -> closed loop");
                }
                self.mode = RotationMode::ClosedLoop;
                record(&mut faults, &self.channels.rotate_target, target_degrees);
                Ok(())
            }
            Err(e) => {
                faults.insert(AxisFault::INVALID_TARGET);
                Err(e)
            }
        };
        self.update_faults(faults);
        self.publish_faults();
        result
    }

    /// True iff in closed loop and the last compute was within tolerance.
    pub fn is_at_target(&self) -> bool {
        self.mode == RotationMode::ClosedLoop && self.controller.at_target()
    }

    /// Stop the controller and command zero immediately. The target is kept
    /// for [`resume`](Self::resume).
    pub fn shutdown(&mut self) {
        self.controller.stop();
        self.mode = RotationMode::Idle;
        self.last_output = 0.0;
        self.actuator.apply(0.0);
        let mut faults = self.faults;
        record(&mut faults, &self.channels.rotate_angle, 0.0);
        self.update_faults(faults);
        self.publish_faults();
        info!(retained_target = ?self.controller.target(), "pivot shut down");
    }

    /// Re-enter closed loop towards the retained target.
    ///
    /// Returns `false` (and stays idle) if no target was ever accepted.
    pub fn resume(&mut self) -> bool {
        match self.controller.target() {
            Some(target) => {
                debug!(target_deg = target, "pivot resumed");
                self.mode = RotationMode::ClosedLoop;
                true
            }
            None => false,
        }
    }

    /// Drive the motor directly, bypassing the controller.
    ///
    /// The output is limited to the controller output limit at each step;
    /// non-finite requests command zero and raise `OUTPUT_OVERFLOW`.
    pub fn drive_open_loop(&mut self, output: f64) {
        if !matches!(self.mode, RotationMode::OpenLoop { .. }) {
            debug!(from = ?self.mode, output, "rotation mode -> open loop");
            self.controller.stop();
        }
        self.mode = RotationMode::OpenLoop { output };
    }

    /// Request flywheel velocity. Non-finite requests are dropped.
    pub fn set_shoot_velocity(&mut self, velocity: f64) {
        if !velocity.is_finite() {
            warn!(velocity, "non-finite flywheel velocity ignored");
            return;
        }
        let mut faults = self.faults;
        record(&mut faults, &self.channels.shoot_velocity, velocity);
        self.update_faults(faults);
        self.flywheel.set_velocity(velocity);
    }

    /// Request flywheel open-loop duty. Non-finite requests are dropped.
    pub fn set_shoot_voltage(&mut self, duty: f64) {
        if !duty.is_finite() {
            warn!(duty, "non-finite flywheel duty ignored");
            return;
        }
        let mut faults = self.faults;
        record(&mut faults, &self.channels.shoot_voltage, duty);
        self.update_faults(faults);
        self.flywheel.set_duty(duty);
    }

    /// Current fault word.
    pub fn faults(&self) -> AxisFault {
        self.faults
    }

    /// Clear every fault flag. Live flags come back on the next step if the
    /// cause persists.
    pub fn clear_faults(&mut self) {
        if !self.faults.is_empty() {
            info!(cleared = ?self.faults, "pivot faults cleared");
        }
        self.faults = AxisFault::empty();
        self.publish_faults();
    }

    /// Active rotation mode.
    pub fn mode(&self) -> RotationMode {
        self.mode
    }

    /// The rotation controller.
    pub fn controller(&self) -> &RotationController {
        &self.controller
    }

    /// The angle sensor.
    pub fn sensor(&self) -> &AngleSensor {
        &self.sensor
    }

    /// Sample taken by the last step.
    pub fn last_sample(&self) -> SensorSample {
        self.last_sample
    }

    /// Output applied by the last step.
    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    /// Telemetry channels of this pivot.
    pub fn channels(&self) -> &PivotChannels {
        &self.channels
    }

    fn publish_faults(&mut self) {
        let mut faults = self.faults;
        let word = faults.as_telemetry();
        record(&mut faults, &self.channels.faults, word);
        self.update_faults(faults);
    }

    fn update_faults(&mut self, next: AxisFault) {
        let raised = next.difference(self.faults);
        let cleared = self.faults.difference(next);
        if !raised.is_empty() {
            warn!(raised = ?raised, faults = ?next, "pivot fault raised");
        }
        if !cleared.is_empty() {
            debug!(cleared = ?cleared, faults = ?next, "pivot fault cleared");
        }
        self.faults = next;
    }
}

impl std::fmt::Debug for PositionSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionSubsystem")
            .field("mode", &self.mode)
            .field("faults", &self.faults)
            .field("controller", &self.controller)
            .field("last_sample", &self.last_sample)
            .field("last_output", &self.last_output)
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
