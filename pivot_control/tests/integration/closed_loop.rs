//! Closed-loop convergence against the simulated pivot.
//!
//! Runs the subsystem at 50 Hz on the second-order plant and checks that the
//! pivot settles on each commanded angle, with and without a reference
//! offset.

use std::time::Duration;

use pivot_common::rotation::RotationConfig;
use pivot_control::hal::ActuatorSink;
use pivot_control::hal::simulation::{PlantParams, SimMotor, SimulatedPivot};
use pivot_control::sensor::AngleSensor;
use pivot_control::subsystem::PositionSubsystem;
use pivot_control::telemetry::TelemetryRegistry;

const DT: Duration = Duration::from_millis(20);

fn tuned() -> RotationConfig {
    RotationConfig {
        kp: 0.02,
        ki: 0.0,
        kd: 0.001,
        ..RotationConfig::default()
    }
}

/// Step subsystem and plant together for `cycles` cycles.
fn settle(subsystem: &mut PositionSubsystem, pivot: &SimulatedPivot, cycles: usize) {
    for _ in 0..cycles {
        subsystem.step();
        pivot.advance(DT);
    }
    subsystem.step();
}

#[test]
fn step_to_sixty_degrees_converges() {
    let pivot = SimulatedPivot::new(PlantParams::default());
    let registry = TelemetryRegistry::in_memory("/shooter");
    let mut subsystem = PositionSubsystem::new(
        &tuned(),
        AngleSensor::new(Box::new(pivot.encoder())),
        Box::new(pivot.motor()),
        &registry,
    );

    subsystem.command(60.0).unwrap();
    settle(&mut subsystem, &pivot, 500);

    let err = (pivot.angle() - 60.0).abs();
    assert!(err < 1.0, "steady-state error {err:.3}° too large");
    assert!(subsystem.is_at_target());
    assert!(pivot.velocity().abs() < 1.0);
}

#[test]
fn target_schedule_visits_each_angle() {
    let pivot = SimulatedPivot::new(PlantParams::default());
    let registry = TelemetryRegistry::in_memory("/shooter");
    let mut subsystem = PositionSubsystem::new(
        &tuned(),
        AngleSensor::new(Box::new(pivot.encoder())),
        Box::new(pivot.motor()),
        &registry,
    );

    for target in [45.0, 30.0, 75.0] {
        subsystem.command(target).unwrap();
        assert!(!subsystem.is_at_target());
        settle(&mut subsystem, &pivot, 400);
        assert!(
            (pivot.angle() - target).abs() < 1.0,
            "target {target}: angle {:.3}",
            pivot.angle()
        );
        assert!(subsystem.is_at_target());
    }

    let targets: Vec<f64> = subsystem
        .channels()
        .rotate_target
        .entries()
        .iter()
        .map(|e| e.value)
        .collect();
    assert_eq!(targets, vec![0.0, 45.0, 30.0, 75.0]);
}

#[test]
fn reference_offset_shifts_the_setpoint_frame() {
    let pivot = SimulatedPivot::new(PlantParams::default());
    let registry = TelemetryRegistry::in_memory("/shooter");
    let sensor = AngleSensor::new(Box::new(pivot.encoder())).with_reference(Box::new(|| 20.0));
    let mut subsystem =
        PositionSubsystem::new(&tuned(), sensor, Box::new(pivot.motor()), &registry);

    // 40° relative to a 20° arm is 60° absolute.
    subsystem.command(40.0).unwrap();
    settle(&mut subsystem, &pivot, 500);

    assert!((pivot.angle() - 60.0).abs() < 1.0);
    let sample = subsystem.last_sample();
    assert!((sample.angle_no_offset - sample.angle - 20.0).abs() < 1e-9);
    assert_eq!(registry.get("encoder_angle").unwrap().get(), sample.angle);
}

#[test]
fn integral_removes_offset_from_constant_load() {
    struct BiasedMotor {
        inner: SimMotor,
        bias: f64,
    }

    impl ActuatorSink for BiasedMotor {
        fn apply(&mut self, output: f64) {
            self.inner.apply(output + self.bias);
        }
    }

    let config = RotationConfig {
        kp: 0.02,
        ki: 0.05,
        kd: 0.001,
        i_zone: 5.0,
        ..RotationConfig::default()
    };
    let pivot = SimulatedPivot::new(PlantParams::default());
    let registry = TelemetryRegistry::in_memory("/shooter");
    let motor = BiasedMotor {
        inner: pivot.motor(),
        bias: -0.02,
    };
    let mut subsystem = PositionSubsystem::new(
        &config,
        AngleSensor::new(Box::new(pivot.encoder())),
        Box::new(motor),
        &registry,
    );

    subsystem.command(60.0).unwrap();
    settle(&mut subsystem, &pivot, 1_500);

    // P alone would sit 1° low (0.02 bias / 0.02 kp).
    assert!(
        (pivot.angle() - 60.0).abs() < 0.2,
        "angle {:.3}",
        pivot.angle()
    );
}
