//! Fault handling across sensor, controller and subsystem.
//!
//! Faults never abort `step()`: they show up as `AxisFault` bits on the
//! `faults` channel while the motor is driven to a safe value.

use std::sync::Arc;
use std::time::Duration;

use pivot_common::fault::AxisFault;
use pivot_common::rotation::RotationConfig;
use pivot_common::telemetry::FAULTS;
use pivot_control::error::{TelemetryError, TelemetryResult};
use pivot_control::hal::simulation::{PlantParams, SimulatedPivot};
use pivot_control::sensor::AngleSensor;
use pivot_control::subsystem::{PositionSubsystem, RotationMode};
use pivot_control::telemetry::{LogEntry, LogSink, MemorySink, TelemetryRegistry};

const DT: Duration = Duration::from_millis(20);

fn published_faults(registry: &TelemetryRegistry) -> AxisFault {
    AxisFault::from_telemetry(registry.get(FAULTS).unwrap().get())
}

fn rig() -> (PositionSubsystem, SimulatedPivot, TelemetryRegistry) {
    let pivot = SimulatedPivot::new(PlantParams::default());
    let registry = TelemetryRegistry::in_memory("/shooter");
    let subsystem = PositionSubsystem::new(
        &RotationConfig::default(),
        AngleSensor::new(Box::new(pivot.encoder())),
        Box::new(pivot.motor()),
        &registry,
    );
    (subsystem, pivot, registry)
}

#[test]
fn encoder_disconnect_mid_move_stops_motor() {
    let (mut sub, pivot, registry) = rig();
    sub.command(90.0).unwrap();
    for _ in 0..10 {
        sub.step();
        pivot.advance(DT);
    }
    assert!(pivot.command() > 0.0);
    let held = sub.last_sample().angle;

    pivot.set_connected(false);
    for _ in 0..5 {
        sub.step();
        pivot.advance(DT);
        assert_eq!(pivot.command(), 0.0);
        assert_eq!(sub.last_output(), 0.0);
        assert!(!sub.is_at_target());
    }
    assert!(published_faults(&registry).contains(AxisFault::SENSOR_FAULT));
    assert_eq!(registry.get("encoder_angle").unwrap().get(), held);
    assert_eq!(sub.mode(), RotationMode::ClosedLoop);

    pivot.set_connected(true);
    for _ in 0..500 {
        sub.step();
        pivot.advance(DT);
    }
    sub.step();
    assert!(published_faults(&registry).is_empty());
    assert!((pivot.angle() - 90.0).abs() < 1.0);
}

#[test]
fn corrupt_reading_is_a_sensor_fault() {
    let (mut sub, pivot, registry) = rig();
    sub.command(30.0).unwrap();
    sub.step();

    pivot.set_raw_override(Some(f64::NAN));
    sub.step();
    assert_eq!(pivot.command(), 0.0);
    assert!(sub.faults().contains(AxisFault::SENSOR_FAULT));
    assert!(registry.get("encoder_value").unwrap().get().is_finite());
}

#[test]
fn rejected_target_keeps_previous_motion() {
    let (mut sub, pivot, registry) = rig();
    sub.command(50.0).unwrap();
    sub.step();
    let before = pivot.command();

    assert!(sub.command(f64::INFINITY).is_err());
    assert_eq!(sub.controller().target(), Some(50.0));
    assert!(published_faults(&registry).contains(AxisFault::INVALID_TARGET));
    assert_eq!(registry.get("rotate_target").unwrap().get(), 50.0);

    sub.step();
    assert_eq!(pivot.command(), before);
}

#[test]
fn saturated_output_flags_overflow_until_in_range() {
    let (mut sub, pivot, _registry) = rig();
    // 0.02 · 170° = 3.4 > output limit 1.0
    sub.command(180.0).unwrap();
    sub.step();
    assert_eq!(pivot.command(), 1.0);
    assert!(sub.faults().contains(AxisFault::OUTPUT_OVERFLOW));

    // First step after the retarget carries the derivative kick.
    sub.command(20.0).unwrap();
    sub.step();
    sub.step();
    assert!(pivot.command().abs() < 1.0);
    assert!(!sub.faults().contains(AxisFault::OUTPUT_OVERFLOW));
}

#[test]
fn clear_faults_resets_latched_flags() {
    let (mut sub, _pivot, registry) = rig();
    let _ = sub.command(f64::NAN);
    assert!(sub.faults().contains(AxisFault::INVALID_TARGET));

    sub.clear_faults();
    assert!(sub.faults().is_empty());
    assert!(published_faults(&registry).is_empty());
}

/// Sink that fails after a number of successful appends.
struct FlakySink {
    inner: MemorySink,
    budget: parking_lot::Mutex<usize>,
}

impl LogSink for FlakySink {
    fn append(&self, key: &str, entry: &LogEntry) -> TelemetryResult<()> {
        let mut budget = self.budget.lock();
        if *budget == 0 {
            return Err(TelemetryError::SinkUnavailable("log volume full".to_string()));
        }
        *budget -= 1;
        self.inner.append(key, entry)
    }
}

#[test]
fn durable_log_failure_does_not_stop_control() {
    let sink = Arc::new(FlakySink {
        inner: MemorySink::new(),
        budget: parking_lot::Mutex::new(20),
    });
    let pivot = SimulatedPivot::new(PlantParams::default());
    let registry = TelemetryRegistry::new("/shooter", sink.clone());
    let mut sub = PositionSubsystem::new(
        &RotationConfig::default(),
        AngleSensor::new(Box::new(pivot.encoder())),
        Box::new(pivot.motor()),
        &registry,
    );
    sub.command(60.0).unwrap();

    for _ in 0..200 {
        sub.step();
        pivot.advance(DT);
    }

    assert_eq!(sink.inner.len(), 20);
    assert!(sub.faults().contains(AxisFault::TELEMETRY_WRITE_FAILURE));
    assert!(pivot.angle() > 50.0);

    // In-memory logs are complete regardless of the durable sink.
    let angle = registry.get("encoder_angle").unwrap();
    assert_eq!(angle.len(), 200);
    assert!(angle.write_failures() > 0);
}
