//! Property tests for the numeric contracts of sensor, controller and
//! telemetry channels.

use proptest::prelude::*;

use pivot_common::rotation::RotationConfig;
use pivot_control::control::RotationController;
use pivot_control::error::SensorFault;
use pivot_control::hal::AbsoluteEncoder;
use pivot_control::sensor::AngleSensor;
use pivot_control::telemetry::TelemetryRegistry;

struct FixedEncoder(f64);

impl AbsoluteEncoder for FixedEncoder {
    fn read_turns(&self) -> Result<f64, SensorFault> {
        Ok(self.0)
    }
}

fn controller(kp: f64, ki: f64, kd: f64, tolerance: f64) -> RotationController {
    RotationController::new(&RotationConfig {
        kp,
        ki,
        kd,
        tolerance,
        ..RotationConfig::default()
    })
}

proptest! {
    #[test]
    fn read_angle_is_turns_times_360_minus_reference(
        raw in 0.0f64..1.0,
        reference in -720.0f64..720.0,
    ) {
        let sensor = AngleSensor::new(Box::new(FixedEncoder(raw)));
        let angle = sensor.read_angle(reference).unwrap();
        prop_assert!((angle - (raw * 360.0 - reference)).abs() < 1e-9);

        let no_offset = sensor.read_angle_without_offset().unwrap();
        prop_assert!((no_offset - raw * 360.0).abs() < 1e-9);
    }

    #[test]
    fn sample_matches_direct_reads(raw in 0.0f64..1.0, reference in -180.0f64..180.0) {
        let mut sensor = AngleSensor::new(Box::new(FixedEncoder(raw)))
            .with_reference(Box::new(move || reference));
        let sample = sensor.sample();
        prop_assert!(sample.is_valid());
        prop_assert_eq!(sample.raw, raw);
        prop_assert_eq!(sample.angle, sensor.read_angle(reference).unwrap());
    }

    #[test]
    fn on_target_measurement_is_at_target(
        target in -1_000.0f64..1_000.0,
        kp in 0.0f64..1.0,
        ki in 0.0f64..0.1,
        kd in 0.0f64..0.01,
        tolerance in 0.0f64..10.0,
    ) {
        let mut c = controller(kp, ki, kd, tolerance);
        c.set_target(target).unwrap();
        c.compute(target);
        prop_assert!(c.at_target());
    }

    #[test]
    fn error_beyond_tolerance_is_not_at_target(
        target in -1_000.0f64..1_000.0,
        tolerance in 0.0f64..10.0,
        excess in 0.001f64..500.0,
        below in any::<bool>(),
    ) {
        let mut c = controller(0.02, 0.0, 0.0, tolerance);
        c.set_target(target).unwrap();
        let offset = tolerance + excess;
        let current = if below { target - offset } else { target + offset };
        c.compute(current);
        prop_assert!(!c.at_target());
    }

    #[test]
    fn output_always_finite_and_limited(
        target in -1e6f64..1e6,
        currents in prop::collection::vec(-1e6f64..1e6, 1..50),
        kp in 0.0f64..100.0,
        kd in 0.0f64..10.0,
    ) {
        let mut c = controller(kp, 0.5, kd, 1.0);
        c.set_target(target).unwrap();
        for current in currents {
            let out = c.compute(current);
            prop_assert!(out.is_finite());
            prop_assert!(out.abs() <= c.output_limit());
        }
    }

    #[test]
    fn error_outside_izone_never_grows_output(
        error in 5.001f64..170.0,
        steps in 2usize..400,
    ) {
        let mut c = RotationController::new(&RotationConfig {
            kp: 0.001,
            ki: 0.5,
            kd: 0.0,
            i_zone: 5.0,
            output_limit: 10.0,
            ..RotationConfig::default()
        });
        c.set_target(error).unwrap();
        let first = c.compute(0.0);
        for _ in 1..steps {
            prop_assert_eq!(c.compute(0.0), first);
        }
    }

    #[test]
    fn every_set_appends_exactly_one_entry(values in prop::collection::vec(-1e9f64..1e9, 1..100)) {
        let registry = TelemetryRegistry::in_memory("/shooter");
        let channel = registry.publish("rotate_angle");
        for (i, v) in values.iter().enumerate() {
            channel.set(*v).unwrap();
            prop_assert_eq!(channel.get(), *v);
            prop_assert_eq!(channel.len(), i + 1);
            prop_assert_eq!(channel.last_entry().unwrap().seq, i as u64);
        }
    }
}
