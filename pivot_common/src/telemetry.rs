//! Telemetry channel names of the shooter pivot.
//!
//! Keys are formed as `<namespace>/<name>`, e.g. `/shooter/encoder_angle`.

/// Flywheel velocity command.
pub const SHOOT_VELOCITY: &str = "shoot_velocity";
/// Flywheel open-loop duty command.
pub const SHOOT_VOLTAGE: &str = "shoot_voltage";
/// Rotation motor command (controller output).
pub const ROTATE_ANGLE: &str = "rotate_angle";
/// Rotation setpoint [deg].
pub const ROTATE_TARGET: &str = "rotate_target";
/// Raw absolute encoder reading [turns].
pub const ENCODER_VALUE: &str = "encoder_value";
/// Encoder angle before the reference offset [deg].
pub const ENCODER_ANGLE_NO_OFFSET: &str = "encoder_angle_no_offset";
/// Encoder angle relative to the reference [deg].
pub const ENCODER_ANGLE: &str = "encoder_angle";
/// Fault word, see [`crate::fault::AxisFault`].
pub const FAULTS: &str = "faults";

/// Every channel owned by the pivot subsystem, in publish order.
pub const PIVOT_CHANNELS: [&str; 8] = [
    SHOOT_VELOCITY,
    SHOOT_VOLTAGE,
    ROTATE_ANGLE,
    ROTATE_TARGET,
    ENCODER_VALUE,
    ENCODER_ANGLE_NO_OFFSET,
    ENCODER_ANGLE,
    FAULTS,
];

/// Join a namespace and a channel name into a key.
///
/// A trailing slash on the namespace is tolerated.
pub fn channel_key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace.trim_end_matches('/'), name)
}
