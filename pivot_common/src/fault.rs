//! Axis fault bitflags.
//!
//! Faults never propagate to the host as hard failures. They are collected
//! in one `AxisFault` word per axis and published on the telemetry
//! namespace.
//!
//! Two classes exist:
//! - **Live** flags are recomputed every step (sensor, output overflow).
//! - **Latched** flags stay set until cleared (invalid target clears on the
//!   next accepted command, telemetry write failure on `clear`).

use bitflags::bitflags;

bitflags! {
    /// Per-axis fault word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AxisFault: u8 {
        /// Position source unreadable, stale or non-finite.
        const SENSOR_FAULT            = 0x01;
        /// Non-finite target rejected.
        const INVALID_TARGET          = 0x02;
        /// Controller output non-finite or beyond the output limit.
        const OUTPUT_OVERFLOW         = 0x04;
        /// Durable telemetry append failed.
        const TELEMETRY_WRITE_FAILURE = 0x08;
    }
}

impl AxisFault {
    /// Flags recomputed from scratch every step.
    pub const LIVE_MASK: Self =
        Self::from_bits_truncate(Self::SENSOR_FAULT.bits() | Self::OUTPUT_OVERFLOW.bits());

    /// Flags that persist until explicitly cleared.
    pub const LATCHED_MASK: Self = Self::from_bits_truncate(
        Self::INVALID_TARGET.bits() | Self::TELEMETRY_WRITE_FAILURE.bits(),
    );

    /// Numeric form for a telemetry channel.
    #[inline]
    pub fn as_telemetry(&self) -> f64 {
        f64::from(self.bits())
    }

    /// Decode a value previously produced by [`AxisFault::as_telemetry`].
    ///
    /// Unknown bits are dropped; non-finite or negative input yields empty.
    pub fn from_telemetry(value: f64) -> Self {
        if !value.is_finite() || value < 0.0 || value > f64::from(u8::MAX) {
            return Self::empty();
        }
        Self::from_bits_truncate(value as u8)
    }
}

impl Default for AxisFault {
    fn default() -> Self {
        Self::empty()
    }
}
