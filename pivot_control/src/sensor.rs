//! Absolute angle sensing with dynamic reference offset.
//!
//! Converts fractional-turn readings to degrees and, when a reference
//! supplier is attached, expresses the angle relative to it:
//!
//! ```text
//! angle_no_offset = raw × 360
//! angle           = raw × 360 − reference
//! ```
//!
//! No wrap-around normalization is applied. Readings near the encoder seam
//! or references larger than the measured angle yield values outside
//! `[0, 360)` and callers must tolerate them.

use tracing::{debug, warn};

use pivot_common::consts::DEGREES_PER_TURN;

use crate::error::SensorFault;
use crate::hal::{AbsoluteEncoder, ReferenceAngle};

/// Raw turns → degrees.
#[inline]
pub fn turns_to_degrees(raw: f64) -> f64 {
    raw * DEGREES_PER_TURN
}

/// Raw turns → degrees relative to `reference` [deg].
#[inline]
pub fn offset_angle(raw: f64, reference: f64) -> f64 {
    turns_to_degrees(raw) - reference
}

/// One coherent sensor read: raw, no-offset and offset angle from the same
/// raw value.
///
/// On fault the numeric fields hold the last valid sample (zeros before the
/// first valid read) and `fault` carries the cause.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorSample {
    /// Raw reading [turns].
    pub raw: f64,
    /// `raw × 360` [deg].
    pub angle_no_offset: f64,
    /// `raw × 360 − reference` [deg].
    pub angle: f64,
    /// Reference used for `angle` [deg].
    pub reference: f64,
    /// Fault that forced the held values, if any.
    pub fault: Option<SensorFault>,
}

impl SensorSample {
    /// True if the sample came from a fresh reading.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.fault.is_none()
    }
}

/// Absolute angle sensor with optional reference-angle offset.
pub struct AngleSensor {
    encoder: Box<dyn AbsoluteEncoder>,
    reference: Option<Box<dyn ReferenceAngle>>,
    last_valid: SensorSample,
    faulted: bool,
}

impl AngleSensor {
    /// Sensor with no reference (offset angle equals no-offset angle).
    pub fn new(encoder: Box<dyn AbsoluteEncoder>) -> Self {
        Self {
            encoder,
            reference: None,
            last_valid: SensorSample::default(),
            faulted: false,
        }
    }

    /// Attach a dynamic reference-angle supplier.
    pub fn with_reference(mut self, reference: Box<dyn ReferenceAngle>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Latest raw reading [turns].
    ///
    /// # Errors
    /// `SensorFault` when the source is unreadable or returns a non-finite value.
    pub fn read_raw(&self) -> Result<f64, SensorFault> {
        let raw = self.encoder.read_turns()?;
        if !raw.is_finite() {
            return Err(SensorFault::NonFinite { value: raw });
        }
        Ok(raw)
    }

    /// `read_raw() × 360` [deg].
    pub fn read_angle_without_offset(&self) -> Result<f64, SensorFault> {
        self.read_raw().map(turns_to_degrees)
    }

    /// `read_angle_without_offset() − reference_angle` [deg].
    pub fn read_angle(&self, reference_angle: f64) -> Result<f64, SensorFault> {
        self.read_raw().map(|raw| offset_angle(raw, reference_angle))
    }

    /// Current value of the attached reference, `0.0` without one.
    pub fn reference_degrees(&self) -> f64 {
        self.reference.as_ref().map_or(0.0, |r| r.degrees())
    }

    /// Read encoder and reference once and build a coherent sample.
    ///
    /// Holds the last valid values on fault. Fault onset and recovery are
    /// logged once per transition.
    pub fn sample(&mut self) -> SensorSample {
        match self.fresh_sample() {
            Ok(sample) => {
                if self.faulted {
                    debug!(angle = sample.angle, "absolute encoder recovered");
                    self.faulted = false;
                }
                self.last_valid = sample;
                sample
            }
            Err(fault) => {
                if !self.faulted {
                    warn!(
                        %fault,
                        held_angle = self.last_valid.angle,
                        "absolute encoder fault, holding last valid angle"
                    );
                    self.faulted = true;
                }
                SensorSample {
                    fault: Some(fault),
                    ..self.last_valid
                }
            }
        }
    }

    /// Last sample built from a fresh reading.
    pub fn last_valid(&self) -> SensorSample {
        self.last_valid
    }

    fn fresh_sample(&self) -> Result<SensorSample, SensorFault> {
        let raw = self.read_raw()?;
        let reference = self.reference_degrees();
        if !reference.is_finite() {
            return Err(SensorFault::NonFiniteReference { value: reference });
        }
        Ok(SensorSample {
            raw,
            angle_no_offset: turns_to_degrees(raw),
            angle: offset_angle(raw, reference),
            reference,
            fault: None,
        })
    }
}

impl std::fmt::Debug for AngleSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AngleSensor")
            .field("has_reference", &self.reference.is_some())
            .field("last_valid", &self.last_valid)
            .field("faulted", &self.faulted)
            .finish()
    }
}
