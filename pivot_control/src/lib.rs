//! # Pivot Control Library
//!
//! Single-axis rotational position control for a shooter pivot: an absolute
//! encoder read relative to a dynamic reference angle, a PID rotation
//! controller with integral zone, and named telemetry channels that are both
//! live values and durable append-only logs.
//!
//! ## Layers
//!
//! 1. **hal**: encoder / reference / actuator traits plus a simulated plant
//! 2. **sensor**: fractional turns → degrees, reference offset, fault hold
//! 3. **control**: PID step and rotation controller
//! 4. **telemetry**: registry, channels and log sinks
//! 5. **subsystem**: composition root driven once per cycle by `step()`
//! 6. **cycle**: drift-free fixed-cadence host loop
//!
//! The core is single-threaded and never blocks; telemetry observers may
//! read channels concurrently from other threads.

pub mod control;
pub mod cycle;
pub mod error;
pub mod hal;
pub mod sensor;
pub mod subsystem;
pub mod telemetry;
