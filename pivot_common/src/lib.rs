//! Pivot Common Library
//!
//! Shared constants, configuration loading and fault flags for the pivot
//! workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Default gains, limits and paths
//! - [`config`] - Configuration loading traits and types
//! - [`rotation`] - `pivot.toml` section structs
//! - [`fault`] - Axis fault bitflags
//! - [`telemetry`] - Telemetry channel names
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod fault;
pub mod prelude;
pub mod rotation;
pub mod telemetry;
