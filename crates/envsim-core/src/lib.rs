//! Control core between `envsim-api` and the `envsim` CLI.
//!
//! This crate owns the device model and the closed-loop temperature
//! controller for the environment simulation:
//!
//! - **[`Gateway`]**: The port every remote read and write goes through.
//!   [`envsim_api::GatewayClient`] implements it; tests substitute an
//!   in-memory double.
//!
//! - **Device state machines** ([`device`]): [`FanState`] (binary) and
//!   [`HeaterLevel`] (six cyclic levels), each with a pure transition
//!   function yielding the next state and the [`Effect`] to request.
//!
//! - **[`DeviceRegistry`]**: Owns every fan and heater, resynchronizes
//!   with the simulation's authoritative state, and offers per-device and
//!   bulk operations.
//!
//! - **[`TemperatureController`]**: Runs a [`ControlPlan`] of ramp and
//!   hold phases against the averaged sensor temperature, publishing
//!   [`ControlEvent`]s and stopping at the next tick once cancelled.

pub mod config;
pub mod control;
pub mod device;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod sensors;

#[cfg(test)]
pub(crate) mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DeviceCounts, EnvironmentConfig, GatewayConfig, TlsVerification};
pub use control::{
    Action, ControlEvent, ControlOutcome, ControlPlan, Phase, PhaseResult, TemperatureController,
};
pub use device::{Device, DeviceKind, DeviceState, Effect, FanState, HeaterLevel};
pub use error::CoreError;
pub use gateway::{Gateway, connect};
pub use registry::{DeviceRef, DeviceRegistry, DeviceSummary, SyncFailure, SyncReport};
pub use sensors::{SensorReading, read_all_sensors, sample_average};
