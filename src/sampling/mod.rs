//! Periodic sensor sampling.
//!
//! The timer only raises [`SampleNow`] requests; the sampler task drains
//! them and runs [`SamplingEngine::on_tick`], which does the (slow) power
//! settle + conversion outside interrupt context. Control updates reach the
//! same task as [`ControlUpdate`]s, so sampling and reconfiguration never
//! interleave. Every handled update is answered with a [`ControlApplied`].

pub mod engine;
pub mod frontend;
pub mod hal;

pub use engine::{SamplerState, SamplingEngine, TickReport};
pub use frontend::{AdcFrontend, MockFrontend, SensorFrontend};

use crate::sensor::{SensorControl, SensorId};

/// One timer compare match: sample every enabled sensor once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleNow;

/// A control record written by the BLE peer, waiting to be applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlUpdate {
    pub sensor: SensorId,
    pub control: SensorControl,
}

/// Control record in effect after the sampler handled a [`ControlUpdate`]:
/// the new record, or the previous one after a rollback. The BLE side
/// mirrors it into the control characteristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlApplied {
    pub sensor: SensorId,
    pub control: SensorControl,
}
