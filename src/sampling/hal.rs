//! Hardware seams of the sampling engine.
//!
//! The engine only talks to the SAADC and the sampling timer through these
//! traits. `platform::saadc` / `platform::timer` bind them to embassy-nrf on
//! target; tests bind them to fakes.

use crate::error::DriverError;
use crate::sensor::Gain;

/// SAADC reference selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    /// Internal 0.6 V reference.
    Internal,
}

/// Single-ended channel configuration for one sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelSetup {
    pub analog_input: u8,
    pub gain: Gain,
    pub reference: Reference,
}

/// Channel-level SAADC access.
#[allow(async_fn_in_trait)]
pub trait AdcDriver {
    /// Bind `channel` to an input with the given gain/reference.
    fn channel_init(&mut self, channel: u8, setup: ChannelSetup) -> Result<(), DriverError>;

    /// Release a channel so it can be configured again.
    fn channel_uninit(&mut self, channel: u8) -> Result<(), DriverError>;

    /// Run one conversion on a configured channel.
    async fn sample_convert(&mut self, channel: u8) -> Result<i16, DriverError>;
}

/// Periodic compare timer that paces the sampler.
///
/// Mirrors a TIMER peripheral in compare-and-clear mode: `init` claims it,
/// `arm` loads the compare value, `enable`/`disable` start and stop
/// counting, `uninit` releases it.
pub trait SampleTimer {
    fn init(&mut self) -> Result<(), DriverError>;

    fn uninit(&mut self);

    /// Convert milliseconds into timer ticks.
    fn ms_to_ticks(&self, ms: u32) -> u64;

    /// Load the compare value; each match raises one sample request.
    fn arm(&mut self, ticks: u64) -> Result<(), DriverError>;

    fn enable(&mut self);

    fn disable(&mut self);
}
