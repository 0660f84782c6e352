//! Sensor front-ends: how one reading is obtained for one sensor.
//!
//! - [`AdcFrontend`] power-gates the sensor around a SAADC conversion.
//! - [`MockFrontend`] fabricates values (RNG / counter) with no hardware.
//!
//! The binary picks one at build time (`mock-adc` feature).

use super::hal::{AdcDriver, ChannelSetup, Reference};
use crate::config::{SENSORS_COUNT, SENSOR_SETTLE_MS};
use crate::error::DriverError;
use crate::sensor::{SensorControl, SensorHardware, SensorId};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use rand_core::RngCore;

#[allow(async_fn_in_trait)]
pub trait SensorFrontend {
    /// Set up the acquisition path of `sensor` for `ctrl`.
    fn configure(
        &mut self,
        sensor: SensorId,
        hw: &SensorHardware,
        ctrl: &SensorControl,
    ) -> Result<(), DriverError>;

    /// Tear down the acquisition path of `sensor`.
    fn release(&mut self, sensor: SensorId, hw: &SensorHardware) -> Result<(), DriverError>;

    /// Take one reading.
    async fn acquire(&mut self, sensor: SensorId, hw: &SensorHardware) -> Result<i16, DriverError>;
}

/// Real sensors: SAADC conversion with the sensor powered only while it
/// is being measured.
pub struct AdcFrontend<A, P, D> {
    adc: A,
    power_pins: [P; SENSORS_COUNT],
    delay: D,
}

impl<A, P, D> AdcFrontend<A, P, D>
where
    A: AdcDriver,
    P: OutputPin,
    D: DelayNs,
{
    /// `power_pins` is indexed by `SensorId::index()`. All sensors start
    /// unpowered.
    pub fn new(adc: A, mut power_pins: [P; SENSORS_COUNT], delay: D) -> Result<Self, DriverError> {
        for pin in power_pins.iter_mut() {
            pin.set_low().map_err(|_| DriverError::Gpio)?;
        }
        Ok(Self {
            adc,
            power_pins,
            delay,
        })
    }
}

impl<A, P, D> SensorFrontend for AdcFrontend<A, P, D>
where
    A: AdcDriver,
    P: OutputPin,
    D: DelayNs,
{
    fn configure(
        &mut self,
        _sensor: SensorId,
        hw: &SensorHardware,
        ctrl: &SensorControl,
    ) -> Result<(), DriverError> {
        let setup = ChannelSetup {
            analog_input: hw.analog_input,
            gain: ctrl.gain,
            reference: Reference::Internal,
        };
        self.adc.channel_init(hw.adc_channel, setup)
    }

    fn release(&mut self, _sensor: SensorId, hw: &SensorHardware) -> Result<(), DriverError> {
        self.adc.channel_uninit(hw.adc_channel)
    }

    async fn acquire(&mut self, sensor: SensorId, hw: &SensorHardware) -> Result<i16, DriverError> {
        let pin = &mut self.power_pins[sensor.index()];
        pin.set_high().map_err(|_| DriverError::Gpio)?;
        self.delay.delay_ms(SENSOR_SETTLE_MS).await;

        let reading = self.adc.sample_convert(hw.adc_channel).await;

        // Cut the bias current even if the conversion failed.
        pin.set_low().map_err(|_| DriverError::Gpio)?;
        trace!("sensor {} raw {:?}", sensor.number(), reading);
        reading
    }
}

/// Synthetic readings for boards without sensors attached.
///
/// Sensor 3 counts up by one per sample (wrapping); the others get one
/// random byte each.
pub struct MockFrontend<R> {
    rng: R,
    counter: i16,
}

impl<R: RngCore> MockFrontend<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, counter: 0 }
    }
}

impl<R: RngCore> SensorFrontend for MockFrontend<R> {
    fn configure(
        &mut self,
        _sensor: SensorId,
        _hw: &SensorHardware,
        _ctrl: &SensorControl,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    fn release(&mut self, _sensor: SensorId, _hw: &SensorHardware) -> Result<(), DriverError> {
        Ok(())
    }

    async fn acquire(&mut self, sensor: SensorId, _hw: &SensorHardware) -> Result<i16, DriverError> {
        if sensor == SensorId::Sensor3 {
            let value = self.counter;
            self.counter = self.counter.wrapping_add(1);
            return Ok(value);
        }
        let mut byte = [0u8; 1];
        self.rng
            .try_fill_bytes(&mut byte)
            .map_err(|_| DriverError::Rng)?;
        Ok(byte[0] as i16)
    }
}
