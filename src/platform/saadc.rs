//! SAADC driver.
//!
//! The embassy `Saadc` takes its channel list at construction, so the
//! driver keeps the per-channel setup itself and brings up a one-channel
//! `Saadc` for every conversion. That also keeps the converter powered
//! down between samples.

use defmt::trace;
use embassy_nrf::peripherals::SAADC;
use embassy_nrf::saadc::{self, AnyInput, ChannelConfig, Resolution, Saadc};
use embassy_nrf::bind_interrupts;

use smart_mask::config::{ADC_CHANNEL_COUNT, SENSORS_COUNT};
use smart_mask::error::DriverError;
use smart_mask::sampling::hal::{AdcDriver, ChannelSetup, Reference};
use smart_mask::sensor::Gain;

bind_interrupts!(pub struct Irqs {
    SAADC => saadc::InterruptHandler;
});

pub struct NrfSaadc {
    saadc: SAADC,
    /// Analog inputs, indexed by AIN number.
    inputs: [AnyInput; SENSORS_COUNT],
    channels: [Option<ChannelSetup>; ADC_CHANNEL_COUNT],
}

impl NrfSaadc {
    pub fn new(saadc: SAADC, inputs: [AnyInput; SENSORS_COUNT]) -> Self {
        Self {
            saadc,
            inputs,
            channels: [None; ADC_CHANNEL_COUNT],
        }
    }
}

fn saadc_gain(gain: Gain) -> saadc::Gain {
    match gain {
        Gain::Gain1_6 => saadc::Gain::GAIN1_6,
        Gain::Gain1_5 => saadc::Gain::GAIN1_5,
        Gain::Gain1_4 => saadc::Gain::GAIN1_4,
        Gain::Gain1_3 => saadc::Gain::GAIN1_3,
        Gain::Gain1_2 => saadc::Gain::GAIN1_2,
        Gain::Gain1 => saadc::Gain::GAIN1,
        Gain::Gain2 => saadc::Gain::GAIN2,
        Gain::Gain4 => saadc::Gain::GAIN4,
    }
}

fn saadc_reference(reference: Reference) -> saadc::Reference {
    match reference {
        Reference::Internal => saadc::Reference::INTERNAL,
    }
}

impl AdcDriver for NrfSaadc {
    fn channel_init(&mut self, channel: u8, setup: ChannelSetup) -> Result<(), DriverError> {
        if usize::from(setup.analog_input) >= self.inputs.len() {
            return Err(DriverError::InvalidChannel(channel));
        }
        let slot = self
            .channels
            .get_mut(usize::from(channel))
            .ok_or(DriverError::InvalidChannel(channel))?;
        if slot.is_some() {
            return Err(DriverError::ChannelBusy(channel));
        }
        *slot = Some(setup);
        Ok(())
    }

    fn channel_uninit(&mut self, channel: u8) -> Result<(), DriverError> {
        let slot = self
            .channels
            .get_mut(usize::from(channel))
            .ok_or(DriverError::InvalidChannel(channel))?;
        *slot = None;
        Ok(())
    }

    async fn sample_convert(&mut self, channel: u8) -> Result<i16, DriverError> {
        let setup = self
            .channels
            .get(usize::from(channel))
            .copied()
            .flatten()
            .ok_or(DriverError::ChannelNotConfigured(channel))?;
        let input = &mut self.inputs[usize::from(setup.analog_input)];

        let mut channel_config = ChannelConfig::single_ended(&mut *input);
        channel_config.gain = saadc_gain(setup.gain);
        channel_config.reference = saadc_reference(setup.reference);

        let mut config = saadc::Config::default();
        config.resolution = Resolution::_12BIT;

        let mut adc = Saadc::new(&mut self.saadc, Irqs, config, [channel_config]);
        let mut buf = [0i16; 1];
        adc.sample(&mut buf).await;
        trace!("saadc ch{} = {}", channel, buf[0]);
        Ok(buf[0])
    }
}
