//! Host-side fakes for the hardware and BLE seams.
//!
//! Every fake shares one [`Rig`], which records an ordered event log and
//! holds failure knobs, so tests can assert on the exact driver sequence.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use heapless::Vec as HVec;

use crate::ble::{CharHandles, CharSpec, GattRegistry, GattStack, Uuid128, MAX_CHARACTERISTICS};
use crate::config::ADC_CHANNEL_COUNT;
use crate::error::{DriverError, GattError};
use crate::sampling::hal::{AdcDriver, ChannelSetup, SampleTimer};
use crate::sampling::{AdcFrontend, SamplingEngine};
use crate::sensor::registry::SensorRegistry;
use crate::sensor::Gain;

/// Fake timer resolution: 1 MHz, like TIMERn with prescaler 4.
pub const TICKS_PER_MS: u64 = 1_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HwEvent {
    ChannelInit(u8, Gain),
    ChannelUninit(u8),
    Convert(u8),
    PinHigh(usize),
    PinLow(usize),
    Settle(u32),
    TimerInit,
    TimerUninit,
    TimerArm(u64),
    TimerEnable,
    TimerDisable,
}

#[derive(Default)]
struct RigState {
    events: Vec<HwEvent>,
    channels: [Option<ChannelSetup>; ADC_CHANNEL_COUNT],
    fail_channel_inits: u32,
    fail_conversions: u32,
    next_sample: i16,
    timer_initialized: bool,
    timer_enabled: bool,
    compare_ticks: Option<u64>,
}

#[derive(Clone, Default)]
pub struct Rig(Rc<RefCell<RigState>>);

pub type FakeEngine = SamplingEngine<AdcFrontend<FakeAdc, FakePin, FakeDelay>, FakeTimer>;

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine wired to this rig with the default registry, not yet
    /// initialised.
    pub fn engine(&self) -> FakeEngine {
        self.engine_with(SensorRegistry::with_defaults())
    }

    pub fn engine_with(&self, registry: SensorRegistry) -> FakeEngine {
        let pins = [0, 1, 2, 3].map(|index| FakePin {
            index,
            rig: self.clone(),
        });
        let frontend = AdcFrontend::new(
            FakeAdc { rig: self.clone() },
            pins,
            FakeDelay { rig: self.clone() },
        )
        .unwrap();
        SamplingEngine::new(frontend, FakeTimer { rig: self.clone() }, registry)
    }

    /// Engine already initialised and running, with the log cleared.
    pub fn running_engine(&self) -> FakeEngine {
        let mut engine = self.engine();
        engine.init().unwrap();
        engine.start().unwrap();
        self.clear_events();
        engine
    }

    pub fn events(&self) -> Vec<HwEvent> {
        self.0.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.0.borrow_mut().events.clear();
    }

    /// The next `n` `channel_init` calls fail.
    pub fn fail_channel_inits(&self, n: u32) {
        self.0.borrow_mut().fail_channel_inits = n;
    }

    /// The next `n` conversions fail.
    pub fn fail_conversions(&self, n: u32) {
        self.0.borrow_mut().fail_conversions = n;
    }

    pub fn channel(&self, channel: u8) -> Option<ChannelSetup> {
        self.0.borrow().channels[channel as usize]
    }

    pub fn timer_enabled(&self) -> bool {
        self.0.borrow().timer_enabled
    }

    /// Period the timer compare is loaded with, in ms.
    pub fn timer_period_ms(&self) -> Option<u64> {
        self.0.borrow().compare_ticks.map(|t| t / TICKS_PER_MS)
    }

    fn record(&self, event: HwEvent) {
        self.0.borrow_mut().events.push(event);
    }
}

pub struct FakeAdc {
    rig: Rig,
}

impl AdcDriver for FakeAdc {
    fn channel_init(&mut self, channel: u8, setup: ChannelSetup) -> Result<(), DriverError> {
        let mut state = self.rig.0.borrow_mut();
        if state.fail_channel_inits > 0 {
            state.fail_channel_inits -= 1;
            return Err(DriverError::ChannelBusy(channel));
        }
        let slot = state
            .channels
            .get_mut(channel as usize)
            .ok_or(DriverError::InvalidChannel(channel))?;
        if slot.is_some() {
            return Err(DriverError::ChannelBusy(channel));
        }
        *slot = Some(setup);
        state.events.push(HwEvent::ChannelInit(channel, setup.gain));
        Ok(())
    }

    fn channel_uninit(&mut self, channel: u8) -> Result<(), DriverError> {
        let mut state = self.rig.0.borrow_mut();
        let slot = state
            .channels
            .get_mut(channel as usize)
            .ok_or(DriverError::InvalidChannel(channel))?;
        *slot = None;
        state.events.push(HwEvent::ChannelUninit(channel));
        Ok(())
    }

    async fn sample_convert(&mut self, channel: u8) -> Result<i16, DriverError> {
        let mut state = self.rig.0.borrow_mut();
        if state.fail_conversions > 0 {
            state.fail_conversions -= 1;
            return Err(DriverError::ChannelNotConfigured(channel));
        }
        if state.channels[channel as usize].is_none() {
            return Err(DriverError::ChannelNotConfigured(channel));
        }
        state.events.push(HwEvent::Convert(channel));
        let value = state.next_sample;
        state.next_sample += 1;
        Ok(value)
    }
}

pub struct FakePin {
    index: usize,
    rig: Rig,
}

impl embedded_hal::digital::ErrorType for FakePin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.rig.record(HwEvent::PinLow(self.index));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.rig.record(HwEvent::PinHigh(self.index));
        Ok(())
    }
}

pub struct FakeDelay {
    rig: Rig,
}

impl embedded_hal_async::delay::DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.rig.record(HwEvent::Settle(ns / 1_000_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.rig.record(HwEvent::Settle(ms));
    }
}

pub struct FakeTimer {
    rig: Rig,
}

impl SampleTimer for FakeTimer {
    fn init(&mut self) -> Result<(), DriverError> {
        let mut state = self.rig.0.borrow_mut();
        if state.timer_initialized {
            return Err(DriverError::TimerState);
        }
        state.timer_initialized = true;
        state.events.push(HwEvent::TimerInit);
        Ok(())
    }

    fn uninit(&mut self) {
        let mut state = self.rig.0.borrow_mut();
        state.timer_initialized = false;
        state.timer_enabled = false;
        state.compare_ticks = None;
        state.events.push(HwEvent::TimerUninit);
    }

    fn ms_to_ticks(&self, ms: u32) -> u64 {
        u64::from(ms) * TICKS_PER_MS
    }

    fn arm(&mut self, ticks: u64) -> Result<(), DriverError> {
        let mut state = self.rig.0.borrow_mut();
        if !state.timer_initialized {
            return Err(DriverError::TimerState);
        }
        if ticks == 0 {
            return Err(DriverError::InvalidPeriod);
        }
        state.compare_ticks = Some(ticks);
        state.events.push(HwEvent::TimerArm(ticks));
        Ok(())
    }

    fn enable(&mut self) {
        let mut state = self.rig.0.borrow_mut();
        state.timer_enabled = true;
        state.events.push(HwEvent::TimerEnable);
    }

    fn disable(&mut self) {
        let mut state = self.rig.0.borrow_mut();
        state.timer_enabled = false;
        state.events.push(HwEvent::TimerDisable);
    }
}

/// Fake SoftDevice: hands out sequential attribute handles and records
/// values and notifications.
#[derive(Default)]
pub struct FakeGatt {
    next_handle: u16,
    pub uuids: Vec<Uuid128>,
    pub values: Vec<(u16, Vec<u8>)>,
    pub notified: Vec<(u16, u16, Vec<u8>)>,
    pub reject_registration: bool,
    pub notify_error: Option<GattError>,
}

impl FakeGatt {
    pub fn new() -> Self {
        Self {
            next_handle: 0x0010,
            ..Default::default()
        }
    }

    pub fn alloc_handle(&mut self) -> u16 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Last value written to `handle`.
    pub fn value(&self, handle: u16) -> Option<&[u8]> {
        self.values
            .iter()
            .rev()
            .find(|(h, _)| *h == handle)
            .map(|(_, v)| v.as_slice())
    }
}

impl GattRegistry for FakeGatt {
    fn register_service(
        &mut self,
        uuid: &Uuid128,
        characteristics: &[CharSpec<'_>],
    ) -> Result<(u16, HVec<CharHandles, MAX_CHARACTERISTICS>), GattError> {
        if self.reject_registration {
            return Err(GattError::NoMemory);
        }
        let service = self.alloc_handle();
        self.uuids.push(*uuid);

        let mut handles = HVec::new();
        for spec in characteristics {
            self.uuids.push(spec.uuid);
            // Declaration attribute precedes the value.
            self.alloc_handle();
            let value_handle = self.alloc_handle();
            let cccd_handle = spec.props.notify.then(|| self.alloc_handle());
            self.values.push((value_handle, spec.initial.to_vec()));
            handles
                .push(CharHandles {
                    value_handle,
                    cccd_handle,
                })
                .map_err(|_| GattError::NoMemory)?;
        }
        Ok((service, handles))
    }
}

impl GattStack for FakeGatt {
    type Conn = u16;

    fn set_value(&mut self, handle: u16, data: &[u8]) -> Result<(), GattError> {
        self.values.push((handle, data.to_vec()));
        Ok(())
    }

    fn notify(&mut self, conn: &u16, handle: u16, data: &[u8]) -> Result<(), GattError> {
        if let Some(e) = self.notify_error {
            return Err(e);
        }
        self.notified.push((*conn, handle, data.to_vec()));
        Ok(())
    }
}
