//! Sampling engine: ADC channel lifecycle, timer pacing, tick sampling.
//!
//! ```text
//!  Uninitialized --init()--> Configured --start()--> Running
//!                                ^                      |
//!                                +-- update_sensor_control (disable,
//!                                    reconfigure, re-arm, re-enable)
//!  any driver failure that cannot be rolled back --> Faulted
//! ```

use super::frontend::SensorFrontend;
use super::hal::SampleTimer;
use super::ControlApplied;
use crate::config::{INITIAL_SAMPLE_RATE_MS, SENSORS_COUNT};
use crate::error::{DriverError, Error};
use crate::sensor::registry::SensorRegistry;
use crate::sensor::{SensorBatch, SensorControl, SensorId};
use heapless::Vec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplerState {
    /// Channels and timer untouched.
    Uninitialized,
    /// Channels configured, timer armed but stopped.
    Configured,
    /// Timer running, ticks are sampled.
    Running,
    /// A driver failure left the hardware in an unknown state.
    Faulted,
}

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sensors that got a new sample, in sampling order.
    pub sampled: Vec<SensorId, SENSORS_COUNT>,
    /// Sensors whose buffer now holds a full batch.
    pub ready: Vec<SensorId, SENSORS_COUNT>,
}

pub struct SamplingEngine<F, T> {
    frontend: F,
    timer: T,
    registry: SensorRegistry,
    state: SamplerState,
    period_ms: u32,
}

impl<F, T> SamplingEngine<F, T>
where
    F: SensorFrontend,
    T: SampleTimer,
{
    pub fn new(frontend: F, timer: T, registry: SensorRegistry) -> Self {
        Self {
            frontend,
            timer,
            registry,
            state: SamplerState::Uninitialized,
            period_ms: INITIAL_SAMPLE_RATE_MS,
        }
    }

    /// Configure one ADC channel per sensor and arm the timer with the
    /// initial period, or with the period of a record stored before
    /// `init`. Does not start sampling.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.state != SamplerState::Uninitialized {
            warn!("sampler already initialised ({:?})", self.state);
            return Ok(());
        }

        for sensor in SensorId::ALL {
            let hw = *self.registry.hardware(sensor);
            let ctrl = *self.registry.control(sensor);
            self.frontend.configure(sensor, &hw, &ctrl)?;
        }

        self.timer.init()?;
        self.arm_timer(self.period_ms)?;
        self.state = SamplerState::Configured;
        info!("sampler configured, period {} ms", self.period_ms);
        Ok(())
    }

    /// Let the timer run.
    pub fn start(&mut self) -> Result<(), Error> {
        match self.state {
            SamplerState::Configured => {
                self.timer.enable();
                self.state = SamplerState::Running;
                info!("sampler running");
                Ok(())
            }
            SamplerState::Running => Ok(()),
            SamplerState::Uninitialized => Err(Error::Driver(DriverError::TimerState)),
            SamplerState::Faulted => Err(Error::Faulted),
        }
    }

    /// Sample every enabled sensor once, in sensor order.
    ///
    /// Ticks that arrive while the engine is not running (queued before a
    /// reconfiguration, or after a fault) are ignored.
    pub async fn on_tick(&mut self) -> Result<TickReport, Error> {
        let mut report = TickReport::default();
        if self.state != SamplerState::Running {
            trace!("tick ignored in {:?}", self.state);
            return Ok(report);
        }

        for sensor in SensorId::ALL {
            if !self.registry.control(sensor).enable {
                continue;
            }
            let hw = *self.registry.hardware(sensor);
            match self.frontend.acquire(sensor, &hw).await {
                Ok(value) => {
                    self.registry.add_value(sensor, value);
                    let _ = report.sampled.push(sensor);
                    if self.registry.buffer(sensor).batch_ready() {
                        let _ = report.ready.push(sensor);
                    }
                }
                Err(e) => {
                    error!("sensor {} sample failed: {:?}", sensor.number(), e);
                    self.fault();
                    return Err(Error::Driver(e));
                }
            }
        }

        Ok(report)
    }

    /// Validate and apply a new control record for `sensor`.
    ///
    /// Sequence: stop timer, uninit the sensor's channel, store the record,
    /// configure the channel with the new gain, recreate the timer with the
    /// record's period, restart if it was running. A rejected record leaves
    /// everything untouched. If a driver call fails the previous record and
    /// period are restored; if that fails too the engine is `Faulted`.
    pub fn update_sensor_control(
        &mut self,
        sensor: SensorId,
        control: SensorControl,
    ) -> Result<(), Error> {
        control.validate()?;

        match self.state {
            SamplerState::Faulted => return Err(Error::Faulted),
            SamplerState::Uninitialized => {
                // Picked up by `init`.
                self.registry.set_control(sensor, control)?;
                self.period_ms = u32::from(control.sample_period_ms);
                return Ok(());
            }
            SamplerState::Configured | SamplerState::Running => {}
        }

        let resume = self.state == SamplerState::Running;
        self.timer.disable();
        self.state = SamplerState::Configured;

        let previous = *self.registry.control(sensor);
        let previous_period = self.period_ms;

        if let Err(e) = self.apply(sensor, control, u32::from(control.sample_period_ms)) {
            warn!(
                "sensor {} reconfiguration failed: {:?}, rolling back",
                sensor.number(),
                e
            );
            if let Err(rollback) = self.apply(sensor, previous, previous_period) {
                error!("rollback failed: {:?}", rollback);
                self.fault();
                return Err(Error::Faulted);
            }
            self.resume(resume);
            return Err(e);
        }

        self.resume(resume);
        info!(
            "sensor {} control: gain {:?} enable {} period {} ms",
            sensor.number(),
            control.gain,
            control.enable,
            control.sample_period_ms
        );
        Ok(())
    }

    fn apply(&mut self, sensor: SensorId, control: SensorControl, period_ms: u32) -> Result<(), Error> {
        let hw = *self.registry.hardware(sensor);
        self.frontend.release(sensor, &hw)?;
        self.registry.set_control(sensor, control)?;
        self.frontend.configure(sensor, &hw, &control)?;
        self.restart_timer(period_ms)?;
        self.period_ms = period_ms;
        Ok(())
    }

    /// Tear the timer down and bring it back armed (but stopped) at
    /// `period_ms`.
    fn restart_timer(&mut self, period_ms: u32) -> Result<(), DriverError> {
        self.timer.uninit();
        self.timer.init()?;
        self.arm_timer(period_ms)
    }

    fn arm_timer(&mut self, period_ms: u32) -> Result<(), DriverError> {
        let ticks = self.timer.ms_to_ticks(period_ms);
        self.timer.arm(ticks)
    }

    fn resume(&mut self, running: bool) {
        if running {
            self.timer.enable();
            self.state = SamplerState::Running;
        }
    }

    fn fault(&mut self) {
        self.timer.disable();
        self.state = SamplerState::Faulted;
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Period the timer is currently armed with.
    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Control record `sensor` currently runs with.
    pub fn applied(&self, sensor: SensorId) -> ControlApplied {
        ControlApplied {
            sensor,
            control: *self.registry.control(sensor),
        }
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    /// Take the pending notification batch of `sensor`.
    pub fn take_batch(&mut self, sensor: SensorId) -> Option<SensorBatch> {
        self.registry.take_batch(sensor)
    }
}
