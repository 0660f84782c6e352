//! Sensor Measurement Service (SMS).
//!
//! Layout (primary service `0x1600` on the vendor base UUID):
//! ```text
//! Sensor 1: value 0x1601 (read, notify)   control 0x1602 (read, write)
//! Sensor 2: value 0x1603 (read, notify)   control 0x1604 (read, write)
//! Sensor 3: value 0x1605 (read, notify)   control 0x1606 (read, write)
//! Sensor 4: value 0x1607 (read, notify)   control 0x1608 (read, write)
//! ```
//!
//! Value payload: up to `SENSOR_VAL_AMOUNT_NOTIF` samples, `i16`
//! little-endian, oldest first. Control payload: see `sensor::control`.

use super::{
    vendor_uuid, BleEvent, CharHandles, CharProps, CharSpec, GattRegistry, GattStack,
    MAX_CHARACTERISTICS,
};
use crate::config::{
    SENSORS_COUNT, SENSOR_VAL_AMOUNT_NOTIF, SMS_UUID_CTRL_CHARS, SMS_UUID_SERVICE,
    SMS_UUID_VALS_CHARS,
};
use crate::error::{Error, GattError};
use crate::sensor::control::CONTROL_PAYLOAD_SIZE;
use crate::sensor::{SensorControl, SensorId};
use heapless::Vec;

/// Largest value characteristic payload (fits a default 23-byte ATT MTU).
pub const VALUE_PAYLOAD_MAX: usize = SENSOR_VAL_AMOUNT_NOTIF * 2;

/// Callback run for every decoded control characteristic write. An error
/// rejects the write.
pub type ControlWriteFn = fn(SensorId, SensorControl) -> Result<(), Error>;

/// Handles of one sensor's characteristic pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorHandles {
    pub value: CharHandles,
    pub control: CharHandles,
}

/// Everything the stack handed back at registration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceHandles {
    pub service: u16,
    pub sensors: [SensorHandles; SENSORS_COUNT],
}

/// Result of a best-effort notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotifyOutcome {
    /// Handed to the stack for transmission.
    Sent,
    /// No subscriber or the stack could not take it; value still updated.
    Dropped,
}

/// Serialise samples for the value characteristic.
/// Returns the number of bytes written; samples that don't fit are cut.
pub fn encode_samples(samples: &[i16], buf: &mut [u8]) -> usize {
    let mut written = 0;
    for (sample, chunk) in samples.iter().zip(buf.chunks_exact_mut(2)) {
        chunk.copy_from_slice(&sample.to_le_bytes());
        written += 2;
    }
    written
}

/// Add the service to the attribute table.
///
/// Kept apart from [`SensorService::new`] so the table can be built while
/// the stack is still exclusively borrowed.
pub fn register<R: GattRegistry>(
    registry: &mut R,
    initial_controls: &[SensorControl; SENSORS_COUNT],
) -> Result<ServiceHandles, Error> {
    let control_bytes = initial_controls.map(|c| c.to_bytes());

    let mut specs: Vec<CharSpec<'_>, MAX_CHARACTERISTICS> = Vec::new();
    for sensor in SensorId::ALL {
        let i = sensor.index();
        let value = CharSpec {
            uuid: vendor_uuid(SMS_UUID_VALS_CHARS[i]),
            props: CharProps::READ_NOTIFY,
            initial: &[],
            max_len: VALUE_PAYLOAD_MAX,
        };
        let control = CharSpec {
            uuid: vendor_uuid(SMS_UUID_CTRL_CHARS[i]),
            props: CharProps::READ_WRITE,
            initial: &control_bytes[i],
            max_len: CONTROL_PAYLOAD_SIZE,
        };
        // Capacity is exactly two per sensor.
        let _ = specs.push(value);
        let _ = specs.push(control);
    }

    let (service, chars) = registry
        .register_service(&vendor_uuid(SMS_UUID_SERVICE), &specs)
        .map_err(Error::Registration)?;
    if chars.len() != specs.len() {
        return Err(Error::Registration(GattError::NoMemory));
    }

    let mut handles = ServiceHandles {
        service,
        ..Default::default()
    };
    for (slot, pair) in handles.sensors.iter_mut().zip(chars.chunks_exact(2)) {
        slot.value = pair[0];
        slot.control = pair[1];
    }

    info!("sensor service registered, handle {}", service);
    Ok(handles)
}

pub struct SensorService<S, F> {
    stack: S,
    handles: ServiceHandles,
    on_control_write: F,
    /// Control record in effect per sensor, as reported by the sampler.
    accepted: [SensorControl; SENSORS_COUNT],
    subscribed: [bool; SENSORS_COUNT],
}

impl<S, F> SensorService<S, F>
where
    S: GattStack,
    F: FnMut(SensorId, SensorControl) -> Result<(), Error>,
{
    /// Register the service and its eight characteristics.
    ///
    /// Control characteristics start out holding `initial_controls`.
    pub fn init<R: GattRegistry>(
        registry: &mut R,
        stack: S,
        on_control_write: F,
        initial_controls: [SensorControl; SENSORS_COUNT],
    ) -> Result<Self, Error> {
        let handles = register(registry, &initial_controls)?;
        Ok(Self::new(stack, handles, on_control_write, initial_controls))
    }

    /// Service over an attribute table that is already registered.
    pub fn new(
        stack: S,
        handles: ServiceHandles,
        on_control_write: F,
        initial_controls: [SensorControl; SENSORS_COUNT],
    ) -> Self {
        Self {
            stack,
            handles,
            on_control_write,
            accepted: initial_controls,
            subscribed: [false; SENSORS_COUNT],
        }
    }

    pub fn handles(&self) -> &ServiceHandles {
        &self.handles
    }

    #[cfg(test)]
    pub(crate) fn stack(&self) -> &S {
        &self.stack
    }

    pub fn control(&self, sensor: SensorId) -> &SensorControl {
        &self.accepted[sensor.index()]
    }

    pub fn is_subscribed(&self, sensor: SensorId) -> bool {
        self.subscribed[sensor.index()]
    }

    /// Dispatch one stack event.
    ///
    /// Only a rejected control write returns an error. Control writes are
    /// deferred by the stack, so the caller answers the peer with the
    /// matching [`WriteRejection`](super::WriteRejection) and the attribute
    /// keeps its value.
    pub fn on_ble_event(&mut self, event: BleEvent<'_>) -> Result<(), Error> {
        match event {
            BleEvent::Connected => {
                self.on_connect();
                Ok(())
            }
            BleEvent::Disconnected => {
                self.on_disconnect();
                Ok(())
            }
            BleEvent::Write { handle, data } => self.on_write(handle, data),
            BleEvent::Other => Ok(()),
        }
    }

    fn on_connect(&mut self) {
        debug!("sensor service: connected");
        self.subscribed = [false; SENSORS_COUNT];
    }

    fn on_disconnect(&mut self) {
        debug!("sensor service: disconnected");
        self.subscribed = [false; SENSORS_COUNT];
    }

    fn on_write(&mut self, handle: u16, data: &[u8]) -> Result<(), Error> {
        for sensor in SensorId::ALL {
            let pair = self.handles.sensors[sensor.index()];
            if handle == pair.control.value_handle {
                return self.on_control_write(sensor, data);
            }
            if Some(handle) == pair.value.cccd_handle {
                self.on_cccd_write(sensor, data);
                return Ok(());
            }
        }
        trace!("write to unhandled handle {}", handle);
        Ok(())
    }

    fn on_control_write(&mut self, sensor: SensorId, data: &[u8]) -> Result<(), Error> {
        let result = SensorControl::decode(data)
            .map_err(Error::InvalidControl)
            .and_then(|control| (self.on_control_write)(sensor, control));
        if let Err(e) = result {
            warn!("sensor {} control write rejected: {:?}", sensor.number(), e);
        }
        result
    }

    /// Record the control the sampler actually runs for `sensor` and make
    /// the characteristic show it.
    ///
    /// Called after every handled update, so a record the hardware could
    /// not take is replaced by the rolled-back one.
    pub fn control_applied(
        &mut self,
        sensor: SensorId,
        control: SensorControl,
    ) -> Result<(), Error> {
        self.accepted[sensor.index()] = control;
        let handle = self.handles.sensors[sensor.index()].control.value_handle;
        self.stack
            .set_value(handle, &control.to_bytes())
            .map_err(Error::Gatt)
    }

    fn on_cccd_write(&mut self, sensor: SensorId, data: &[u8]) {
        let enabled = data.first().is_some_and(|b| b & 0x01 != 0);
        self.subscribed[sensor.index()] = enabled;
        info!("sensor {} notifications: {}", sensor.number(), enabled);
    }

    /// Publish `samples` on the sensor's value characteristic.
    ///
    /// The attribute value is always updated so reads see the latest
    /// batch. The notification itself is best-effort: without a
    /// subscriber, or when the stack reports a transient condition, it is
    /// dropped and not retried.
    pub fn notify(
        &mut self,
        conn: &S::Conn,
        sensor: SensorId,
        samples: &[i16],
    ) -> Result<NotifyOutcome, Error> {
        let handle = self.handles.sensors[sensor.index()].value.value_handle;
        let mut buf = [0u8; VALUE_PAYLOAD_MAX];
        let len = encode_samples(samples, &mut buf);
        let payload = &buf[..len];

        self.stack.set_value(handle, payload).map_err(Error::Gatt)?;

        if !self.subscribed[sensor.index()] {
            return Ok(NotifyOutcome::Dropped);
        }

        match self.stack.notify(conn, handle, payload) {
            Ok(()) => Ok(NotifyOutcome::Sent),
            Err(e) if e.is_transient() => {
                debug!("sensor {} notify dropped: {:?}", sensor.number(), e);
                Ok(NotifyOutcome::Dropped)
            }
            Err(e) => Err(Error::Gatt(e)),
        }
    }
}
