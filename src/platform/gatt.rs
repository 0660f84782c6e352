//! SoftDevice side of the sensor service.
//!
//! - [`SdRegistry`] builds the attribute table with `ServiceBuilder`.
//! - [`SoftdeviceGatt`] sets values and sends notifications.
//! - [`MaskServer`] routes GATT writes into the service and answers
//!   deferred control writes.
//! - [`run`] advertises, serves one central at a time and pushes sample
//!   batches while connected.
//! - [`sync_controls`] mirrors the records the sampler runs into the
//!   control characteristics.

use core::cell::RefCell;

use defmt::{debug, info, trace, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_time::{Duration, Timer};
use heapless::Vec;
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
};
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{
    self, DeferredWriteReply, NotifyValueError, RegisterError, SetValueError, WriteOp,
};
use nrf_softdevice::ble::{peripheral, Connection, GattError as AttError, Uuid};
use nrf_softdevice::{raw, RawError, Softdevice};

use smart_mask::ble::service::{ControlWriteFn, NotifyOutcome, SensorService, ServiceHandles};
use smart_mask::ble::{
    vendor_uuid, BleEvent, CharHandles, CharProps, CharSpec, GattRegistry, GattStack, Uuid128,
    WriteRejection, MAX_CHARACTERISTICS,
};
use smart_mask::config::{
    BATCH_QUEUE_DEPTH, BLE_ADV_INTERVAL, CONTROL_QUEUE_DEPTH, BLE_CONN_INTERVAL_MAX, BLE_CONN_INTERVAL_MIN,
    BLE_DEVICE_NAME, BLE_SLAVE_LATENCY, BLE_SUP_TIMEOUT, SENSORS_COUNT, SMS_UUID_SERVICE,
};
use smart_mask::error::GattError;
use smart_mask::sampling::ControlApplied;
use smart_mask::sensor::{SensorBatch, SensorControl};

fn raw_error(raw: RawError) -> GattError {
    match raw {
        RawError::NotSupported => GattError::NotSupported,
        RawError::InvalidState => GattError::InvalidState,
        RawError::Busy | RawError::Resources => GattError::Busy,
        RawError::NoMem => GattError::NoMemory,
        other => GattError::Raw(other as u32),
    }
}

fn att_error(rejection: WriteRejection) -> AttError {
    match rejection {
        WriteRejection::InvalidLength => AttError::ATTERR_INVALID_ATT_VAL_LENGTH,
        WriteRejection::OutOfRange => AttError::ATTERR_CPS_OUT_OF_RANGE,
        WriteRejection::InsufficientResources => AttError::ATTERR_INSUF_RESOURCES,
        WriteRejection::Unlikely => AttError::ATTERR_UNLIKELY_ERROR,
    }
}

fn properties(props: CharProps) -> Properties {
    let mut p = Properties::new();
    if props.read {
        p = p.read();
    }
    if props.write {
        p = p.write();
    }
    if props.notify {
        p = p.notify();
    }
    p
}

/// Attribute table access during boot, while the SoftDevice is still
/// exclusively borrowed.
pub struct SdRegistry<'a>(pub &'a mut Softdevice);

impl GattRegistry for SdRegistry<'_> {
    fn register_service(
        &mut self,
        uuid: &Uuid128,
        characteristics: &[CharSpec<'_>],
    ) -> Result<(u16, Vec<CharHandles, MAX_CHARACTERISTICS>), GattError> {
        let register = |e: RegisterError| match e {
            RegisterError::Raw(raw) => raw_error(raw),
        };

        let mut sb = ServiceBuilder::new(&mut *self.0, Uuid::new_128(uuid)).map_err(register)?;
        let mut handles = Vec::new();
        for spec in characteristics {
            let mut attr = Attribute::new(spec.initial).variable_len(spec.max_len as u16);
            if spec.props.write {
                attr = attr.deferred_write();
            }
            let metadata = Metadata::new(properties(spec.props));
            let built = sb
                .add_characteristic(Uuid::new_128(&spec.uuid), attr, metadata)
                .map_err(register)?
                .build();
            let char_handles = CharHandles {
                value_handle: built.value_handle,
                cccd_handle: (built.cccd_handle != 0).then_some(built.cccd_handle),
            };
            handles
                .push(char_handles)
                .map_err(|_| GattError::NoMemory)?;
        }
        let service = sb.build();
        Ok((service.handle(), handles))
    }
}

pub struct SoftdeviceGatt {
    sd: &'static Softdevice,
}

impl SoftdeviceGatt {
    pub fn new(sd: &'static Softdevice) -> Self {
        Self { sd }
    }
}

impl GattStack for SoftdeviceGatt {
    type Conn = Connection;

    fn set_value(&mut self, handle: u16, data: &[u8]) -> Result<(), GattError> {
        gatt_server::set_value(self.sd, handle, data).map_err(|e| match e {
            SetValueError::Raw(raw) => raw_error(raw),
        })
    }

    fn notify(&mut self, conn: &Connection, handle: u16, data: &[u8]) -> Result<(), GattError> {
        gatt_server::notify_value(conn, handle, data).map_err(|e| match e {
            NotifyValueError::Disconnected => GattError::Disconnected,
            NotifyValueError::Raw(raw) => raw_error(raw),
        })
    }
}

pub type MaskService = SensorService<SoftdeviceGatt, ControlWriteFn>;

pub struct MaskServer {
    service: RefCell<MaskService>,
}

impl MaskServer {
    pub fn new(
        sd: &'static Softdevice,
        handles: ServiceHandles,
        on_control_write: ControlWriteFn,
        initial_controls: [SensorControl; SENSORS_COUNT],
    ) -> Self {
        let service = SensorService::new(
            SoftdeviceGatt::new(sd),
            handles,
            on_control_write,
            initial_controls,
        );
        Self {
            service: RefCell::new(service),
        }
    }

    fn dispatch(&self, event: BleEvent<'_>) {
        if let Err(e) = self.service.borrow_mut().on_ble_event(event) {
            debug!("ble event not applied: {:?}", e);
        }
    }

    fn write_control(&self, handle: u16, offset: usize, data: &[u8]) -> Result<(), AttError> {
        if offset != 0 {
            return Err(att_error(WriteRejection::InvalidLength));
        }
        self.service
            .borrow_mut()
            .on_ble_event(BleEvent::Write { handle, data })
            .map_err(|e| att_error(e.into()))
    }

    pub fn control_applied(&self, applied: ControlApplied) {
        if let Err(e) = self
            .service
            .borrow_mut()
            .control_applied(applied.sensor, applied.control)
        {
            warn!(
                "sensor {} control value not updated: {:?}",
                applied.sensor.number(),
                e
            );
        }
    }

    fn publish(&self, conn: &Connection, batch: &SensorBatch) {
        let sensor = batch.sensor.number();
        match self
            .service
            .borrow_mut()
            .notify(conn, batch.sensor, &batch.samples)
        {
            Ok(NotifyOutcome::Sent) => trace!("sensor {} batch sent", sensor),
            Ok(NotifyOutcome::Dropped) => trace!("sensor {} batch dropped", sensor),
            Err(e) => warn!("sensor {} notify failed: {:?}", sensor, e),
        }
    }
}

impl gatt_server::Server for MaskServer {
    type Event = ();

    fn on_write(
        &self,
        _conn: &Connection,
        handle: u16,
        _op: WriteOp,
        _offset: usize,
        data: &[u8],
    ) -> Option<Self::Event> {
        self.dispatch(BleEvent::Write { handle, data });
        None
    }

    fn on_deferred_write(
        &self,
        handle: u16,
        _op: WriteOp,
        offset: usize,
        data: &[u8],
        reply: DeferredWriteReply,
    ) -> Option<Self::Event> {
        // Only accepted records reach the attribute table.
        let answer = self.write_control(handle, offset, data).map(|()| Some(data));
        if let Err(e) = reply.reply(answer) {
            warn!("write reply failed: {:?}", defmt::Debug2Format(&e));
        }
        None
    }
}

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_128(ServiceList::Complete, &[vendor_uuid(SMS_UUID_SERVICE)])
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .full_name(BLE_DEVICE_NAME)
    .build();

async fn publish_batches(
    server: &MaskServer,
    conn: &Connection,
    batches: &Receiver<'static, CriticalSectionRawMutex, SensorBatch, BATCH_QUEUE_DEPTH>,
) -> ! {
    loop {
        let batch = batches.receive().await;
        server.publish(conn, &batch);
    }
}

/// Mirror every [`ControlApplied`] report into the control characteristic,
/// connected or not.
pub async fn sync_controls(
    server: &MaskServer,
    reports: Receiver<'static, CriticalSectionRawMutex, ControlApplied, CONTROL_QUEUE_DEPTH>,
) -> ! {
    loop {
        let applied = reports.receive().await;
        server.control_applied(applied);
    }
}

pub async fn run(
    sd: &'static Softdevice,
    server: &'static MaskServer,
    batches: Receiver<'static, CriticalSectionRawMutex, SensorBatch, BATCH_QUEUE_DEPTH>,
) -> ! {
    let config = peripheral::Config {
        interval: BLE_ADV_INTERVAL,
        ..Default::default()
    };

    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("advertising failed: {:?}", defmt::Debug2Format(&e));
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
        };
        info!("central connected");

        let params = raw::ble_gap_conn_params_t {
            min_conn_interval: BLE_CONN_INTERVAL_MIN,
            max_conn_interval: BLE_CONN_INTERVAL_MAX,
            slave_latency: BLE_SLAVE_LATENCY,
            conn_sup_timeout: BLE_SUP_TIMEOUT,
        };
        if let Err(e) = conn.set_conn_params(params) {
            warn!("conn param update failed: {:?}", defmt::Debug2Format(&e));
        }

        // Batches taken while nobody listened are stale.
        while batches.try_receive().is_ok() {}
        server.dispatch(BleEvent::Connected);

        let disconnected = match select(
            gatt_server::run(&conn, server, |_| {}),
            publish_batches(server, &conn, &batches),
        )
        .await
        {
            Either::First(e) => e,
            Either::Second(never) => never,
        };

        server.dispatch(BleEvent::Disconnected);
        info!("central disconnected: {:?}", defmt::Debug2Format(&disconnected));
    }
}
