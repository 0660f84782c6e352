//! Bluetooth Low Energy subsystem.
//!
//! The firmware runs the Nordic SoftDevice in **Peripheral** role and
//! exposes one vendor GATT service (see [`service`]):
//!
//! 1. **Registration** - the service and its eight characteristics are
//!    added once at boot through [`GattRegistry`].
//! 2. **Event dispatch** - connection changes and attribute writes are fed
//!    to the service as [`BleEvent`]s.
//! 3. **Notification** - sample batches are pushed through [`GattStack`].
//!
//! Both traits are implemented over `nrf-softdevice` in
//! `platform::gatt`; the service logic itself is hardware independent.

pub mod service;

use crate::config::{SENSORS_COUNT, SMS_UUID_BASE};
use crate::error::{ControlError, Error, GattError};
use heapless::Vec;

/// 128-bit UUID in SoftDevice (little-endian) byte order.
pub type Uuid128 = [u8; 16];

/// Characteristics registered by the sensor service.
pub const MAX_CHARACTERISTICS: usize = 2 * SENSORS_COUNT;

/// Expand a 16-bit service/characteristic id onto the vendor base UUID.
pub const fn vendor_uuid(short: u16) -> Uuid128 {
    let mut uuid = SMS_UUID_BASE;
    let le = short.to_le_bytes();
    uuid[12] = le[0];
    uuid[13] = le[1];
    uuid
}

/// Characteristic properties the service uses.
///
/// Writable characteristics are registered with deferred writes: the stack
/// holds a peer write until the service accepts or rejects it, and only
/// stores accepted values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharProps {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

impl CharProps {
    pub const READ_NOTIFY: Self = Self {
        read: true,
        write: false,
        notify: true,
    };

    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        notify: false,
    };
}

/// One characteristic to add to the attribute table.
#[derive(Clone, Copy, Debug)]
pub struct CharSpec<'a> {
    pub uuid: Uuid128,
    pub props: CharProps,
    /// Initial attribute value.
    pub initial: &'a [u8],
    /// Maximum value length; longer than `initial` makes it variable-length.
    pub max_len: usize,
}

/// Attribute handles the stack assigned to a characteristic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharHandles {
    pub value_handle: u16,
    /// Client Characteristic Configuration descriptor, when notifiable.
    pub cccd_handle: Option<u16>,
}

/// Events the stack delivers to the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BleEvent<'a> {
    /// A central connected.
    Connected,
    /// The link dropped.
    Disconnected,
    /// The peer wrote an attribute (value or CCCD).
    Write { handle: u16, data: &'a [u8] },
    /// Anything else the stack reports (MTU exchange, PHY update, ...).
    Other,
}

/// ATT error a rejected deferred write is answered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteRejection {
    /// Payload is not one control record (ATT 0x0D).
    InvalidLength,
    /// A field is outside its allowed values (ATT 0xFF).
    OutOfRange,
    /// The update could not be queued (ATT 0x11).
    InsufficientResources,
    /// Anything else (ATT 0x0E).
    Unlikely,
}

impl From<Error> for WriteRejection {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidControl(ControlError::BadLength(_)) => WriteRejection::InvalidLength,
            Error::InvalidControl(_) => WriteRejection::OutOfRange,
            Error::QueueFull => WriteRejection::InsufficientResources,
            _ => WriteRejection::Unlikely,
        }
    }
}

/// Boot-time attribute table registration.
pub trait GattRegistry {
    /// Add a primary service and its characteristics, in order. Returns
    /// the service handle and one handle set per characteristic.
    fn register_service(
        &mut self,
        uuid: &Uuid128,
        characteristics: &[CharSpec<'_>],
    ) -> Result<(u16, Vec<CharHandles, MAX_CHARACTERISTICS>), GattError>;
}

/// Runtime attribute access.
pub trait GattStack {
    /// Connection the notifications are sent on.
    type Conn;

    /// Update the stored value (what a peer read returns).
    fn set_value(&mut self, handle: u16, data: &[u8]) -> Result<(), GattError>;

    /// Send a handle value notification.
    fn notify(&mut self, conn: &Self::Conn, handle: u16, data: &[u8]) -> Result<(), GattError>;
}
