//! Unified error type for the smart-mask firmware.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

/// Top-level error type used across the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // BLE
    /// The SoftDevice refused a service / characteristic registration.
    Registration(GattError),

    /// The SoftDevice returned an unexpected error at runtime.
    Gatt(GattError),

    // Sensors
    /// A control record failed validation or decoding.
    InvalidControl(ControlError),

    /// A control update could not be queued for the sampler.
    QueueFull,

    // Sampling
    /// An ADC / timer / GPIO driver call failed.
    Driver(DriverError),

    /// A driver failure could not be rolled back; sampling is halted.
    Faulted,
}

/// Reasons a sensor control record is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Sample period below `MIN_SAMPLE_PERIOD_MS`.
    PeriodTooShort(u16),
    /// Sample period above `MAX_SAMPLE_PERIOD_MS`.
    PeriodTooLong(u16),
    /// Gain code outside the SAADC gain table.
    UnknownGain(u8),
    /// Enable byte other than 0 or 1.
    InvalidEnable(u8),
    /// Payload length differs from the control record size.
    BadLength(usize),
}

/// Peripheral driver failures (SAADC, timer, GPIO, RNG).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// ADC channel number outside CH[0]..CH[7].
    InvalidChannel(u8),
    /// Channel initialised twice without `channel_uninit`.
    ChannelBusy(u8),
    /// Conversion requested on a channel that is not configured.
    ChannelNotConfigured(u8),
    /// Timer used before `init` or armed twice.
    TimerState,
    /// Compare value of zero ticks.
    InvalidPeriod,
    /// Power pin could not be driven.
    Gpio,
    /// Random number generator failed (mock mode).
    Rng,
}

/// Subset of SoftDevice GATT errors we distinguish (keeps the enum `Copy`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GattError {
    /// Peer has not enabled notifications / operation not supported.
    NotSupported,
    /// Stack is not in a state that allows the operation.
    InvalidState,
    /// Connection went away.
    Disconnected,
    /// Out of TX buffers, retry later.
    Busy,
    /// Attribute table full.
    NoMemory,
    /// Raw SoftDevice error code.
    Raw(u32),
}

impl GattError {
    /// Errors that just mean "nobody is listening right now".
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GattError::NotSupported
                | GattError::InvalidState
                | GattError::Disconnected
                | GattError::Busy
        )
    }
}

// Convenience conversions

impl From<ControlError> for Error {
    fn from(e: ControlError) -> Self {
        Error::InvalidControl(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Error::Driver(e)
    }
}
