//! Unified error type for imu-streamer.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // BLE
    /// The SoftDevice returned a BLE-level error.
    Ble(BleError),

    /// Connection to the central was lost.
    Disconnected,

    // IMU
    /// Something answered on the IMU address but `WHO_AM_I` did not match.
    ImuNotDetected(u8),

    /// I²C transaction to the IMU failed.
    Imu,

    // Payloads
    /// The sample did not fit the encoder buffer.
    Encode,

    /// Characteristic too small to carry a chunk header plus one byte.
    CapacityTooSmall,

    /// A reassembled message outgrew its buffer.
    BufferOverflow,

    /// A received notification matched none of the wire formats.
    InvalidFrame,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// GATT server could not be registered with the SoftDevice.
    ServerRegistrationFailed,
    /// Advertising could not start or was aborted.
    AdvertiseFailed,
    /// Characteristic set/notify failed.
    NotifyFailed,
}

// Convenience conversions

impl From<BleError> for Error {
    fn from(e: BleError) -> Self {
        Error::Ble(e)
    }
}

impl<E> From<crate::imu::lsm6ds3::Error<E>> for Error {
    fn from(e: crate::imu::lsm6ds3::Error<E>) -> Self {
        match e {
            crate::imu::lsm6ds3::Error::Bus(_) => Error::Imu,
            crate::imu::lsm6ds3::Error::WrongDevice(id) => Error::ImuNotDetected(id),
        }
    }
}

impl From<serde_json_core::ser::Error> for Error {
    fn from(_: serde_json_core::ser::Error) -> Self {
        Error::Encode
    }
}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Error::Encode
    }
}
