//! Application-wide constants and compile-time configuration.
//!
//! The firmware has no runtime configuration: the revision (wire format,
//! characteristic layout, pacing) is picked by Cargo feature and every
//! timing, UUID and buffer size lives here so it can be tuned in one place.

use crate::encode::PayloadFormat;

// Revision profiles

/// How an encoded payload reaches the characteristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transmission {
    /// One write per sample; anything past the capacity is cut off.
    Whole,
    /// `id#fragment` writes of at most `capacity` bytes each.
    Chunked,
}

/// What the status LED does while streaming.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorMode {
    Off,
    /// High while a sample is being encoded.
    Pulse,
    /// Flipped once per transmitted sample.
    Toggle,
}

/// Everything that differs between the firmware revisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamProfile {
    pub format: PayloadFormat,
    pub transmission: Transmission,
    /// Characteristic capacity in bytes.
    pub capacity: usize,
    /// Pause after each transmitted sample (ms).
    pub loop_delay_ms: u32,
    /// Pause between two chunks of the same sample (ms).
    pub chunk_delay_ms: u32,
    pub indicator: IndicatorMode,
}

impl StreamProfile {
    /// Flat CSV over a heart-rate-style characteristic, LED blinking at 100 ms.
    pub const CSV: Self = Self {
        format: PayloadFormat::Csv,
        transmission: Transmission::Whole,
        capacity: 24,
        loop_delay_ms: 100,
        chunk_delay_ms: 0,
        indicator: IndicatorMode::Toggle,
    };

    /// Whole JSON object per notification (truncated at 20 bytes by the stack).
    pub const JSON: Self = Self {
        format: PayloadFormat::Json,
        transmission: Transmission::Whole,
        capacity: 20,
        loop_delay_ms: 25,
        chunk_delay_ms: 0,
        indicator: IndicatorMode::Pulse,
    };

    /// JSON split into `id#fragment` chunks that fit the 20-byte characteristic.
    pub const CHUNKED_JSON: Self = Self {
        format: PayloadFormat::Json,
        transmission: Transmission::Chunked,
        capacity: 20,
        loop_delay_ms: 25,
        chunk_delay_ms: CHUNK_INTERVAL_MS,
        indicator: IndicatorMode::Off,
    };
}

/// Profile compiled into the firmware.
#[cfg(feature = "profile-csv")]
pub const PROFILE: StreamProfile = StreamProfile::CSV;
#[cfg(all(feature = "profile-json", not(feature = "profile-csv")))]
pub const PROFILE: StreamProfile = StreamProfile::JSON;
#[cfg(not(any(feature = "profile-csv", feature = "profile-json")))]
pub const PROFILE: StreamProfile = StreamProfile::CHUNKED_JSON;

/// Capacity of the GATT characteristic value for the compiled profile.
pub const CHARACTERISTIC_CAPACITY: usize = PROFILE.capacity;

/// Largest characteristic any profile uses; sizes the transmit frame buffer.
pub const MAX_CHARACTERISTIC_CAPACITY: usize = 24;

// BLE

/// GAP device name, sent in the scan response.
pub const DEVICE_NAME: &str = "Nano 33 IoT";

/// Custom IMU service (JSON revisions).
pub const IMU_SERVICE_UUID: &str = "12345678-1234-5678-1234-56789abcdef0";
pub const IMU_DATA_CHAR_UUID: &str = "12345678-1234-5678-1234-56789abcdef1";

/// Same service UUID as a little-endian `u128`, for advertisement payloads.
pub const IMU_SERVICE_UUID_U128: u128 = 0x12345678_1234_5678_1234_56789abcdef0;

/// Heart-rate-style service used by the CSV revision (0x180D / 0x2A37).
pub const HEART_RATE_SERVICE_UUID: &str = "0000180d-0000-1000-8000-00805f9b34fb";
pub const HEART_RATE_MEASUREMENT_UUID: &str = "00002a37-0000-1000-8000-00805f9b34fb";

/// ATT MTU we accept; the central may negotiate down to 23 (20-byte values).
pub const BLE_ATT_MTU: u16 = 64;

/// Advertising interval in 0.625 ms units. 160 = 100 ms.
pub const BLE_ADV_INTERVAL: u32 = 160;

// Streaming

/// Gap between chunks of one sample (ms).
pub const CHUNK_INTERVAL_MS: u32 = 10;

/// Bytes of `id` + separator in front of every chunk.
pub const CHUNK_HEADER_LEN: usize = 6;

/// Encoder output buffer. A JSON sample with six full-precision floats
/// stays under 180 bytes.
pub const ENCODED_CAPACITY: usize = 192;

// Receiving side

/// Longest message the reassembler will rebuild.
pub const REASSEMBLY_CAPACITY: usize = ENCODED_CAPACITY;

/// Messages that may be in flight at once (power of two for `FnvIndexMap`).
pub const REASSEMBLY_SLOTS: usize = 4;

// IMU

/// LSM6DS3 I²C address with SA0 pulled low.
pub use crate::imu::lsm6ds3::DEFAULT_ADDRESS as IMU_I2C_ADDRESS;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   I²C SDA        → P0.26
//   I²C SCL        → P0.27
//   Status LED     → P0.13
