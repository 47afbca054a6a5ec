//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Advertiser** - announces the device name and the IMU service and
//!    waits for one central to connect.
//! 2. **GATT server** - one service with a single read/notify
//!    characteristic that carries the encoded samples (see [`server`]).
//!
//! Only one central is served at a time. After a disconnect the main loop
//! advertises again.

pub mod server;

use core::mem;

use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
};
use nrf_softdevice::ble::{peripheral, Connection};
use nrf_softdevice::{raw, Softdevice};

use crate::config::{BLE_ADV_INTERVAL, BLE_ATT_MTU, DEVICE_NAME};
use crate::error::{BleError, Error};

pub use server::{NotifyLink, Server};

/// SoftDevice configuration for a single-link peripheral.
///
/// The Nano 33 IoT style boards have no 32 kHz crystal, so the LF clock
/// runs from the internal RC oscillator.
pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: BLE_ATT_MTU,
        }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            // SAFETY: all-zero is "no access" for a security mode struct.
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

// Advertising data: flags + service UUID. The name goes in the scan response
// because a 128-bit UUID and "Nano 33 IoT" do not both fit in 31 bytes.

#[cfg(not(feature = "profile-csv"))]
static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_128(
        ServiceList::Complete,
        &[crate::config::IMU_SERVICE_UUID_U128.to_le_bytes()],
    )
    .build();

#[cfg(feature = "profile-csv")]
static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(
        ServiceList::Complete,
        &[nrf_softdevice::ble::advertisement_builder::ServiceUuid16::HEART_RATE],
    )
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .full_name(DEVICE_NAME)
    .build();

/// Advertise until a central connects.
pub async fn advertise(sd: &Softdevice) -> Result<Connection, Error> {
    let config = peripheral::Config {
        interval: BLE_ADV_INTERVAL,
        ..Default::default()
    };
    let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
        adv_data: &ADV_DATA,
        scan_data: &SCAN_DATA,
    };

    info!("BLE advertising as \"{}\"", DEVICE_NAME);
    match peripheral::advertise_connectable(sd, adv, &config).await {
        Ok(conn) => {
            info!("BLE central connected");
            Ok(conn)
        }
        Err(e) => {
            warn!("BLE advertising failed: {:?}", e);
            Err(Error::Ble(BleError::AdvertiseFailed))
        }
    }
}
