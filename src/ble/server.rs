//! GATT server: the IMU service and its data characteristic.
//!
//! JSON revisions use a custom 128-bit service; the CSV revision reuses the
//! Heart Rate service layout (0x180D / 0x2A37). Either way the
//! characteristic is read + notify and holds at most
//! [`CHARACTERISTIC_CAPACITY`] bytes.

use heapless::Vec;
use nrf_softdevice::ble::Connection;
use nrf_softdevice::Softdevice;

use crate::config::CHARACTERISTIC_CAPACITY;
use crate::error::{BleError, Error};
use crate::stream::Link;

/// Value type of the data characteristic.
pub type CharacteristicValue = Vec<u8, CHARACTERISTIC_CAPACITY>;

#[cfg(not(feature = "profile-csv"))]
#[nrf_softdevice::gatt_service(uuid = "12345678-1234-5678-1234-56789abcdef0")]
pub struct ImuService {
    #[characteristic(uuid = "12345678-1234-5678-1234-56789abcdef1", read, notify)]
    pub imu_data: CharacteristicValue,
}

#[cfg(feature = "profile-csv")]
#[nrf_softdevice::gatt_service(uuid = "180d")]
pub struct ImuService {
    #[characteristic(uuid = "2a37", read, notify)]
    pub imu_data: CharacteristicValue,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub imu: ImuService,
}

/// Register the service table with the SoftDevice.
pub fn register(sd: &mut Softdevice) -> Result<Server, Error> {
    Server::new(sd).map_err(|e| {
        warn!("GATT register error: {:?}", e);
        Error::from(BleError::ServerRegistrationFailed)
    })
}

/// Log subscription changes; the server has nothing else to react to.
pub fn on_event(event: ServerEvent) {
    match event {
        ServerEvent::Imu(ImuServiceEvent::ImuDataCccdWrite { notifications }) => {
            info!("BLE notifications {}", if notifications { "enabled" } else { "disabled" });
        }
    }
}

/// [`Link`] over one connection: set the characteristic value, then notify.
pub struct NotifyLink<'a> {
    server: &'a Server,
    conn: &'a Connection,
}

impl<'a> NotifyLink<'a> {
    pub fn new(server: &'a Server, conn: &'a Connection) -> Self {
        Self { server, conn }
    }
}

impl Link for NotifyLink<'_> {
    type Error = Error;

    fn is_connected(&self) -> bool {
        self.conn.handle().is_some()
    }

    async fn write(&mut self, payload: &[u8]) -> Result<(), Error> {
        let value = CharacteristicValue::from_slice(payload).map_err(|_| Error::BufferOverflow)?;
        self.server
            .imu
            .imu_data_set(&value)
            .map_err(|_| BleError::NotifyFailed)?;
        if let Err(e) = self.server.imu.imu_data_notify(self.conn, &value) {
            // Fails while the central has not subscribed yet.
            debug!("BLE notify failed: {:?}", e);
            return Err(BleError::NotifyFailed.into());
        }
        Ok(())
    }
}
