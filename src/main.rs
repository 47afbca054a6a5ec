//! imu-streamer firmware - main entry point.
//!
//! Boots the SoftDevice, configures the LSM6DS3 over TWIM and then loops:
//! advertise, stream samples to the connected central until it leaves,
//! advertise again.
//!
//! # Task layout
//!
//! | Task            | Responsibility                                  |
//! |-----------------|-------------------------------------------------|
//! | `softdevice`    | Runs the SoftDevice event loop (must never stop) |
//! | `main`          | Advertising, GATT server and the sample loop    |

#![no_std]
#![no_main]

use defmt::{error, info, unwrap, warn};
use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_time::{Delay, Instant, Timer};
use nrf_softdevice::ble::gatt_server;
use nrf_softdevice::Softdevice;

use imu_streamer::ble::{self, NotifyLink};
use imu_streamer::config::{IMU_I2C_ADDRESS, PROFILE};
use imu_streamer::error::Error;
use imu_streamer::imu::Lsm6ds3;
use imu_streamer::stream::{Clock, Streamer};

bind_interrupts!(struct Irqs {
    TWISPI0 => twim::InterruptHandler<peripherals::TWISPI0>;
});

/// Milliseconds since boot from the embassy time driver.
struct Uptime;

impl Clock for Uptime {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("imu-streamer starting");

    // Priorities 0, 1 and 4 belong to the SoftDevice.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);
    interrupt::TWISPI0.set_priority(Priority::P3);

    // -- BLE ----------------------------------------------------------------
    let sd = Softdevice::enable(&ble::softdevice_config());
    let server = match ble::server::register(sd) {
        Ok(server) => server,
        Err(e) => {
            error!("GATT server registration failed: {:?}", e);
            halt();
        }
    };
    unwrap!(spawner.spawn(softdevice_task(sd)));

    // -- IMU ----------------------------------------------------------------
    let mut twim_config = twim::Config::default();
    twim_config.frequency = twim::Frequency::K400;
    let i2c = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim_config);

    let mut imu = Lsm6ds3::new(i2c, IMU_I2C_ADDRESS);
    if let Err(e) = imu.init().await.map_err(Error::from) {
        error!("IMU init failed: {:?}", e);
        halt();
    }

    // -- Streamer -----------------------------------------------------------
    let led = Output::new(p.P0_13, Level::Low, OutputDrive::Standard);
    let mut streamer = match Streamer::new(imu, Delay, Uptime, led, PROFILE) {
        Ok(streamer) => streamer,
        Err(e) => {
            error!("Profile rejected: {:?}", e);
            halt();
        }
    };
    info!("Profile: {:?}", PROFILE);

    loop {
        let conn = match ble::advertise(sd).await {
            Ok(conn) => conn,
            Err(_) => {
                Timer::after_secs(1).await;
                continue;
            }
        };

        let mut link = NotifyLink::new(&server, &conn);
        let (reason, stats) = join(
            gatt_server::run(&conn, &server, ble::server::on_event),
            streamer.run(&mut link),
        )
        .await;

        warn!("BLE disconnected: {:?}", reason);
        info!("Session: {:?}", stats);
    }
}

/// Stop here for good; the board needs a reset.
fn halt() -> ! {
    loop {
        cortex_m::asm::wfe();
    }
}
