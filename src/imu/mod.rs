//! IMU drivers.
//!
//! The firmware targets the LSM6DS3 family (Arduino Nano 33 IoT, LSM6DS3
//! breakouts). Drivers talk to the bus through `embedded-hal-async`, so
//! they run unchanged on embassy-nrf's TWIM and on host-side mocks.

pub mod lsm6ds3;

pub use lsm6ds3::Lsm6ds3;
