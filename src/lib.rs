//! BLE IMU sample streamer.
//!
//! Reads a six-axis IMU, stamps each reading with the uptime in ms, encodes
//! it as JSON or CSV and notifies it to a connected central, either whole
//! or split into `id#fragment` chunks that fit a 20-byte characteristic.
//!
//! Everything except `ble` is plain `no_std` logic and runs on the host:
//! `cargo test --lib`. The firmware entry point is `main.rs`
//! (`--features embedded`); the receiver tool is `bin/monitor.rs`
//! (`--features host`).

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod chunk;
pub mod config;
pub mod encode;
pub mod error;
pub mod imu;
pub mod receive;
pub mod sample;
pub mod stream;

#[cfg(feature = "embedded")]
pub mod ble;

pub use chunk::{Chunk, ChunkId, Chunker};
pub use config::{StreamProfile, PROFILE};
pub use encode::PayloadFormat;
pub use error::{BleError, Error};
pub use receive::{classify_frame, Frame, Reassembler};
pub use sample::{Sample, Vector3};
pub use stream::{Clock, Link, MotionSensor, SessionStats, Streamer};
