//! One IMU reading as it goes over the air.
//!
//! Field names are the JSON wire names: the timestamp travels as `id`,
//! the two vectors as `accelerometer` and `gyroscope`.

use serde::{Deserialize, Serialize};

/// Three-axis reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Acceleration (g) and angular velocity (°/s) taken in the same loop pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Milliseconds since boot when the sample was read.
    #[serde(rename = "id")]
    pub timestamp_ms: u64,
    #[serde(rename = "accelerometer")]
    pub acceleration: Vector3,
    #[serde(rename = "gyroscope")]
    pub angular_velocity: Vector3,
}

impl Sample {
    pub const fn new(timestamp_ms: u64, acceleration: Vector3, angular_velocity: Vector3) -> Self {
        Self {
            timestamp_ms,
            acceleration,
            angular_velocity,
        }
    }

    /// The six values in wire order: ax, ay, az, gx, gy, gz.
    pub fn values(&self) -> [f32; 6] {
        let a = self.acceleration;
        let g = self.angular_velocity;
        [a.x, a.y, a.z, g.x, g.y, g.z]
    }
}
