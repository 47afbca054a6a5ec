//! Sample Streamer - the read → encode → send loop.
//!
//! While the central stays connected:
//! 1. Check that both acceleration and angular velocity are ready; if not,
//!    yield and try again.
//! 2. Read the six values and stamp them with the uptime in ms.
//! 3. Encode as JSON or CSV.
//! 4. Write the payload whole (cut to the characteristic capacity) or as
//!    `id#fragment` chunks separated by a fixed pause.
//! 5. Pause for the profile's loop delay.
//!
//! Hardware is reached through three seams: [`MotionSensor`] for the IMU,
//! [`Link`] for the characteristic, [`Clock`] for timestamps. Delays use
//! `embedded-hal-async` and the status LED `embedded-hal`.


use core::convert::Infallible;

use embassy_futures::yield_now;
use embedded_hal::digital::{ErrorType, OutputPin, PinState};
use embedded_hal_async::delay::DelayNs;

use crate::chunk::{ChunkId, Chunker};
use crate::config::{IndicatorMode, StreamProfile, Transmission, MAX_CHARACTERISTIC_CAPACITY};
use crate::encode::encode;
use crate::error::Error;
use crate::sample::{Sample, Vector3};

/// Six-axis sensor with "new data" flags.
#[allow(async_fn_in_trait)]
pub trait MotionSensor {
    type Error;

    async fn acceleration_available(&mut self) -> Result<bool, Self::Error>;
    async fn gyroscope_available(&mut self) -> Result<bool, Self::Error>;
    /// Acceleration in g.
    async fn read_acceleration(&mut self) -> Result<Vector3, Self::Error>;
    /// Angular velocity in °/s.
    async fn read_gyroscope(&mut self) -> Result<Vector3, Self::Error>;
}

/// The characteristic a connected central reads from.
#[allow(async_fn_in_trait)]
pub trait Link {
    type Error;

    fn is_connected(&self) -> bool;

    /// Write one value (at most the characteristic capacity) and notify.
    async fn write(&mut self, payload: &[u8]) -> Result<(), Self::Error>;
}

/// Monotonic milliseconds since boot.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Stand-in for boards without a status LED.
pub struct NoIndicator;

impl ErrorType for NoIndicator {
    type Error = Infallible;
}

impl OutputPin for NoIndicator {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Counters for one connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionStats {
    /// Samples read from the sensor.
    pub samples: u32,
    /// Samples handed to the link (whole or chunked).
    pub payloads: u32,
    /// Chunk frames written.
    pub chunks: u32,
    /// Loop passes without a ready sample.
    pub skipped: u32,
    /// Writes the link rejected (ignored otherwise).
    pub write_errors: u32,
}

pub struct Streamer<S, D, C, P> {
    sensor: S,
    delay: D,
    clock: C,
    indicator: P,
    profile: StreamProfile,
    chunker: Option<Chunker>,
    led_on: bool,
}

impl<S, D, C, P> Streamer<S, D, C, P>
where
    S: MotionSensor,
    D: DelayNs,
    C: Clock,
    P: OutputPin,
{
    /// Takes ownership of the sensor and timing resources for the
    /// lifetime of the device.
    pub fn new(sensor: S, delay: D, clock: C, indicator: P, profile: StreamProfile) -> Result<Self, Error> {
        if profile.capacity > MAX_CHARACTERISTIC_CAPACITY {
            return Err(Error::BufferOverflow);
        }
        let chunker = match profile.transmission {
            Transmission::Chunked => Some(Chunker::new(profile.capacity)?),
            Transmission::Whole => None,
        };
        Ok(Self {
            sensor,
            delay,
            clock,
            indicator,
            profile,
            chunker,
            led_on: false,
        })
    }

    pub fn profile(&self) -> &StreamProfile {
        &self.profile
    }

    /// Stream until `link` reports the central gone.
    pub async fn run<L: Link>(&mut self, link: &mut L) -> SessionStats {
        let mut stats = SessionStats::default();

        while link.is_connected() {
            let Some(sample) = self.poll_sample().await else {
                stats.skipped = stats.skipped.saturating_add(1);
                yield_now().await;
                continue;
            };
            stats.samples = stats.samples.saturating_add(1);

            if let Err(e) = self.transmit(link, &sample, &mut stats).await {
                warn!("sample {} not sent: {:?}", sample.timestamp_ms, e);
            }

            self.delay.delay_ms(self.profile.loop_delay_ms).await;
        }

        self.set_indicator(false);
        stats
    }

    /// Read one sample if both sensors have fresh data.
    pub async fn poll_sample(&mut self) -> Option<Sample> {
        match self.sample_ready().await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(_) => {
                warn!("IMU: status read failed");
                return None;
            }
        }

        let (acceleration, angular_velocity) =
            match (self.sensor.read_acceleration().await, self.sensor.read_gyroscope().await) {
                (Ok(a), Ok(g)) => (a, g),
                _ => {
                    warn!("IMU: data read failed");
                    return None;
                }
            };

        Some(Sample::new(self.clock.now_ms(), acceleration, angular_velocity))
    }

    /// Encode `sample` and hand it to `link` per the profile.
    ///
    /// Write failures are counted in `stats` and otherwise ignored.
    pub async fn transmit<L: Link>(
        &mut self,
        link: &mut L,
        sample: &Sample,
        stats: &mut SessionStats,
    ) -> Result<(), Error> {
        if self.profile.indicator == IndicatorMode::Pulse {
            self.set_indicator(true);
        }
        let encoded = encode(sample, self.profile.format);
        if self.profile.indicator == IndicatorMode::Pulse {
            self.set_indicator(false);
        }
        let encoded = encoded?;
        let payload = encoded.as_bytes();

        match self.chunker {
            None => {
                let len = payload.len().min(self.profile.capacity);
                if len < payload.len() {
                    trace!("payload cut {} -> {} bytes", payload.len(), len);
                }
                if link.write(&payload[..len]).await.is_err() {
                    stats.write_errors = stats.write_errors.saturating_add(1);
                    debug!("characteristic write failed");
                }
            }
            Some(chunker) => {
                let id = ChunkId::from_timestamp(sample.timestamp_ms);
                let mut frame = [0u8; MAX_CHARACTERISTIC_CAPACITY];
                for (i, chunk) in chunker.chunks(id, payload).enumerate() {
                    if i > 0 {
                        self.delay.delay_ms(self.profile.chunk_delay_ms).await;
                    }
                    if !link.is_connected() {
                        return Err(Error::Disconnected);
                    }
                    let len = chunk.encode(&mut frame);
                    if link.write(&frame[..len]).await.is_err() {
                        stats.write_errors = stats.write_errors.saturating_add(1);
                        debug!("chunk {} of {} write failed", i, id);
                    }
                    stats.chunks = stats.chunks.saturating_add(1);
                }
            }
        }
        stats.payloads = stats.payloads.saturating_add(1);

        if self.profile.indicator == IndicatorMode::Toggle {
            self.set_indicator(!self.led_on);
        }
        Ok(())
    }

    /// Give back the owned resources.
    pub fn release(self) -> (S, D, C, P) {
        (self.sensor, self.delay, self.clock, self.indicator)
    }

    async fn sample_ready(&mut self) -> Result<bool, S::Error> {
        Ok(self.sensor.acceleration_available().await? && self.sensor.gyroscope_available().await?)
    }

    fn set_indicator(&mut self, on: bool) {
        self.led_on = on;
        let _ = self.indicator.set_state(PinState::from(on));
    }
}
