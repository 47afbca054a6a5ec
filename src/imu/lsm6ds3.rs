//! LSM6DS3 accelerometer + gyroscope over I²C.
//!
//! Configuration (same as the Arduino driver the sketches were written
//! against):
//! ```text
//! CTRL2_G  = 0x4C   gyro 104 Hz, ±2000 dps
//! CTRL1_XL = 0x4A   accel 104 Hz, ±4 g, 100 Hz anti-aliasing
//! CTRL7_G  = 0x00   gyro high-performance mode
//! CTRL8_XL = 0x09   accel LPF2 at ODR/4
//! ```

use embedded_hal_async::i2c::I2c;

use crate::sample::Vector3;
use crate::stream::MotionSensor;

/// I²C address with SA0 low.
pub const DEFAULT_ADDRESS: u8 = 0x6A;

/// `WHO_AM_I` values of register-compatible parts.
pub const ACCEPTED_IDS: [u8; 3] = [
    0x69, // LSM6DS3
    0x6A, // LSM6DS3TR-C
    0x6C, // LSM6DSOX / LSM6DSO
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum Register {
    WhoAmI = 0x0F,
    Ctrl1Xl = 0x10,
    Ctrl2G = 0x11,
    Ctrl7G = 0x16,
    Ctrl8Xl = 0x17,
    StatusReg = 0x1E,
    OutxLG = 0x22,
    OutxLXl = 0x28,
}

/// STATUS_REG: new accelerometer data.
const STATUS_XLDA: u8 = 1 << 0;
/// STATUS_REG: new gyroscope data.
const STATUS_GDA: u8 = 1 << 1;

const INIT_SEQUENCE: [(Register, u8); 4] = [
    (Register::Ctrl2G, 0x4C),
    (Register::Ctrl1Xl, 0x4A),
    (Register::Ctrl7G, 0x00),
    (Register::Ctrl8Xl, 0x09),
];

/// LSB → g at ±4 g full scale.
const ACCEL_SCALE: f32 = 4.0 / 32768.0;
/// LSB → °/s at ±2000 dps full scale.
const GYRO_SCALE: f32 = 2000.0 / 32768.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Underlying bus error.
    Bus(E),
    /// `WHO_AM_I` returned something other than a supported part.
    WrongDevice(u8),
}

pub struct Lsm6ds3<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Lsm6ds3<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Verify the part and apply the streaming configuration.
    pub async fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        let id = self.who_am_i().await?;
        if !ACCEPTED_IDS.contains(&id) {
            warn!("IMU: unexpected WHO_AM_I {=u8:#x}", id);
            return Err(Error::WrongDevice(id));
        }
        debug!("IMU: WHO_AM_I {=u8:#x}", id);

        for (reg, value) in INIT_SEQUENCE {
            self.write_reg(reg, value).await?;
        }
        info!("IMU: LSM6DS3 configured (104 Hz, 4 g, 2000 dps)");
        Ok(())
    }

    pub async fn who_am_i(&mut self) -> Result<u8, Error<I2C::Error>> {
        self.read_reg(Register::WhoAmI).await
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    async fn status(&mut self) -> Result<u8, Error<I2C::Error>> {
        self.read_reg(Register::StatusReg).await
    }

    async fn read_axes(&mut self, first: Register, scale: f32) -> Result<Vector3, Error<I2C::Error>> {
        let mut raw = [0u8; 6];
        self.i2c
            .write_read(self.address, &[first as u8], &mut raw)
            .await
            .map_err(Error::Bus)?;
        let axis = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]) as f32 * scale;
        Ok(Vector3::new(axis(0), axis(2), axis(4)))
    }

    async fn read_reg(&mut self, reg: Register) -> Result<u8, Error<I2C::Error>> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.address, &[reg as u8], &mut buf)
            .await
            .map_err(Error::Bus)?;
        Ok(buf[0])
    }

    async fn write_reg(&mut self, reg: Register, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[reg as u8, value])
            .await
            .map_err(Error::Bus)
    }
}

impl<I2C: I2c> MotionSensor for Lsm6ds3<I2C> {
    type Error = Error<I2C::Error>;

    async fn acceleration_available(&mut self) -> Result<bool, Self::Error> {
        Ok(self.status().await? & STATUS_XLDA != 0)
    }

    async fn gyroscope_available(&mut self) -> Result<bool, Self::Error> {
        Ok(self.status().await? & STATUS_GDA != 0)
    }

    async fn read_acceleration(&mut self) -> Result<Vector3, Self::Error> {
        self.read_axes(Register::OutxLXl, ACCEL_SCALE).await
    }

    async fn read_gyroscope(&mut self) -> Result<Vector3, Self::Error> {
        self.read_axes(Register::OutxLG, GYRO_SCALE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embedded_hal::i2c::{ErrorKind, ErrorType};
    use embedded_hal_async::i2c::Operation;
    use heapless::Vec;

    /// Register file behind a fake bus.
    struct FakeBus {
        regs: [u8; 0x80],
        writes: Vec<(u8, u8), 8>,
        fail: bool,
    }

    impl FakeBus {
        fn with_id(id: u8) -> Self {
            let mut regs = [0u8; 0x80];
            regs[Register::WhoAmI as usize] = id;
            Self {
                regs,
                writes: Vec::new(),
                fail: false,
            }
        }
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        async fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            assert_eq!(address, DEFAULT_ADDRESS);
            let mut pointer = 0usize;
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        pointer = bytes[0] as usize;
                        if bytes.len() == 2 {
                            self.regs[pointer] = bytes[1];
                            self.writes.push((bytes[0], bytes[1])).unwrap();
                        }
                    }
                    Operation::Read(buf) => {
                        let len = buf.len();
                        buf.copy_from_slice(&self.regs[pointer..pointer + len]);
                    }
                }
            }
            Ok(())
        }
    }

    fn put_i16(regs: &mut [u8], at: u8, values: [i16; 3]) {
        for (i, v) in values.iter().enumerate() {
            let [lo, hi] = v.to_le_bytes();
            regs[at as usize + 2 * i] = lo;
            regs[at as usize + 2 * i + 1] = hi;
        }
    }

    #[test]
    fn init_writes_configuration_in_order() {
        let mut imu = Lsm6ds3::new(FakeBus::with_id(0x69), DEFAULT_ADDRESS);
        block_on(imu.init()).unwrap();
        let bus = imu.release();
        assert_eq!(
            bus.writes.as_slice(),
            &[(0x11, 0x4C), (0x10, 0x4A), (0x16, 0x00), (0x17, 0x09)]
        );
    }

    #[test]
    fn init_accepts_register_compatible_parts() {
        for id in ACCEPTED_IDS {
            let mut imu = Lsm6ds3::new(FakeBus::with_id(id), DEFAULT_ADDRESS);
            assert!(block_on(imu.init()).is_ok());
        }
    }

    #[test]
    fn init_rejects_unknown_part() {
        let mut imu = Lsm6ds3::new(FakeBus::with_id(0x33), DEFAULT_ADDRESS);
        assert_eq!(block_on(imu.init()), Err(Error::WrongDevice(0x33)));
        assert!(imu.release().writes.is_empty());
    }

    #[test]
    fn init_failure_converts_to_crate_error() {
        let mut imu = Lsm6ds3::new(FakeBus::with_id(0x00), DEFAULT_ADDRESS);
        let result = block_on(imu.init()).map_err(crate::error::Error::from);
        assert_eq!(result, Err(crate::error::Error::ImuNotDetected(0x00)));

        let mut bus = FakeBus::with_id(0x69);
        bus.fail = true;
        let mut imu = Lsm6ds3::new(bus, DEFAULT_ADDRESS);
        let result = block_on(imu.init()).map_err(crate::error::Error::from);
        assert_eq!(result, Err(crate::error::Error::Imu));
    }

    #[test]
    fn bus_failure_is_reported() {
        let mut bus = FakeBus::with_id(0x69);
        bus.fail = true;
        let mut imu = Lsm6ds3::new(bus, DEFAULT_ADDRESS);
        assert_eq!(block_on(imu.init()), Err(Error::Bus(ErrorKind::Other)));
    }

    #[test]
    fn availability_follows_status_bits() {
        let mut bus = FakeBus::with_id(0x69);
        bus.regs[Register::StatusReg as usize] = STATUS_XLDA;
        let mut imu = Lsm6ds3::new(bus, DEFAULT_ADDRESS);
        assert_eq!(block_on(imu.acceleration_available()), Ok(true));
        assert_eq!(block_on(imu.gyroscope_available()), Ok(false));

        let mut bus = imu.release();
        bus.regs[Register::StatusReg as usize] = STATUS_XLDA | STATUS_GDA;
        let mut imu = Lsm6ds3::new(bus, DEFAULT_ADDRESS);
        assert_eq!(block_on(imu.gyroscope_available()), Ok(true));
    }

    #[test]
    fn acceleration_is_scaled_to_g() {
        let mut bus = FakeBus::with_id(0x69);
        put_i16(&mut bus.regs, Register::OutxLXl as u8, [16384, -8192, 8192]);
        let mut imu = Lsm6ds3::new(bus, DEFAULT_ADDRESS);
        let a = block_on(imu.read_acceleration()).unwrap();
        assert_eq!(a, Vector3::new(2.0, -1.0, 1.0));
    }

    #[test]
    fn angular_velocity_is_scaled_to_dps() {
        let mut bus = FakeBus::with_id(0x69);
        put_i16(&mut bus.regs, Register::OutxLG as u8, [-16384, 0, 32767]);
        let mut imu = Lsm6ds3::new(bus, DEFAULT_ADDRESS);
        let g = block_on(imu.read_gyroscope()).unwrap();
        assert_eq!(g.x, -1000.0);
        assert_eq!(g.y, 0.0);
        assert!((g.z - 1999.939).abs() < 1e-3);
    }
}
