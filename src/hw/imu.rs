//! MPU6050 driver: blocking register access over I²C.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use imu2sd::hal::{ImuSensor, RawImuSample};

const MPU6050_ADDR: u8 = 0x68;

const REG_SMPLRT_DIV: u8 = 0x19;
const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_PWR_MGMT_1: u8 = 0x6B;

const DEVICE_RESET: u8 = 0x80;

/// MPU6050 over blocking I²C, configured for ±2 g and ±250 °/s so the raw
/// counts match the core's conversion constants.
pub struct Mpu6050<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Mpu6050<I2C> {
    /// Reset the device, wake it and configure rate, filter and ranges.
    pub fn new(mut i2c: I2C, delay: &mut impl DelayNs) -> Result<Self, I2C::Error> {
        i2c.write(MPU6050_ADDR, &[REG_PWR_MGMT_1, DEVICE_RESET])?;
        delay.delay_ms(100);
        i2c.write(MPU6050_ADDR, &[REG_PWR_MGMT_1, 0x00])?;
        delay.delay_ms(10);

        // 1 kHz / (1 + 7) = 125 Hz internal sample rate.
        i2c.write(MPU6050_ADDR, &[REG_SMPLRT_DIV, 0x07])?;
        // DLPF at 44 Hz (accel) / 42 Hz (gyro).
        i2c.write(MPU6050_ADDR, &[REG_CONFIG, 0x03])?;
        // ±250 °/s and ±2 g full scale.
        i2c.write(MPU6050_ADDR, &[REG_GYRO_CONFIG, 0x00])?;
        i2c.write(MPU6050_ADDR, &[REG_ACCEL_CONFIG, 0x00])?;

        Ok(Self { i2c })
    }
}

impl<I2C: I2c> ImuSensor for Mpu6050<I2C> {
    type Error = I2C::Error;

    /// One burst read covering accel, temperature and gyro registers.
    fn read_raw(&mut self) -> Result<RawImuSample, I2C::Error> {
        let mut data = [0u8; 14];
        self.i2c
            .write_read(MPU6050_ADDR, &[REG_ACCEL_XOUT_H], &mut data)?;

        let word = |i: usize| i16::from_be_bytes([data[i], data[i + 1]]);
        Ok(RawImuSample {
            accel: [word(0), word(2), word(4)],
            temp: word(6),
            gyro: [word(8), word(10), word(12)],
        })
    }
}
