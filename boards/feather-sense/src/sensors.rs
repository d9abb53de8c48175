#![deny(unsafe_code)]
#![deny(warnings)]
//! On-board environmental and motion sensors
//!
//! Minimal register-level drivers for the three parts the logger reads,
//! sharing one blocking I2C bus:
//! - **BMP280** (0x77): temperature and pressure, altitude derived
//! - **SHT31-D** (0x44): relative humidity
//! - **LSM6DS33** (0x6A): acceleration
//!
//! The APDS9960 (0x39) and LIS3MDL (0x1C) share the bus. They are enabled
//! at startup but never read.
//!
//! Reads never fail from the caller's point of view. A transfer error is
//! logged and the driver returns the last good value.

use datalogger_core::altitude::altitude_from_pressure;
use datalogger_core::checksum::sensirion_crc8;
use datalogger_hal::{Accelerometer, Altimeter, Barometer, Hygrometer, Thermometer};
use defmt::{info, warn, Format};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// Sensor bring-up errors
#[derive(Debug, Clone, Copy, Format)]
pub enum SensorError {
    /// Bus transfer failed
    Bus,
    /// WHO_AM_I / chip ID did not match
    WrongChip { address: u8, id: u8 },
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus => write!(f, "I2C bus error"),
            Self::WrongChip { address, id } => {
                write!(f, "Unexpected chip ID {:#04x} at {:#04x}", id, address)
            }
        }
    }
}

impl core::error::Error for SensorError {}

fn read_reg<I: I2c>(i2c: &mut I, address: u8, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
    i2c.write_read(address, &[reg], buf)
        .map_err(|_| SensorError::Bus)
}

fn write_reg<I: I2c>(i2c: &mut I, address: u8, reg: u8, value: u8) -> Result<(), SensorError> {
    i2c.write(address, &[reg, value]).map_err(|_| SensorError::Bus)
}

/// BMP280 factory trim values
#[derive(Debug, Clone, Copy, Default)]
struct Bmp280Calibration {
    t1: f64,
    t2: f64,
    t3: f64,
    p: [f64; 9],
}

impl Bmp280Calibration {
    fn parse(raw: &[u8; 24]) -> Self {
        let u = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]) as f64;
        let s = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]) as f64;
        Self {
            t1: u(0),
            t2: s(2),
            t3: s(4),
            p: [u(6), s(8), s(10), s(12), s(14), s(16), s(18), s(20), s(22)],
        }
    }
}

/// Bosch BMP280 barometric pressure sensor
pub struct Bmp280<I> {
    i2c: I,
    calibration: Bmp280Calibration,
    sea_level_hpa: f32,
    temperature: f32,
    pressure: f32,
}

impl<I: I2c> Bmp280<I> {
    const ADDRESS: u8 = 0x77;
    const CHIP_ID: u8 = 0x58;
    const REG_CALIB: u8 = 0x88;
    const REG_ID: u8 = 0xD0;
    const REG_CTRL_MEAS: u8 = 0xF4;
    const REG_CONFIG: u8 = 0xF5;
    const REG_DATA: u8 = 0xF7;

    pub fn new(mut i2c: I, sea_level_hpa: f32) -> Result<Self, SensorError> {
        let mut id = [0u8];
        read_reg(&mut i2c, Self::ADDRESS, Self::REG_ID, &mut id)?;
        if id[0] != Self::CHIP_ID {
            return Err(SensorError::WrongChip {
                address: Self::ADDRESS,
                id: id[0],
            });
        }

        let mut raw = [0u8; 24];
        read_reg(&mut i2c, Self::ADDRESS, Self::REG_CALIB, &mut raw)?;

        // Standby 0.5 ms, filter off
        write_reg(&mut i2c, Self::ADDRESS, Self::REG_CONFIG, 0x00)?;
        // Temperature x2, pressure x16, normal mode
        write_reg(&mut i2c, Self::ADDRESS, Self::REG_CTRL_MEAS, 0b010_101_11)?;

        info!("BMP280 ready (sea level {} hPa)", sea_level_hpa);
        Ok(Self {
            i2c,
            calibration: Bmp280Calibration::parse(&raw),
            sea_level_hpa,
            temperature: 0.0,
            pressure: sea_level_hpa,
        })
    }

    /// Burst-read both channels and compensate them
    fn refresh(&mut self) {
        let mut data = [0u8; 6];
        if let Err(e) = read_reg(&mut self.i2c, Self::ADDRESS, Self::REG_DATA, &mut data) {
            warn!("BMP280 read failed: {}", e);
            return;
        }
        let adc_p = ((data[0] as u32) << 12 | (data[1] as u32) << 4 | (data[2] as u32) >> 4) as f64;
        let adc_t = ((data[3] as u32) << 12 | (data[4] as u32) << 4 | (data[5] as u32) >> 4) as f64;
        let c = &self.calibration;

        // Datasheet floating-point compensation, section 8.1
        let var1 = (adc_t / 16384.0 - c.t1 / 1024.0) * c.t2;
        let d = adc_t / 131072.0 - c.t1 / 8192.0;
        let var2 = d * d * c.t3;
        let t_fine = var1 + var2;
        self.temperature = (t_fine / 5120.0) as f32;

        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * c.p[5] / 32768.0;
        var2 += var1 * c.p[4] * 2.0;
        var2 = var2 / 4.0 + c.p[3] * 65536.0;
        var1 = (c.p[2] * var1 * var1 / 524288.0 + c.p[1] * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * c.p[0];
        if var1 == 0.0 {
            return;
        }
        let mut p = 1048576.0 - adc_p;
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        let var1 = c.p[8] * p * p / 2147483648.0;
        let var2 = p * c.p[7] / 32768.0;
        p += (var1 + var2 + c.p[6]) / 16.0;
        self.pressure = (p / 100.0) as f32;
    }
}

impl<I: I2c> Thermometer for Bmp280<I> {
    fn temperature(&mut self) -> f32 {
        self.refresh();
        self.temperature
    }
}

impl<I: I2c> Barometer for Bmp280<I> {
    fn pressure(&mut self) -> f32 {
        self.refresh();
        self.pressure
    }
}

impl<I: I2c> Altimeter for Bmp280<I> {
    fn altitude(&mut self) -> f32 {
        self.refresh();
        altitude_from_pressure(self.pressure, self.sea_level_hpa)
    }
}

/// Sensirion SHT31-D humidity sensor
pub struct Sht31<I, D> {
    i2c: I,
    delay: D,
    humidity: f32,
}

impl<I: I2c, D: DelayNs> Sht31<I, D> {
    const ADDRESS: u8 = 0x44;
    /// Single shot, high repeatability, no clock stretching
    const CMD_MEASURE: [u8; 2] = [0x24, 0x00];
    const CMD_SOFT_RESET: [u8; 2] = [0x30, 0xA2];

    pub fn new(mut i2c: I, mut delay: D) -> Result<Self, SensorError> {
        i2c.write(Self::ADDRESS, &Self::CMD_SOFT_RESET)
            .map_err(|_| SensorError::Bus)?;
        delay.delay_ms(2);
        info!("SHT31-D ready");
        Ok(Self {
            i2c,
            delay,
            humidity: 0.0,
        })
    }

    fn measure(&mut self) -> Result<f32, SensorError> {
        self.i2c
            .write(Self::ADDRESS, &Self::CMD_MEASURE)
            .map_err(|_| SensorError::Bus)?;
        // Max conversion time for high repeatability is 15 ms
        self.delay.delay_ms(16);
        let mut data = [0u8; 6];
        self.i2c
            .read(Self::ADDRESS, &mut data)
            .map_err(|_| SensorError::Bus)?;
        if sensirion_crc8(&data[3..5]) != data[5] {
            return Err(SensorError::Bus);
        }
        let raw = u16::from_be_bytes([data[3], data[4]]) as f32;
        Ok(100.0 * raw / 65535.0)
    }
}

impl<I: I2c, D: DelayNs> Hygrometer for Sht31<I, D> {
    fn relative_humidity(&mut self) -> f32 {
        match self.measure() {
            Ok(rh) => self.humidity = rh,
            Err(e) => warn!("SHT31 read failed: {}", e),
        }
        self.humidity
    }
}

/// ST LSM6DS33 accelerometer/gyroscope (accelerometer only)
pub struct Lsm6ds33<I> {
    i2c: I,
    acceleration: [f32; 3],
}

impl<I: I2c> Lsm6ds33<I> {
    const ADDRESS: u8 = 0x6A;
    const WHO_AM_I: u8 = 0x69;
    const REG_WHO_AM_I: u8 = 0x0F;
    const REG_CTRL1_XL: u8 = 0x10;
    const REG_OUTX_L_XL: u8 = 0x28;
    /// ±4 g full scale: 0.122 mg/LSB
    const MS2_PER_LSB: f32 = 0.122e-3 * 9.80665;

    pub fn new(mut i2c: I) -> Result<Self, SensorError> {
        let mut id = [0u8];
        read_reg(&mut i2c, Self::ADDRESS, Self::REG_WHO_AM_I, &mut id)?;
        if id[0] != Self::WHO_AM_I {
            return Err(SensorError::WrongChip {
                address: Self::ADDRESS,
                id: id[0],
            });
        }
        // 104 Hz, ±4 g
        write_reg(&mut i2c, Self::ADDRESS, Self::REG_CTRL1_XL, 0x48)?;
        info!("LSM6DS33 ready");
        Ok(Self {
            i2c,
            acceleration: [0.0; 3],
        })
    }
}

impl<I: I2c> Accelerometer for Lsm6ds33<I> {
    fn acceleration(&mut self) -> [f32; 3] {
        let mut data = [0u8; 6];
        match read_reg(&mut self.i2c, Self::ADDRESS, Self::REG_OUTX_L_XL, &mut data) {
            Ok(()) => {
                for (axis, raw) in self.acceleration.iter_mut().zip(data.chunks_exact(2)) {
                    *axis = i16::from_le_bytes([raw[0], raw[1]]) as f32 * Self::MS2_PER_LSB;
                }
            }
            Err(e) => warn!("LSM6DS33 read failed: {}", e),
        }
        self.acceleration
    }
}

fn check_id<I: I2c>(i2c: &mut I, address: u8, reg: u8, expected: &[u8]) -> Result<(), SensorError> {
    let mut id = [0u8];
    read_reg(i2c, address, reg, &mut id)?;
    if !expected.contains(&id[0]) {
        return Err(SensorError::WrongChip { address, id: id[0] });
    }
    Ok(())
}

/// Power up the APDS9960 with proximity and color sensing enabled
///
/// Its readings are not part of the frame; the part is only brought up.
pub fn enable_apds9960<I: I2c>(i2c: &mut I) -> Result<(), SensorError> {
    const ADDRESS: u8 = 0x39;
    const REG_ENABLE: u8 = 0x80;
    const REG_ID: u8 = 0x92;
    // PON | AEN | PEN
    const ENABLE: u8 = 0b0000_0111;

    // 0xAB on production parts, 0xA8 and 0x9C on some lots
    check_id(i2c, ADDRESS, REG_ID, &[0xAB, 0xA8, 0x9C])?;
    write_reg(i2c, ADDRESS, REG_ENABLE, ENABLE)?;
    info!("APDS9960 ready (proximity, color)");
    Ok(())
}

/// Put the LIS3MDL magnetometer in continuous conversion
///
/// Like the APDS9960 it does not feed the frame.
pub fn enable_lis3mdl<I: I2c>(i2c: &mut I) -> Result<(), SensorError> {
    const ADDRESS: u8 = 0x1C;
    const REG_WHO_AM_I: u8 = 0x0F;
    const REG_CTRL_REG1: u8 = 0x20;
    const REG_CTRL_REG3: u8 = 0x22;

    check_id(i2c, ADDRESS, REG_WHO_AM_I, &[0x3D])?;
    // 10 Hz, then MD = 00 (continuous)
    write_reg(i2c, ADDRESS, REG_CTRL_REG1, 0x10)?;
    write_reg(i2c, ADDRESS, REG_CTRL_REG3, 0x00)?;
    info!("LIS3MDL ready");
    Ok(())
}

/// The Feather Sense sensor set
pub struct SenseSensors<I, D> {
    pub bmp280: Bmp280<I>,
    pub sht31: Sht31<I, D>,
    pub lsm6ds33: Lsm6ds33<I>,
}

impl<I: I2c, D: DelayNs> Thermometer for SenseSensors<I, D> {
    fn temperature(&mut self) -> f32 {
        self.bmp280.temperature()
    }
}

impl<I: I2c, D: DelayNs> Barometer for SenseSensors<I, D> {
    fn pressure(&mut self) -> f32 {
        self.bmp280.pressure()
    }
}

impl<I: I2c, D: DelayNs> Altimeter for SenseSensors<I, D> {
    fn altitude(&mut self) -> f32 {
        self.bmp280.altitude()
    }
}

impl<I: I2c, D: DelayNs> Hygrometer for SenseSensors<I, D> {
    fn relative_humidity(&mut self) -> f32 {
        self.sht31.relative_humidity()
    }
}

impl<I: I2c, D: DelayNs> Accelerometer for SenseSensors<I, D> {
    fn acceleration(&mut self) -> [f32; 3] {
        self.lsm6ds33.acceleration()
    }
}
