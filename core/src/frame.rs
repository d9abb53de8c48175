//! Sensor frames and their text record encoding
//!
//! One frame is built per loop iteration, written to exactly one sink and
//! then dropped. Both sinks share the record layout:
//!
//! ```text
//! $,<temp>,<pres>,<alt>,<humid>,<accel_x>,<accel_y>,<accel_z>\n
//! ```
//!
//! Every field carries exactly two decimal places.

use core::fmt::Write;

use datalogger_hal::SensorSuite;
use heapless::String;

/// Record boundary marker expected by downstream consumers
pub const SENTINEL: char = '$';

/// Maximum encoded record length in bytes
///
/// Realistic readings need well under 80 bytes; only absurd magnitudes
/// (e.g. `f32::MAX`) overflow.
pub const RECORD_CAPACITY: usize = 128;

/// One encoded record line
pub type Record = String<RECORD_CAPACITY>;

/// Frame encoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Encoded record does not fit in [`RECORD_CAPACITY`] bytes
    RecordTooLong,
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RecordTooLong => write!(f, "Record too long"),
        }
    }
}

impl core::error::Error for FrameError {}

/// One set of readings in fixed field order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFrame {
    temperature: f32,
    pressure: f32,
    altitude: f32,
    humidity: f32,
    acceleration: [f32; 3],
}

impl SensorFrame {
    /// Number of numeric fields in a record
    pub const FIELD_COUNT: usize = 7;

    pub const fn new(
        temperature: f32,
        pressure: f32,
        altitude: f32,
        humidity: f32,
        acceleration: [f32; 3],
    ) -> Self {
        Self {
            temperature,
            pressure,
            altitude,
            humidity,
            acceleration,
        }
    }

    /// Temperature in °C
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Pressure in hPa
    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    /// Altitude in m
    pub fn altitude(&self) -> f32 {
        self.altitude
    }

    /// Relative humidity in %
    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    /// Acceleration `[x, y, z]` in m/s²
    pub fn acceleration(&self) -> [f32; 3] {
        self.acceleration
    }

    /// All fields in record order
    pub fn fields(&self) -> [f32; Self::FIELD_COUNT] {
        let [x, y, z] = self.acceleration;
        [
            self.temperature,
            self.pressure,
            self.altitude,
            self.humidity,
            x,
            y,
            z,
        ]
    }

    /// Encode as one newline-terminated record line
    pub fn encode(&self) -> Result<Record, FrameError> {
        let mut record = Record::new();
        record
            .push(SENTINEL)
            .map_err(|_| FrameError::RecordTooLong)?;
        for field in self.fields() {
            write!(record, ",{:.2}", field).map_err(|_| FrameError::RecordTooLong)?;
        }
        record.push('\n').map_err(|_| FrameError::RecordTooLong)?;
        Ok(record)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SensorFrame {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(
            f,
            "SensorFrame(temperature: {}, pressure: {}, altitude: {}, humidity: {}, acceleration: {})",
            self.temperature,
            self.pressure,
            self.altitude,
            self.humidity,
            self.acceleration
        );
    }
}

/// Assembles frames from the sensor set
///
/// Reads every source once per frame, without retry.
pub struct FrameBuilder<S> {
    sensors: S,
}

impl<S: SensorSuite> FrameBuilder<S> {
    pub fn new(sensors: S) -> Self {
        Self { sensors }
    }

    /// Read all sensors into a new frame
    pub fn build(&mut self) -> SensorFrame {
        let temperature = self.sensors.temperature();
        let pressure = self.sensors.pressure();
        let altitude = self.sensors.altitude();
        let humidity = self.sensors.relative_humidity();
        let acceleration = self.sensors.acceleration();
        SensorFrame::new(temperature, pressure, altitude, humidity, acceleration)
    }

    /// Access the underlying sensor set
    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }
}
