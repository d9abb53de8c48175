//! Sensor capabilities
//!
//! Reads are synchronous and always succeed at this level. Bus errors are
//! the driver's business; a driver that cannot talk to its part reports
//! whatever value it last held.

/// Ambient temperature in degrees Celsius
pub trait Thermometer {
    fn temperature(&mut self) -> f32;
}

/// Barometric pressure in hectopascals
pub trait Barometer {
    fn pressure(&mut self) -> f32;
}

/// Approximate altitude in meters
pub trait Altimeter {
    fn altitude(&mut self) -> f32;
}

/// Relative humidity in percent (0-100)
pub trait Hygrometer {
    fn relative_humidity(&mut self) -> f32;
}

/// Linear acceleration `[x, y, z]` in m/s²
pub trait Accelerometer {
    fn acceleration(&mut self) -> [f32; 3];
}

/// Everything a sensor frame is built from
///
/// Implemented automatically for any type providing all five readings.
pub trait SensorSuite: Thermometer + Barometer + Altimeter + Hygrometer + Accelerometer {}

impl<T> SensorSuite for T where T: Thermometer + Barometer + Altimeter + Hygrometer + Accelerometer {}
