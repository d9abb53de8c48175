//! Barometric altitude

use num_traits::Float;

/// Approximate altitude in meters for `pressure_hpa`, relative to the
/// sea-level reference `sea_level_hpa`
///
/// International barometric formula as used by BMP280-class drivers:
/// `44330 * (1 - (p / p0)^0.1903)`.
pub fn altitude_from_pressure(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    44330.0 * (1.0 - Float::powf(pressure_hpa / sea_level_hpa, 0.1903))
}
