//! Compiled-in logger configuration

/// Acquisition loop configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoggerConfig {
    /// Storage target, truncated on every boot (8.3 name for FAT volumes)
    pub storage_path: &'static str,
    /// Delay between samples in milliseconds
    pub sample_interval_ms: u32,
    /// Radio sample interval in milliseconds when storage was full
    pub full_storage_interval_ms: u32,
    /// Sea-level reference pressure in hPa for altitude computation
    pub sea_level_pressure_hpa: f32,
    /// Status pixel brightness (0.0-1.0), fixed at startup
    pub indicator_brightness: f32,
}

impl LoggerConfig {
    pub const DEFAULT: Self = Self {
        storage_path: "DATA.CSV",
        sample_interval_ms: 500,
        full_storage_interval_ms: 250,
        sea_level_pressure_hpa: 1013.25,
        indicator_brightness: 0.3,
    };
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// PDM microphone configuration
///
/// The microphone does not feed the sensor frame but must still be brought
/// up with these parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicrophoneConfig {
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
    /// Bits per sample
    pub bit_depth: u8,
}

impl MicrophoneConfig {
    pub const DEFAULT: Self = Self {
        sample_rate_hz: 16_000,
        bit_depth: 16,
    };
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
