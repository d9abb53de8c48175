//! PDM microphone helpers: clock selection and level estimation

use num_traits::Float;

use crate::config::MicrophoneConfig;

/// PDM clock rates the nRF52840 can generate (32 MHz / integer divider)
pub const PDM_CLOCKS_HZ: [u32; 6] = [1_000_000, 1_032_258, 1_066_667, 1_230_769, 1_280_000, 1_333_333];

/// Decimation ratios of the nRF52840 PDM filter
pub const PDM_RATIOS: [u32; 2] = [64, 80];

/// PDM output is always 16-bit PCM
pub const PDM_BIT_DEPTH: u8 = 16;

/// Largest accepted deviation from the requested rate, in percent
pub const RATE_TOLERANCE_PERCENT: u32 = 2;

/// Microphone configuration the PDM peripheral cannot honor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MicrophoneError {
    /// No clock/ratio pair lands within tolerance of this rate
    UnsupportedRate(u32),
    /// Only 16-bit samples are produced
    UnsupportedBitDepth(u8),
}

impl core::fmt::Display for MicrophoneError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedRate(hz) => write!(f, "Unsupported PDM sample rate: {} Hz", hz),
            Self::UnsupportedBitDepth(bits) => write!(f, "Unsupported PDM bit depth: {}", bits),
        }
    }
}

impl core::error::Error for MicrophoneError {}

/// PDM clock and decimation ratio for a requested sample rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PdmTiming {
    pub clock_hz: u32,
    pub ratio: u32,
    /// Resulting sample rate (`clock_hz / ratio`)
    pub sample_rate_hz: u32,
}

/// Pick the clock/ratio pair whose output rate is closest to the request
pub fn pdm_timing(mic: &MicrophoneConfig) -> Result<PdmTiming, MicrophoneError> {
    if mic.bit_depth != PDM_BIT_DEPTH {
        return Err(MicrophoneError::UnsupportedBitDepth(mic.bit_depth));
    }
    let requested = mic.sample_rate_hz;

    let best = PDM_RATIOS
        .into_iter()
        .flat_map(|ratio| {
            PDM_CLOCKS_HZ.into_iter().map(move |clock_hz| PdmTiming {
                clock_hz,
                ratio,
                sample_rate_hz: clock_hz / ratio,
            })
        })
        .min_by_key(|t| t.sample_rate_hz.abs_diff(requested))
        .ok_or(MicrophoneError::UnsupportedRate(requested))?;

    let deviation = u64::from(best.sample_rate_hz.abs_diff(requested)) * 100;
    if requested == 0 || deviation > u64::from(requested) * u64::from(RATE_TOLERANCE_PERCENT) {
        return Err(MicrophoneError::UnsupportedRate(requested));
    }
    Ok(best)
}

/// RMS level of a block of PDM samples with the DC offset removed
///
/// The offset is the integer mean of the block; the result is truncated to
/// an integer. An empty block has level 0.
pub fn normalized_rms(samples: &[i16]) -> u32 {
    if samples.is_empty() {
        return 0;
    }
    let len = samples.len() as i64;
    let sum: i64 = samples.iter().map(|&s| i64::from(s)).sum();
    let offset = sum / len;

    let squares: f64 = samples
        .iter()
        .map(|&s| {
            let d = (i64::from(s) - offset) as f64;
            d * d
        })
        .sum();
    Float::sqrt(squares / len as f64) as u32
}
