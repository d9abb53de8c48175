#![deny(unsafe_code)]
#![deny(warnings)]
//! PDM microphone bring-up
//!
//! The microphone does not feed the sensor frame. It is initialized with
//! the configured rate and depth and one block is sampled so the log shows
//! whether it is alive.

use datalogger_core::sound::{normalized_rms, pdm_timing, MicrophoneError};
use datalogger_core::MicrophoneConfig;
use defmt::{info, warn};
use embassy_nrf::pdm::{self, Frequency, Pdm, Ratio};

/// Samples per level check (~10 ms at 16 kHz)
const BLOCK_LEN: usize = 160;

/// PDM configuration for `mic`
///
/// Fails if no PDM clock and decimation ratio come close enough to the
/// requested rate, or if the depth is not 16 bits.
pub fn pdm_config(mic: &MicrophoneConfig) -> Result<pdm::Config, MicrophoneError> {
    let timing = pdm_timing(mic)?;
    let mut config = pdm::Config::default();
    config.frequency = match timing.clock_hz {
        1_000_000 => Frequency::_1000K,
        1_066_667 => Frequency::_1067K,
        1_230_769 => Frequency::_1231K,
        1_280_000 => Frequency::_1280K,
        1_333_333 => Frequency::_1333K,
        _ => Frequency::DEFAULT,
    };
    config.ratio = if timing.ratio == 80 {
        Ratio::RATIO80
    } else {
        Ratio::RATIO64
    };
    info!(
        "PDM microphone: {} Hz requested, {} Hz ({} Hz clock / {}), {}-bit samples",
        mic.sample_rate_hz, timing.sample_rate_hz, timing.clock_hz, timing.ratio, mic.bit_depth
    );
    Ok(config)
}

/// Sample one block and log its level
pub async fn check_level(pdm: &mut Pdm<'_>) {
    let mut block = [0i16; BLOCK_LEN];
    pdm.start().await;
    match pdm.sample(&mut block).await {
        Ok(()) => info!("Microphone level: {}", normalized_rms(&block)),
        Err(e) => warn!("Microphone sample failed: {:?}", e),
    }
    pdm.stop().await;
}
