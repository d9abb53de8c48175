#![deny(unsafe_code)]
#![deny(warnings)]
//! On-board NeoPixel (WS2812) status indicator
//!
//! The pixel is clocked out with the PWM peripheral: one 16 MHz PWM period
//! of 20 ticks (1.25 µs) per bit, duty cycle selecting 0 or 1, followed by
//! a run of low periods for the latch.

use datalogger_hal::{IndicatorState, Rgb, StatusIndicator};
use defmt::warn;
use embassy_nrf::pwm::{
    Config, Prescaler, SequenceConfig, SequenceLoad, SequencePwm, SingleSequenceMode,
    SingleSequencer,
};

/// Setting the top bit inverts polarity, which is what the WS2812 expects
const T1H: u16 = 0x8000 | 13;
const T0H: u16 = 0x8000 | 7;
const RES: u16 = 0x8000;

/// 24 data bits plus 40 latch periods (50 µs)
const WORDS: usize = 24 + 40;

/// Clock-out time for one full sequence in CPU cycles (64 MHz), with margin
const SEQUENCE_CYCLES: u32 = 64 * 100;

/// Single NeoPixel with a fixed brightness
pub struct NeoPixel<'d> {
    pwm: SequencePwm<'d>,
    brightness: f32,
    words: [u16; WORDS],
}

impl<'d> NeoPixel<'d> {
    pub fn new(pwm: SequencePwm<'d>, brightness: f32) -> Self {
        Self {
            pwm,
            brightness,
            words: [RES; WORDS],
        }
    }

    /// PWM configuration for WS2812 bit timing
    pub fn pwm_config() -> Config {
        let mut config = Config::default();
        config.sequence_load = SequenceLoad::Common;
        config.prescaler = Prescaler::Div1;
        config.max_duty = 20;
        config
    }

    fn show(&mut self, color: Rgb) {
        // WS2812 wire order is GRB, MSB first
        let bits = (color.g as u32) << 16 | (color.r as u32) << 8 | color.b as u32;
        for (i, word) in self.words[..24].iter_mut().enumerate() {
            *word = if bits & (1 << (23 - i)) != 0 { T1H } else { T0H };
        }

        let sequencer = SingleSequencer::new(&mut self.pwm, &self.words, SequenceConfig::default());
        if let Err(e) = sequencer.start(SingleSequenceMode::Times(1)) {
            warn!("NeoPixel update failed: {:?}", e);
            return;
        }
        // Dropping the sequencer stops the PWM; let the frame clock out first
        cortex_m::asm::delay(SEQUENCE_CYCLES);
    }
}

impl StatusIndicator for NeoPixel<'_> {
    fn set_state(&mut self, state: IndicatorState) {
        self.show(state.color().scaled(self.brightness));
    }
}
