//! Single-pixel status indicator

/// Operating phase shown on the status pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorState {
    /// Pixel dark
    Off,
    /// Sampling to local storage (green)
    SamplingStorage,
    /// Sampling to the radio link (blue)
    SamplingRadio,
}

impl IndicatorState {
    /// Full-intensity color for this state
    pub const fn color(self) -> Rgb {
        match self {
            Self::Off => Rgb::OFF,
            Self::SamplingStorage => Rgb::GREEN,
            Self::SamplingRadio => Rgb::BLUE,
        }
    }
}

/// 8-bit RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Self = Self::new(0, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `brightness`, clamped to `0.0..=1.0`
    ///
    /// NaN is treated as fully dark.
    pub fn scaled(self, brightness: f32) -> Self {
        let level = if brightness.is_nan() {
            0.0
        } else {
            brightness.clamp(0.0, 1.0)
        };
        let scale = |c: u8| (c as f32 * level) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

/// Status pixel driver
///
/// Fire-and-forget: setting a state has no observable failure mode.
pub trait StatusIndicator {
    /// Show `state` on the pixel
    fn set_state(&mut self, state: IndicatorState);
}
