//! Per grain amplitude window.

use std::f64::consts::PI;

// -------------------------------------------------------------------------------------------------

/// Grain window shape selection.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
    strum::EnumCount,
)]
#[repr(u8)]
pub enum GrainWindowShape {
    /// Linear attack ramp to the peak at the grain's center, then a linear release ramp.
    #[default]
    Triangle = 0,
    /// Raised cosine window: `sin²(π·i/(D-1))`.
    Hann = 1,
}

impl GrainWindowShape {
    /// Map a raw enum parameter value (the variant index) to a shape.
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => GrainWindowShape::Hann,
            _ => GrainWindowShape::Triangle,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Generates the amplitude multiplier of a single grain, one value per output sample.
///
/// The triangle shape is computed incrementally: the amplitude starts at zero, rises by
/// `peak / attack` until `attack = duration / 2` samples passed, then falls by
/// `peak / release` with `release = duration - attack - 1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrainEnvelope {
    shape: GrainWindowShape,
    peak: f32,
    amplitude: f32,
    increment: f32,
    current_sample: usize,
    duration_samples: usize,
    attack_samples: usize,
    release_samples: usize,
}

impl GrainEnvelope {
    /// Create a new, zeroed envelope. Use [`Self::init`] before fetching samples.
    pub const fn new() -> Self {
        Self {
            shape: GrainWindowShape::Triangle,
            peak: 0.0,
            amplitude: 0.0,
            increment: 0.0,
            current_sample: 0,
            duration_samples: 0,
            attack_samples: 0,
            release_samples: 0,
        }
    }

    /// (Re)start the envelope for a grain of the given duration and peak amplitude.
    /// `duration_samples` should be >= 2.
    pub fn init(&mut self, duration_samples: usize, peak: f32, shape: GrainWindowShape) {
        debug_assert!(duration_samples >= 2, "Grain duration must be >= 2 samples");
        self.shape = shape;
        self.peak = peak;
        self.amplitude = 0.0;
        self.current_sample = 0;
        self.duration_samples = duration_samples;
        self.attack_samples = duration_samples / 2;
        self.release_samples = duration_samples.saturating_sub(self.attack_samples + 1);
        self.increment = peak / self.attack_samples.max(1) as f32;
    }

    /// The window shape of the running envelope.
    pub fn shape(&self) -> GrainWindowShape {
        self.shape
    }

    /// Number of samples in the attack ramp.
    pub fn attack_samples(&self) -> usize {
        self.attack_samples
    }

    /// Number of samples in the release ramp.
    pub fn release_samples(&self) -> usize {
        self.release_samples
    }

    /// The amplitude that the next call to [`Self::next_sample`] returns.
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Return the current amplitude and advance by one sample.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let value = self.amplitude;
        match self.shape {
            GrainWindowShape::Triangle => {
                if self.current_sample == self.attack_samples {
                    self.increment = -(self.peak / self.release_samples.max(1) as f32);
                }
                self.amplitude += self.increment;
            }
            GrainWindowShape::Hann => {
                let phase = (self.current_sample + 1) as f64
                    / (self.duration_samples.max(2) - 1) as f64;
                let window = (PI * phase.min(1.0)).sin();
                self.amplitude = self.peak * (window * window) as f32;
            }
        }
        self.current_sample += 1;
        value
    }
}

// -------------------------------------------------------------------------------------------------
