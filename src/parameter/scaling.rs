/// Skew of a [`FloatParameter`](super::FloatParameter)'s normalized range.
///
/// Normalized values from UIs or automation get skewed before they are mapped into the
/// parameter's range, and unskewed when normalizing raw values.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum ParameterScaling {
    /// Normalized values map linearly into the range.
    #[default]
    Linear,
    /// `y = x^exponent` with `exponent > 0`. Exponents > 1 spread small values over most of
    /// the normalized range: the grain and envelope time controls use 5.
    Exponential(f32),
}

impl ParameterScaling {
    /// Skew a normalized value.
    pub fn scale(&self, normalized: f32) -> f32 {
        debug_assert!((0.0..=1.0).contains(&normalized), "Expecting a normalized value");
        match self.exponent() {
            Some(exponent) => normalized.powf(exponent),
            None => normalized,
        }
    }

    /// Undo [`Self::scale`].
    pub fn unscale(&self, scaled: f32) -> f32 {
        debug_assert!((0.0..=1.0).contains(&scaled), "Expecting a normalized value");
        match self.exponent() {
            Some(exponent) => scaled.powf(1.0 / exponent),
            None => scaled,
        }
    }

    fn exponent(&self) -> Option<f32> {
        match *self {
            Self::Linear => None,
            Self::Exponential(exponent) => Some(exponent.max(f32::EPSILON)),
        }
    }

    /// Panics at compile time when used in const descriptors with an invalid exponent.
    pub(crate) const fn validate(&self) {
        if let Self::Exponential(exponent) = *self {
            assert!(exponent > 0.0, "Exponential scaling needs an exponent > 0");
        }
    }
}

// -------------------------------------------------------------------------------------------------
