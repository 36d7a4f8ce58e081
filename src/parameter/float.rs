use std::ops::RangeInclusive;

use four_cc::FourCC;

use super::{Parameter, ParameterScaling, ParameterType};

// -------------------------------------------------------------------------------------------------

/// A continuous (float) parameter descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<f32>,
    default: f32,
    unit: &'static str,
    scaling: ParameterScaling,
}

impl FloatParameter {
    /// Create a new float parameter descriptor.
    pub const fn new(
        id: FourCC,
        name: &'static str,
        range: RangeInclusive<f32>,
        default: f32,
    ) -> Self {
        assert!(
            *range.start() < *range.end(),
            "Invalid parameter range"
        );
        assert!(
            default >= *range.start() && default <= *range.end(),
            "Invalid parameter default value"
        );
        Self {
            id,
            name,
            range,
            default,
            unit: "",
            scaling: ParameterScaling::Linear,
        }
    }

    /// Optional unit for string displays.
    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// Optional scaling which gets applied when converting normalized values.
    pub const fn with_scaling(mut self, scaling: ParameterScaling) -> Self {
        scaling.validate();
        self.scaling = scaling;
        self
    }

    /// The parameter's value range.
    pub fn range(&self) -> &RangeInclusive<f32> {
        &self.range
    }

    /// The parameter's default value.
    pub fn default_value(&self) -> f32 {
        self.default
    }

    /// The parameter's display unit.
    pub fn unit(&self) -> &'static str {
        self.unit
    }

    /// The parameter's normalized value scaling.
    pub fn scaling(&self) -> ParameterScaling {
        self.scaling
    }

    /// Clamp the given plain value to the parameter's range.
    pub fn clamp_value(&self, value: f32) -> f32 {
        value.clamp(*self.range.start(), *self.range.end())
    }

    /// Normalize the given plain value to a 0.0-1.0 range, applying the inverse scaling.
    pub fn normalize_value(&self, value: f32) -> f32 {
        let linear = (self.clamp_value(value) - *self.range.start())
            / (*self.range.end() - *self.range.start());
        self.scaling.unscale(linear)
    }

    /// Denormalize a 0.0-1.0 ranged value to the corresponding plain value, applying the scaling.
    pub fn denormalize_value(&self, normalized: f32) -> f32 {
        let scaled = self.scaling.scale(normalized.clamp(0.0, 1.0));
        *self.range.start() + scaled * (*self.range.end() - *self.range.start())
    }

    /// Convert the given plain value to a string.
    pub fn value_to_string(&self, value: f32, include_unit: bool) -> String {
        if include_unit && !self.unit.is_empty() {
            format!("{:.2} {}", value, self.unit)
        } else {
            format!("{:.2}", value)
        }
    }

    /// Convert the given string to a plain, clamped value.
    pub fn string_to_value(&self, string: &str) -> Option<f32> {
        let value = string
            .trim()
            .trim_end_matches(self.unit)
            .trim()
            .parse::<f32>()
            .ok()?;
        Some(self.clamp_value(value))
    }
}

impl Parameter for FloatParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Float {
            range: self.range.clone(),
            default: self.default,
        }
    }

    fn default_raw_value(&self) -> f32 {
        self.default
    }

    fn clamp_raw_value(&self, value: f32) -> f32 {
        self.clamp_value(value)
    }

    fn raw_to_normalized(&self, value: f32) -> f32 {
        self.normalize_value(value)
    }

    fn normalized_to_raw(&self, normalized: f32) -> f32 {
        self.denormalize_value(normalized)
    }

    fn raw_value_to_string(&self, value: f32, include_unit: bool) -> String {
        self.value_to_string(value, include_unit)
    }

    fn string_to_raw_value(&self, string: &str) -> Option<f32> {
        self.string_to_value(string)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DURATION: FloatParameter =
        FloatParameter::new(FourCC(*b"TDUR"), "Duration", 0.0..=30000.0, 1000.0)
            .with_scaling(ParameterScaling::Exponential(5.0))
            .with_unit("ms");

    #[test]
    fn normalization() {
        assert_eq!(DURATION.denormalize_value(0.0), 0.0);
        assert_eq!(DURATION.denormalize_value(1.0), 30000.0);
        assert!((DURATION.denormalize_value(0.5) - 937.5).abs() < 0.01);
        let normalized = DURATION.normalize_value(1000.0);
        assert!((DURATION.denormalize_value(normalized) - 1000.0).abs() < 0.1);
        // out of range values get clamped
        assert_eq!(DURATION.normalize_value(-10.0), 0.0);
        assert_eq!(DURATION.normalize_value(50000.0), 1.0);
    }

    #[test]
    fn string_conversion() {
        assert_eq!(DURATION.value_to_string(12.5, true), "12.50 ms");
        assert_eq!(DURATION.value_to_string(12.5, false), "12.50");
        assert_eq!(DURATION.string_to_value(" 250 ms"), Some(250.0));
        assert_eq!(DURATION.string_to_value("99999"), Some(30000.0));
        assert_eq!(DURATION.string_to_value("abc"), None);
    }
}
