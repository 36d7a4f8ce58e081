use std::ops::RangeInclusive;

use four_cc::FourCC;

use super::{Parameter, ParameterType};

// -------------------------------------------------------------------------------------------------

/// A discrete (integer) parameter descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegerParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<i32>,
    default: i32,
    unit: &'static str,
}

impl IntegerParameter {
    pub const fn new(
        id: FourCC,
        name: &'static str,
        range: RangeInclusive<i32>,
        default: i32,
    ) -> Self {
        assert!(*range.start() < *range.end(), "Invalid parameter range");
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
        }
    }

    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    pub fn range(&self) -> &RangeInclusive<i32> {
        &self.range
    }

    pub fn default_value(&self) -> i32 {
        self.default
    }

    pub fn clamp_value(&self, value: i32) -> i32 {
        value.clamp(*self.range.start(), *self.range.end())
    }

    pub fn normalize_value(&self, value: i32) -> f32 {
        (self.clamp_value(value) as f32 - *self.range.start() as f32)
            / (*self.range.end() as f32 - *self.range.start() as f32)
    }

    pub fn denormalize_value(&self, normalized: f32) -> i32 {
        let normalized = normalized.clamp(0.0, 1.0);
        let value = *self.range.start() as f32
            + normalized * (*self.range.end() as f32 - *self.range.start() as f32);
        value.round() as i32
    }
}

impl Parameter for IntegerParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Integer {
            range: self.range.clone(),
            default: self.default,
        }
    }

    fn default_raw_value(&self) -> f32 {
        self.default as f32
    }

    fn clamp_raw_value(&self, value: f32) -> f32 {
        self.clamp_value(value.round() as i32) as f32
    }

    fn raw_to_normalized(&self, value: f32) -> f32 {
        self.normalize_value(value.round() as i32)
    }

    fn normalized_to_raw(&self, normalized: f32) -> f32 {
        self.denormalize_value(normalized) as f32
    }

    fn raw_value_to_string(&self, value: f32, include_unit: bool) -> String {
        let value = value.round() as i32;
        if include_unit && !self.unit.is_empty() {
            format!("{} {}", value, self.unit)
        } else {
            value.to_string()
        }
    }

    fn string_to_raw_value(&self, string: &str) -> Option<f32> {
        let value = string
            .trim()
            .trim_end_matches(self.unit)
            .trim()
            .parse::<i32>()
            .ok()?;
        Some(self.clamp_value(value) as f32)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_are_quantized() {
        let sustain = IntegerParameter::new(FourCC(*b"TSUS"), "Sustain", 0..=100, 100).with_unit("%");
        assert_eq!(sustain.clamp_raw_value(42.4), 42.0);
        assert_eq!(sustain.clamp_raw_value(142.0), 100.0);
        assert_eq!(sustain.normalized_to_raw(0.514), 51.0);
        assert_eq!(sustain.raw_to_normalized(25.0), 0.25);
        assert_eq!(sustain.raw_value_to_string(50.0, true), "50 %");
        assert_eq!(sustain.string_to_raw_value("75%"), Some(75.0));
    }
}
