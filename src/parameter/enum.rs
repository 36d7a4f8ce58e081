use four_cc::FourCC;
use strum::VariantNames;

use super::{Parameter, ParameterType};

// -------------------------------------------------------------------------------------------------

/// An enum parameter descriptor. Raw values are variant indices.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumParameter {
    id: FourCC,
    name: &'static str,
    values: &'static [&'static str],
    default_index: usize,
}

impl EnumParameter {
    /// Create a new enum descriptor from an enum with [`VariantNames`] and the default
    /// variant's index.
    pub const fn new<E: VariantNames>(id: FourCC, name: &'static str, default_index: usize) -> Self {
        assert!(E::VARIANTS.len() > 1, "Enum parameters need at least two variants");
        assert!(
            default_index < E::VARIANTS.len(),
            "Invalid parameter default value"
        );
        Self {
            id,
            name,
            values: E::VARIANTS,
            default_index,
        }
    }

    pub fn values(&self) -> &'static [&'static str] {
        self.values
    }

    pub fn default_index(&self) -> usize {
        self.default_index
    }

    pub fn clamp_index(&self, value: f32) -> usize {
        (value.round().max(0.0) as usize).min(self.values.len() - 1)
    }

    pub fn normalize_index(&self, index: usize) -> f32 {
        index.min(self.values.len() - 1) as f32 / (self.values.len() - 1) as f32
    }

    pub fn denormalize_index(&self, normalized: f32) -> usize {
        let normalized = normalized.clamp(0.0, 1.0);
        (normalized * (self.values.len() - 1) as f32).round() as usize
    }
}

impl Parameter for EnumParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Enum {
            values: self.values,
            default_index: self.default_index,
        }
    }

    fn default_raw_value(&self) -> f32 {
        self.default_index as f32
    }

    fn clamp_raw_value(&self, value: f32) -> f32 {
        self.clamp_index(value) as f32
    }

    fn raw_to_normalized(&self, value: f32) -> f32 {
        self.normalize_index(self.clamp_index(value))
    }

    fn normalized_to_raw(&self, normalized: f32) -> f32 {
        self.denormalize_index(normalized) as f32
    }

    fn raw_value_to_string(&self, value: f32, _include_unit: bool) -> String {
        self.values[self.clamp_index(value)].to_string()
    }

    fn string_to_raw_value(&self, string: &str) -> Option<f32> {
        let string = string.trim();
        self.values
            .iter()
            .position(|v| v.eq_ignore_ascii_case(string))
            .map(|index| index as f32)
    }
}
