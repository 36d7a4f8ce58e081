use four_cc::FourCC;

use super::{Parameter, ParameterType};

// -------------------------------------------------------------------------------------------------

/// A toggle parameter descriptor. Raw values are `0.0` (off) or `1.0` (on).
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanParameter {
    id: FourCC,
    name: &'static str,
    default: bool,
}

impl BooleanParameter {
    const ON: f32 = 1.0;
    const OFF: f32 = 0.0;

    pub const fn new(id: FourCC, name: &'static str, default: bool) -> Self {
        Self { id, name, default }
    }

    pub const fn default_value(&self) -> bool {
        self.default
    }

    /// Interpret a raw or normalized value as toggle state: everything >= 0.5 is on.
    pub fn is_on(value: f32) -> bool {
        value >= 0.5
    }

    fn raw_value(on: bool) -> f32 {
        if on {
            Self::ON
        } else {
            Self::OFF
        }
    }
}

impl Parameter for BooleanParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Boolean {
            default: self.default,
        }
    }

    fn default_raw_value(&self) -> f32 {
        Self::raw_value(self.default)
    }

    fn clamp_raw_value(&self, value: f32) -> f32 {
        Self::raw_value(Self::is_on(value))
    }

    fn raw_to_normalized(&self, value: f32) -> f32 {
        self.clamp_raw_value(value)
    }

    fn normalized_to_raw(&self, normalized: f32) -> f32 {
        self.clamp_raw_value(normalized)
    }

    fn raw_value_to_string(&self, value: f32, _include_unit: bool) -> String {
        let string = if Self::is_on(value) { "On" } else { "Off" };
        string.to_string()
    }

    fn string_to_raw_value(&self, string: &str) -> Option<f32> {
        match string.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Some(Self::ON),
            "off" | "false" | "no" | "0" => Some(Self::OFF),
            _ => None,
        }
    }
}

// -------------------------------------------------------------------------------------------------
