//! Synth parameter descriptors and value updates.

use std::{fmt::Debug, ops::RangeInclusive};

use four_cc::FourCC;

// -------------------------------------------------------------------------------------------------

/// Describes the type of a [`Parameter`] to e.g. select a proper visual representation in a UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterType {
    /// A continuous floating-point value.
    Float {
        range: RangeInclusive<f32>,
        default: f32,
    },
    /// A discrete integer value.
    Integer {
        range: RangeInclusive<i32>,
        default: i32,
    },
    /// A choice from a list of strings (an enum).
    Enum {
        values: &'static [&'static str],
        default_index: usize,
    },
    /// A boolean toggle.
    Boolean { default: bool },
}

// -------------------------------------------------------------------------------------------------

/// Describes a single synth parameter for use in UIs or for automation.
///
/// All parameter kinds share a raw `f32` representation: floats are stored as they are,
/// integers as whole numbers, booleans as `0.0` or `1.0` and enums as variant index.
/// This allows storing any parameter value in a lock free atomic float.
pub trait Parameter: Debug + Send + Sync {
    /// The unique id of the parameter.
    fn id(&self) -> FourCC;

    /// The name of the parameter.
    fn name(&self) -> &'static str;

    /// The parameter type.
    fn parameter_type(&self) -> ParameterType;

    /// Default value of parameter in its raw representation.
    fn default_raw_value(&self) -> f32;

    /// Clamp and quantize the given raw value into the parameter's range.
    fn clamp_raw_value(&self, value: f32) -> f32;

    /// Convert a raw value to a normalized value in range \[0,1\].
    fn raw_to_normalized(&self, value: f32) -> f32;

    /// Convert a normalized value in range \[0,1\] to the raw value.
    fn normalized_to_raw(&self, normalized: f32) -> f32;

    /// Convert the given raw value to a string value.
    fn raw_value_to_string(&self, value: f32, include_unit: bool) -> String;

    /// Convert the given string value to a raw value.
    /// Returns `None` when conversion failed, else a valid, clamped raw value.
    fn string_to_raw_value(&self, string: &str) -> Option<f32>;
}

// -------------------------------------------------------------------------------------------------

/// An update for a [`Parameter`]'s value, applied to [`SynthParameters`](crate::SynthParameters).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValueUpdate {
    /// A plain value in the parameter's raw representation. Gets clamped into the valid range.
    Raw(f32),
    /// A float value in range `0.0..=1.0`.
    Normalized(f32),
}

// -------------------------------------------------------------------------------------------------

mod float;
pub use float::FloatParameter;

mod integer;
pub use integer::IntegerParameter;

mod r#enum;
pub use r#enum::EnumParameter;

mod boolean;
pub use boolean::BooleanParameter;

mod scaling;
pub use scaling::ParameterScaling;
