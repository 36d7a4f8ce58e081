//! Live synth parameters, shared between UI/control threads and the audio thread.

use std::{sync::atomic::Ordering, time::Duration};

use atomic_float::AtomicF32;
use four_cc::FourCC;
use strum::EnumCount;

use crate::{
    grain::GrainWindowShape,
    parameter::{
        BooleanParameter, EnumParameter, FloatParameter, IntegerParameter, Parameter,
        ParameterScaling, ParameterValueUpdate,
    },
    utils::adsr::AdsrParameters,
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Internal storage slots. Order must match [`SynthParameters::descriptors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumCount)]
#[repr(usize)]
enum Slot {
    MasterGain,
    NumGrains,
    GrainDuration,
    Position,
    PositionRandom,
    GrainSpeed,
    GrainShape,
    Attack,
    Decay,
    Sustain,
    Release,
    Reverb,
    RootNote,
}

static DESCRIPTORS: [&dyn Parameter; Slot::COUNT] = [
    &SynthParameters::MASTER_GAIN,
    &SynthParameters::NUM_GRAINS,
    &SynthParameters::GRAIN_DURATION,
    &SynthParameters::POSITION,
    &SynthParameters::POSITION_RANDOM,
    &SynthParameters::GRAIN_SPEED,
    &SynthParameters::GRAIN_SHAPE,
    &SynthParameters::ATTACK,
    &SynthParameters::DECAY,
    &SynthParameters::SUSTAIN,
    &SynthParameters::RELEASE,
    &SynthParameters::REVERB,
    &SynthParameters::ROOT_NOTE,
];

// -------------------------------------------------------------------------------------------------

/// Lock free store of all live synth parameter values.
///
/// Each value is a single atomic float, so writers (UI, automation) never block the audio
/// thread and readers never see torn values. There's no ordering between different
/// parameters: a change may apply at any grain boundary of a playing note.
///
/// Values are stored in their raw representation, see [`Parameter`].
#[derive(Debug)]
pub struct SynthParameters {
    values: [AtomicF32; Slot::COUNT],
}

impl SynthParameters {
    const MAX_TIME_MS: f32 = 30000.0;

    pub const MASTER_GAIN: FloatParameter =
        FloatParameter::new(FourCC(*b"MGAN"), "Master Gain", 0.0..=1.0, 1.0);

    pub const NUM_GRAINS: IntegerParameter =
        IntegerParameter::new(FourCC(*b"GNUM"), "Num Grains", 1..=8, 1);

    pub const GRAIN_DURATION: FloatParameter =
        FloatParameter::new(FourCC(*b"GDUR"), "Grain Duration", 1.0..=1000.0, 1.0)
            .with_scaling(ParameterScaling::Exponential(5.0));

    pub const POSITION: FloatParameter =
        FloatParameter::new(FourCC(*b"GPOS"), "Position", 0.0..=1.0, 0.0);

    pub const POSITION_RANDOM: FloatParameter =
        FloatParameter::new(FourCC(*b"GRND"), "Position Random", 0.0..=1.0, 0.0)
            .with_scaling(ParameterScaling::Exponential(5.0));

    pub const GRAIN_SPEED: FloatParameter =
        FloatParameter::new(FourCC(*b"GSPD"), "Grain Speed", -2.0..=2.0, 0.0);

    pub const GRAIN_SHAPE: EnumParameter = EnumParameter::new::<GrainWindowShape>(
        FourCC(*b"GSHP"),
        "Grain Shape",
        GrainWindowShape::Triangle as usize,
    );

    pub const ATTACK: FloatParameter = FloatParameter::new(
        FourCC(*b"AATK"),
        "Attack",
        0.0..=Self::MAX_TIME_MS,
        0.0,
    )
    .with_scaling(ParameterScaling::Exponential(5.0))
    .with_unit("ms");
    pub const DECAY: FloatParameter = FloatParameter::new(
        FourCC(*b"ADCY"),
        "Decay",
        0.0..=Self::MAX_TIME_MS,
        1000.0,
    )
    .with_scaling(ParameterScaling::Exponential(5.0))
    .with_unit("ms");
    pub const SUSTAIN: IntegerParameter =
        IntegerParameter::new(FourCC(*b"ASTN"), "Sustain", 0..=100, 100).with_unit("%");
    pub const RELEASE: FloatParameter = FloatParameter::new(
        FourCC(*b"AREL"),
        "Release",
        0.0..=Self::MAX_TIME_MS,
        1000.0,
    )
    .with_scaling(ParameterScaling::Exponential(5.0))
    .with_unit("ms");

    /// Reverb send toggle. Only stored here: the reverb lives in the host's effect chain.
    pub const REVERB: BooleanParameter =
        BooleanParameter::new(FourCC(*b"RVRB"), "Reverb Toggle", false);

    pub const ROOT_NOTE: IntegerParameter =
        IntegerParameter::new(FourCC(*b"ROOT"), "Root Note", 0..=127, 60);

    /// Create a new parameter set with all values set to their defaults.
    pub fn new() -> Self {
        let values = std::array::from_fn(|index| AtomicF32::new(DESCRIPTORS[index].default_raw_value()));
        Self { values }
    }

    /// Descriptors of all parameters, e.g. to build a UI.
    pub fn descriptors() -> &'static [&'static dyn Parameter] {
        &DESCRIPTORS
    }

    /// Find a parameter's descriptor by its id.
    pub fn descriptor(id: FourCC) -> Option<&'static dyn Parameter> {
        DESCRIPTORS.iter().find(|p| p.id() == id).copied()
    }

    /// Reset all values to their defaults.
    pub fn reset(&self) {
        for (value, descriptor) in self.values.iter().zip(DESCRIPTORS) {
            value.store(descriptor.default_raw_value(), Ordering::Relaxed);
        }
    }

    /// Get a parameter's raw value.
    pub fn value(&self, id: FourCC) -> Result<f32, Error> {
        let index = Self::slot_index(id)?;
        Ok(self.values[index].load(Ordering::Relaxed))
    }

    /// Get a parameter's value, normalized to range `0..=1`.
    pub fn normalized_value(&self, id: FourCC) -> Result<f32, Error> {
        let index = Self::slot_index(id)?;
        let value = self.values[index].load(Ordering::Relaxed);
        Ok(DESCRIPTORS[index].raw_to_normalized(value))
    }

    /// Set a parameter's raw value. The value gets clamped into the parameter's range.
    pub fn set_value(&self, id: FourCC, value: f32) -> Result<(), Error> {
        self.apply_update(id, ParameterValueUpdate::Raw(value))
    }

    /// Set a parameter's value from a normalized `0..=1` value.
    pub fn set_normalized(&self, id: FourCC, normalized: f32) -> Result<(), Error> {
        self.apply_update(id, ParameterValueUpdate::Normalized(normalized))
    }

    /// Apply a raw or normalized value update to the given parameter.
    pub fn apply_update(&self, id: FourCC, update: ParameterValueUpdate) -> Result<(), Error> {
        let index = Self::slot_index(id)?;
        let descriptor = DESCRIPTORS[index];
        let value = match update {
            ParameterValueUpdate::Raw(value) if value.is_finite() => {
                descriptor.clamp_raw_value(value)
            }
            ParameterValueUpdate::Normalized(normalized) if normalized.is_finite() => {
                descriptor.normalized_to_raw(normalized.clamp(0.0, 1.0))
            }
            _ => {
                log::warn!("Ignoring non finite value for parameter '{}'", id);
                return Err(Error::ParameterError(format!(
                    "Non finite value for parameter '{}'",
                    id
                )));
            }
        };
        self.values[index].store(value, Ordering::Relaxed);
        Ok(())
    }

    fn slot_index(id: FourCC) -> Result<usize, Error> {
        DESCRIPTORS
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| Error::ParameterError(format!("Unknown parameter id '{}'", id)))
    }

    #[inline]
    fn load(&self, slot: Slot) -> f32 {
        self.values[slot as usize].load(Ordering::Relaxed)
    }

    /// Linear output gain.
    pub fn master_gain(&self) -> f32 {
        self.load(Slot::MasterGain)
    }

    /// Number of overlapping grains per grain duration.
    pub fn num_grains(&self) -> usize {
        self.load(Slot::NumGrains).max(1.0) as usize
    }

    /// Grain duration as a multiple of the played note's period.
    pub fn grain_duration(&self) -> f64 {
        self.load(Slot::GrainDuration) as f64
    }

    /// Grain spawn start position, relative to the sample length.
    pub fn position(&self) -> f64 {
        self.load(Slot::Position) as f64
    }

    /// Random grain position spread, relative to the sample length.
    ///
    /// This is the control's normalized value: the skew only shapes the UI's display range.
    pub fn position_random(&self) -> f64 {
        Self::POSITION_RANDOM.raw_to_normalized(self.load(Slot::PositionRandom)) as f64
    }

    /// Spawn position drift in frames per output frame.
    pub fn grain_speed(&self) -> f64 {
        self.load(Slot::GrainSpeed) as f64
    }

    pub fn grain_shape(&self) -> GrainWindowShape {
        GrainWindowShape::from_index(self.load(Slot::GrainShape) as usize)
    }

    pub fn attack_ms(&self) -> f32 {
        self.load(Slot::Attack)
    }

    pub fn decay_ms(&self) -> f32 {
        self.load(Slot::Decay)
    }

    pub fn sustain_percent(&self) -> f32 {
        self.load(Slot::Sustain)
    }

    pub fn release_ms(&self) -> f32 {
        self.load(Slot::Release)
    }

    pub fn reverb_enabled(&self) -> bool {
        BooleanParameter::is_on(self.load(Slot::Reverb))
    }

    pub fn root_note(&self) -> u8 {
        self.load(Slot::RootNote).clamp(0.0, 127.0) as u8
    }

    /// Write current note envelope settings into the given ADSR parameters.
    pub fn apply_envelope(&self, envelope: &mut AdsrParameters) -> Result<(), Error> {
        let millis = |ms: f32| Duration::from_secs_f32(ms.max(0.0) / 1000.0);
        envelope.setup(
            millis(self.attack_ms()),
            millis(self.decay_ms()),
            (self.sustain_percent() / 100.0).clamp(0.0, 1.0),
            millis(self.release_ms()),
        )
    }
}

impl Default for SynthParameters {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
