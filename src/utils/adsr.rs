//! Linear ADSR envelope, used as note gate for the granular voices.

use std::time::Duration;

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Current processing stage in a [`AdsrEnvelope`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum AdsrStage {
    #[default]
    /// Before attack and after release (zero volume).
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

// -------------------------------------------------------------------------------------------------

/// ADSR envelope parameters that define the envelope shape for a [`AdsrEnvelope`].
///
/// Zero durations skip the corresponding stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AdsrParameters {
    sample_rate: u32,
    attack_time: Duration,
    attack_rate: f32,
    decay_time: Duration,
    decay_rate: f32,
    sustain_level: f32,
    release_time: Duration,
}

impl AdsrParameters {
    /// Create new ADSR parameters for the given output sample rate.
    ///
    /// `sustain_level` is in range \[0.0, 1.0\].
    pub fn new(
        sample_rate: u32,
        attack_time: Duration,
        decay_time: Duration,
        sustain_level: f32,
        release_time: Duration,
    ) -> Result<Self, Error> {
        let mut parameters = Self {
            sample_rate: 0,
            attack_time: Duration::ZERO,
            attack_rate: 0.0,
            decay_time: Duration::ZERO,
            decay_rate: 0.0,
            sustain_level: 1.0,
            release_time: Duration::ZERO,
        };
        parameters.set_sample_rate(sample_rate)?;
        parameters.setup(attack_time, decay_time, sustain_level, release_time)?;
        Ok(parameters)
    }

    /// Get currently applied sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Set a new sample rate and recalculate internal rates.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), Error> {
        if sample_rate == 0 {
            return Err(Error::ParameterError(
                "Envelope sample rate must be > 0".to_string(),
            ));
        }
        self.sample_rate = sample_rate;
        self.update_rates();
        Ok(())
    }

    /// Get the attack time.
    pub fn attack_time(&self) -> Duration {
        self.attack_time
    }

    /// Get the decay time.
    pub fn decay_time(&self) -> Duration {
        self.decay_time
    }

    /// Get the sustain level.
    pub fn sustain_level(&self) -> f32 {
        self.sustain_level
    }

    /// Get the release time.
    pub fn release_time(&self) -> Duration {
        self.release_time
    }

    /// Set attack, decay, release durations and the sustain level.
    pub fn setup(
        &mut self,
        attack_time: Duration,
        decay_time: Duration,
        sustain_level: f32,
        release_time: Duration,
    ) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&sustain_level) {
            return Err(Error::ParameterError(format!(
                "Invalid sustain level: {}. Must be in range [0.0, 1.0]",
                sustain_level
            )));
        }
        self.attack_time = attack_time;
        self.decay_time = decay_time;
        self.sustain_level = sustain_level;
        self.release_time = release_time;
        self.update_rates();
        Ok(())
    }

    fn update_rates(&mut self) {
        self.attack_rate = Self::rate(1.0, self.attack_time, self.sample_rate);
        self.decay_rate = Self::rate(1.0 - self.sustain_level, self.decay_time, self.sample_rate);
    }

    /// Per sample increment to cover `distance` in `time`. Zero when the stage gets skipped.
    fn rate(distance: f32, time: Duration, sample_rate: u32) -> f32 {
        let samples = time.as_secs_f32() * sample_rate as f32;
        if samples > 0.0 {
            distance / samples
        } else {
            0.0
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Linear ADSR envelope with externally defined parameter state.
///
/// Attack ramps from the current level to 1, decay falls to the sustain level and release
/// falls from the level at note-off to zero within the release time.
#[derive(Debug, Default, Clone)]
pub struct AdsrEnvelope {
    stage: AdsrStage,
    release_rate: f32,
    output: f32,
}

impl AdsrEnvelope {
    /// Create a new ADSR envelope in idle state.
    pub fn new() -> Self {
        Self {
            stage: AdsrStage::Idle,
            release_rate: 0.0,
            output: 0.0,
        }
    }

    /// Return the envelope's current stage.
    #[inline(always)]
    pub fn stage(&self) -> AdsrStage {
        self.stage
    }

    /// True when the envelope is not idle.
    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.stage != AdsrStage::Idle
    }

    /// Return the envelope's current (last processed) output value.
    #[inline(always)]
    pub fn output(&self) -> f32 {
        self.output
    }

    /// Start the attack, or the first following stage which has a duration.
    pub fn note_on(&mut self, parameters: &AdsrParameters) {
        if parameters.attack_rate > 0.0 {
            self.stage = AdsrStage::Attack;
        } else if parameters.decay_rate > 0.0 {
            self.output = 1.0;
            self.stage = AdsrStage::Decay;
        } else {
            self.output = parameters.sustain_level;
            self.stage = AdsrStage::Sustain;
        }
    }

    /// Start the release stage, or stop immediately when there's no release time.
    pub fn note_off(&mut self, parameters: &AdsrParameters) {
        if self.stage == AdsrStage::Idle {
            return;
        }
        let release_samples =
            parameters.release_time.as_secs_f32() * parameters.sample_rate as f32;
        if release_samples > 0.0 {
            self.release_rate = self.output / release_samples;
            self.stage = AdsrStage::Release;
        } else {
            self.reset();
        }
    }

    /// Immediately stop and set state to Idle.
    pub fn reset(&mut self) {
        self.output = 0.0;
        self.stage = AdsrStage::Idle;
    }

    /// Compute and return one output sample. Returns 0.0 in Idle stage.
    #[inline]
    pub fn run(&mut self, parameters: &AdsrParameters) -> f32 {
        match self.stage {
            AdsrStage::Idle => return 0.0,
            AdsrStage::Attack => {
                self.output += parameters.attack_rate;
                if self.output >= 1.0 {
                    self.output = 1.0;
                    self.stage = if parameters.decay_rate > 0.0 {
                        AdsrStage::Decay
                    } else {
                        AdsrStage::Sustain
                    };
                }
            }
            AdsrStage::Decay => {
                self.output -= parameters.decay_rate;
                if self.output <= parameters.sustain_level {
                    self.output = parameters.sustain_level;
                    self.stage = AdsrStage::Sustain;
                }
            }
            AdsrStage::Sustain => {
                self.output = parameters.sustain_level;
            }
            AdsrStage::Release => {
                self.output -= self.release_rate;
                if self.output <= 0.0 {
                    self.reset();
                }
            }
        }
        self.output
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters(
        attack_ms: u64,
        decay_ms: u64,
        sustain: f32,
        release_ms: u64,
    ) -> Result<AdsrParameters, Error> {
        AdsrParameters::new(
            1000,
            Duration::from_millis(attack_ms),
            Duration::from_millis(decay_ms),
            sustain,
            Duration::from_millis(release_ms),
        )
    }

    #[test]
    fn invalid_parameters() {
        assert!(parameters(0, 0, 1.5, 0).is_err());
        assert!(AdsrParameters::new(0, Duration::ZERO, Duration::ZERO, 1.0, Duration::ZERO)
            .is_err());
    }

    #[test]
    fn stages() -> Result<(), Box<Error>> {
        // 1000 Hz: one sample per ms
        let parameters = parameters(4, 2, 0.5, 5)?;
        let mut env = AdsrEnvelope::new();
        assert_eq!(env.run(&parameters), 0.0);

        env.note_on(&parameters);
        assert_eq!(env.stage(), AdsrStage::Attack);
        let attack = (0..4).map(|_| env.run(&parameters)).collect::<Vec<_>>();
        assert_eq!(attack, vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(env.stage(), AdsrStage::Decay);

        let decay = (0..2).map(|_| env.run(&parameters)).collect::<Vec<_>>();
        assert_eq!(decay, vec![0.75, 0.5]);
        assert_eq!(env.stage(), AdsrStage::Sustain);
        assert_eq!(env.run(&parameters), 0.5);

        env.note_off(&parameters);
        assert_eq!(env.stage(), AdsrStage::Release);
        let release = (0..5).map(|_| env.run(&parameters)).collect::<Vec<_>>();
        for (value, expected) in release.iter().zip([0.4, 0.3, 0.2, 0.1, 0.0]) {
            assert!((value - expected).abs() < 1e-6, "{release:?}");
        }
        // accumulated rounding errors may delay the end by a sample
        if env.is_active() {
            assert_eq!(env.run(&parameters), 0.0);
        }
        assert!(!env.is_active());
        Ok(())
    }

    #[test]
    fn skipped_stages() -> Result<(), Box<Error>> {
        // no attack: start at full level in decay
        let parameters = parameters(0, 2, 0.0, 0)?;
        let mut env = AdsrEnvelope::new();
        env.note_on(&parameters);
        assert_eq!(env.stage(), AdsrStage::Decay);
        assert_eq!(env.run(&parameters), 0.5);

        // no attack and decay: start right in sustain
        let parameters = self::parameters(0, 0, 1.0, 0)?;
        env.reset();
        env.note_on(&parameters);
        assert_eq!(env.stage(), AdsrStage::Sustain);
        assert_eq!(env.run(&parameters), 1.0);

        // no release: stop immediately
        env.note_off(&parameters);
        assert_eq!(env.stage(), AdsrStage::Idle);
        assert_eq!(env.run(&parameters), 0.0);
        Ok(())
    }

    #[test]
    fn note_off_while_idle_is_ignored() -> Result<(), Box<Error>> {
        let parameters = parameters(10, 10, 0.5, 10)?;
        let mut env = AdsrEnvelope::new();
        env.note_off(&parameters);
        assert_eq!(env.stage(), AdsrStage::Idle);
        Ok(())
    }

    #[test]
    fn release_during_attack() -> Result<(), Box<Error>> {
        let parameters = parameters(10, 0, 1.0, 2)?;
        let mut env = AdsrEnvelope::new();
        env.note_on(&parameters);
        env.run(&parameters);
        env.run(&parameters);
        // level 0.2: released within 2 samples
        env.note_off(&parameters);
        assert!((env.run(&parameters) - 0.1).abs() < 1e-6);
        assert_eq!(env.run(&parameters), 0.0);
        assert!(!env.is_active());
        Ok(())
    }
}
