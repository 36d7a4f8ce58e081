use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Options to set up a [`GranularSynth`](crate::GranularSynth) or [`SynthEngine`](crate::SynthEngine).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    /// Output sample rate in Hz. By default 44100.
    pub sample_rate: u32,
    /// Max polyphony. By default 16.
    pub voice_count: usize,
    /// By default true: steal a voice when a note-on finds no free one.
    pub note_stealing: bool,
    /// By default 32: smallest number of frames rendered between two events.
    pub minimum_sub_block_size: usize,
    /// By default false: when true, the first event of a block can't split off smaller blocks.
    pub strict_sub_block_size: bool,
    /// By default None: when set, grain position jitter is seeded with `seed + voice index`.
    pub rng_seed: Option<u64>,
    /// By default 256: max number of pending events in a [`SynthEngine`](crate::SynthEngine).
    pub event_queue_capacity: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            voice_count: 16,
            note_stealing: true,
            minimum_sub_block_size: 32,
            strict_sub_block_size: false,
            rng_seed: None,
            event_queue_capacity: 256,
        }
    }
}

impl SynthConfig {
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn voice_count(mut self, voice_count: usize) -> Self {
        self.voice_count = voice_count;
        self
    }

    pub fn note_stealing(mut self, enabled: bool) -> Self {
        self.note_stealing = enabled;
        self
    }

    pub fn minimum_sub_block_size(mut self, frames: usize, strict: bool) -> Self {
        self.minimum_sub_block_size = frames;
        self.strict_sub_block_size = strict;
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    /// Validate all options. Returns Error::ParameterError on errors.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_rate == 0 {
            return Err(Error::ParameterError(
                "synth config 'sample_rate' must be > 0".to_string(),
            ));
        }
        if self.voice_count == 0 {
            return Err(Error::ParameterError(
                "synth config 'voice_count' must be > 0".to_string(),
            ));
        }
        if self.minimum_sub_block_size == 0 {
            return Err(Error::ParameterError(
                "synth config 'minimum_sub_block_size' must be > 0".to_string(),
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(Error::ParameterError(
                "synth config 'event_queue_capacity' must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(SynthConfig::default().validate().is_ok());
        let config = SynthConfig::default()
            .sample_rate(48000)
            .voice_count(4)
            .rng_seed(7);
        assert!(config.validate().is_ok());
        assert_eq!(config.rng_seed, Some(7));
        assert!(SynthConfig::default().sample_rate(0).validate().is_err());
        assert!(SynthConfig::default().voice_count(0).validate().is_err());
        assert!(SynthConfig::default()
            .minimum_sub_block_size(0, true)
            .validate()
            .is_err());
        assert!(SynthConfig::default()
            .event_queue_capacity(0)
            .validate()
            .is_err());
    }
}
