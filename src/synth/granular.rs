use std::sync::Arc;

use super::{SynthEvent, Synthesizer, TimedSynthEvent};
use crate::{
    monitor::GrainPoolMonitor,
    parameter::Parameter,
    voice::{GranularVoice, GRAIN_POOL_SIZE},
    Error, Sample, SynthConfig, SynthParameters,
};

// -------------------------------------------------------------------------------------------------

/// A polyphonic [`Synthesizer`] with [`GranularVoice`]s, playing a single [`Sample`].
///
/// Loading a new sample is a hard reset: all voices get recreated, so playing notes and
/// grains never outlive the sample they read from.
pub struct GranularSynth {
    synth: Synthesizer<GranularVoice>,
    parameters: Arc<SynthParameters>,
    config: SynthConfig,
    monitors: Vec<Arc<GrainPoolMonitor<GRAIN_POOL_SIZE>>>,
}

impl GranularSynth {
    /// Create a new synth without a sample. Notes are silently ignored until a sample got
    /// loaded.
    pub fn new(config: SynthConfig, parameters: Arc<SynthParameters>) -> Result<Self, Error> {
        config.validate()?;
        let mut synth = Synthesizer::new();
        synth.set_note_stealing_enabled(config.note_stealing);
        synth.set_minimum_sub_block_size(
            config.minimum_sub_block_size,
            config.strict_sub_block_size,
        );
        let monitors = Vec::with_capacity(config.voice_count);
        Ok(Self {
            synth,
            parameters,
            config,
            monitors,
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn parameters(&self) -> &Arc<SynthParameters> {
        &self.parameters
    }

    /// The currently loaded sample, if any.
    pub fn sample(&self) -> Option<&Arc<Sample>> {
        self.synth.sounds().first()
    }

    /// Replace the current sample. Stops all playing notes and recreates all voices.
    ///
    /// The sample's root note gets applied to the `Root Note` parameter.
    pub fn load_sample(&mut self, sample: Arc<Sample>) -> Result<(), Error> {
        self.unload_sample();

        self.parameters.set_value(
            SynthParameters::ROOT_NOTE.id(),
            sample.root_note() as f32,
        )?;
        for index in 0..self.config.voice_count {
            let rng_seed = self
                .config
                .rng_seed
                .map(|seed| seed.wrapping_add(index as u64));
            let voice = GranularVoice::new(
                self.config.sample_rate,
                Arc::clone(&self.parameters),
                rng_seed,
            )?;
            self.monitors.push(voice.monitor());
            self.synth.add_voice(voice);
        }
        log::info!(
            "Loaded sample '{}' into {} granular voices",
            sample.name(),
            self.config.voice_count
        );
        self.synth.add_sound(sample);
        Ok(())
    }

    /// Remove the current sample and all voices.
    pub fn unload_sample(&mut self) {
        self.synth.clear_sounds();
        self.synth.clear_voices();
        self.monitors.clear();
    }

    /// Per voice grain pool monitors of the current voice set.
    pub fn grain_monitors(&self) -> &[Arc<GrainPoolMonitor<GRAIN_POOL_SIZE>>] {
        &self.monitors
    }

    pub fn voices(&self) -> &[GranularVoice] {
        self.synth.voices()
    }

    pub fn active_voice_count(&self) -> usize {
        self.synth.active_voice_count()
    }

    /// Number of playing grains in all voices.
    pub fn active_grain_count(&self) -> usize {
        self.synth
            .voices()
            .iter()
            .map(GranularVoice::active_grain_count)
            .sum()
    }

    pub fn set_note_stealing_enabled(&mut self, enabled: bool) {
        self.config.note_stealing = enabled;
        self.synth.set_note_stealing_enabled(enabled);
    }

    pub fn note_on(&mut self, channel: u8, note: u8, velocity: f32) {
        self.synth.note_on(channel, note, velocity);
    }

    pub fn note_off(&mut self, channel: u8, note: u8, velocity: f32, allow_tail_off: bool) {
        self.synth.note_off(channel, note, velocity, allow_tail_off);
    }

    pub fn all_notes_off(&mut self, channel: u8, allow_tail_off: bool) {
        self.synth.all_notes_off(channel, allow_tail_off);
    }

    pub fn handle_event(&mut self, event: &SynthEvent) {
        self.synth.handle_event(event);
    }

    /// Add the output of all voices to the given interleaved buffer.
    pub fn render(&mut self, output: &mut [f32], channel_count: usize) {
        self.synth.render_voices(output, channel_count);
    }

    /// Add the output of all voices to the given interleaved buffer, applying the given
    /// events at their sample offsets.
    pub fn process_block(
        &mut self,
        output: &mut [f32],
        channel_count: usize,
        events: &[TimedSynthEvent],
    ) {
        self.synth.process_block(output, channel_count, events);
    }
}

// -------------------------------------------------------------------------------------------------
