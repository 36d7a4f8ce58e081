//! Granular synth voice: schedules grain onsets and gates their sum with a note ADSR.

use std::{sync::Arc, time::Duration};

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    grain::{wrap_position, Grain, GrainPosition},
    monitor::GrainPoolMonitor,
    synth::{SynthVoice, VoiceState},
    utils::{
        adsr::{AdsrEnvelope, AdsrParameters},
        buffer::add_stereo_frame,
        note_pitch_ratio, note_to_frequency,
    },
    Error, Sample, SynthParameters,
};

// -------------------------------------------------------------------------------------------------

/// Number of grain slots in each voice. Must be >= the max value of the `Num Grains` parameter.
pub const GRAIN_POOL_SIZE: usize = 8;

// -------------------------------------------------------------------------------------------------

/// A [`SynthVoice`] which plays a [`Sample`] as a stream of overlapping grains.
///
/// While a note is held, a new grain starts every `grain duration / num grains` frames, reusing
/// the slots of a fixed grain pool round-robin. Grains spawn at a position that drifts with
/// the `Grain Speed` parameter, jittered independently per channel by `Position Random`.
/// The summed grains are gated by a note level ADSR. Grains keep spawning while the ADSR
/// releases, the voice frees itself when the release finished.
///
/// Grain parameters are read from the shared [`SynthParameters`] once per rendered block.
pub struct GranularVoice {
    state: VoiceState<Sample>,
    parameters: Arc<SynthParameters>,
    monitor: Arc<GrainPoolMonitor<GRAIN_POOL_SIZE>>,
    sample_rate: u32,
    grains: [Grain; GRAIN_POOL_SIZE],
    next_grain_index: usize,
    samples_until_next_onset: usize,
    reused_grain_count: usize,
    spawn_position: f64,
    pitch_ratio: f64,
    note_frequency: f64,
    adsr_parameters: AdsrParameters,
    adsr: AdsrEnvelope,
    rng: SmallRng,
}

impl GranularVoice {
    /// Create a new voice for the given output sample rate.
    ///
    /// When `rng_seed` is set, grain position jitter is reproducible, else the voice
    /// gets seeded from the OS.
    pub fn new(
        sample_rate: u32,
        parameters: Arc<SynthParameters>,
        rng_seed: Option<u64>,
    ) -> Result<Self, Error> {
        let state = VoiceState::new();
        let monitor = Arc::new(GrainPoolMonitor::new());
        let grains = [Grain::new(); GRAIN_POOL_SIZE];
        let next_grain_index = 0;
        let samples_until_next_onset = 0;
        let reused_grain_count = 0;
        let spawn_position = 0.0;
        let pitch_ratio = 1.0;
        let note_frequency = note_to_frequency(60.0);
        let mut adsr_parameters = AdsrParameters::new(
            sample_rate,
            Duration::ZERO,
            Duration::ZERO,
            1.0,
            Duration::ZERO,
        )?;
        parameters.apply_envelope(&mut adsr_parameters)?;
        let adsr = AdsrEnvelope::new();
        let rng = match rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Ok(Self {
            state,
            parameters,
            monitor,
            sample_rate,
            grains,
            next_grain_index,
            samples_until_next_onset,
            reused_grain_count,
            spawn_position,
            pitch_ratio,
            note_frequency,
            adsr_parameters,
            adsr,
            rng,
        })
    }

    /// Output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Shared, lock free view of the voice's grain pool.
    pub fn monitor(&self) -> Arc<GrainPoolMonitor<GRAIN_POOL_SIZE>> {
        Arc::clone(&self.monitor)
    }

    /// Access the grain pool.
    pub fn grains(&self) -> &[Grain; GRAIN_POOL_SIZE] {
        &self.grains
    }

    /// Number of currently playing grains.
    pub fn active_grain_count(&self) -> usize {
        self.grains.iter().filter(|grain| grain.is_active()).count()
    }

    /// Pool slot which gets (re)activated with the next grain onset.
    pub fn next_grain_index(&self) -> usize {
        self.next_grain_index
    }

    /// Frames left until the next grain onset.
    pub fn samples_until_next_onset(&self) -> usize {
        self.samples_until_next_onset
    }

    /// Number of grain onsets which replaced a still playing grain since the voice got
    /// created. Happens when grains overlap more than the pool can hold.
    pub fn reused_grain_count(&self) -> usize {
        self.reused_grain_count
    }

    /// Current grain spawn position in sample frames.
    pub fn spawn_position(&self) -> f64 {
        self.spawn_position
    }

    /// Resampling ratio of the playing note.
    pub fn pitch_ratio(&self) -> f64 {
        self.pitch_ratio
    }

    /// The note level envelope.
    pub fn envelope(&self) -> &AdsrEnvelope {
        &self.adsr
    }

    fn finish_note(&mut self) {
        self.state.clear_current_note();
        self.adsr.reset();
        for grain in self.grains.iter_mut() {
            grain.deactivate();
        }
    }

    fn publish_grains(&self) {
        let length = self.state.sound().map_or(0, |sample| sample.len());
        self.monitor.publish(
            self.state.note(),
            self.grains.iter().map(|grain| grain.snapshot(length)),
        );
    }
}

impl SynthVoice for GranularVoice {
    type Sound = Sample;

    fn state(&self) -> &VoiceState<Sample> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VoiceState<Sample> {
        &mut self.state
    }

    fn can_play_sound(&self, _sound: &Sample) -> bool {
        true
    }

    fn start_note(&mut self, note: u8, _velocity: f32, sound: &Arc<Sample>, _pitch_wheel: u16) {
        for grain in self.grains.iter_mut() {
            grain.deactivate();
        }
        self.next_grain_index = 0;

        let root_note = self.parameters.root_note();
        self.pitch_ratio = note_pitch_ratio(note as f64, root_note as f64) * sound.sample_rate()
            / self.sample_rate as f64;
        self.note_frequency = note_to_frequency(note as f64);

        self.samples_until_next_onset = 0;
        self.spawn_position = self.parameters.position() * sound.len() as f64;

        let envelope_result = self.parameters.apply_envelope(&mut self.adsr_parameters);
        debug_assert!(envelope_result.is_ok(), "Invalid envelope parameters");
        self.adsr.reset();
        self.adsr.note_on(&self.adsr_parameters);
    }

    fn stop_note(&mut self, _velocity: f32, allow_tail_off: bool) {
        if allow_tail_off {
            self.adsr.note_off(&self.adsr_parameters);
        } else {
            self.finish_note();
        }
    }

    fn render(&mut self, output: &mut [f32], channel_count: usize) {
        if !self.state.is_active() {
            if self.monitor.note().is_some() {
                self.publish_grains();
            }
            return;
        }
        if channel_count == 0 {
            return;
        }
        let Some(sample) = self.state.sound().map(Arc::clone) else {
            return;
        };
        let length = sample.len();

        // grain layout for this block
        let grain_duration =
            self.sample_rate as f64 * self.parameters.grain_duration() / self.note_frequency;
        let grain_duration_samples = (grain_duration.round() as usize).max(2);
        let samples_between_onsets =
            ((grain_duration / self.parameters.num_grains() as f64).round() as usize).max(1);
        let grain_shape = self.parameters.grain_shape();
        let position_range = self.parameters.position_random() * length as f64;
        let spawn_advance = samples_between_onsets as f64 * self.parameters.grain_speed();

        let mut finished = false;
        for frame in output.chunks_exact_mut(channel_count) {
            if self.samples_until_next_onset == 0 {
                let mut jitter = || {
                    if position_range > 0.0 {
                        position_range * self.rng.random::<f64>() - position_range / 2.0
                    } else {
                        0.0
                    }
                };
                let position = GrainPosition::new(
                    self.spawn_position + jitter(),
                    self.spawn_position + jitter(),
                );
                let grain = &mut self.grains[self.next_grain_index];
                if grain.is_active() {
                    self.reused_grain_count += 1;
                }
                grain.activate(
                    grain_duration_samples,
                    position,
                    self.pitch_ratio,
                    1.0,
                    grain_shape,
                    length,
                );
                self.next_grain_index = (self.next_grain_index + 1) % GRAIN_POOL_SIZE;
                self.samples_until_next_onset = samples_between_onsets;
                self.spawn_position = wrap_position(self.spawn_position + spawn_advance, length);
            }

            let (mut left, mut right) = (0.0, 0.0);
            for grain in self.grains.iter_mut() {
                let (grain_left, grain_right) = grain.next_sample(&sample);
                left += grain_left;
                right += grain_right;
            }
            let gain = self.adsr.run(&self.adsr_parameters);
            add_stereo_frame(frame, left * gain, right * gain);

            self.samples_until_next_onset -= 1;
            if !self.adsr.is_active() {
                finished = true;
                break;
            }
        }
        if finished {
            self.finish_note();
        }
        self.publish_grains();
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parameter::Parameter, synth::Synthesizer};

    const SAMPLE_RATE: u32 = 44100;

    fn sine_sample(length: usize) -> Result<Arc<Sample>, Error> {
        let data = (0..length)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / SAMPLE_RATE as f32).sin())
            .collect::<Vec<_>>();
        Ok(Arc::new(Sample::from_planar(
            "sine",
            &[data],
            SAMPLE_RATE as f64,
            60,
            10.0,
        )?))
    }

    fn gate_parameters(parameters: &SynthParameters) -> Result<(), Error> {
        parameters.set_value(SynthParameters::ATTACK.id(), 0.0)?;
        parameters.set_value(SynthParameters::DECAY.id(), 0.0)?;
        parameters.set_value(SynthParameters::SUSTAIN.id(), 100.0)?;
        parameters.set_value(SynthParameters::RELEASE.id(), 0.0)
    }

    fn synth(
        parameters: &Arc<SynthParameters>,
        sample: &Arc<Sample>,
    ) -> Result<Synthesizer<GranularVoice>, Error> {
        let mut synth = Synthesizer::new();
        synth.add_voice(GranularVoice::new(
            SAMPLE_RATE,
            Arc::clone(parameters),
            Some(0x1234),
        )?);
        synth.add_sound(Arc::clone(sample));
        Ok(synth)
    }

    #[test]
    fn end_to_end() -> Result<(), Box<Error>> {
        let parameters = Arc::new(SynthParameters::new());
        gate_parameters(&parameters)?;
        // 4410 frames long grains at note 60
        let duration_factor = 4410.0 * note_to_frequency(60.0) / SAMPLE_RATE as f64;
        parameters.set_value(SynthParameters::GRAIN_DURATION.id(), duration_factor as f32)?;
        parameters.set_value(SynthParameters::NUM_GRAINS.id(), 1.0)?;

        let sample = sine_sample(SAMPLE_RATE as usize)?;
        let mut synth = synth(&parameters, &sample)?;

        // free voices render nothing
        let mut output = vec![0.0; 4410];
        synth.render_voices(&mut output, 1);
        assert!(output.iter().all(|v| *v == 0.0));

        synth.note_on(1, 60, 1.0);
        // render frame by frame to follow the single grain's lifetime
        let mut output = Vec::with_capacity(4410);
        for _ in 0..4410 {
            assert!(synth.voices()[0].active_grain_count() <= 1);
            let mut frame = [0.0f32];
            synth.render_voices(&mut frame, 1);
            output.push(frame[0]);
            assert_eq!(synth.voices()[0].next_grain_index(), 1);
        }
        let voice = &synth.voices()[0];
        assert_eq!(voice.pitch_ratio(), 1.0);
        // one onset at frame 0, the next one is due right at the start of the next block
        assert_eq!(voice.samples_until_next_onset(), 0);
        assert_eq!(output[0], 0.0);
        let rms = (output.iter().map(|v| v * v).sum::<f32>() / output.len() as f32).sqrt();
        assert!(rms > 0.1, "rms is {rms}");
        // the grain played for exactly 4410 frames and then stays silent
        assert!(output[4409].abs() < 1e-3);
        let mut grain = voice.grains()[0];
        assert!(!grain.is_active());
        assert_eq!(grain.samples_remaining(), 0);
        for _ in 0..16 {
            assert_eq!(grain.next_sample(&sample), (0.0, 0.0));
        }
        assert!(voice.grains()[1..].iter().all(|grain| !grain.is_active()));

        let mut output = vec![0.0; 4410];
        synth.render_voices(&mut output, 1);
        let voice = &synth.voices()[0];
        assert_eq!(voice.next_grain_index(), 2);
        assert_eq!(voice.active_grain_count(), 0);
        assert_eq!(output[0], 0.0);
        assert!(output[1..].iter().any(|v| *v != 0.0));
        Ok(())
    }

    #[test]
    fn onset_spacing() -> Result<(), Box<Error>> {
        let parameters = Arc::new(SynthParameters::new());
        gate_parameters(&parameters)?;
        // 1000 frames long grains at note 69 (440 Hz)
        let duration_factor = 1000.0 * 440.0 / SAMPLE_RATE as f64;
        parameters.set_value(SynthParameters::GRAIN_DURATION.id(), duration_factor as f32)?;
        parameters.set_value(SynthParameters::POSITION_RANDOM.id(), 0.5)?;
        parameters.set_value(SynthParameters::GRAIN_SPEED.id(), 1.0)?;

        let sample = sine_sample(SAMPLE_RATE as usize)?;
        for (num_grains, expected_spacing) in [(1, 1000), (3, 333), (4, 250), (8, 125)] {
            parameters.set_value(SynthParameters::NUM_GRAINS.id(), num_grains as f32)?;
            let mut synth = synth(&parameters, &sample)?;
            synth.note_on(1, 69, 1.0);

            let mut onsets = Vec::new();
            let mut frame = [0.0f32; 2];
            for n in 0..3000 {
                let before = synth.voices()[0].next_grain_index();
                synth.render_voices(&mut frame, 2);
                if synth.voices()[0].next_grain_index() != before {
                    onsets.push(n);
                }
            }
            let expected = (0..3000).step_by(expected_spacing).collect::<Vec<_>>();
            assert_eq!(onsets, expected, "num grains: {num_grains}");
            // the pool never grows, overlapping grains are bounded by the density
            assert!(synth.voices()[0].active_grain_count() <= num_grains.min(GRAIN_POOL_SIZE));
        }
        Ok(())
    }

    #[test]
    fn dense_grains_reuse_playing_slots() -> Result<(), Box<Error>> {
        let parameters = Arc::new(SynthParameters::new());
        gate_parameters(&parameters)?;
        parameters.set_value(SynthParameters::GRAIN_DURATION.id(), 1.0)?;
        let sample = sine_sample(SAMPLE_RATE as usize)?;

        // note 99: 18 frames long grains
        parameters.set_value(SynthParameters::NUM_GRAINS.id(), 1.0)?;
        let mut synth = synth(&parameters, &sample)?;
        synth.note_on(1, 99, 1.0);
        let mut output = vec![0.0; 256 * 2];
        synth.render_voices(&mut output, 2);
        assert_eq!(synth.voices()[0].reused_grain_count(), 0);

        // onsets every 2 frames keep 9 grains alive, one more than the pool holds
        parameters.set_value(SynthParameters::NUM_GRAINS.id(), 8.0)?;
        let mut dense = self::synth(&parameters, &sample)?;
        dense.note_on(1, 99, 1.0);
        dense.render_voices(&mut output, 2);
        let voice = &dense.voices()[0];
        assert!(voice.reused_grain_count() > 0);
        assert_eq!(voice.active_grain_count(), GRAIN_POOL_SIZE);
        assert!(output.iter().all(|v| v.is_finite()));
        Ok(())
    }

    #[test]
    fn spawn_position_drifts_and_wraps() -> Result<(), Box<Error>> {
        let parameters = Arc::new(SynthParameters::new());
        gate_parameters(&parameters)?;
        let duration_factor = 100.0 * 440.0 / SAMPLE_RATE as f64;
        parameters.set_value(SynthParameters::GRAIN_DURATION.id(), duration_factor as f32)?;
        parameters.set_value(SynthParameters::POSITION.id(), 0.5)?;
        parameters.set_value(SynthParameters::GRAIN_SPEED.id(), -2.0)?;

        let sample = sine_sample(1000)?;
        let mut synth = synth(&parameters, &sample)?;
        synth.note_on(1, 69, 1.0);
        assert_eq!(synth.voices()[0].spawn_position(), 500.0);

        let mut output = vec![0.0; 100 * 2];
        synth.render_voices(&mut output, 2);
        // one onset, then moved back by 100 frames * speed
        assert_eq!(synth.voices()[0].spawn_position(), 300.0);
        for _ in 0..2 {
            synth.render_voices(&mut output, 2);
        }
        assert_eq!(synth.voices()[0].spawn_position(), 900.0);
        Ok(())
    }

    #[test]
    fn stereo_jitter_is_decorrelated() -> Result<(), Box<Error>> {
        let parameters = Arc::new(SynthParameters::new());
        gate_parameters(&parameters)?;
        parameters.set_value(SynthParameters::POSITION_RANDOM.id(), 1.0)?;

        let sample = sine_sample(SAMPLE_RATE as usize)?;
        let mut synth = synth(&parameters, &sample)?;
        synth.note_on(1, 60, 1.0);
        let mut output = vec![0.0; 2];
        synth.render_voices(&mut output, 2);

        let snapshot = synth.voices()[0].grains()[0].snapshot(sample.len());
        assert!(snapshot.active);
        assert_ne!(snapshot.position.0, snapshot.position.1);
        assert!((0.0..1.0).contains(&snapshot.position.0));
        assert!((0.0..1.0).contains(&snapshot.position.1));
        Ok(())
    }

    #[test]
    fn position_spread_follows_normalized_control() -> Result<(), Box<Error>> {
        let parameters = Arc::new(SynthParameters::new());
        gate_parameters(&parameters)?;
        parameters.set_value(SynthParameters::POSITION.id(), 0.5)?;
        // skewed raw value is 0.5^5, the spread is half of the sample
        parameters.set_normalized(SynthParameters::POSITION_RANDOM.id(), 0.5)?;
        assert!((parameters.position_random() - 0.5).abs() < 1e-6);

        let sample = sine_sample(SAMPLE_RATE as usize)?;
        let mut max_offset = 0.0f32;
        for seed in 0..50 {
            let mut synth = Synthesizer::new();
            synth.add_voice(GranularVoice::new(
                SAMPLE_RATE,
                Arc::clone(&parameters),
                Some(seed),
            )?);
            synth.add_sound(Arc::clone(&sample));
            synth.note_on(1, 60, 1.0);
            let mut output = vec![0.0; 2];
            synth.render_voices(&mut output, 2);

            let snapshot = synth.voices()[0].grains()[0].snapshot(sample.len());
            assert!(snapshot.active);
            for position in [snapshot.position.0, snapshot.position.1] {
                let offset = (position - 0.5).abs();
                // +/- half of the spread, plus the single frame the grain moved
                assert!(offset <= 0.25 + 1e-4, "offset {offset} exceeds the spread");
                max_offset = max_offset.max(offset);
            }
        }
        assert!(max_offset > 0.2, "max offset {max_offset} is too small");
        Ok(())
    }

    #[test]
    fn release_frees_voice() -> Result<(), Box<Error>> {
        let parameters = Arc::new(SynthParameters::new());
        gate_parameters(&parameters)?;
        parameters.set_value(SynthParameters::RELEASE.id(), 10.0)?;

        let sample = sine_sample(SAMPLE_RATE as usize)?;
        let mut synth = synth(&parameters, &sample)?;
        let monitor = synth.voices()[0].monitor();
        synth.note_on(1, 60, 1.0);

        let mut output = vec![0.0; 1024];
        synth.render_voices(&mut output, 1);
        assert_eq!(monitor.note(), Some(60));
        assert!(monitor.snapshot().iter().any(|grain| grain.active));

        synth.note_off(1, 60, 0.0, true);
        assert_eq!(synth.active_voice_count(), 1);
        // 10 ms release: 441 frames
        let mut output = vec![0.0; 1024];
        synth.render_voices(&mut output, 1);
        assert_eq!(synth.active_voice_count(), 0);
        assert!(output[..400].iter().any(|v| *v != 0.0));
        assert!(output[450..].iter().all(|v| *v == 0.0));
        assert_eq!(monitor.note(), None);
        assert!(monitor.snapshot().iter().all(|grain| !grain.active));

        // free voices don't touch the buffer
        let mut output = vec![0.5; 64];
        synth.render_voices(&mut output, 1);
        assert!(output.iter().all(|v| *v == 0.5));
        Ok(())
    }

    #[test]
    fn hard_stop() -> Result<(), Box<Error>> {
        let parameters = Arc::new(SynthParameters::new());
        let sample = sine_sample(SAMPLE_RATE as usize)?;
        let mut synth = synth(&parameters, &sample)?;
        let monitor = synth.voices()[0].monitor();
        synth.note_on(1, 72, 1.0);
        assert!((synth.voices()[0].pitch_ratio() - 2.0).abs() < 1e-12);
        let mut output = vec![0.0; 256];
        synth.render_voices(&mut output, 2);
        assert_eq!(monitor.note(), Some(72));

        synth.note_off(1, 72, 0.0, false);
        assert_eq!(synth.active_voice_count(), 0);
        assert_eq!(synth.voices()[0].active_grain_count(), 0);
        // monitor catches up with the next block
        synth.render_voices(&mut output, 2);
        assert_eq!(monitor.note(), None);
        Ok(())
    }

    #[test]
    fn root_note_and_sample_rate_set_pitch() -> Result<(), Box<Error>> {
        let parameters = Arc::new(SynthParameters::new());
        parameters.set_value(SynthParameters::ROOT_NOTE.id(), 48.0)?;
        let sample = Arc::new(Sample::from_planar(
            "half rate",
            &[[0.0f32; 64]],
            22050.0,
            48,
            10.0,
        )?);
        let mut synth = synth(&parameters, &sample)?;
        synth.note_on(1, 60, 1.0);
        assert!((synth.voices()[0].pitch_ratio() - 1.0).abs() < 1e-12);
        Ok(())
    }
}
