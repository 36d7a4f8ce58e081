//! Thread safe front end of the granular synth.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use crossbeam_queue::ArrayQueue;

use crate::{
    monitor::GrainPoolMonitor,
    synth::{GranularSynth, SynthEvent, TimedSynthEvent},
    utils::buffer::{clear_buffer, scale_buffer},
    voice::GRAIN_POOL_SIZE,
    Error, Sample, SynthConfig, SynthParameters,
};

// -------------------------------------------------------------------------------------------------

/// Owns a [`GranularSynth`] and makes it usable from a real-time audio thread and any number
/// of control threads.
///
/// Control threads push note events into a bounded lock free queue, which the audio thread
/// drains at the start of each block, and write [`SynthParameters`] values directly.
/// Only structural changes (loading samples) lock the synth. The audio thread never waits on
/// that lock: while it's held, blocks are rendered as silence and queued events stay queued.
/// Status queries and the note stealing switch go through atomics and a separate monitor
/// list, so polling them from a UI never interrupts playback.
pub struct SynthEngine {
    synth: Mutex<GranularSynth>,
    parameters: Arc<SynthParameters>,
    event_queue: ArrayQueue<SynthEvent>,
    monitors: Mutex<Vec<Arc<GrainPoolMonitor<GRAIN_POOL_SIZE>>>>,
    active_voice_count: AtomicUsize,
    note_stealing: AtomicBool,
}

impl SynthEngine {
    /// Create a new engine with default parameter values and no sample.
    pub fn new(config: SynthConfig) -> Result<Self, Error> {
        Self::with_parameters(config, Arc::new(SynthParameters::new()))
    }

    /// Create a new engine which reads from the given shared parameters.
    pub fn with_parameters(
        config: SynthConfig,
        parameters: Arc<SynthParameters>,
    ) -> Result<Self, Error> {
        let synth = Mutex::new(GranularSynth::new(config, Arc::clone(&parameters))?);
        let event_queue = ArrayQueue::new(config.event_queue_capacity);
        let monitors = Mutex::new(Vec::new());
        let active_voice_count = AtomicUsize::new(0);
        let note_stealing = AtomicBool::new(config.note_stealing);
        Ok(Self {
            synth,
            parameters,
            event_queue,
            monitors,
            active_voice_count,
            note_stealing,
        })
    }

    /// Shared live parameters.
    pub fn parameters(&self) -> &Arc<SynthParameters> {
        &self.parameters
    }

    /// Replace the sample. Blocks until the audio thread finished its current block.
    pub fn load_sample(&self, sample: Sample) -> Result<(), Error> {
        let sample = Arc::new(sample);
        let mut synth = self.synth.lock()?;
        let result = synth.load_sample(sample);
        *self.monitors.lock()? = synth.grain_monitors().to_vec();
        self.active_voice_count.store(synth.active_voice_count(), Ordering::Relaxed);
        result
    }

    /// Enable or disable voice stealing. Applied with the next processed block.
    pub fn set_note_stealing_enabled(&self, enabled: bool) {
        self.note_stealing.store(enabled, Ordering::Relaxed);
    }

    /// Grain pool monitors of all voices, e.g. to visualize grains in a UI.
    /// Monitors get replaced when loading a new sample.
    pub fn grain_monitors(&self) -> Result<Vec<Arc<GrainPoolMonitor<GRAIN_POOL_SIZE>>>, Error> {
        Ok(self.monitors.lock()?.clone())
    }

    /// Number of voices which played a note at the end of the last processed block.
    pub fn active_voice_count(&self) -> usize {
        self.active_voice_count.load(Ordering::Relaxed)
    }

    /// Number of events which wait for the next processed block.
    pub fn pending_event_count(&self) -> usize {
        self.event_queue.len()
    }

    pub fn note_on(&self, channel: u8, note: u8, velocity: f32) -> Result<(), Error> {
        self.send_event(SynthEvent::NoteOn {
            channel,
            note,
            velocity,
        })
    }

    pub fn note_off(
        &self,
        channel: u8,
        note: u8,
        velocity: f32,
        allow_tail_off: bool,
    ) -> Result<(), Error> {
        self.send_event(SynthEvent::NoteOff {
            channel,
            note,
            velocity,
            allow_tail_off,
        })
    }

    /// Stop all notes on the given channel, or all channels when `channel` is 0.
    pub fn all_notes_off(&self, channel: u8, allow_tail_off: bool) -> Result<(), Error> {
        self.send_event(SynthEvent::AllNotesOff {
            channel,
            allow_tail_off,
        })
    }

    /// Queue an event for the next processed block.
    pub fn send_event(&self, event: SynthEvent) -> Result<(), Error> {
        event.validate()?;
        self.event_queue.push(event).map_err(|event| {
            log::warn!("Synth event queue is full. Dropping event {event:?}");
            Error::SendError("Synth event queue is full".to_string())
        })
    }

    /// Decode and queue a raw MIDI message. Unsupported messages are ignored.
    pub fn send_midi(&self, message: &[u8]) -> Result<(), Error> {
        match SynthEvent::from_midi(message) {
            Some(event) => self.send_event(event),
            None => {
                log::debug!("Ignoring unsupported MIDI message {message:02X?}");
                Ok(())
            }
        }
    }

    /// Render the next block into the given interleaved buffer, overwriting its content.
    /// Called by the audio thread.
    pub fn process(&self, output: &mut [f32], channel_count: usize) {
        self.process_with_events(output, channel_count, &[]);
    }

    /// Render the next block, applying queued events at the block start and the given host
    /// events at their sample offsets. Called by the audio thread.
    pub fn process_with_events(
        &self,
        output: &mut [f32],
        channel_count: usize,
        events: &[TimedSynthEvent],
    ) {
        Self::assert_no_alloc(|| {
            clear_buffer(output);
            let Ok(mut synth) = self.synth.try_lock() else {
                return;
            };
            synth.set_note_stealing_enabled(self.note_stealing.load(Ordering::Relaxed));
            while let Some(event) = self.event_queue.pop() {
                synth.handle_event(&event);
            }
            synth.process_block(output, channel_count, events);
            self.active_voice_count.store(synth.active_voice_count(), Ordering::Relaxed);
            scale_buffer(output, self.parameters.master_gain());
        })
    }

    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);

        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

// -------------------------------------------------------------------------------------------------
