//! Polyphonic voice management: sounds, voices, note routing, voice stealing and
//! sample accurate event processing.

use std::sync::Arc;

pub mod event;
mod granular;

pub use event::{SynthEvent, TimedSynthEvent, PITCH_WHEEL_CENTER};
pub use granular::GranularSynth;

use event::{SOFT_PEDAL_CONTROLLER, SOSTENUTO_PEDAL_CONTROLLER, SUSTAIN_PEDAL_CONTROLLER};

// -------------------------------------------------------------------------------------------------

/// Something a [`SynthVoice`] can play, e.g. a sample.
pub trait SynthSound: Send + Sync {
    /// True when the sound should be played for the given MIDI note.
    fn applies_to_note(&self, note: u8) -> bool;
    /// True when the sound should be played on the given MIDI channel (1-16).
    fn applies_to_channel(&self, channel: u8) -> bool;
}

// -------------------------------------------------------------------------------------------------

/// Note assignment and key/pedal state of a voice. Managed by the [`Synthesizer`].
#[derive(Debug)]
pub struct VoiceState<S> {
    note: Option<u8>,
    channel: u8,
    sound: Option<Arc<S>>,
    note_on_time: u64,
    key_down: bool,
    sustain_pedal_down: bool,
    sostenuto_pedal_down: bool,
}

impl<S> VoiceState<S> {
    pub fn new() -> Self {
        Self {
            note: None,
            channel: 0,
            sound: None,
            note_on_time: 0,
            key_down: false,
            sustain_pedal_down: false,
            sostenuto_pedal_down: false,
        }
    }

    /// Currently playing note, if any.
    #[inline]
    pub fn note(&self) -> Option<u8> {
        self.note
    }

    /// MIDI channel of the currently playing note or 0.
    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// The sound the voice currently plays.
    #[inline]
    pub fn sound(&self) -> Option<&Arc<S>> {
        self.sound.as_ref()
    }

    /// Sequence number of the last note-on. Higher numbers are newer.
    pub fn note_on_time(&self) -> u64 {
        self.note_on_time
    }

    /// True while a note is assigned, including its release phase.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.note.is_some()
    }

    #[inline]
    pub fn is_playing_channel(&self, channel: u8) -> bool {
        self.channel == channel
    }

    pub fn is_key_down(&self) -> bool {
        self.key_down
    }

    pub fn is_sustain_pedal_down(&self) -> bool {
        self.sustain_pedal_down
    }

    pub fn is_sostenuto_pedal_down(&self) -> bool {
        self.sostenuto_pedal_down
    }

    /// True when the voice is still sounding, but neither a key nor a pedal holds it.
    pub fn is_playing_but_released(&self) -> bool {
        self.is_active() && !(self.key_down || self.sustain_pedal_down || self.sostenuto_pedal_down)
    }

    /// Mark the voice as free. Voices call this when their note finished.
    pub fn clear_current_note(&mut self) {
        self.note = None;
        self.channel = 0;
        self.sound = None;
    }
}

impl<S> Default for VoiceState<S> {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

/// A voice which plays one note of a [`SynthSound`] at a time.
///
/// The [`Synthesizer`] assigns notes and updates the voice's [`VoiceState`] before calling
/// [`start_note`](Self::start_note). Voices must call [`VoiceState::clear_current_note`] when
/// they got stopped without tail-off, or when their tail-off finished while rendering.
pub trait SynthVoice: Send {
    type Sound: SynthSound;

    fn state(&self) -> &VoiceState<Self::Sound>;
    fn state_mut(&mut self) -> &mut VoiceState<Self::Sound>;

    /// True when this voice is able to play the given sound.
    fn can_play_sound(&self, sound: &Self::Sound) -> bool;

    /// Start playing a new note.
    fn start_note(&mut self, note: u8, velocity: f32, sound: &Arc<Self::Sound>, pitch_wheel: u16);

    /// Stop the playing note, either with a release phase or immediately.
    fn stop_note(&mut self, velocity: f32, allow_tail_off: bool);

    fn pitch_wheel_moved(&mut self, _value: u16) {}
    fn controller_moved(&mut self, _controller: u8, _value: u8) {}
    fn aftertouch_changed(&mut self, _value: u8) {}
    fn channel_pressure_changed(&mut self, _value: u8) {}

    /// Add the voice's output to the given interleaved buffer. Must not allocate or block.
    fn render(&mut self, output: &mut [f32], channel_count: usize);
}

// -------------------------------------------------------------------------------------------------

/// Owns a set of voices and sounds, routes note and controller events to the voices and
/// mixes their output.
///
/// Voices and sounds are set up on a control thread. All other functions are real-time safe:
/// they neither allocate nor block.
pub struct Synthesizer<V: SynthVoice> {
    voices: Vec<V>,
    sounds: Vec<Arc<V::Sound>>,
    last_note_on_counter: u64,
    last_pitch_wheel_values: [u16; 16],
    sustain_pedals_down: [bool; 17],
    note_stealing_enabled: bool,
    minimum_sub_block_size: usize,
    strict_sub_block_size: bool,
    // preallocated temp buffer for voice stealing
    usable_voices: Vec<usize>,
}

impl<V: SynthVoice> Synthesizer<V> {
    pub const DEFAULT_MINIMUM_SUB_BLOCK_SIZE: usize = 32;

    pub fn new() -> Self {
        Self {
            voices: Vec::new(),
            sounds: Vec::new(),
            last_note_on_counter: 0,
            last_pitch_wheel_values: [PITCH_WHEEL_CENTER; 16],
            sustain_pedals_down: [false; 17],
            note_stealing_enabled: true,
            minimum_sub_block_size: Self::DEFAULT_MINIMUM_SUB_BLOCK_SIZE,
            strict_sub_block_size: false,
            usable_voices: Vec::new(),
        }
    }

    /// Access to all voices.
    pub fn voices(&self) -> &[V] {
        &self.voices
    }

    /// Number of voices which currently play a note.
    pub fn active_voice_count(&self) -> usize {
        self.voices
            .iter()
            .filter(|voice| voice.state().is_active())
            .count()
    }

    pub fn add_voice(&mut self, voice: V) {
        self.voices.push(voice);
        self.usable_voices.reserve(self.voices.len());
    }

    pub fn clear_voices(&mut self) {
        self.voices.clear();
    }

    /// Access to all sounds.
    pub fn sounds(&self) -> &[Arc<V::Sound>] {
        &self.sounds
    }

    pub fn add_sound(&mut self, sound: Arc<V::Sound>) {
        self.sounds.push(sound);
    }

    pub fn clear_sounds(&mut self) {
        self.sounds.clear();
    }

    pub fn is_note_stealing_enabled(&self) -> bool {
        self.note_stealing_enabled
    }

    /// When disabled, note-ons which find no free voice get dropped.
    pub fn set_note_stealing_enabled(&mut self, enabled: bool) {
        self.note_stealing_enabled = enabled;
    }

    /// Set the smallest number of frames [`Self::process_block`] renders between two events.
    /// Events closer than that get applied early. When `strict` is false, the first event in
    /// a block may split it at any offset.
    pub fn set_minimum_sub_block_size(&mut self, frames: usize, strict: bool) {
        debug_assert!(frames > 0, "Invalid sub block size");
        self.minimum_sub_block_size = frames.max(1);
        self.strict_sub_block_size = strict;
    }

    /// Start a note on all voices with matching sounds, stealing voices when necessary.
    pub fn note_on(&mut self, channel: u8, note: u8, velocity: f32) {
        for sound_index in 0..self.sounds.len() {
            let sound = Arc::clone(&self.sounds[sound_index]);
            if sound.applies_to_note(note) && sound.applies_to_channel(channel) {
                // a still ringing voice with the same note could be held by a pedal
                for voice in self.voices.iter_mut() {
                    if voice.state().note() == Some(note) && voice.state().is_playing_channel(channel)
                    {
                        voice.stop_note(1.0, true);
                    }
                }
                if let Some(voice_index) = self.find_free_voice(&sound, note) {
                    self.start_voice(voice_index, &sound, channel, note, velocity);
                }
            }
        }
    }

    /// Release a note. Voices held by the sustain or sostenuto pedal keep playing.
    pub fn note_off(&mut self, channel: u8, note: u8, velocity: f32, allow_tail_off: bool) {
        for voice in self.voices.iter_mut() {
            let state = voice.state();
            let applies = state.note() == Some(note)
                && state.is_playing_channel(channel)
                && state
                    .sound()
                    .is_some_and(|s| s.applies_to_note(note) && s.applies_to_channel(channel));
            if applies {
                let state = voice.state_mut();
                state.key_down = false;
                if !(state.sustain_pedal_down || state.sostenuto_pedal_down) {
                    voice.stop_note(velocity, allow_tail_off);
                }
            }
        }
    }

    /// Stop all notes on the given channel, or on all channels when `channel` is 0.
    pub fn all_notes_off(&mut self, channel: u8, allow_tail_off: bool) {
        for voice in self.voices.iter_mut() {
            if channel == 0 || voice.state().is_playing_channel(channel) {
                voice.stop_note(1.0, allow_tail_off);
            }
        }
        self.sustain_pedals_down = [false; 17];
    }

    pub fn handle_pitch_wheel(&mut self, channel: u8, value: u16) {
        self.last_pitch_wheel_values[Self::channel_index(channel)] = value;
        for voice in self.voices.iter_mut() {
            if channel == 0 || voice.state().is_playing_channel(channel) {
                voice.pitch_wheel_moved(value);
            }
        }
    }

    pub fn handle_controller(&mut self, channel: u8, controller: u8, value: u8) {
        match controller {
            SUSTAIN_PEDAL_CONTROLLER => self.handle_sustain_pedal(channel, value >= 64),
            SOSTENUTO_PEDAL_CONTROLLER => self.handle_sostenuto_pedal(channel, value >= 64),
            SOFT_PEDAL_CONTROLLER => (),
            _ => (),
        }
        for voice in self.voices.iter_mut() {
            if channel == 0 || voice.state().is_playing_channel(channel) {
                voice.controller_moved(controller, value);
            }
        }
    }

    pub fn handle_aftertouch(&mut self, channel: u8, note: u8, value: u8) {
        for voice in self.voices.iter_mut() {
            if voice.state().note() == Some(note)
                && (channel == 0 || voice.state().is_playing_channel(channel))
            {
                voice.aftertouch_changed(value);
            }
        }
    }

    pub fn handle_channel_pressure(&mut self, channel: u8, value: u8) {
        for voice in self.voices.iter_mut() {
            if channel == 0 || voice.state().is_playing_channel(channel) {
                voice.channel_pressure_changed(value);
            }
        }
    }

    pub fn handle_sustain_pedal(&mut self, channel: u8, is_down: bool) {
        if is_down {
            self.sustain_pedals_down[Self::pedal_index(channel)] = true;
            for voice in self.voices.iter_mut() {
                let state = voice.state_mut();
                if state.is_playing_channel(channel) && state.key_down {
                    state.sustain_pedal_down = true;
                }
            }
        } else {
            for voice in self.voices.iter_mut() {
                let state = voice.state_mut();
                if state.is_playing_channel(channel) {
                    state.sustain_pedal_down = false;
                    if !(state.key_down || state.sostenuto_pedal_down) {
                        voice.stop_note(1.0, true);
                    }
                }
            }
            self.sustain_pedals_down[Self::pedal_index(channel)] = false;
        }
    }

    pub fn handle_sostenuto_pedal(&mut self, channel: u8, is_down: bool) {
        for voice in self.voices.iter_mut() {
            let state = voice.state_mut();
            if state.is_playing_channel(channel) {
                if is_down {
                    state.sostenuto_pedal_down = true;
                } else if state.sostenuto_pedal_down {
                    voice.stop_note(1.0, true);
                }
            }
        }
    }

    /// Apply a single event.
    pub fn handle_event(&mut self, event: &SynthEvent) {
        match *event {
            SynthEvent::NoteOn {
                channel,
                note,
                velocity,
            } => self.note_on(channel, note, velocity),
            SynthEvent::NoteOff {
                channel,
                note,
                velocity,
                allow_tail_off,
            } => self.note_off(channel, note, velocity, allow_tail_off),
            SynthEvent::AllNotesOff {
                channel,
                allow_tail_off,
            } => self.all_notes_off(channel, allow_tail_off),
            SynthEvent::PitchWheel { channel, value } => self.handle_pitch_wheel(channel, value),
            SynthEvent::Controller {
                channel,
                controller,
                value,
            } => self.handle_controller(channel, controller, value),
            SynthEvent::Aftertouch {
                channel,
                note,
                value,
            } => self.handle_aftertouch(channel, note, value),
            SynthEvent::ChannelPressure { channel, value } => {
                self.handle_channel_pressure(channel, value)
            }
        }
    }

    /// Add the output of all voices to the given interleaved buffer.
    pub fn render_voices(&mut self, output: &mut [f32], channel_count: usize) {
        for voice in self.voices.iter_mut() {
            voice.render(output, channel_count);
        }
    }

    /// Render a block and apply the given events at their sample offsets.
    ///
    /// Events must be sorted by offset. The block gets split into sub-blocks at event
    /// positions, see [`Self::set_minimum_sub_block_size`]. Events at or past the end of the
    /// block get applied after rendering. Output is added to the buffer's content.
    pub fn process_block(
        &mut self,
        output: &mut [f32],
        channel_count: usize,
        events: &[TimedSynthEvent],
    ) {
        let frame_count = if channel_count > 0 {
            output.len() / channel_count
        } else {
            0
        };
        let mut start_frame = 0;
        let mut remaining_frames = frame_count;
        let mut event_index = 0;
        let mut first_event = true;

        while remaining_frames > 0 {
            let Some(timed_event) = events.get(event_index) else {
                self.render_frames(output, channel_count, start_frame, remaining_frames);
                break;
            };
            let frames_to_next_event = timed_event.sample_offset.saturating_sub(start_frame);
            if frames_to_next_event >= remaining_frames {
                self.render_frames(output, channel_count, start_frame, remaining_frames);
                break;
            }
            let minimum_frames = if first_event && !self.strict_sub_block_size {
                1
            } else {
                self.minimum_sub_block_size
            };
            if frames_to_next_event < minimum_frames {
                self.handle_event(&timed_event.event);
                event_index += 1;
                continue;
            }
            first_event = false;
            self.render_frames(output, channel_count, start_frame, frames_to_next_event);
            self.handle_event(&timed_event.event);
            start_frame += frames_to_next_event;
            remaining_frames -= frames_to_next_event;
            event_index += 1;
        }

        for timed_event in &events[event_index.min(events.len())..] {
            self.handle_event(&timed_event.event);
        }
    }

    fn render_frames(
        &mut self,
        output: &mut [f32],
        channel_count: usize,
        start_frame: usize,
        frame_count: usize,
    ) {
        let range = start_frame * channel_count..(start_frame + frame_count) * channel_count;
        self.render_voices(&mut output[range], channel_count);
    }

    fn find_free_voice(&mut self, sound: &V::Sound, note: u8) -> Option<usize> {
        if let Some(index) = self
            .voices
            .iter()
            .position(|voice| !voice.state().is_active() && voice.can_play_sound(sound))
        {
            return Some(index);
        }
        if self.note_stealing_enabled {
            self.find_voice_to_steal(sound, note)
        } else {
            None
        }
    }

    fn find_voice_to_steal(&mut self, sound: &V::Sound, note: u8) -> Option<usize> {
        let voices = &self.voices;
        let usable_voices = &mut self.usable_voices;
        usable_voices.clear();

        // lowest and highest held notes are protected, released notes are not
        let mut low = None::<usize>;
        let mut top = None::<usize>;
        for (index, voice) in voices.iter().enumerate() {
            if voice.can_play_sound(sound) {
                usable_voices.push(index);
                if !voice.state().is_playing_but_released() {
                    let voice_note = voice.state().note();
                    if low.is_none_or(|low| voice_note < voices[low].state().note()) {
                        low = Some(index);
                    }
                    if top.is_none_or(|top| voice_note > voices[top].state().note()) {
                        top = Some(index);
                    }
                }
            }
        }
        // with a single held note, only the lowest one is protected
        if top == low {
            top = None;
        }
        usable_voices.sort_unstable_by_key(|&index| voices[index].state().note_on_time());

        let is_protected = |index: usize| Some(index) == low || Some(index) == top;
        let usable_voices = &*usable_voices;

        // oldest voice playing the same note
        if let Some(&index) = usable_voices
            .iter()
            .find(|&&index| voices[index].state().note() == Some(note))
        {
            return Some(index);
        }
        // oldest released voice
        if let Some(&index) = usable_voices.iter().find(|&&index| {
            !is_protected(index) && voices[index].state().is_playing_but_released()
        }) {
            return Some(index);
        }
        // oldest voice without a key held
        if let Some(&index) = usable_voices
            .iter()
            .find(|&&index| !is_protected(index) && !voices[index].state().is_key_down())
        {
            return Some(index);
        }
        // oldest unprotected voice
        if let Some(&index) = usable_voices.iter().find(|&&index| !is_protected(index)) {
            return Some(index);
        }
        // only protected voices left: prefer the top note
        top.or(low)
    }

    fn start_voice(
        &mut self,
        voice_index: usize,
        sound: &Arc<V::Sound>,
        channel: u8,
        note: u8,
        velocity: f32,
    ) {
        self.last_note_on_counter += 1;
        let note_on_time = self.last_note_on_counter;
        let pitch_wheel = self.last_pitch_wheel_values[Self::channel_index(channel)];
        let sustain_pedal_down = self.sustain_pedals_down[Self::pedal_index(channel)];

        let voice = &mut self.voices[voice_index];
        if voice.state().sound().is_some() {
            voice.stop_note(0.0, false);
        }
        let state = voice.state_mut();
        state.note = Some(note);
        state.channel = channel;
        state.sound = Some(Arc::clone(sound));
        state.note_on_time = note_on_time;
        state.key_down = true;
        state.sostenuto_pedal_down = false;
        state.sustain_pedal_down = sustain_pedal_down;
        voice.start_note(note, velocity, sound, pitch_wheel);
    }

    #[inline]
    fn channel_index(channel: u8) -> usize {
        channel.clamp(1, 16) as usize - 1
    }

    #[inline]
    fn pedal_index(channel: u8) -> usize {
        channel.min(16) as usize
    }
}

impl<V: SynthVoice> Default for Synthesizer<V> {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
