//! Immutable, decoded sample data shared by all voices and grains.

use std::ops::RangeInclusive;

use crate::{synth::SynthSound, Error};

// -------------------------------------------------------------------------------------------------

/// Decoded mono or stereo PCM data with its source sample rate and root note.
///
/// Channel data is stored planar with a few extra guard frames past the sample's length, so
/// grains can interpolate between frame `length - 1` and `length` without bound checks. Guard
/// frames are copied from the source when available and are zero otherwise.
///
/// Samples get created once on the control thread and then shared via `Arc` with the synth.
/// A sample with a non positive sample rate or without frames is *empty*: it applies to no
/// note, so trying to play it is a silent no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    name: String,
    sample_rate: f64,
    channels: Vec<Box<[f32]>>,
    length: usize,
    root_note: u8,
    note_range: RangeInclusive<u8>,
    midi_channel: Option<u8>,
}

impl Sample {
    /// Number of extra frames stored past the sample's length.
    pub const GUARD_FRAMES: usize = 4;
    /// Max number of channels a sample keeps. Additional source channels are dropped.
    pub const MAX_CHANNELS: usize = 2;
    /// Default max length of loaded samples in seconds.
    pub const DEFAULT_MAX_LENGTH_SECS: f64 = 10.0;

    /// Create a new sample from interleaved PCM data.
    ///
    /// The sample gets truncated to `max_length_secs`. Returns an error when `channel_count`
    /// is zero or the buffer size is not a multiple of the channel count.
    pub fn from_interleaved(
        name: &str,
        data: &[f32],
        channel_count: usize,
        sample_rate: f64,
        root_note: u8,
        max_length_secs: f64,
    ) -> Result<Self, Error> {
        if channel_count == 0 {
            return Err(Error::SampleError(
                "Sample channel count must be > 0".to_string(),
            ));
        }
        if data.len() % channel_count != 0 {
            return Err(Error::SampleError(format!(
                "Interleaved buffer size {} is not a multiple of the channel count {}",
                data.len(),
                channel_count
            )));
        }
        let frame_count = data.len() / channel_count;
        Ok(Self::from_frames(
            name,
            channel_count.min(Self::MAX_CHANNELS),
            frame_count,
            sample_rate,
            root_note,
            max_length_secs,
            |channel, frame| data[frame * channel_count + channel],
        ))
    }

    /// Create a new sample from planar PCM data, one slice per channel.
    ///
    /// Returns an error when no channels are passed or the channel slices differ in length.
    pub fn from_planar<C: AsRef<[f32]>>(
        name: &str,
        channels: &[C],
        sample_rate: f64,
        root_note: u8,
        max_length_secs: f64,
    ) -> Result<Self, Error> {
        let Some(first_channel) = channels.first() else {
            return Err(Error::SampleError(
                "Sample channel count must be > 0".to_string(),
            ));
        };
        let frame_count = first_channel.as_ref().len();
        if channels.iter().any(|c| c.as_ref().len() != frame_count) {
            return Err(Error::SampleError(
                "All sample channels must have the same length".to_string(),
            ));
        }
        Ok(Self::from_frames(
            name,
            channels.len().min(Self::MAX_CHANNELS),
            frame_count,
            sample_rate,
            root_note,
            max_length_secs,
            |channel, frame| channels[channel].as_ref()[frame],
        ))
    }

    fn from_frames<F: Fn(usize, usize) -> f32>(
        name: &str,
        channel_count: usize,
        frame_count: usize,
        sample_rate: f64,
        root_note: u8,
        max_length_secs: f64,
        frame_value: F,
    ) -> Self {
        let name = name.to_string();
        let root_note = root_note.min(127);
        let note_range = 0..=127;
        let midi_channel = None;

        let max_frames = if max_length_secs.is_finite() && sample_rate.is_finite() {
            (max_length_secs.max(0.0) * sample_rate.max(0.0)) as usize
        } else {
            frame_count
        };
        let length = frame_count.min(max_frames);
        let valid_sample_rate = sample_rate.is_finite() && sample_rate > 0.0;
        if !valid_sample_rate || length == 0 {
            log::warn!(
                "Sample '{name}' has no playable frames (sample rate: {sample_rate}, frames: {frame_count})"
            );
            return Self {
                name,
                sample_rate: if valid_sample_rate { sample_rate } else { 0.0 },
                channels: Vec::new(),
                length: 0,
                root_note,
                note_range,
                midi_channel,
            };
        }

        let channels = (0..channel_count)
            .map(|channel| {
                (0..length + Self::GUARD_FRAMES)
                    .map(|frame| {
                        if frame < frame_count {
                            frame_value(channel, frame)
                        } else {
                            0.0
                        }
                    })
                    .collect::<Box<[f32]>>()
            })
            .collect::<Vec<_>>();

        log::info!(
            "Loaded sample '{name}' with {channel_count} channel(s), {length} frames at {sample_rate} Hz"
        );
        Self {
            name,
            sample_rate,
            channels,
            length,
            root_note,
            note_range,
            midi_channel,
        }
    }

    /// Restrict the notes this sample applies to. By default, all notes apply.
    #[must_use]
    pub fn with_note_range(mut self, note_range: RangeInclusive<u8>) -> Self {
        self.note_range = note_range;
        self
    }

    /// Restrict the MIDI channel (1-16) this sample applies to. By default, all channels apply.
    #[must_use]
    pub fn with_midi_channel(mut self, channel: u8) -> Self {
        self.midi_channel = Some(channel);
        self
    }

    /// The sample's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sample's source sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of stored channels: 1 or 2, or 0 for empty samples.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Length of the sample in frames, excluding guard frames.
    pub fn len(&self) -> usize {
        self.length
    }

    /// True when the sample has no playable frames.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// MIDI note which plays the sample at its original pitch.
    pub fn root_note(&self) -> u8 {
        self.root_note
    }

    /// Access a channel's frames, including the trailing guard frames. Mono samples return
    /// their only channel for all channel indices. Empty samples return an empty slice.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        match self.channels.len() {
            0 => &[],
            1 => &self.channels[0],
            _ => &self.channels[index.min(1)],
        }
    }
}

impl SynthSound for Sample {
    fn applies_to_note(&self, note: u8) -> bool {
        !self.is_empty() && self.note_range.contains(&note)
    }

    fn applies_to_channel(&self, channel: u8) -> bool {
        self.midi_channel.is_none_or(|c| c == channel)
    }
}

// -------------------------------------------------------------------------------------------------
