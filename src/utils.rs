//! Low level DSP helpers used by the synth.

pub mod adsr;
pub mod buffer;

// -------------------------------------------------------------------------------------------------

/// Frequency in Hz of the given MIDI note number, with A4 (note 69) at 440 Hz.
pub fn note_to_frequency(note: f64) -> f64 {
    440.0 * 2.0f64.powf((note - 69.0) / 12.0)
}

/// Playback speed ratio which transposes a sample from `root_note` to `note`.
pub fn note_pitch_ratio(note: f64, root_note: f64) -> f64 {
    2.0f64.powf((note - root_note) / 12.0)
}

// -------------------------------------------------------------------------------------------------
