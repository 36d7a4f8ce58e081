//! Note and controller events for the [`Synthesizer`](super::Synthesizer).

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Center value of a 14 bit MIDI pitch wheel.
pub const PITCH_WHEEL_CENTER: u16 = 0x2000;

/// Controller numbers the synthesizer handles itself.
pub const SUSTAIN_PEDAL_CONTROLLER: u8 = 0x40;
pub const SOSTENUTO_PEDAL_CONTROLLER: u8 = 0x42;
pub const SOFT_PEDAL_CONTROLLER: u8 = 0x43;
const ALL_SOUND_OFF_CONTROLLER: u8 = 120;
const ALL_NOTES_OFF_CONTROLLER: u8 = 123;

// -------------------------------------------------------------------------------------------------

/// Events which can be applied to a [`Synthesizer`](super::Synthesizer).
///
/// MIDI channels are in range 1-16. A channel of 0 in [`SynthEvent::AllNotesOff`] addresses
/// all channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynthEvent {
    NoteOn {
        channel: u8,
        note: u8,
        /// Velocity in range 0.0..=1.0.
        velocity: f32,
    },
    NoteOff {
        channel: u8,
        note: u8,
        velocity: f32,
        /// When false, the voice stops immediately instead of playing its release.
        allow_tail_off: bool,
    },
    AllNotesOff {
        channel: u8,
        allow_tail_off: bool,
    },
    PitchWheel {
        channel: u8,
        /// 14 bit wheel position, centered at [`PITCH_WHEEL_CENTER`].
        value: u16,
    },
    Controller {
        channel: u8,
        controller: u8,
        value: u8,
    },
    Aftertouch {
        channel: u8,
        note: u8,
        value: u8,
    },
    ChannelPressure {
        channel: u8,
        value: u8,
    },
}

impl SynthEvent {
    /// Decode a raw MIDI 1.0 channel voice message.
    ///
    /// Returns `None` for messages the synth doesn't handle (system messages, program
    /// changes, running status or truncated messages).
    pub fn from_midi(message: &[u8]) -> Option<Self> {
        let (&status, data) = message.split_first()?;
        if !(0x80..0xF0).contains(&status) {
            return None;
        }
        let channel = (status & 0x0F) + 1;
        let data1 = || data.first().map(|v| v & 0x7F);
        let data2 = || data.get(1).map(|v| v & 0x7F);
        let event = match status & 0xF0 {
            0x80 => SynthEvent::NoteOff {
                channel,
                note: data1()?,
                velocity: data2()? as f32 / 127.0,
                allow_tail_off: true,
            },
            0x90 => {
                let note = data1()?;
                let velocity = data2()?;
                if velocity == 0 {
                    SynthEvent::NoteOff {
                        channel,
                        note,
                        velocity: 0.0,
                        allow_tail_off: true,
                    }
                } else {
                    SynthEvent::NoteOn {
                        channel,
                        note,
                        velocity: velocity as f32 / 127.0,
                    }
                }
            }
            0xA0 => SynthEvent::Aftertouch {
                channel,
                note: data1()?,
                value: data2()?,
            },
            0xB0 => {
                let controller = data1()?;
                let value = data2()?;
                match controller {
                    ALL_SOUND_OFF_CONTROLLER | ALL_NOTES_OFF_CONTROLLER => {
                        SynthEvent::AllNotesOff {
                            channel,
                            allow_tail_off: true,
                        }
                    }
                    _ => SynthEvent::Controller {
                        channel,
                        controller,
                        value,
                    },
                }
            }
            0xD0 => SynthEvent::ChannelPressure {
                channel,
                value: data1()?,
            },
            0xE0 => SynthEvent::PitchWheel {
                channel,
                value: data1()? as u16 | ((data2()? as u16) << 7),
            },
            // program change
            _ => return None,
        };
        Some(event)
    }

    /// Check that channel, note and value ranges are valid.
    pub fn validate(&self) -> Result<(), Error> {
        fn check_channel(channel: u8) -> Result<(), Error> {
            if (1..=16).contains(&channel) {
                Ok(())
            } else {
                Err(Error::ParameterError(format!(
                    "Invalid MIDI channel: {channel}. Must be in range [1, 16]"
                )))
            }
        }
        fn check_7bit(what: &str, value: u8) -> Result<(), Error> {
            if value <= 127 {
                Ok(())
            } else {
                Err(Error::ParameterError(format!(
                    "Invalid {what}: {value}. Must be in range [0, 127]"
                )))
            }
        }
        fn check_velocity(velocity: f32) -> Result<(), Error> {
            if (0.0..=1.0).contains(&velocity) {
                Ok(())
            } else {
                Err(Error::ParameterError(format!(
                    "Invalid velocity: {velocity}. Must be in range [0.0, 1.0]"
                )))
            }
        }
        match *self {
            SynthEvent::NoteOn {
                channel,
                note,
                velocity,
            }
            | SynthEvent::NoteOff {
                channel,
                note,
                velocity,
                ..
            } => {
                check_channel(channel)?;
                check_7bit("note", note)?;
                check_velocity(velocity)
            }
            SynthEvent::AllNotesOff { channel, .. } => {
                if channel == 0 {
                    Ok(())
                } else {
                    check_channel(channel)
                }
            }
            SynthEvent::PitchWheel { channel, value } => {
                check_channel(channel)?;
                if value <= 0x3FFF {
                    Ok(())
                } else {
                    Err(Error::ParameterError(format!(
                        "Invalid pitch wheel value: {value}. Must be in range [0, 16383]"
                    )))
                }
            }
            SynthEvent::Controller {
                channel,
                controller,
                value,
            } => {
                check_channel(channel)?;
                check_7bit("controller", controller)?;
                check_7bit("controller value", value)
            }
            SynthEvent::Aftertouch {
                channel,
                note,
                value,
            } => {
                check_channel(channel)?;
                check_7bit("note", note)?;
                check_7bit("aftertouch value", value)
            }
            SynthEvent::ChannelPressure { channel, value } => {
                check_channel(channel)?;
                check_7bit("channel pressure", value)
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A [`SynthEvent`] which should be applied at the given frame offset in a rendered block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSynthEvent {
    pub sample_offset: usize,
    pub event: SynthEvent,
}

impl TimedSynthEvent {
    pub fn new(sample_offset: usize, event: SynthEvent) -> Self {
        Self {
            sample_offset,
            event,
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_notes() {
        assert_eq!(
            SynthEvent::from_midi(&[0x90, 60, 127]),
            Some(SynthEvent::NoteOn {
                channel: 1,
                note: 60,
                velocity: 1.0
            })
        );
        assert_eq!(
            SynthEvent::from_midi(&[0x83, 61, 64]),
            Some(SynthEvent::NoteOff {
                channel: 4,
                note: 61,
                velocity: 64.0 / 127.0,
                allow_tail_off: true
            })
        );
        // note-on with zero velocity is a note-off
        assert_eq!(
            SynthEvent::from_midi(&[0x9F, 62, 0]),
            Some(SynthEvent::NoteOff {
                channel: 16,
                note: 62,
                velocity: 0.0,
                allow_tail_off: true
            })
        );
    }

    #[test]
    fn decode_controllers() {
        assert_eq!(
            SynthEvent::from_midi(&[0xB0, 64, 127]),
            Some(SynthEvent::Controller {
                channel: 1,
                controller: SUSTAIN_PEDAL_CONTROLLER,
                value: 127
            })
        );
        for controller in [120, 123] {
            assert_eq!(
                SynthEvent::from_midi(&[0xB2, controller, 0]),
                Some(SynthEvent::AllNotesOff {
                    channel: 3,
                    allow_tail_off: true
                })
            );
        }
        assert_eq!(
            SynthEvent::from_midi(&[0xE0, 0x00, 0x40]),
            Some(SynthEvent::PitchWheel {
                channel: 1,
                value: PITCH_WHEEL_CENTER
            })
        );
        assert_eq!(
            SynthEvent::from_midi(&[0xE1, 0x7F, 0x7F]),
            Some(SynthEvent::PitchWheel {
                channel: 2,
                value: 0x3FFF
            })
        );
        assert_eq!(
            SynthEvent::from_midi(&[0xA0, 60, 10]),
            Some(SynthEvent::Aftertouch {
                channel: 1,
                note: 60,
                value: 10
            })
        );
        assert_eq!(
            SynthEvent::from_midi(&[0xD5, 99]),
            Some(SynthEvent::ChannelPressure {
                channel: 6,
                value: 99
            })
        );
    }

    #[test]
    fn ignore_unsupported_messages() {
        assert_eq!(SynthEvent::from_midi(&[]), None);
        assert_eq!(SynthEvent::from_midi(&[60, 100]), None);
        assert_eq!(SynthEvent::from_midi(&[0x90, 60]), None);
        assert_eq!(SynthEvent::from_midi(&[0xC0, 5]), None);
        assert_eq!(SynthEvent::from_midi(&[0xF8]), None);
    }

    #[test]
    fn validation() {
        let note_on = |channel, note, velocity| SynthEvent::NoteOn {
            channel,
            note,
            velocity,
        };
        assert!(note_on(1, 60, 1.0).validate().is_ok());
        assert!(note_on(0, 60, 1.0).validate().is_err());
        assert!(note_on(17, 60, 1.0).validate().is_err());
        assert!(note_on(1, 128, 1.0).validate().is_err());
        assert!(note_on(1, 60, 1.5).validate().is_err());
        assert!(note_on(1, 60, f32::NAN).validate().is_err());
        assert!(SynthEvent::AllNotesOff {
            channel: 0,
            allow_tail_off: false
        }
        .validate()
        .is_ok());
        assert!(SynthEvent::PitchWheel {
            channel: 1,
            value: 0x4000
        }
        .validate()
        .is_err());
    }
}
