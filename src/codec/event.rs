//! MIDI event model shared by both directions
//!
//! Field ranges follow MIDI 1.0: channel 0-15, data bytes 0-127.
//! Pitch bend is stored centered (-8192..=8191); the wire form is the
//! unsigned 14-bit value `centered + PITCH_BEND_CENTER`.

use crate::constants::PITCH_BEND_CENTER;
use std::fmt;

/// Lowest centered pitch-bend value
pub const PITCH_BEND_MIN: i16 = -8192;

/// Highest centered pitch-bend value
pub const PITCH_BEND_MAX: i16 = 8191;

/// A MIDI event as seen on the sequencer bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Polyphonic aftertouch
    KeyPressure { channel: u8, note: u8, value: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, value: u8 },
    ChannelPressure { channel: u8, value: u8 },
    /// Centered value, see [`to_wire_pitch`]
    PitchBend { channel: u8, value: i16 },
    TransportStart,
    TransportContinue,
    TransportStop,
    /// Any sequencer event outside the bridged set
    Unknown,
}

impl MidiEvent {
    /// Channel of a channel-voice event, `None` for transport/unknown
    pub fn channel(&self) -> Option<u8> {
        match *self {
            Self::NoteOff { channel, .. }
            | Self::NoteOn { channel, .. }
            | Self::KeyPressure { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::ChannelPressure { channel, .. }
            | Self::PitchBend { channel, .. } => Some(channel),
            Self::TransportStart | Self::TransportContinue | Self::TransportStop | Self::Unknown => {
                None
            }
        }
    }

    /// Human-readable kind, used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoteOff { .. } => "Note off",
            Self::NoteOn { .. } => "Note on",
            Self::KeyPressure { .. } => "Pressure change",
            Self::ControlChange { .. } => "Controller change",
            Self::ProgramChange { .. } => "Program change",
            Self::ChannelPressure { .. } => "Channel pressure",
            Self::PitchBend { .. } => "Pitch bend",
            Self::TransportStart => "Start",
            Self::TransportContinue => "Continue",
            Self::TransportStop => "Stop",
            Self::Unknown => "Unknown command",
        }
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<18}", self.label())?;
        match *self {
            Self::NoteOff { channel, note, velocity } | Self::NoteOn { channel, note, velocity } => {
                write!(f, "\t{}\t{}\t{}", channel, note, velocity)
            }
            Self::KeyPressure { channel, note, value } => {
                write!(f, "\t{}\t{}\t{}", channel, note, value)
            }
            Self::ControlChange { channel, controller, value } => {
                write!(f, "\t{}\t{}\t{}", channel, controller, value)
            }
            Self::ProgramChange { channel, value } | Self::ChannelPressure { channel, value } => {
                write!(f, "\t{}\t{}", channel, value)
            }
            Self::PitchBend { channel, value } => write!(f, "\t{}\t{}", channel, value),
            _ => Ok(()),
        }
    }
}

/// Centered pitch-bend value to its unsigned 14-bit wire form
#[inline]
pub fn to_wire_pitch(centered: i16) -> i32 {
    i32::from(centered) + PITCH_BEND_CENTER
}

/// Unsigned 14-bit wire value to the centered form
///
/// Returns `None` when `wire` is outside 0..=16383.
#[inline]
pub fn from_wire_pitch(wire: i32) -> Option<i16> {
    let centered = wire.checked_sub(PITCH_BEND_CENTER)?;
    if (i32::from(PITCH_BEND_MIN)..=i32::from(PITCH_BEND_MAX)).contains(&centered) {
        i16::try_from(centered).ok()
    } else {
        None
    }
}
