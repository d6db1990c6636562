//! Event codec: MIDI events <-> OSC messages
//!
//! Pure and stateless. Separates translation from I/O:
//! - **Codec**: what a MIDI event looks like on the OSC wire (this module)
//! - **Transport**: how OSC packets flow (`crate::transport`)
//! - **Sequencer**: how MIDI events reach the local bus (`crate::sequencer`)
//!
//! Forward mapping (`to_osc`) is total over bridged event kinds.
//! Reverse mapping (`from_osc`) classifies every message into a
//! [`Translation`] so the caller never has to catch anything.

pub mod address;
mod decode;
pub mod event;

pub use event::MidiEvent;

use event::to_wire_pitch;
use rosc::{OscMessage, OscType};

/// Outcome of the reverse mapping
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// Message decoded into an event for the bus
    Translated(MidiEvent),
    /// Address not recognized, or argument count does not match it
    Unhandled,
    /// Legacy combined address with a selector that is no longer honored
    Deprecated,
    /// Recognized address and arity, but argument types or values are invalid
    Malformed(String),
}

/// Translate a bus event into its OSC message
///
/// Returns `None` for [`MidiEvent::Unknown`].
pub fn to_osc(event: &MidiEvent) -> Option<OscMessage> {
    let int = |v: u8| OscType::Int(i32::from(v));

    let (addr, args) = match *event {
        MidiEvent::NoteOff {
            channel,
            note,
            velocity,
        } => (address::NOTE_OFF, vec![int(channel), int(note), int(velocity)]),
        MidiEvent::NoteOn {
            channel,
            note,
            velocity,
        } => (address::NOTE_ON, vec![int(channel), int(note), int(velocity)]),
        MidiEvent::KeyPressure {
            channel,
            note,
            value,
        } => (address::KEY_PRESSURE, vec![int(channel), int(note), int(value)]),
        MidiEvent::ControlChange {
            channel,
            controller,
            value,
        } => (
            address::CONTROL_CHANGE,
            vec![int(channel), int(controller), int(value)],
        ),
        MidiEvent::ProgramChange { channel, value } => {
            (address::PROGRAM_CHANGE, vec![int(channel), int(value)])
        }
        MidiEvent::ChannelPressure { channel, value } => {
            (address::CHANNEL_PRESSURE, vec![int(channel), int(value)])
        }
        MidiEvent::PitchBend { channel, value } => (
            address::PITCH_BEND,
            vec![int(channel), OscType::Int(to_wire_pitch(value))],
        ),
        MidiEvent::TransportStart => (address::START, vec![OscType::Int(1)]),
        MidiEvent::TransportContinue => (address::CONTINUE, vec![OscType::Int(1)]),
        MidiEvent::TransportStop => (address::STOP, vec![OscType::Int(1)]),
        MidiEvent::Unknown => return None,
    };

    Some(OscMessage {
        addr: addr.to_string(),
        args,
    })
}

/// Translate an OSC message into a bus event
///
/// Dispatch is by exact address, then exact argument count.
pub fn from_osc(msg: &OscMessage) -> Translation {
    let Some(handler) = address::handlers().get(msg.addr.as_str()) else {
        return Translation::Unhandled;
    };

    if let Some(arity) = handler.arity {
        if msg.args.len() != arity {
            return Translation::Unhandled;
        }
    }

    (handler.decode)(&msg.args)
}
