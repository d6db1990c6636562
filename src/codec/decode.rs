//! Inbound decoders, one per recognized address
//!
//! Every decoder receives an argument slice whose length already matches
//! the handler's arity (except `legacy`, which checks for itself).

use super::address::LEGACY_PITCH_BEND_SELECTOR;
use super::event::{from_wire_pitch, PITCH_BEND_MAX, PITCH_BEND_MIN};
use super::{MidiEvent, Translation};
use rosc::OscType;

type Field<T> = std::result::Result<T, String>;

/// Integer argument constrained to `0..=max`
fn int_arg(args: &[OscType], index: usize, name: &str, max: i32) -> Field<u8> {
    match args.get(index) {
        Some(OscType::Int(v)) if (0..=max).contains(v) => Ok(*v as u8),
        Some(OscType::Int(v)) => Err(format!("{} {} outside 0..={}", name, v, max)),
        Some(other) => Err(format!("{} must be an integer, got {:?}", name, other)),
        None => Err(format!("missing {}", name)),
    }
}

fn channel(args: &[OscType], index: usize) -> Field<u8> {
    int_arg(args, index, "channel", 15)
}

fn data(args: &[OscType], index: usize, name: &str) -> Field<u8> {
    int_arg(args, index, name, 127)
}

/// (channel, data1, data2) for the three-byte note messages
fn note_fields(args: &[OscType], second: &str) -> Field<(u8, u8, u8)> {
    Ok((channel(args, 0)?, data(args, 1, "note")?, data(args, 2, second)?))
}

/// (channel, data1) for the two-byte channel messages
fn channel_fields(args: &[OscType], name: &str) -> Field<(u8, u8)> {
    Ok((channel(args, 0)?, data(args, 1, name)?))
}

fn finish(event: Field<MidiEvent>) -> Translation {
    match event {
        Ok(ev) => Translation::Translated(ev),
        Err(reason) => Translation::Malformed(reason),
    }
}

pub(super) fn note_off(args: &[OscType]) -> Translation {
    finish(
        note_fields(args, "velocity").map(|(channel, note, velocity)| MidiEvent::NoteOff {
            channel,
            note,
            velocity,
        }),
    )
}

pub(super) fn note_on(args: &[OscType]) -> Translation {
    finish(
        note_fields(args, "velocity").map(|(channel, note, velocity)| MidiEvent::NoteOn {
            channel,
            note,
            velocity,
        }),
    )
}

pub(super) fn key_pressure(args: &[OscType]) -> Translation {
    finish(
        note_fields(args, "value").map(|(channel, note, value)| MidiEvent::KeyPressure {
            channel,
            note,
            value,
        }),
    )
}

pub(super) fn control_change(args: &[OscType]) -> Translation {
    finish(parse_control_change(args))
}

/// The value may arrive as int or float; floats truncate toward zero
fn parse_control_change(args: &[OscType]) -> Field<MidiEvent> {
    let channel = channel(args, 0)?;
    let controller = data(args, 1, "controller")?;
    let value = match args.get(2) {
        Some(OscType::Int(v)) => *v,
        Some(OscType::Float(f)) if f.is_finite() => f.trunc() as i32,
        Some(other) => return Err(format!("value must be int or float, got {:?}", other)),
        None => return Err("missing value".into()),
    };
    if !(0..=127).contains(&value) {
        return Err(format!("value {} outside 0..=127", value));
    }
    Ok(MidiEvent::ControlChange {
        channel,
        controller,
        value: value as u8,
    })
}

pub(super) fn program_change(args: &[OscType]) -> Translation {
    finish(
        channel_fields(args, "program")
            .map(|(channel, value)| MidiEvent::ProgramChange { channel, value }),
    )
}

pub(super) fn channel_pressure(args: &[OscType]) -> Translation {
    finish(
        channel_fields(args, "value")
            .map(|(channel, value)| MidiEvent::ChannelPressure { channel, value }),
    )
}

pub(super) fn pitch_bend(args: &[OscType]) -> Translation {
    finish(parse_pitch_bend(args))
}

/// Wire value is unsigned 14-bit, stored centered
fn parse_pitch_bend(args: &[OscType]) -> Field<MidiEvent> {
    let channel = channel(args, 0)?;
    let value = match args.get(1) {
        Some(OscType::Int(wire)) => from_wire_pitch(*wire)
            .ok_or_else(|| format!("pitch bend {} outside 0..=16383", wire))?,
        Some(other) => return Err(format!("pitch bend must be an integer, got {:?}", other)),
        None => return Err("missing pitch bend".into()),
    };
    Ok(MidiEvent::PitchBend { channel, value })
}

/// `/oscmidi "pitchbend" channel value` with an already-centered value
///
/// Any other selector is deprecated and produces no event.
pub(super) fn legacy(args: &[OscType]) -> Translation {
    match args.first() {
        Some(OscType::String(selector)) if selector == LEGACY_PITCH_BEND_SELECTOR => {}
        Some(OscType::String(_)) => return Translation::Deprecated,
        Some(other) => {
            return Translation::Malformed(format!("selector must be a string, got {:?}", other))
        }
        None => return Translation::Malformed("missing selector".into()),
    }
    if args.len() != 3 {
        return Translation::Malformed(format!(
            "legacy pitch bend expects 2 arguments after the selector, got {}",
            args.len() - 1
        ));
    }
    finish(parse_legacy_pitch_bend(&args[1..]))
}

fn parse_legacy_pitch_bend(args: &[OscType]) -> Field<MidiEvent> {
    let channel = channel(args, 0)?;
    let range = i32::from(PITCH_BEND_MIN)..=i32::from(PITCH_BEND_MAX);
    let value = match args.get(1) {
        Some(OscType::Int(v)) if range.contains(v) => *v as i16,
        Some(OscType::Int(v)) => return Err(format!("pitch bend {} outside -8192..=8191", v)),
        Some(other) => return Err(format!("pitch bend must be an integer, got {:?}", other)),
        None => return Err("missing pitch bend".into()),
    };
    Ok(MidiEvent::PitchBend { channel, value })
}
