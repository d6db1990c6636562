//! ALSA sequencer client
//!
//! Opens a duplex client with two application ports:
//! - "MIDI out": readable, events injected from OSC leave through it
//! - "MIDI in": writable, events other clients send here go to OSC
//!
//! The `alsa::Seq` handle sits behind a mutex held while pending input is
//! read or for one output+flush, never across the poll wait or a send.

use super::Sequencer;
use crate::codec::event::{PITCH_BEND_MAX, PITCH_BEND_MIN};
use crate::codec::MidiEvent;
use crate::constants::{INPUT_PORT_NAME, OUTPUT_PORT_NAME};
use crate::error::{BridgeError, Result};
use alsa::poll::pollfd;
use alsa::seq::{EvCtrl, EvNote, Event, EventType, PortCap, PortType, Seq};
use alsa::PollDescriptors;
use parking_lot::Mutex;
use std::ffi::CString;
use std::time::Duration;
use tracing::{debug, warn};

pub struct AlsaSequencer {
    seq: Mutex<Seq>,
    /// Capture-side descriptors, copied for every poll
    fds: Vec<pollfd>,
    /// Source port for injected events (`None` if creation failed)
    output_port: Option<i32>,
}

impl AlsaSequencer {
    /// Open `device` as a duplex client named `client_name`
    ///
    /// Port creation failures are logged and tolerated; only failing to
    /// open the device itself is an error.
    pub fn open(device: &str, client_name: &str) -> Result<Self> {
        let open_err = |reason: String| BridgeError::SequencerOpen {
            device: device.to_string(),
            reason,
        };

        let device_c = CString::new(device).map_err(|e| open_err(e.to_string()))?;
        let seq = Seq::open(Some(device_c.as_c_str()), None, false)
            .map_err(|e| open_err(e.to_string()))?;

        match CString::new(client_name) {
            Ok(name) => {
                if let Err(e) = seq.set_client_name(&name) {
                    warn!("Cannot set client name '{}': {}", client_name, e);
                }
            }
            Err(e) => warn!("Invalid client name '{}': {}", client_name, e),
        }

        let output_port = create_port(
            &seq,
            OUTPUT_PORT_NAME,
            PortCap::READ | PortCap::SUBS_READ,
        );
        let input_port = create_port(
            &seq,
            INPUT_PORT_NAME,
            PortCap::WRITE | PortCap::SUBS_WRITE,
        );
        debug!(?output_port, ?input_port, "Sequencer ports created");

        let fds = (&seq, Some(alsa::Direction::Capture))
            .get()
            .map_err(|e| open_err(format!("poll descriptors: {}", e)))?;

        Ok(Self {
            seq: Mutex::new(seq),
            fds,
            output_port,
        })
    }
}

fn create_port(seq: &Seq, name: &'static str, caps: PortCap) -> Option<i32> {
    let port = CString::new(name)
        .map_err(|e| e.to_string())
        .and_then(|c_name| {
            seq.create_simple_port(&c_name, caps, PortType::APPLICATION)
                .map_err(|e| e.to_string())
        });

    match port {
        Ok(id) => Some(id),
        Err(reason) => {
            warn!("{}", BridgeError::PortCreate { port: name, reason });
            None
        }
    }
}

fn sequencer_err(operation: &'static str) -> impl Fn(alsa::Error) -> BridgeError {
    move |e| BridgeError::Sequencer {
        operation,
        reason: e.to_string(),
    }
}

/// Clamp a raw sequencer value into a 7-bit data byte
fn data_byte(value: i64) -> u8 {
    value.clamp(0, 127) as u8
}

/// Map a raw sequencer event onto the bridged kinds
fn to_midi(ev: &Event) -> MidiEvent {
    let note = || ev.get_data::<EvNote>();
    let ctrl = || ev.get_data::<EvCtrl>();

    let mapped = match ev.get_type() {
        EventType::Noteoff => note().map(|n| MidiEvent::NoteOff {
            channel: n.channel & 0x0f,
            note: data_byte(n.note.into()),
            velocity: data_byte(n.velocity.into()),
        }),
        EventType::Noteon => note().map(|n| MidiEvent::NoteOn {
            channel: n.channel & 0x0f,
            note: data_byte(n.note.into()),
            velocity: data_byte(n.velocity.into()),
        }),
        EventType::Keypress => note().map(|n| MidiEvent::KeyPressure {
            channel: n.channel & 0x0f,
            note: data_byte(n.note.into()),
            value: data_byte(n.velocity.into()),
        }),
        EventType::Controller => ctrl().map(|c| MidiEvent::ControlChange {
            channel: c.channel & 0x0f,
            controller: data_byte(c.param.into()),
            value: data_byte(c.value.into()),
        }),
        EventType::Pgmchange => ctrl().map(|c| MidiEvent::ProgramChange {
            channel: c.channel & 0x0f,
            value: data_byte(c.value.into()),
        }),
        EventType::Chanpress => ctrl().map(|c| MidiEvent::ChannelPressure {
            channel: c.channel & 0x0f,
            value: data_byte(c.value.into()),
        }),
        EventType::Pitchbend => ctrl().map(|c| MidiEvent::PitchBend {
            channel: c.channel & 0x0f,
            value: c
                .value
                .clamp(i32::from(PITCH_BEND_MIN), i32::from(PITCH_BEND_MAX)) as i16,
        }),
        EventType::Start => Some(MidiEvent::TransportStart),
        EventType::Continue => Some(MidiEvent::TransportContinue),
        EventType::Stop => Some(MidiEvent::TransportStop),
        other => {
            debug!("Unbridged sequencer event {:?}", other);
            None
        }
    };

    mapped.unwrap_or(MidiEvent::Unknown)
}

/// Build the raw sequencer event for an injectable MIDI event
fn to_alsa(event: &MidiEvent) -> Option<Event<'static>> {
    let note = |channel: u8, note: u8, velocity: u8| EvNote {
        channel,
        note,
        velocity,
        off_velocity: 0,
        duration: 0,
    };
    let ctrl = |channel: u8, param: u32, value: i32| EvCtrl {
        channel,
        param,
        value,
    };

    let ev = match *event {
        MidiEvent::NoteOff {
            channel,
            note: n,
            velocity,
        } => Event::new(EventType::Noteoff, &note(channel, n, velocity)),
        MidiEvent::NoteOn {
            channel,
            note: n,
            velocity,
        } => Event::new(EventType::Noteon, &note(channel, n, velocity)),
        MidiEvent::KeyPressure {
            channel,
            note: n,
            value,
        } => Event::new(EventType::Keypress, &note(channel, n, value)),
        MidiEvent::ControlChange {
            channel,
            controller,
            value,
        } => Event::new(
            EventType::Controller,
            &ctrl(channel, controller.into(), value.into()),
        ),
        MidiEvent::ProgramChange { channel, value } => {
            Event::new(EventType::Pgmchange, &ctrl(channel, 0, value.into()))
        }
        MidiEvent::ChannelPressure { channel, value } => {
            Event::new(EventType::Chanpress, &ctrl(channel, 0, value.into()))
        }
        MidiEvent::PitchBend { channel, value } => {
            Event::new(EventType::Pitchbend, &ctrl(channel, 0, value.into()))
        }
        MidiEvent::TransportStart
        | MidiEvent::TransportContinue
        | MidiEvent::TransportStop
        | MidiEvent::Unknown => return None,
    };
    Some(ev)
}

/// Read every pending input event into `events`
///
/// Events read before a failure stay in `events`.
fn read_pending(input: &mut alsa::seq::Input<'_>, events: &mut Vec<MidiEvent>) -> Result<()> {
    while input
        .event_input_pending(true)
        .map_err(sequencer_err("input pending"))?
        > 0
    {
        let ev = input.event_input().map_err(sequencer_err("event input"))?;
        events.push(to_midi(&ev));
    }
    Ok(())
}

impl Sequencer for AlsaSequencer {
    fn wait(&self, timeout: Duration) -> Result<bool> {
        let mut fds = self.fds.clone();
        let ready = alsa::poll::poll(&mut fds, timeout.as_millis() as i32)
            .map_err(sequencer_err("poll"))?;
        Ok(ready > 0)
    }

    fn drain(&self, on_event: &mut dyn FnMut(MidiEvent)) -> Result<usize> {
        // Events are copied out so the lock is not held while they are sent
        let (events, result) = {
            let seq = self.seq.lock();
            let mut input = seq.input();
            let mut events = Vec::new();
            let result = read_pending(&mut input, &mut events);
            (events, result)
        };

        let count = events.len();
        for event in events {
            on_event(event);
        }
        result.map(|()| count)
    }

    fn inject(&self, event: &MidiEvent) -> Result<()> {
        let Some(mut ev) = to_alsa(event) else {
            return Err(BridgeError::Sequencer {
                operation: "inject",
                reason: format!("{} is not injectable", event.label()),
            });
        };

        if let Some(port) = self.output_port {
            ev.set_source(port);
        }
        ev.set_subs();
        ev.set_direct();

        let seq = self.seq.lock();
        seq.event_output_direct(&mut ev)
            .map_err(sequencer_err("event output"))?;
        seq.drain_output().map_err(sequencer_err("drain output"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsa::seq::EvQueueControl;

    fn bridged() -> Vec<MidiEvent> {
        vec![
            MidiEvent::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0,
            },
            MidiEvent::NoteOn {
                channel: 15,
                note: 127,
                velocity: 100,
            },
            MidiEvent::KeyPressure {
                channel: 3,
                note: 36,
                value: 70,
            },
            MidiEvent::ControlChange {
                channel: 1,
                controller: 7,
                value: 64,
            },
            MidiEvent::ProgramChange {
                channel: 4,
                value: 9,
            },
            MidiEvent::ChannelPressure {
                channel: 5,
                value: 33,
            },
            MidiEvent::PitchBend {
                channel: 2,
                value: PITCH_BEND_MIN,
            },
            MidiEvent::PitchBend {
                channel: 2,
                value: PITCH_BEND_MAX,
            },
        ]
    }

    #[test]
    fn test_bridged_kinds_survive_the_bus_format() {
        for event in bridged() {
            let raw = to_alsa(&event).unwrap();
            assert_eq!(to_midi(&raw), event);
        }
    }

    #[test]
    fn test_program_and_pressure_use_value_field() {
        let raw = to_alsa(&MidiEvent::ProgramChange {
            channel: 4,
            value: 9,
        })
        .unwrap();
        let ctrl = raw.get_data::<EvCtrl>().unwrap();
        assert_eq!(ctrl.param, 0);
        assert_eq!(ctrl.value, 9);
    }

    #[test]
    fn test_out_of_range_bus_values_are_clamped() {
        let raw = Event::new(
            EventType::Controller,
            &EvCtrl {
                channel: 0x13,
                param: 200,
                value: -5,
            },
        );
        assert_eq!(
            to_midi(&raw),
            MidiEvent::ControlChange {
                channel: 3,
                controller: 127,
                value: 0
            }
        );

        let raw = Event::new(
            EventType::Pitchbend,
            &EvCtrl {
                channel: 0,
                param: 0,
                value: 20000,
            },
        );
        assert_eq!(
            to_midi(&raw),
            MidiEvent::PitchBend {
                channel: 0,
                value: PITCH_BEND_MAX
            }
        );
    }

    #[test]
    fn test_transport_and_unknown_are_not_injectable() {
        for event in [
            MidiEvent::TransportStart,
            MidiEvent::TransportContinue,
            MidiEvent::TransportStop,
            MidiEvent::Unknown,
        ] {
            assert!(to_alsa(&event).is_none());
        }
    }

    #[test]
    fn test_transport_from_bus() {
        let control = EvQueueControl {
            queue: 0,
            value: (),
        };
        for (kind, expected) in [
            (EventType::Start, MidiEvent::TransportStart),
            (EventType::Continue, MidiEvent::TransportContinue),
            (EventType::Stop, MidiEvent::TransportStop),
        ] {
            assert_eq!(to_midi(&Event::new(kind, &control)), expected);
        }
    }

    #[test]
    fn test_unbridged_bus_event_is_unknown() {
        let raw = Event::new(
            EventType::Note,
            &EvNote {
                channel: 0,
                note: 60,
                velocity: 100,
                off_velocity: 0,
                duration: 500,
            },
        );
        assert_eq!(to_midi(&raw), MidiEvent::Unknown);
    }
}
