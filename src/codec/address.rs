//! OSC address vocabulary and the inbound handler table
//!
//! Inbound dispatch is by exact string equality on the address (no OSC
//! pattern matching). Each recognized address maps to a `Handler` holding
//! its expected arity and decode function.

use super::decode;
use super::Translation;
use rosc::OscType;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const NOTE_OFF: &str = "/oscmidi/noteoff";
pub const NOTE_ON: &str = "/oscmidi/noteon";
pub const KEY_PRESSURE: &str = "/oscmidi/keypress";
pub const CONTROL_CHANGE: &str = "/oscmidi/cc";
pub const PROGRAM_CHANGE: &str = "/oscmidi/pgmchange";
pub const CHANNEL_PRESSURE: &str = "/oscmidi/chanpress";
pub const PITCH_BEND: &str = "/oscmidi/pitchbend";
pub const START: &str = "/oscmidi/start";
pub const CONTINUE: &str = "/oscmidi/continue";
pub const STOP: &str = "/oscmidi/stop";

/// Deprecated combined address, first argument selects the event kind
pub const LEGACY: &str = "/oscmidi";

/// Only selector still honored under [`LEGACY`]
pub const LEGACY_PITCH_BEND_SELECTOR: &str = "pitchbend";

/// Decoder for one inbound address
#[derive(Clone, Copy)]
pub(super) struct Handler {
    /// Exact argument count, `None` when the decoder checks it itself
    pub arity: Option<usize>,
    pub decode: fn(&[OscType]) -> Translation,
}

/// Lookup table for inbound addresses
///
/// Transport addresses are outbound-only and absent here.
pub(super) fn handlers() -> &'static HashMap<&'static str, Handler> {
    static TABLE: OnceLock<HashMap<&'static str, Handler>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let entries: [(&'static str, Option<usize>, fn(&[OscType]) -> Translation); 8] = [
            (NOTE_OFF, Some(3), decode::note_off),
            (NOTE_ON, Some(3), decode::note_on),
            (KEY_PRESSURE, Some(3), decode::key_pressure),
            (CONTROL_CHANGE, Some(3), decode::control_change),
            (PROGRAM_CHANGE, Some(2), decode::program_change),
            (CHANNEL_PRESSURE, Some(2), decode::channel_pressure),
            (PITCH_BEND, Some(2), decode::pitch_bend),
            (LEGACY, None, decode::legacy),
        ];
        entries
            .into_iter()
            .map(|(address, arity, decode)| (address, Handler { arity, decode }))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_inbound_addresses() {
        let table = handlers();
        assert_eq!(table.len(), 8);
        assert_eq!(table[NOTE_ON].arity, Some(3));
        assert_eq!(table[PITCH_BEND].arity, Some(2));
        assert_eq!(table[LEGACY].arity, None);
    }

    #[test]
    fn test_transport_addresses_are_outbound_only() {
        let table = handlers();
        assert!(!table.contains_key(START));
        assert!(!table.contains_key(CONTINUE));
        assert!(!table.contains_key(STOP));
    }
}
