//! Inbound dispatcher: OSC -> sequencer
//!
//! Called by the transport listener once per received message, on the
//! listener's own task. Every outcome is returned as a [`Dispatch`] value;
//! nothing here can unwind into the listener.

use super::stats::Stats;
use crate::codec::{self, MidiEvent, Translation};
use crate::sequencer::Sequencer;
use crate::transport::MessageHandler;
use rosc::OscMessage;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one received message
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Translated and written to the bus
    Injected(MidiEvent),
    /// Not an oscmidi message (unknown address or wrong argument count)
    Unhandled,
    /// Legacy combined address with an unsupported selector
    Deprecated,
    /// Handled as a no-op: malformed arguments or bus write failure
    Rejected(String),
}

pub struct Dispatcher {
    sequencer: Arc<dyn Sequencer>,
    stats: Arc<Stats>,
}

impl Dispatcher {
    pub fn new(sequencer: Arc<dyn Sequencer>, stats: Arc<Stats>) -> Self {
        Self { sequencer, stats }
    }

    /// Translate `msg` and inject the result onto the bus
    pub fn dispatch(&self, msg: &OscMessage) -> Dispatch {
        self.stats.add_received();

        let outcome = match codec::from_osc(msg) {
            Translation::Translated(event) => match self.sequencer.inject(&event) {
                Ok(()) => {
                    debug!("OSC   {}", event);
                    Dispatch::Injected(event)
                }
                Err(e) => Dispatch::Rejected(e.to_string()),
            },
            Translation::Unhandled => {
                info!(
                    "OSC received '{}' message, which is not an oscmidi message",
                    msg.addr
                );
                Dispatch::Unhandled
            }
            Translation::Deprecated => {
                debug!("OSC   Deprecated API, ignored: {} {:?}", msg.addr, msg.args);
                Dispatch::Deprecated
            }
            Translation::Malformed(reason) => Dispatch::Rejected(reason),
        };

        match &outcome {
            Dispatch::Injected(_) => self.stats.add_injected(),
            Dispatch::Unhandled => self.stats.add_unhandled(),
            Dispatch::Deprecated => self.stats.add_rejected(),
            Dispatch::Rejected(reason) => {
                warn!("Error while parsing message {}: {}", msg.addr, reason);
                self.stats.add_rejected();
            }
        }
        outcome
    }

    /// Wrap the dispatcher as a listener callback
    pub fn into_handler(self) -> MessageHandler {
        Arc::new(move |msg: OscMessage| {
            self.dispatch(&msg);
        })
    }
}
