//! oscmidi: bidirectional bridge between the ALSA sequencer and OSC
//!
//! MIDI events arriving at the client's input port are sent to an OSC peer
//! as `/oscmidi/...` messages; OSC messages received on the listen port are
//! translated back and written to every subscriber of the output port.

pub mod bridge;
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod sequencer;
pub mod transport;

pub use bridge::Bridge;
pub use config::Config;
pub use error::{BridgeError, Result};
