//! Sequencer abstraction for the local MIDI bus
//!
//! Separates bus I/O from translation:
//! - **Sequencer**: how MIDI events reach and leave the local bus
//! - **Codec**: what those events look like as OSC (handled separately)
//!
//! One sequencer handle is shared by both pumps: the outbound pump only
//! waits and drains, the inbound dispatcher only injects.
//!
//! # Implementations
//!
//! - `AlsaSequencer`: ALSA sequencer client (feature `alsa`, Linux only)
//! - `MemorySequencer`: in-process queue, used by the tests

#[cfg(all(feature = "alsa", target_os = "linux"))]
pub mod alsa_seq;
pub mod memory;

#[cfg(all(feature = "alsa", target_os = "linux"))]
pub use alsa_seq::AlsaSequencer;
pub use memory::MemorySequencer;

use crate::codec::MidiEvent;
use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Local MIDI bus endpoint
///
/// Implementations must tolerate `wait`/`drain` on one thread while
/// `inject` runs on another.
pub trait Sequencer: Send + Sync {
    /// Block until input is pending or `timeout` elapses
    ///
    /// Returns `true` when at least one event may be pending.
    fn wait(&self, timeout: Duration) -> Result<bool>;

    /// Hand every currently pending input event to `on_event`
    ///
    /// Returns the number of events delivered.
    fn drain(&self, on_event: &mut dyn FnMut(MidiEvent)) -> Result<usize>;

    /// Write an event to all subscribers and flush immediately
    fn inject(&self, event: &MidiEvent) -> Result<()>;
}

/// Open the configured sequencer
///
/// # Errors
///
/// Returns `SequencerOpen` if the device cannot be opened.
#[cfg(all(feature = "alsa", target_os = "linux"))]
pub fn open(config: &Config) -> Result<Arc<dyn Sequencer>> {
    let seq = AlsaSequencer::open(&config.device, &config.client_name)?;
    Ok(Arc::new(seq))
}

/// Open the configured sequencer
///
/// Without ALSA support there is no bus to open.
#[cfg(not(all(feature = "alsa", target_os = "linux")))]
pub fn open(config: &Config) -> Result<Arc<dyn Sequencer>> {
    Err(crate::error::BridgeError::SequencerOpen {
        device: config.device.clone(),
        reason: "built without ALSA sequencer support".into(),
    })
}
