//! Outbound pump: sequencer -> OSC
//!
//! Runs on a dedicated OS thread. Each iteration waits on the sequencer
//! for at most `POLL_TIMEOUT_MS`, then drains every pending event before
//! waiting again, so a burst is never split across wakes. The run flag is
//! checked between waits; once it clears, one final drain pass picks up
//! whatever was already pending and the thread exits.

use super::stats::Stats;
use crate::codec::{self, MidiEvent};
use crate::constants::POLL_TIMEOUT_MS;
use crate::error::{BridgeError, Result};
use crate::sequencer::Sequencer;
use crate::transport::OscSender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sequencer-to-OSC pump
pub struct OutboundPump {
    sequencer: Arc<dyn Sequencer>,
    sender: Arc<dyn OscSender>,
    running: Arc<AtomicBool>,
    stats: Arc<Stats>,
    poll_timeout: Duration,
}

impl OutboundPump {
    pub fn new(
        sequencer: Arc<dyn Sequencer>,
        sender: Arc<dyn OscSender>,
        running: Arc<AtomicBool>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            sequencer,
            sender,
            running,
            stats,
            poll_timeout: Duration::from_millis(POLL_TIMEOUT_MS),
        }
    }

    /// Start the pump on its own thread
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("alsa-to-osc".into())
            .spawn(move || self.run())
            .map_err(|e| BridgeError::Thread {
                name: "outbound pump",
                source: e,
            })
    }

    /// Pump until the run flag clears
    pub fn run(self) {
        info!("Sending MIDI to {}", self.sender.peer());

        while self.running.load(Ordering::Relaxed) {
            match self.sequencer.wait(self.poll_timeout) {
                Ok(true) => self.drain(),
                Ok(false) => {}
                Err(e) => {
                    // Interrupted poll (signal delivery) lands here too
                    debug!("Sequencer wait failed: {}", e);
                    std::thread::sleep(self.poll_timeout);
                }
            }
        }

        // Events already pending when the flag cleared still go out
        self.drain();
        info!("Stopping [ALSA]->[OSC] communication");
    }

    /// Translate and send every pending event
    fn drain(&self) {
        let result = self.sequencer.drain(&mut |event| self.forward(&event));
        if let Err(e) = result {
            warn!("Sequencer input failed: {}", e);
        }
    }

    fn forward(&self, event: &MidiEvent) {
        debug!("ALSA  {}", event);
        let Some(msg) = codec::to_osc(event) else {
            self.stats.add_skipped();
            return;
        };

        match self.sender.send(&msg) {
            Ok(()) => self.stats.add_sent(),
            Err(e) => {
                warn!("OSC error: {}", e);
                self.stats.add_send_failure();
            }
        }
    }
}
