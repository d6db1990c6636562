//! In-memory sequencer
//!
//! Pending input is a FIFO fed by [`MemorySequencer::push`]; injected
//! events are recorded in order. `wait` parks on a condvar so the
//! outbound pump behaves exactly as it does against a real bus.

use super::Sequencer;
use crate::codec::MidiEvent;
use crate::error::Result;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Default)]
pub struct MemorySequencer {
    pending: Mutex<VecDeque<MidiEvent>>,
    activity: Condvar,
    injected: Mutex<Vec<MidiEvent>>,
}

impl MemorySequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event as if another client had sent it to our input port
    pub fn push(&self, event: MidiEvent) {
        self.pending.lock().push_back(event);
        self.activity.notify_all();
    }

    /// Number of input events not yet drained
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Events written to the bus so far
    pub fn injected(&self) -> Vec<MidiEvent> {
        self.injected.lock().clone()
    }
}

impl Sequencer for MemorySequencer {
    fn wait(&self, timeout: Duration) -> Result<bool> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            self.activity.wait_for(&mut pending, timeout);
        }
        Ok(!pending.is_empty())
    }

    fn drain(&self, on_event: &mut dyn FnMut(MidiEvent)) -> Result<usize> {
        let mut count = 0;
        // Pop one at a time so events pushed mid-drain are still picked up
        loop {
            let next = self.pending.lock().pop_front();
            match next {
                Some(event) => {
                    on_event(event);
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }

    fn inject(&self, event: &MidiEvent) -> Result<()> {
        self.injected.lock().push(*event);
        Ok(())
    }
}
