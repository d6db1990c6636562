//! Traffic statistics for the bridge
//!
//! Thread-safe counters shared by both pumps.
//! Uses lock-free atomics for all operations.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-direction event counters (fully lock-free)
#[derive(Default)]
pub struct Stats {
    /// Bus events translated and sent as OSC
    sent: AtomicU64,
    /// OSC sends that failed
    send_failures: AtomicU64,
    /// Bus events with no OSC counterpart
    skipped: AtomicU64,
    /// OSC messages received
    received: AtomicU64,
    /// OSC messages injected onto the bus
    injected: AtomicU64,
    /// OSC messages that were not oscmidi messages
    unhandled: AtomicU64,
    /// OSC messages rejected (malformed, deprecated or bus write failure)
    rejected: AtomicU64,
}

/// Point-in-time copy of [`Stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub sent: u64,
    pub send_failures: u64,
    pub skipped: u64,
    pub received: u64,
    pub injected: u64,
    pub unhandled: u64,
    pub rejected: u64,
}

macro_rules! counter {
    ($inc:ident, $field:ident) => {
        #[inline]
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(add_sent, sent);
    counter!(add_send_failure, send_failures);
    counter!(add_skipped, skipped);
    counter!(add_received, received);
    counter!(add_injected, injected);
    counter!(add_unhandled, unhandled);
    counter!(add_rejected, rejected);

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            sent: self.sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            injected: self.injected.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ALSA->OSC sent {} (failed {}, skipped {}), OSC->ALSA received {} (injected {}, unhandled {}, rejected {})",
            self.sent,
            self.send_failures,
            self.skipped,
            self.received,
            self.injected,
            self.unhandled,
            self.rejected
        )
    }
}
