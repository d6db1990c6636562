//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Defaults
// =============================================================================

/// Default OSC peer address
pub const DEFAULT_PEER_HOST: &str = "127.0.0.1";

/// Default port where OSC messages are sent (and received, unless overridden)
pub const DEFAULT_SEND_PORT: u16 = 7000;

/// Default ALSA client name
pub const DEFAULT_CLIENT_NAME: &str = "oscmidi";

/// Default ALSA sequencer device
pub const DEFAULT_SEQUENCER_DEVICE: &str = "default";

// =============================================================================
// Sequencer
// =============================================================================

/// Name of the port other clients read from (bridge -> ALSA)
pub const OUTPUT_PORT_NAME: &str = "MIDI out";

/// Name of the port other clients write to (ALSA -> bridge)
pub const INPUT_PORT_NAME: &str = "MIDI in";

/// Offset between the wire (unsigned 14-bit) and centered pitch-bend forms
pub const PITCH_BEND_CENTER: i32 = 8192;

// =============================================================================
// Timing
// =============================================================================

/// Bounded wait of the outbound pump on sequencer activity (milliseconds)
pub const POLL_TIMEOUT_MS: u64 = 100;

/// Listener receive timeout, bounds shutdown latency (milliseconds)
pub const LISTENER_TIMEOUT_MS: u64 = 100;

/// TCP connect timeout of the outbound sender (milliseconds)
pub const TCP_CONNECT_TIMEOUT_MS: u64 = 500;

/// TCP write timeout; a peer that stops reading fails the send (milliseconds)
pub const TCP_WRITE_TIMEOUT_MS: u64 = 250;

/// Sends fail fast for this long after a TCP connect or write failure (milliseconds)
pub const TCP_RECONNECT_BACKOFF_MS: u64 = 1000;

// =============================================================================
// Retry
// =============================================================================

/// Maximum socket bind retry attempts
pub const MAX_SOCKET_RETRY_ATTEMPTS: u32 = 5;

/// Base delay between retry attempts (milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 200;

// =============================================================================
// Buffers
// =============================================================================

/// UDP receive buffer size
pub const UDP_BUFFER_SIZE: usize = rosc::decoder::MTU;

/// Largest OSC packet accepted on a TCP stream
pub const MAX_TCP_PACKET_SIZE: usize = 64 * 1024;
