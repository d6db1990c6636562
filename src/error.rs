//! Centralized error types for the bridge
//!
//! All bridge errors are represented by the `BridgeError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, BridgeError>`.

use std::fmt;
use std::path::PathBuf;

/// All bridge errors
#[derive(Debug)]
pub enum BridgeError {
    // === Sequencer ===
    /// Failed to open the sequencer device (fatal at startup)
    SequencerOpen { device: String, reason: String },
    /// Sequencer operation failed while running
    Sequencer {
        operation: &'static str,
        reason: String,
    },
    /// Failed to create a sequencer port
    PortCreate { port: &'static str, reason: String },

    // === OSC ===
    /// Message could not be serialized
    OscEncode { address: String, reason: String },
    /// Packet could not be deserialized
    OscDecode { reason: String },
    /// Transmission to the peer failed
    OscSend {
        peer: String,
        source: std::io::Error,
    },

    // === Network ===
    /// Failed to bind the receive socket
    Bind { port: u16, source: std::io::Error },
    /// Failed to connect to the peer (stream mode)
    Connect {
        peer: String,
        source: std::io::Error,
    },
    /// Peer address could not be resolved
    Resolve { peer: String },

    // === Config ===
    /// Config file could not be read
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config file is not valid TOML for `Config`
    ConfigParse { path: PathBuf, reason: String },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
    /// Thread spawn failed
    Thread {
        name: &'static str,
        source: std::io::Error,
    },
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::OscSend { source, .. }
            | Self::Bind { source, .. }
            | Self::Connect { source, .. }
            | Self::ConfigRead { source, .. }
            | Self::Runtime { source }
            | Self::Thread { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequencerOpen { device, reason } => {
                write!(f, "Error opening ALSA sequencer '{}': {}", device, reason)
            }
            Self::Sequencer { operation, reason } => {
                write!(f, "Sequencer {} failed: {}", operation, reason)
            }
            Self::PortCreate { port, reason } => {
                write!(f, "Error creating sequencer port '{}': {}", port, reason)
            }
            Self::OscEncode { address, reason } => {
                write!(f, "Cannot encode OSC message {}: {}", address, reason)
            }
            Self::OscDecode { reason } => write!(f, "Cannot decode OSC packet: {}", reason),
            Self::OscSend { peer, source } => write!(f, "OSC send to {} failed: {}", peer, source),
            Self::Bind { port, .. } => write!(f, "Cannot bind OSC port {}", port),
            Self::Connect { peer, source } => {
                write!(f, "Cannot connect to {}: {}", peer, source)
            }
            Self::Resolve { peer } => write!(f, "Cannot resolve peer address {}", peer),
            Self::ConfigRead { path, .. } => write!(f, "Cannot read config: {}", path.display()),
            Self::ConfigParse { path, reason } => {
                write!(f, "Invalid config {}: {}", path.display(), reason)
            }
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
            Self::Thread { name, source } => {
                write!(f, "Cannot spawn {} thread: {}", name, source)
            }
        }
    }
}

/// Alias for Result with BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;
