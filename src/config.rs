//! Configuration management
//!
//! Built once at startup and never mutated afterwards. Precedence, lowest
//! to highest: built-in defaults, optional TOML file (`--config`), CLI flags.
//!
//! Example file:
//!
//! ```toml
//! peer_host = "192.168.1.20"
//! send_port = 8000
//! receive_port = 8001
//! transport = "tcp"
//! ```

use crate::cli::Cli;
use crate::constants::{
    DEFAULT_CLIENT_NAME, DEFAULT_PEER_HOST, DEFAULT_SEND_PORT, DEFAULT_SEQUENCER_DEVICE,
};
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

// =============================================================================
// Transport Mode
// =============================================================================

/// Network transport used for OSC in both directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// One OSC packet per datagram
    #[default]
    Udp,
    /// Length-prefixed OSC packets on a stream
    Tcp,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => write!(f, "UDP"),
            Self::Tcp => write!(f, "TCP"),
        }
    }
}

// =============================================================================
// Bridge Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// ALSA client name shown to other sequencer clients
    pub client_name: String,

    /// ALSA sequencer device to open
    pub device: String,

    /// Host where OSC messages are sent
    pub peer_host: String,

    /// Port where OSC messages are sent
    pub send_port: u16,

    /// Port for incoming OSC (None = same as send_port)
    pub receive_port: Option<u16>,

    /// UDP or TCP
    pub transport: TransportMode,

    /// Log every bridged event
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            device: DEFAULT_SEQUENCER_DEVICE.to_string(),
            peer_host: DEFAULT_PEER_HOST.to_string(),
            send_port: DEFAULT_SEND_PORT,
            receive_port: None,
            transport: TransportMode::Udp,
            verbose: false,
        }
    }
}

impl Config {
    /// Build the configuration from parsed CLI arguments
    ///
    /// Loads `--config` first when given, then applies explicit flags.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(ip) = &cli.ip {
            config.peer_host = ip.clone();
        }
        if let Some(port) = cli.send_port {
            config.send_port = port;
        }
        if let Some(port) = cli.receive_port {
            config.receive_port = Some(port);
        }
        if let Some(name) = &cli.name {
            config.client_name = name.clone();
        }
        if let Some(device) = &cli.device {
            config.device = device.clone();
        }
        if cli.verbose {
            config.verbose = true;
        }
        if cli.tcp {
            config.transport = TransportMode::Tcp;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file (missing keys take defaults)
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| BridgeError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| BridgeError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Check values that would otherwise fail later, deep inside a pump
    pub fn validate(&self) -> Result<()> {
        if self.send_port == 0 {
            return Err(BridgeError::ConfigValidation {
                field: "send_port",
                reason: "must be non-zero".into(),
            });
        }
        if self.receive_port == Some(0) {
            return Err(BridgeError::ConfigValidation {
                field: "receive_port",
                reason: "must be non-zero".into(),
            });
        }
        if self.peer_host.trim().is_empty() {
            return Err(BridgeError::ConfigValidation {
                field: "peer_host",
                reason: "must not be empty".into(),
            });
        }
        for (field, value) in [("client_name", &self.client_name), ("device", &self.device)] {
            if value.is_empty() || value.contains('\0') {
                return Err(BridgeError::ConfigValidation {
                    field,
                    reason: "must be non-empty and contain no NUL byte".into(),
                });
            }
        }
        Ok(())
    }

    /// Port the OSC listener binds
    pub fn receive_port(&self) -> u16 {
        self.receive_port.unwrap_or(self.send_port)
    }

    /// `host:port` of the OSC peer
    pub fn peer(&self) -> String {
        if self.peer_host.contains(':') && !self.peer_host.starts_with('[') {
            // Bare IPv6 literal
            format!("[{}]:{}", self.peer_host, self.send_port)
        } else {
            format!("{}:{}", self.peer_host, self.send_port)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
