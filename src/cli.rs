//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.
//! Every option is optional so a config file can supply the value; see
//! [`crate::config::Config::from_cli`] for precedence.

use clap::Parser;
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Connect ALSA MIDI clients with OSC
#[derive(Parser, Debug, Default)]
#[command(name = "oscmidi")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// IP address or host name where OSC messages are sent [default: 127.0.0.1]
    #[arg(short, long, value_name = "IP")]
    pub ip: Option<String>,

    /// Port where OSC messages are sent [default: 7000]
    #[arg(short = 'p', long = "sport", value_name = "SEND_PORT")]
    pub send_port: Option<u16>,

    /// Port for incoming OSC traffic [default: the send port]
    #[arg(short = 'r', long = "rport", value_name = "RECEIVING_PORT")]
    pub receive_port: Option<u16>,

    /// Name of the ALSA MIDI client created [default: oscmidi]
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// ALSA sequencer device opened [default: default]
    #[arg(short = 'w', long = "hw", value_name = "NAME")]
    pub device: Option<String>,

    /// Produce verbose output (every bridged event)
    #[arg(short, long)]
    pub verbose: bool,

    /// Use TCP instead of UDP
    #[arg(short, long)]
    pub tcp: bool,

    /// TOML file providing defaults for the options above
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

// =============================================================================
// Tests
// =============================================================================
