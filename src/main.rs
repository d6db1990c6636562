//! oscmidi - Connect ALSA MIDI clients with OSC
//!
//! Usage:
//!   oscmidi [-i IP] [-p SEND_PORT] [-r RECEIVING_PORT] [-n NAME] [-w HW] [-v] [-t]
//!   oscmidi --config bridge.toml

use clap::Parser;
use oscmidi::bridge::Bridge;
use oscmidi::cli::Cli;
use oscmidi::config::Config;
use oscmidi::error::{BridgeError, Result};
use oscmidi::{logging, sequencer};
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    // Help and version exit here with status 0
    let cli = Cli::parse();

    let config = match Config::from_cli(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_tracing(config.verbose);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<()> {
    let sequencer = sequencer::open(config)?;
    info!(
        "ALSA client '{}' open on '{}'",
        config.client_name, config.device
    );

    let rt = tokio::runtime::Runtime::new().map_err(|e| BridgeError::Runtime { source: e })?;

    rt.block_on(async {
        let bridge = Bridge::start(config, sequencer).await?;

        let signal = wait_for_shutdown_signal().await;
        bridge.shutdown().await;
        signal
    })
}

/// Resolve on SIGINT or SIGTERM
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let map_err = |e| BridgeError::Runtime { source: e };
    let mut sigterm = signal(SignalKind::terminate()).map_err(map_err)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(map_err)?;

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
    Ok(())
}

/// Resolve on Ctrl+C
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| BridgeError::Runtime { source: e })
}
