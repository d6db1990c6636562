//! Bridge lifecycle
//!
//! Owns the two directions of traffic and the order in which they start
//! and stop:
//!
//! 1. The outbound pump (sequencer -> OSC) starts on its own thread
//! 2. The OSC listener binds and starts feeding the inbound dispatcher
//! 3. On shutdown the run flag clears, the pump exits within one poll
//!    interval, the listener stops, and the sequencer is released last

pub mod inbound;
pub mod outbound;
pub mod stats;

use self::inbound::Dispatcher;
use self::outbound::OutboundPump;
use self::stats::Stats;
use crate::config::Config;
use crate::error::Result;
use crate::sequencer::Sequencer;
use crate::transport::{self, Listener, OscSender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

/// Bridge state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initializing,
    Running,
    ShuttingDown,
    Stopped,
}

/// Handle to observe and stop a running bridge from another task
#[derive(Clone)]
pub struct Handle {
    running: Arc<AtomicBool>,
    state: Arc<RwLock<State>>,
    stats: Arc<Stats>,
}

impl Handle {
    /// Request shutdown; the pump notices within one poll interval
    pub fn stop(&self) {
        let mut state = self.state.write();
        if *state == State::Running {
            *state = State::ShuttingDown;
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Get current state
    pub fn state(&self) -> State {
        *self.state.read()
    }

    /// Get traffic statistics
    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }
}

/// A running bridge
pub struct Bridge {
    handle: Handle,
    sequencer: Arc<dyn Sequencer>,
    pump: Option<JoinHandle<()>>,
    listener: Option<Listener>,
}

impl Bridge {
    /// Start both directions using the sender the configuration calls for
    ///
    /// # Errors
    ///
    /// Returns `Resolve` if the peer cannot be resolved (UDP), `Thread` if
    /// the pump cannot be spawned, or `Bind` if the listener port is taken.
    /// Anything already started is stopped before the error is returned.
    pub async fn start(config: &Config, sequencer: Arc<dyn Sequencer>) -> Result<Self> {
        let sender = transport::sender(config)?;
        Self::start_with_sender(config, sequencer, sender).await
    }

    /// Start both directions with an explicit OSC sender
    pub async fn start_with_sender(
        config: &Config,
        sequencer: Arc<dyn Sequencer>,
        sender: Arc<dyn OscSender>,
    ) -> Result<Self> {
        let handle = Handle {
            running: Arc::new(AtomicBool::new(true)),
            state: Arc::new(RwLock::new(State::Initializing)),
            stats: Arc::new(Stats::new()),
        };

        let pump = OutboundPump::new(
            sequencer.clone(),
            sender,
            handle.running.clone(),
            handle.stats.clone(),
        )
        .spawn()?;

        let port = config.receive_port();
        let handler = Dispatcher::new(sequencer.clone(), handle.stats.clone()).into_handler();
        let listener = match transport::listen(config.transport, port, handler).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("{}", e);
                handle.running.store(false, Ordering::SeqCst);
                join_pump(pump).await;
                *handle.state.write() = State::Stopped;
                return Err(e);
            }
        };
        info!(
            "Listening for OSC on {} port {}",
            config.transport,
            listener.port()
        );

        *handle.state.write() = State::Running;
        Ok(Self {
            handle,
            sequencer,
            pump: Some(pump),
            listener: Some(listener),
        })
    }

    /// Handle usable from other tasks (signal handlers, tests)
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Current state
    pub fn state(&self) -> State {
        self.handle.state()
    }

    /// Stop both directions and release the sequencer
    ///
    /// Idempotent with respect to a prior [`Handle::stop`].
    pub async fn shutdown(mut self) {
        info!("Shutting down");
        self.handle.stop();

        if let Some(pump) = self.pump.take() {
            join_pump(pump).await;
        }
        if let Some(listener) = self.listener.take() {
            listener.stop().await;
            info!("Stopping [OSC]->[ALSA] communication");
        }

        info!("{}", self.handle.stats.snapshot());
        *self.handle.state.write() = State::Stopped;

        // Last reference held by the bridge; the sequencer closes here
        drop(self.sequencer);
    }
}

/// Wait for the pump thread without blocking the runtime
async fn join_pump(pump: JoinHandle<()>) {
    match tokio::task::spawn_blocking(move || pump.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => warn!("Outbound pump panicked"),
        Err(e) => warn!("Failed to join outbound pump: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MidiEvent;
    use crate::error::BridgeError;
    use crate::sequencer::MemorySequencer;
    use rosc::OscMessage;
    use std::time::Duration;

    struct NullSender;

    impl OscSender for NullSender {
        fn send(&self, _msg: &OscMessage) -> Result<()> {
            Ok(())
        }

        fn peer(&self) -> &str {
            "null"
        }
    }

    fn free_udp_port() -> u16 {
        let probe = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_start_and_shutdown() {
        let seq = Arc::new(MemorySequencer::new());
        let config = Config {
            receive_port: Some(free_udp_port()),
            ..Config::default()
        };

        let bridge = Bridge::start_with_sender(&config, seq.clone(), Arc::new(NullSender))
            .await
            .unwrap();
        let handle = bridge.handle();
        assert_eq!(handle.state(), State::Running);

        bridge.shutdown().await;
        assert_eq!(handle.state(), State::Stopped);
        // Only the test's reference is left
        assert_eq!(Arc::strong_count(&seq), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bind_failure_stops_pump() {
        let seq = Arc::new(MemorySequencer::new());
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let config = Config {
            receive_port: Some(taken.local_addr().unwrap().port()),
            transport: crate::config::TransportMode::Tcp,
            ..Config::default()
        };

        let result = Bridge::start_with_sender(&config, seq.clone(), Arc::new(NullSender)).await;

        assert!(matches!(result, Err(BridgeError::Bind { .. })));
        assert_eq!(Arc::strong_count(&seq), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stats_count_outbound_traffic() {
        let seq = Arc::new(MemorySequencer::new());
        let config = Config {
            receive_port: Some(free_udp_port()),
            ..Config::default()
        };
        let bridge = Bridge::start_with_sender(&config, seq.clone(), Arc::new(NullSender))
            .await
            .unwrap();
        let handle = bridge.handle();

        seq.push(MidiEvent::TransportContinue);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while handle.stats().snapshot().sent == 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        bridge.shutdown().await;

        assert_eq!(handle.stats().snapshot().sent, 1);
    }

    #[test]
    fn test_handle_stop_before_running() {
        let handle = Handle {
            running: Arc::new(AtomicBool::new(true)),
            state: Arc::new(RwLock::new(State::Initializing)),
            stats: Arc::new(Stats::new()),
        };
        handle.stop();
        assert!(!handle.running.load(Ordering::SeqCst));
        assert_eq!(handle.state(), State::Initializing);
    }
}
