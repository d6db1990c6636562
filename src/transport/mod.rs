//! OSC transport: how OSC packets flow over the network
//!
//! Separates I/O concerns from translation:
//! - **Transport**: how packets flow (UDP datagrams, TCP streams)
//! - **Codec**: what the messages mean (handled separately)
//!
//! Each direction has its own execution model:
//! - Sending is blocking and happens on the outbound pump's thread
//! - Receiving runs as tokio tasks that call a handler once per message
//!
//! A transport does NOT handle:
//! - MIDI translation (that's the codec's job)
//! - Statistics (that's the bridge's job)

pub mod framing;
pub mod tcp;
pub mod udp;

pub use tcp::TcpSender;
pub use udp::UdpSender;

use crate::config::{Config, TransportMode};
use crate::error::{BridgeError, Result};
use rosc::{OscMessage, OscPacket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Callback invoked by a listener for every received message
pub type MessageHandler = Arc<dyn Fn(OscMessage) + Send + Sync>;

/// Outgoing side of the transport
///
/// Implementations are used from a single thread at a time but must be
/// shareable so the bridge can hold them behind `Arc`.
pub trait OscSender: Send + Sync {
    /// Serialize and transmit one message to the peer
    fn send(&self, msg: &OscMessage) -> Result<()>;

    /// Human-readable peer description for logs
    fn peer(&self) -> &str;
}

/// Create the sender for the configured mode and peer
pub fn sender(config: &Config) -> Result<Arc<dyn OscSender>> {
    let peer = config.peer();
    Ok(match config.transport {
        TransportMode::Udp => Arc::new(UdpSender::new(peer)?),
        TransportMode::Tcp => Arc::new(TcpSender::new(peer)),
    })
}

/// Running receive side of the transport
///
/// Stops when [`Listener::stop`] is called. Dropping the handle without
/// stopping leaves the tasks running until the runtime shuts down.
pub struct Listener {
    port: u16,
    shutdown: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Listener {
    pub(crate) fn new(port: u16, shutdown: Arc<AtomicBool>, task: JoinHandle<()>) -> Self {
        Self {
            port,
            shutdown,
            task,
        }
    }

    /// Port the listener is bound to
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Signal the receive tasks and wait for them to finish
    pub async fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Err(e) = self.task.await {
            debug!("Listener task ended abnormally: {}", e);
        }
    }
}

/// Bind the receive socket for the configured mode and start delivering
///
/// # Errors
///
/// Returns `Bind` if the port cannot be bound.
pub async fn listen(mode: TransportMode, port: u16, handler: MessageHandler) -> Result<Listener> {
    match mode {
        TransportMode::Udp => udp::listen(port, handler).await,
        TransportMode::Tcp => tcp::listen(port, handler).await,
    }
}

/// Serialize one message as a standalone OSC packet
pub fn encode(msg: &OscMessage) -> Result<Vec<u8>> {
    rosc::encoder::encode(&OscPacket::Message(msg.clone())).map_err(|e| BridgeError::OscEncode {
        address: msg.addr.clone(),
        reason: format!("{:?}", e),
    })
}

/// Decode a packet and hand every contained message to `handler`
///
/// Bundles are flattened in order; their time tags are ignored.
pub fn deliver(packet: &[u8], handler: &MessageHandler) -> Result<()> {
    let (_, packet) =
        rosc::decoder::decode_udp(packet).map_err(|e| BridgeError::OscDecode {
            reason: format!("{:?}", e),
        })?;
    deliver_packet(packet, handler);
    Ok(())
}

fn deliver_packet(packet: OscPacket, handler: &MessageHandler) {
    match packet {
        OscPacket::Message(msg) => handler(msg),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                deliver_packet(inner, handler);
            }
        }
    }
}
