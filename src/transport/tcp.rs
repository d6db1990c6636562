//! TCP transport
//!
//! - Sender: lazily connected stream with bounded connect and write
//!   times. After a failure, sends fail fast until the reconnect backoff
//!   expires, so a stalled peer never holds up the outbound pump
//! - Listener: accept loop spawning one task per connection, packets are
//!   length-prefixed (see [`super::framing`])

use super::framing::{frame, PacketFramer};
use super::{deliver, encode, Listener, MessageHandler, OscSender};
use crate::constants::{
    LISTENER_TIMEOUT_MS, MAX_TCP_PACKET_SIZE, TCP_CONNECT_TIMEOUT_MS, TCP_RECONNECT_BACKOFF_MS,
    TCP_WRITE_TIMEOUT_MS,
};
use crate::error::{BridgeError, Result};
use parking_lot::Mutex;
use rosc::OscMessage;
use std::io::{self, Write};
use std::net::{Ipv4Addr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Stream sender to a fixed peer
pub struct TcpSender {
    peer: String,
    link: Mutex<Link>,
}

#[derive(Default)]
struct Link {
    stream: Option<TcpStream>,
    /// No reconnect attempt before this instant
    retry_at: Option<Instant>,
}

impl TcpSender {
    /// Create a sender for `peer` (`host:port`); connects on first send
    pub fn new(peer: String) -> Self {
        Self {
            peer,
            link: Mutex::new(Link::default()),
        }
    }

    /// Connect with bounded connect and write times
    fn connect(&self) -> Result<TcpStream> {
        let addrs = self
            .peer
            .to_socket_addrs()
            .map_err(|_| BridgeError::Resolve {
                peer: self.peer.clone(),
            })?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, Duration::from_millis(TCP_CONNECT_TIMEOUT_MS)) {
                Ok(stream) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Cannot set TCP_NODELAY on {}: {}", self.peer, e);
                    }
                    stream
                        .set_write_timeout(Some(Duration::from_millis(TCP_WRITE_TIMEOUT_MS)))
                        .map_err(|e| BridgeError::Connect {
                            peer: self.peer.clone(),
                            source: e,
                        })?;
                    debug!("Connected to {}", self.peer);
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(match last_err {
            Some(source) => BridgeError::Connect {
                peer: self.peer.clone(),
                source,
            },
            None => BridgeError::Resolve {
                peer: self.peer.clone(),
            },
        })
    }
}

impl OscSender for TcpSender {
    fn send(&self, msg: &OscMessage) -> Result<()> {
        let framed = frame(&encode(msg)?);
        let mut link = self.link.lock();
        let backoff = Duration::from_millis(TCP_RECONNECT_BACKOFF_MS);

        let stream = match link.stream.take() {
            Some(stream) => stream,
            None => {
                if link.retry_at.is_some_and(|at| Instant::now() < at) {
                    return Err(BridgeError::OscSend {
                        peer: self.peer.clone(),
                        source: io::Error::new(io::ErrorKind::NotConnected, "waiting to reconnect"),
                    });
                }
                match self.connect() {
                    Ok(stream) => stream,
                    Err(e) => {
                        link.retry_at = Some(Instant::now() + backoff);
                        return Err(e);
                    }
                }
            }
        };

        let stream = link.stream.insert(stream);
        if let Err(e) = stream.write_all(&framed) {
            // A partial frame may be on the wire; the stream is unusable
            link.stream = None;
            link.retry_at = Some(Instant::now() + backoff);
            return Err(BridgeError::OscSend {
                peer: self.peer.clone(),
                source: e,
            });
        }
        Ok(())
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

/// Bind `port` and deliver every message received on any connection
pub(super) async fn listen(port: u16, handler: MessageHandler) -> Result<Listener> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .map_err(|e| BridgeError::Bind { port, source: e })?;
    let shutdown = Arc::new(AtomicBool::new(false));

    let shutdown_accept = shutdown.clone();
    let task = tokio::spawn(async move {
        let mut connections = Vec::new();

        while !shutdown_accept.load(Ordering::Relaxed) {
            match tokio::time::timeout(
                Duration::from_millis(LISTENER_TIMEOUT_MS),
                listener.accept(),
            )
            .await
            {
                Ok(Ok((stream, from))) => {
                    info!("OSC connection from {}", from);
                    let handler = handler.clone();
                    let shutdown = shutdown_accept.clone();
                    connections.push(tokio::spawn(async move {
                        read_connection(stream, handler, shutdown).await;
                        debug!("OSC connection from {} closed", from);
                    }));
                }
                Ok(Err(e)) => warn!("TCP accept failed: {}", e),
                Err(_) => {
                    // Timeout - check shutdown flag
                }
            }
            connections.retain(|c| !c.is_finished());
        }

        for connection in connections {
            let _ = connection.await;
        }
    });

    Ok(Listener::new(port, shutdown, task))
}

async fn read_connection(
    mut stream: tokio::net::TcpStream,
    handler: MessageHandler,
    shutdown: Arc<AtomicBool>,
) {
    let mut framer = PacketFramer::new(MAX_TCP_PACKET_SIZE);

    while !shutdown.load(Ordering::Relaxed) {
        match tokio::time::timeout(
            Duration::from_millis(LISTENER_TIMEOUT_MS),
            stream.read_buf(framer.buffer_mut()),
        )
        .await
        {
            Ok(Ok(0)) => break, // Peer closed
            Ok(Ok(_)) => match framer.drain_packets() {
                Ok(packets) => {
                    for packet in packets {
                        if let Err(e) = deliver(&packet, &handler) {
                            warn!("Dropping packet: {}", e);
                        }
                    }
                }
                Err(oversized) => {
                    warn!(
                        "Peer announced a {} byte packet, closing connection",
                        oversized.announced
                    );
                    break;
                }
            },
            Ok(Err(e)) => {
                debug!("TCP read error: {}", e);
                break;
            }
            Err(_) => {
                // Timeout - check shutdown flag
            }
        }
    }
}
