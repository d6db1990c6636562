//! UDP transport
//!
//! - Sender: one unconnected datagram socket, blocking `send_to`
//! - Listener: async RX task on a reusable socket bound to all interfaces,
//!   one OSC packet per datagram

use super::{deliver, encode, Listener, MessageHandler, OscSender};
use crate::constants::{
    LISTENER_TIMEOUT_MS, MAX_SOCKET_RETRY_ATTEMPTS, RETRY_BASE_DELAY_MS, UDP_BUFFER_SIZE,
};
use crate::error::{BridgeError, Result};
use rosc::OscMessage;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Datagram sender to a fixed peer
pub struct UdpSender {
    peer: String,
    target: SocketAddr,
    socket: std::net::UdpSocket,
}

impl UdpSender {
    /// Resolve `peer` (`host:port`) and open an ephemeral local socket
    ///
    /// # Errors
    ///
    /// - `Resolve` - the host name does not resolve
    /// - `Bind` - no local socket could be opened
    pub fn new(peer: String) -> Result<Self> {
        let target = peer
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| BridgeError::Resolve { peer: peer.clone() })?;

        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket =
            std::net::UdpSocket::bind(local).map_err(|e| BridgeError::Bind { port: 0, source: e })?;

        Ok(Self {
            peer,
            target,
            socket,
        })
    }
}

impl OscSender for UdpSender {
    fn send(&self, msg: &OscMessage) -> Result<()> {
        let packet = encode(msg)?;
        self.socket
            .send_to(&packet, self.target)
            .map_err(|e| BridgeError::OscSend {
                peer: self.peer.clone(),
                source: e,
            })?;
        Ok(())
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

/// Bind `port` and deliver every received message to `handler`
pub(super) async fn listen(port: u16, handler: MessageHandler) -> Result<Listener> {
    let socket = create_reusable_udp_socket(port).await?;
    let shutdown = Arc::new(AtomicBool::new(false));

    let shutdown_rx = shutdown.clone();
    let task = tokio::spawn(async move {
        let mut buf = vec![0u8; UDP_BUFFER_SIZE];

        while !shutdown_rx.load(Ordering::Relaxed) {
            match tokio::time::timeout(
                Duration::from_millis(LISTENER_TIMEOUT_MS),
                socket.recv_from(&mut buf),
            )
            .await
            {
                Ok(Ok((len, from))) => {
                    if let Err(e) = deliver(&buf[..len], &handler) {
                        warn!("Dropping datagram from {}: {}", from, e);
                    }
                }
                Ok(Err(e)) => {
                    // Socket recv error (e.g. ICMP port unreachable) - keep polling
                    debug!("UDP receive error: {}", e);
                }
                Err(_) => {
                    // Timeout - expected, allows checking shutdown flag
                }
            }
        }
    });

    Ok(Listener::new(port, shutdown, task))
}

/// Create a UDP socket with SO_REUSEADDR for quick rebind after restart
///
/// Retries a few times if the socket is still in use (e.g., from previous run).
async fn create_reusable_udp_socket(port: u16) -> Result<UdpSocket> {
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();
    let map_err = |e| BridgeError::Bind { port, source: e };

    for attempt in 0..MAX_SOCKET_RETRY_ATTEMPTS {
        let socket =
            Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(map_err)?;
        socket.set_reuse_address(true).map_err(map_err)?;
        socket.set_nonblocking(true).map_err(map_err)?;

        match socket.bind(&addr.into()) {
            Ok(_) => {
                let std_socket: std::net::UdpSocket = socket.into();
                return UdpSocket::from_std(std_socket).map_err(map_err);
            }
            Err(_) if attempt < MAX_SOCKET_RETRY_ATTEMPTS - 1 => {
                // Exponential backoff: 200ms, 400ms, 800ms, 1600ms
                tokio::time::sleep(Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << attempt)))
                    .await;
            }
            Err(e) => return Err(map_err(e)),
        }
    }

    Err(BridgeError::Bind {
        port,
        source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "failed after retries"),
    })
}
