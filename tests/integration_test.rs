//! Integration tests for the bridge
//!
//! Runs the whole bridge against an in-memory sequencer and a real OSC
//! peer on the loopback interface.

use oscmidi::bridge::{Bridge, Handle, State};
use oscmidi::codec::MidiEvent;
use oscmidi::config::{Config, TransportMode};
use oscmidi::sequencer::MemorySequencer;
use oscmidi::transport::framing::{frame, PacketFramer};
use rosc::{OscMessage, OscPacket, OscType};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

// =============================================================================
// Helpers
// =============================================================================

fn free_port() -> u16 {
    let probe = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().port()
}

fn encode(addr: &str, args: Vec<OscType>) -> Vec<u8> {
    rosc::encoder::encode(&OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args,
    }))
    .unwrap()
}

fn decode(packet: &[u8]) -> OscMessage {
    match rosc::decoder::decode_udp(packet).unwrap().1 {
        OscPacket::Message(msg) => msg,
        OscPacket::Bundle(_) => panic!("unexpected bundle"),
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !done() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Bridge wired to a UDP peer socket on loopback
struct UdpRig {
    seq: Arc<MemorySequencer>,
    peer: UdpSocket,
    bridge: Bridge,
    listen_port: u16,
}

impl UdpRig {
    async fn start() -> Self {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let listen_port = free_port();
        let config = Config {
            peer_host: "127.0.0.1".into(),
            send_port: peer.local_addr().unwrap().port(),
            receive_port: Some(listen_port),
            ..Config::default()
        };
        let seq = Arc::new(MemorySequencer::new());
        let bridge = Bridge::start(&config, seq.clone()).await.unwrap();
        Self {
            seq,
            peer,
            bridge,
            listen_port,
        }
    }

    async fn send_to_bridge(&self, packet: &[u8]) {
        self.peer
            .send_to(packet, ("127.0.0.1", self.listen_port))
            .await
            .unwrap();
    }

    async fn recv_from_bridge(&self) -> OscMessage {
        let mut buf = vec![0u8; 1536];
        let (len, _) = tokio::time::timeout(Duration::from_secs(3), self.peer.recv_from(&mut buf))
            .await
            .expect("timeout")
            .unwrap();
        decode(&buf[..len])
    }
}

// =============================================================================
// UDP
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_note_on_reaches_peer() {
    let rig = UdpRig::start().await;

    rig.seq.push(MidiEvent::NoteOn {
        channel: 0,
        note: 60,
        velocity: 100,
    });
    let msg = rig.recv_from_bridge().await;

    assert_eq!(msg.addr, "/oscmidi/noteon");
    assert_eq!(
        msg.args,
        vec![OscType::Int(0), OscType::Int(60), OscType::Int(100)]
    );
    rig.bridge.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pitch_bend_from_peer_is_centered() {
    let rig = UdpRig::start().await;

    rig.send_to_bridge(&encode(
        "/oscmidi/pitchbend",
        vec![OscType::Int(2), OscType::Int(8192)],
    ))
    .await;
    wait_until(|| !rig.seq.injected().is_empty()).await;

    assert_eq!(
        rig.seq.injected(),
        vec![MidiEvent::PitchBend {
            channel: 2,
            value: 0
        }]
    );
    rig.bridge.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cc_float_from_peer() {
    let rig = UdpRig::start().await;

    rig.send_to_bridge(&encode(
        "/oscmidi/cc",
        vec![OscType::Int(1), OscType::Int(7), OscType::Float(64.0)],
    ))
    .await;
    wait_until(|| !rig.seq.injected().is_empty()).await;

    assert_eq!(
        rig.seq.injected(),
        vec![MidiEvent::ControlChange {
            channel: 1,
            controller: 7,
            value: 64
        }]
    );
    rig.bridge.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_foreign_and_malformed_messages_are_dropped() {
    let rig = UdpRig::start().await;
    let handle: Handle = rig.bridge.handle();

    rig.send_to_bridge(&encode("/foo/bar", vec![])).await;
    rig.send_to_bridge(&encode("/oscmidi/noteon", vec![OscType::Int(0)]))
        .await;
    rig.send_to_bridge(&encode(
        "/oscmidi",
        vec![OscType::String("noteon".into()), OscType::Int(1)],
    ))
    .await;
    rig.send_to_bridge(b"not osc at all").await;
    // A valid message after the junk proves the listener kept going
    rig.send_to_bridge(&encode(
        "/oscmidi/pgmchange",
        vec![OscType::Int(4), OscType::Int(9)],
    ))
    .await;
    wait_until(|| !rig.seq.injected().is_empty()).await;

    assert_eq!(
        rig.seq.injected(),
        vec![MidiEvent::ProgramChange {
            channel: 4,
            value: 9
        }]
    );
    let stats = handle.stats().snapshot();
    assert_eq!(stats.unhandled, 2);
    assert_eq!(stats.rejected, 1);
    rig.bridge.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bundle_from_peer_is_flattened() {
    let rig = UdpRig::start().await;
    let bundle = rosc::encoder::encode(&OscPacket::Bundle(rosc::OscBundle {
        timetag: rosc::OscTime {
            seconds: 0,
            fractional: 1,
        },
        content: vec![
            OscPacket::Message(OscMessage {
                addr: "/oscmidi/noteon".into(),
                args: vec![OscType::Int(0), OscType::Int(64), OscType::Int(90)],
            }),
            OscPacket::Message(OscMessage {
                addr: "/oscmidi/noteoff".into(),
                args: vec![OscType::Int(0), OscType::Int(64), OscType::Int(0)],
            }),
        ],
    }))
    .unwrap();

    rig.send_to_bridge(&bundle).await;
    wait_until(|| rig.seq.injected().len() == 2).await;

    assert!(matches!(
        rig.seq.injected().as_slice(),
        [MidiEvent::NoteOn { .. }, MidiEvent::NoteOff { .. }]
    ));
    rig.bridge.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_stops_both_directions() {
    let rig = UdpRig::start().await;
    let handle = rig.bridge.handle();
    let seq = rig.seq.clone();
    let listen_port = rig.listen_port;

    rig.bridge.shutdown().await;
    assert_eq!(handle.state(), State::Stopped);

    // Nothing is listening any more: the port binds again
    let rebound = std::net::UdpSocket::bind(("0.0.0.0", listen_port));
    assert!(rebound.is_ok());

    // Nothing drains the bus any more
    seq.push(MidiEvent::TransportStart);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(seq.pending_len(), 1);
    assert_eq!(Arc::strong_count(&seq), 2);
    drop(rig.peer);
}

// =============================================================================
// TCP
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tcp_both_directions() {
    let peer = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listen_port = {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };
    let config = Config {
        peer_host: "127.0.0.1".into(),
        send_port: peer.local_addr().unwrap().port(),
        receive_port: Some(listen_port),
        transport: TransportMode::Tcp,
        ..Config::default()
    };
    let seq = Arc::new(MemorySequencer::new());
    let bridge = Bridge::start(&config, seq.clone()).await.unwrap();

    // Outbound: bus -> length-prefixed packet on the peer's connection
    seq.push(MidiEvent::ChannelPressure {
        channel: 5,
        value: 33,
    });
    let (mut inbound, _) = tokio::time::timeout(Duration::from_secs(3), peer.accept())
        .await
        .expect("timeout")
        .unwrap();
    let mut framer = PacketFramer::new(64 * 1024);
    let packet = loop {
        let mut chunk = [0u8; 256];
        let n = tokio::time::timeout(Duration::from_secs(3), inbound.read(&mut chunk))
            .await
            .expect("timeout")
            .unwrap();
        assert!(n > 0, "bridge closed the connection");
        if let Some(p) = framer.feed(&chunk[..n]).unwrap().into_iter().next() {
            break p;
        }
    };
    let msg = decode(&packet);
    assert_eq!(msg.addr, "/oscmidi/chanpress");
    assert_eq!(msg.args, vec![OscType::Int(5), OscType::Int(33)]);

    // Inbound: framed packet on a fresh connection -> bus
    let mut client = TcpStream::connect(("127.0.0.1", listen_port)).await.unwrap();
    let payload = encode(
        "/oscmidi/keypress",
        vec![OscType::Int(9), OscType::Int(36), OscType::Int(70)],
    );
    client.write_all(&frame(&payload)).await.unwrap();
    wait_until(|| !seq.injected().is_empty()).await;

    assert_eq!(
        seq.injected(),
        vec![MidiEvent::KeyPressure {
            channel: 9,
            note: 36,
            value: 70
        }]
    );

    drop(client);
    bridge.shutdown().await;
}
