//! Packet framing for OSC over TCP
//!
//! OSC 1.0 stream framing: every packet is preceded by its length as a
//! 32-bit big-endian integer. The framer accumulates bytes and emits
//! complete packets.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Prefix `packet` with its length
pub fn frame(packet: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(packet.len() + 4);
    out.put_u32(packet.len() as u32);
    out.extend_from_slice(packet);
    out
}

/// Frame error: the peer announced a packet larger than allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Oversized {
    pub announced: usize,
}

/// Accumulates stream bytes into complete packets
pub struct PacketFramer {
    buffer: BytesMut,
    /// Maximum packet size accepted (prevents memory exhaustion)
    max_packet_size: usize,
}

impl PacketFramer {
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
            max_packet_size,
        }
    }

    /// Buffer to read into directly (e.g. with `AsyncReadExt::read_buf`)
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Feed new data and extract complete packets
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<Bytes>, Oversized> {
        self.buffer.extend_from_slice(data);
        self.drain_packets()
    }

    /// Extract every complete packet currently buffered
    ///
    /// Zero-length packets are skipped.
    pub fn drain_packets(&mut self) -> Result<Vec<Bytes>, Oversized> {
        let mut packets = Vec::new();

        while self.buffer.len() >= 4 {
            let len = u32::from_be_bytes([
                self.buffer[0],
                self.buffer[1],
                self.buffer[2],
                self.buffer[3],
            ]) as usize;

            if len > self.max_packet_size {
                self.buffer.clear();
                return Err(Oversized { announced: len });
            }
            if self.buffer.len() < 4 + len {
                break;
            }

            self.buffer.advance(4);
            let packet = self.buffer.split_to(len).freeze();
            if !packet.is_empty() {
                packets.push(packet);
            }
        }

        Ok(packets)
    }
}
