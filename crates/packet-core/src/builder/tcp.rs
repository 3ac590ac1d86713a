use std::net::SocketAddr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::tcp::{TcpFlags, TcpSegment};
use crate::types::Timestamp;

/// Minimum TCP header length, no options
const HEADER_LEN: usize = 20;

/// Builder for [`TcpSegment`]
#[derive(Debug, Clone)]
pub struct TcpSegmentBuilder {
    arrival: Timestamp,
    source: SocketAddr,
    destination: SocketAddr,
    flags: TcpFlags,
    sequence: u32,
    acknowledgement: u32,
    window: u16,
    payload: Bytes,
}

impl TcpSegmentBuilder {
    pub fn new(source: SocketAddr, destination: SocketAddr) -> Self {
        Self {
            arrival: Timestamp::EPOCH,
            source,
            destination,
            flags: TcpFlags::ACK,
            sequence: 0,
            acknowledgement: 0,
            window: u16::MAX,
            payload: Bytes::new(),
        }
    }

    pub fn at(mut self, arrival: Timestamp) -> Self {
        self.arrival = arrival;
        self
    }

    /// Replace the flag set (default: ACK)
    pub fn flags(mut self, flags: TcpFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn acknowledgement(mut self, acknowledgement: u32) -> Self {
        self.acknowledgement = acknowledgement;
        self
    }

    pub fn window(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn build(self) -> TcpSegment {
        let mut raw = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        raw.put_u16(self.source.port());
        raw.put_u16(self.destination.port());
        raw.put_u32(self.sequence);
        raw.put_u32(self.acknowledgement);
        // data offset in 32-bit words, upper nibble
        raw.put_u8(((HEADER_LEN / 4) as u8) << 4);
        raw.put_u8(self.flags.bits());
        raw.put_u16(self.window);
        // checksum is left zero; it covers a pseudo-header we do not model
        raw.put_u16(0);
        raw.put_u16(0);
        raw.put_slice(&self.payload);

        TcpSegment {
            arrival: self.arrival,
            source: self.source,
            destination: self.destination,
            flags: self.flags,
            sequence: self.sequence,
            acknowledgement: self.acknowledgement,
            payload: self.payload,
            raw: raw.freeze(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let segment = TcpSegmentBuilder::new(
            "10.0.0.1:4660".parse().unwrap(),
            "10.0.0.2:80".parse().unwrap(),
        )
        .flags(TcpFlags::SYN | TcpFlags::ACK)
        .sequence(0x0102_0304)
        .acknowledgement(7)
        .payload(&b"hi"[..])
        .build();

        let raw = segment.raw();
        assert_eq!(raw.len(), 22);
        assert_eq!(&raw[0..2], &[0x12, 0x34]);
        assert_eq!(&raw[2..4], &[0x00, 0x50]);
        assert_eq!(&raw[4..8], &[1, 2, 3, 4]);
        assert_eq!(&raw[8..12], &[0, 0, 0, 7]);
        assert_eq!(raw[12], 0x50);
        assert_eq!(raw[13], 0x12);
        assert_eq!(&raw[20..], b"hi");
        assert_eq!(segment.payload().as_ref(), b"hi");
    }
}
