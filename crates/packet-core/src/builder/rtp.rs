use std::net::SocketAddr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::rtp::{RTP_HEADER_LEN, RTP_VERSION, RtpPacket};
use crate::types::Timestamp;

/// Builder for [`RtpPacket`]
#[derive(Debug, Clone)]
pub struct RtpPacketBuilder {
    arrival: Timestamp,
    source: SocketAddr,
    destination: SocketAddr,
    marker: bool,
    payload_type: u8,
    sequence_number: u16,
    rtp_timestamp: u32,
    ssrc: u32,
    payload: Bytes,
}

impl RtpPacketBuilder {
    pub fn new(source: SocketAddr, destination: SocketAddr) -> Self {
        Self {
            arrival: Timestamp::EPOCH,
            source,
            destination,
            marker: false,
            payload_type: 0,
            sequence_number: 0,
            rtp_timestamp: 0,
            ssrc: 0,
            payload: Bytes::new(),
        }
    }

    pub fn at(mut self, arrival: Timestamp) -> Self {
        self.arrival = arrival;
        self
    }

    pub fn ssrc(mut self, ssrc: u32) -> Self {
        self.ssrc = ssrc;
        self
    }

    pub fn sequence_number(mut self, sequence_number: u16) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    pub fn rtp_timestamp(mut self, rtp_timestamp: u32) -> Self {
        self.rtp_timestamp = rtp_timestamp;
        self
    }

    /// Payload type, 7 bits (default: 0, PCMU)
    pub fn payload_type(mut self, payload_type: u8) -> Self {
        self.payload_type = payload_type & 0x7f;
        self
    }

    pub fn marker(mut self, marker: bool) -> Self {
        self.marker = marker;
        self
    }

    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn build(self) -> RtpPacket {
        let mut raw = BytesMut::with_capacity(RTP_HEADER_LEN + self.payload.len());
        raw.put_u8(RTP_VERSION << 6);
        raw.put_u8((u8::from(self.marker) << 7) | self.payload_type);
        raw.put_u16(self.sequence_number);
        raw.put_u32(self.rtp_timestamp);
        raw.put_u32(self.ssrc);
        raw.put_slice(&self.payload);

        RtpPacket {
            arrival: self.arrival,
            source: self.source,
            destination: self.destination,
            marker: self.marker,
            payload_type: self.payload_type,
            sequence_number: self.sequence_number,
            rtp_timestamp: self.rtp_timestamp,
            ssrc: self.ssrc,
            csrc_count: 0,
            payload: self.payload,
            raw: raw.freeze(),
        }
    }
}
