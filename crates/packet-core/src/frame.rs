//! One decoded capture record
//!
//! The framer chain decides which protocols a record can be interpreted as
//! and attaches the protocol views it managed to decode. The stream handler
//! routes on that reachability information only.

use std::io;

use bytes::Bytes;

use crate::error::PacketResult;
use crate::rtp::RtpPacket;
use crate::sip::SipMessage;
use crate::tcp::TcpSegment;
use crate::types::{Protocol, Timestamp};

/// A decoded capture record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    arrival: Timestamp,
    protocols: Vec<Protocol>,
    tcp: Option<TcpSegment>,
    sip: Option<SipMessage>,
    rtp: Option<RtpPacket>,
    raw: Bytes,
}

impl Frame {
    /// A frame with only a protocol stack and raw bytes
    pub fn new(arrival: Timestamp, protocols: Vec<Protocol>, raw: Bytes) -> Self {
        Self {
            arrival,
            protocols,
            tcp: None,
            sip: None,
            rtp: None,
            raw,
        }
    }

    /// Attach the TCP view
    pub fn with_tcp(mut self, segment: TcpSegment) -> Self {
        if !self.protocols.contains(&Protocol::Tcp) {
            self.protocols.push(Protocol::Tcp);
        }
        self.tcp = Some(segment);
        self
    }

    /// Attach the SIP view
    pub fn with_sip(mut self, message: SipMessage) -> Self {
        if !self.protocols.contains(&Protocol::Sip) {
            self.protocols.push(Protocol::Sip);
        }
        self.sip = Some(message);
        self
    }

    /// Attach the RTP view
    pub fn with_rtp(mut self, packet: RtpPacket) -> Self {
        if !self.protocols.contains(&Protocol::Rtp) {
            self.protocols.push(Protocol::Rtp);
        }
        self.rtp = Some(packet);
        self
    }

    pub fn arrival(&self) -> Timestamp {
        self.arrival
    }

    /// Protocol stack, outermost first
    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    /// Can this frame be interpreted as `protocol`
    pub fn has_protocol(&self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Tcp => self.tcp.is_some(),
            Protocol::Sip => self.sip.is_some(),
            Protocol::Rtp => self.rtp.is_some(),
            other => self.protocols.contains(&other),
        }
    }

    pub fn tcp(&self) -> Option<&TcpSegment> {
        self.tcp.as_ref()
    }

    pub fn sip(&self) -> Option<&SipMessage> {
        self.sip.as_ref()
    }

    pub fn rtp(&self) -> Option<&RtpPacket> {
        self.rtp.as_ref()
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn write<W: io::Write>(&self, out: &mut W) -> PacketResult<()> {
        out.write_all(&self.raw)?;
        Ok(())
    }
}

impl From<TcpSegment> for Frame {
    fn from(segment: TcpSegment) -> Self {
        Frame::new(segment.arrival(), vec![Protocol::Ipv4], segment.raw().clone()).with_tcp(segment)
    }
}

impl From<SipMessage> for Frame {
    fn from(message: SipMessage) -> Self {
        Frame::new(
            message.arrival(),
            vec![Protocol::Ipv4, Protocol::Udp],
            message.raw().clone(),
        )
        .with_sip(message)
    }
}

impl From<RtpPacket> for Frame {
    fn from(packet: RtpPacket) -> Self {
        Frame::new(packet.arrival(), vec![Protocol::Ipv4, Protocol::Udp], packet.raw().clone()).with_rtp(packet)
    }
}
