//! RTP packet view
//!
//! An [`RtpPacket`] is the RTP layer of a UDP frame. Only the fixed header
//! is interpreted; CSRC lists and header extensions are skipped so the
//! payload offset is right, padding is stripped from the payload.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use bytes::Bytes;

use crate::error::{PacketError, PacketResult};
use crate::tcp::FlowId;
use crate::types::Timestamp;

/// Fixed RTP header length
pub const RTP_HEADER_LEN: usize = 12;

/// The only RTP version in use (RFC 3550)
pub const RTP_VERSION: u8 = 2;

/// The RTP layer of a decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub(crate) arrival: Timestamp,
    pub(crate) source: SocketAddr,
    pub(crate) destination: SocketAddr,
    pub(crate) marker: bool,
    pub(crate) payload_type: u8,
    pub(crate) sequence_number: u16,
    pub(crate) rtp_timestamp: u32,
    pub(crate) ssrc: u32,
    pub(crate) csrc_count: u8,
    pub(crate) payload: Bytes,
    pub(crate) raw: Bytes,
}

impl RtpPacket {
    /// Decode the RTP header of a UDP payload
    pub fn parse(
        raw: Bytes,
        arrival: Timestamp,
        source: SocketAddr,
        destination: SocketAddr,
    ) -> PacketResult<Self> {
        if raw.len() < RTP_HEADER_LEN {
            return Err(PacketError::Truncated {
                protocol: "rtp",
                needed: RTP_HEADER_LEN,
                available: raw.len(),
            });
        }

        let b0 = raw[0];
        let b1 = raw[1];
        let version = b0 >> 6;
        if version != RTP_VERSION {
            return Err(PacketError::UnsupportedVersion {
                protocol: "rtp",
                version,
            });
        }
        let padding = b0 & 0x20 != 0;
        let extension = b0 & 0x10 != 0;
        let csrc_count = b0 & 0x0f;

        let mut offset = RTP_HEADER_LEN + csrc_count as usize * 4;
        if extension {
            let needed = offset + 4;
            if raw.len() < needed {
                return Err(truncated(needed, raw.len()));
            }
            let words = u16::from_be_bytes([raw[offset + 2], raw[offset + 3]]) as usize;
            offset = needed + words * 4;
        }
        if raw.len() < offset {
            return Err(truncated(offset, raw.len()));
        }

        let mut end = raw.len();
        if padding && end > offset {
            let pad = raw[end - 1] as usize;
            if pad == 0 || pad > end - offset {
                return Err(PacketError::malformed("RTP padding", format!("{} octets", pad)));
            }
            end -= pad;
        }

        Ok(Self {
            arrival,
            source,
            destination,
            marker: b1 & 0x80 != 0,
            payload_type: b1 & 0x7f,
            sequence_number: u16::from_be_bytes([raw[2], raw[3]]),
            rtp_timestamp: u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
            ssrc: u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]),
            csrc_count,
            payload: raw.slice(offset..end),
            raw,
        })
    }

    pub fn arrival(&self) -> Timestamp {
        self.arrival
    }

    pub fn source(&self) -> SocketAddr {
        self.source
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn flow(&self) -> FlowId {
        FlowId::new(self.source, self.destination)
    }

    pub fn marker(&self) -> bool {
        self.marker
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    /// Media clock timestamp from the header, not the capture time
    pub fn rtp_timestamp(&self) -> u32 {
        self.rtp_timestamp
    }

    /// Synchronization source identifier
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn csrc_count(&self) -> u8 {
        self.csrc_count
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn write<W: io::Write>(&self, out: &mut W) -> PacketResult<()> {
        out.write_all(&self.raw)?;
        Ok(())
    }
}

fn truncated(needed: usize, available: usize) -> PacketError {
    PacketError::Truncated {
        protocol: "rtp",
        needed,
        available,
    }
}

impl fmt::Display for RtpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ssrc={:#010x} pt={} seq={} ts={}",
            self.flow(),
            self.ssrc,
            self.payload_type,
            self.sequence_number,
            self.rtp_timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &'static [u8]) -> PacketResult<RtpPacket> {
        RtpPacket::parse(
            Bytes::from_static(raw),
            Timestamp::EPOCH,
            "10.0.0.1:16384".parse().unwrap(),
            "10.0.0.2:20000".parse().unwrap(),
        )
    }

    #[test]
    fn test_fixed_header() {
        let packet = parse(&[
            0x80, 0x80 | 8, 0x00, 0x2a, 0x00, 0x00, 0x01, 0x40, 0xde, 0xad, 0xbe, 0xef, 0xd5, 0xd5,
        ])
        .unwrap();
        assert!(packet.marker());
        assert_eq!(packet.payload_type(), 8);
        assert_eq!(packet.sequence_number(), 42);
        assert_eq!(packet.rtp_timestamp(), 320);
        assert_eq!(packet.ssrc(), 0xdead_beef);
        assert_eq!(packet.payload().as_ref(), &[0xd5, 0xd5]);
    }

    #[test]
    fn test_csrc_extension_and_padding_are_skipped() {
        let packet = parse(&[
            0xb1, 0x00, 0, 1, 0, 0, 0, 0, 0, 0, 0, 9, // V=2 P X CC=1
            0, 0, 0, 7, // csrc
            0xbe, 0xde, 0, 1, 1, 2, 3, 4, // one-word extension
            0xaa, 0xbb, 0, 2, // payload + two padding octets
        ])
        .unwrap();
        assert_eq!(packet.csrc_count(), 1);
        assert_eq!(packet.ssrc(), 9);
        assert_eq!(packet.payload().as_ref(), &[0xaa, 0xbb]);
    }

    #[test]
    fn test_rejects_short_and_foreign_packets() {
        assert!(matches!(
            parse(&[0x80, 0, 0, 1]),
            Err(PacketError::Truncated { needed: 12, available: 4, .. })
        ));
        assert!(matches!(
            parse(&[0x40, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1]),
            Err(PacketError::UnsupportedVersion { version: 1, .. })
        ));
        assert!(matches!(
            parse(&[0x82, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1]),
            Err(PacketError::Truncated { needed: 20, .. })
        ));
    }
}
