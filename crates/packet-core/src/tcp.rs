//! TCP segment view
//!
//! A [`TcpSegment`] is the TCP layer of a decoded frame: the addressing
//! taken from the network layer beneath it, the control flags, sequence and
//! acknowledgement numbers, and the payload. The original wire bytes are
//! retained so a stream can hand its packets back out unmodified.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::PacketResult;
use crate::types::Timestamp;

/// TCP control flags as carried in the header's flag byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TcpFlags(u8);

impl TcpFlags {
    pub const FIN: TcpFlags = TcpFlags(0x01);
    pub const SYN: TcpFlags = TcpFlags(0x02);
    pub const RST: TcpFlags = TcpFlags(0x04);
    pub const PSH: TcpFlags = TcpFlags(0x08);
    pub const ACK: TcpFlags = TcpFlags(0x10);
    pub const URG: TcpFlags = TcpFlags(0x20);

    const NAMES: [(TcpFlags, &'static str); 6] = [
        (TcpFlags::FIN, "FIN"),
        (TcpFlags::SYN, "SYN"),
        (TcpFlags::RST, "RST"),
        (TcpFlags::PSH, "PSH"),
        (TcpFlags::ACK, "ACK"),
        (TcpFlags::URG, "URG"),
    ];

    /// No flags set
    pub const fn empty() -> Self {
        TcpFlags(0)
    }

    /// Flags from the raw header byte
    pub const fn from_bits(bits: u8) -> Self {
        TcpFlags(bits)
    }

    /// The raw header byte
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Union of two flag sets
    pub const fn with(self, other: TcpFlags) -> Self {
        TcpFlags(self.0 | other.0)
    }

    /// True if every flag in `other` is set
    pub const fn contains(&self, other: TcpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_fin(&self) -> bool {
        self.contains(TcpFlags::FIN)
    }

    pub const fn is_syn(&self) -> bool {
        self.contains(TcpFlags::SYN)
    }

    pub const fn is_rst(&self) -> bool {
        self.contains(TcpFlags::RST)
    }

    pub const fn is_psh(&self) -> bool {
        self.contains(TcpFlags::PSH)
    }

    pub const fn is_ack(&self) -> bool {
        self.contains(TcpFlags::ACK)
    }

    pub const fn is_urg(&self) -> bool {
        self.contains(TcpFlags::URG)
    }
}

impl std::ops::BitOr for TcpFlags {
    type Output = TcpFlags;

    fn bitor(self, rhs: TcpFlags) -> TcpFlags {
        self.with(rhs)
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

/// Directed flow: source endpoint to destination endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId {
    pub source: SocketAddr,
    pub destination: SocketAddr,
}

impl FlowId {
    pub fn new(source: SocketAddr, destination: SocketAddr) -> Self {
        Self { source, destination }
    }

    /// The same flow seen from the other side
    pub fn reversed(&self) -> Self {
        Self {
            source: self.destination,
            destination: self.source,
        }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// The TCP layer of a decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    pub(crate) arrival: Timestamp,
    pub(crate) source: SocketAddr,
    pub(crate) destination: SocketAddr,
    pub(crate) flags: TcpFlags,
    pub(crate) sequence: u32,
    pub(crate) acknowledgement: u32,
    pub(crate) payload: Bytes,
    pub(crate) raw: Bytes,
}

impl TcpSegment {
    /// Arrival time of the frame carrying this segment
    pub fn arrival(&self) -> Timestamp {
        self.arrival
    }

    pub fn source(&self) -> SocketAddr {
        self.source
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Directed flow this segment travels on
    pub fn flow(&self) -> FlowId {
        FlowId::new(self.source, self.destination)
    }

    pub fn flags(&self) -> TcpFlags {
        self.flags
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn acknowledgement(&self) -> u32 {
        self.acknowledgement
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Original TCP header plus payload as captured
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Write the original bytes out unmodified
    pub fn write<W: io::Write>(&self, out: &mut W) -> PacketResult<()> {
        out.write_all(&self.raw)?;
        Ok(())
    }
}

impl fmt::Display for TcpSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] seq={} ack={} len={}",
            self.flow(),
            self.flags,
            self.sequence,
            self.acknowledgement,
            self.payload.len()
        )
    }
}
