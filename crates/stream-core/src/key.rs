//! Session keys
//!
//! A key names the session a packet belongs to; it is what the registry
//! looks up. Keys are pure values: equality and hashing only.
//!
//! - [`ConnectionKey`]: a TCP connection's 4-tuple, direction independent
//! - [`CallId`]: a SIP dialog's Call-ID, compared as opaque bytes
//! - [`Ssrc`]: an RTP synchronization source
//!
//! A key can be reused over time (a new handshake on the same ports, a new
//! call re-using a Call-ID). Each incarnation gets its own [`StreamId`].

use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;
use pktflow_packet_core::FlowId;
use serde::{Deserialize, Serialize};

/// Registry-assigned identity of one stream incarnation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamId(u64);

impl StreamId {
    pub const fn new(id: u64) -> Self {
        StreamId(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// TCP 4-tuple in canonical order
///
/// The lower endpoint (by address, then port) is always stored first, so
/// both directions of a connection produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionKey {
    low: SocketAddr,
    high: SocketAddr,
}

impl ConnectionKey {
    pub fn new(a: SocketAddr, b: SocketAddr) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> SocketAddr {
        self.low
    }

    pub fn high(&self) -> SocketAddr {
        self.high
    }

    /// Is `flow` one of the two directions of this connection
    pub fn matches(&self, flow: &FlowId) -> bool {
        *self == ConnectionKey::from(*flow)
    }
}

impl From<FlowId> for ConnectionKey {
    fn from(flow: FlowId) -> Self {
        ConnectionKey::new(flow.source, flow.destination)
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.low, self.high)
    }
}

/// RTP synchronization source identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ssrc(u32);

impl Ssrc {
    pub const fn new(ssrc: u32) -> Self {
        Ssrc(ssrc)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Ssrc {
    fn from(ssrc: u32) -> Self {
        Ssrc(ssrc)
    }
}

impl fmt::Display for Ssrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// SIP Call-ID
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallId(Bytes);

impl CallId {
    pub fn new(value: impl Into<Bytes>) -> Self {
        CallId(value.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&'static str> for CallId {
    fn from(value: &'static str) -> Self {
        CallId(Bytes::from_static(value.as_bytes()))
    }
}

impl From<Bytes> for CallId {
    fn from(value: Bytes) -> Self {
        CallId(value)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for CallId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_key_is_direction_independent() {
        let a: SocketAddr = "10.0.0.2:5060".parse().unwrap();
        let b: SocketAddr = "10.0.0.1:40000".parse().unwrap();
        let forward = ConnectionKey::from(FlowId::new(a, b));
        let backward = ConnectionKey::from(FlowId::new(b, a));
        assert_eq!(forward, backward);
        assert_eq!(forward.low(), b);
        assert!(forward.matches(&FlowId::new(a, b)));
        assert_eq!(forward.to_string(), "10.0.0.1:40000 <-> 10.0.0.2:5060");
    }

    #[test]
    fn test_ports_distinguish_connections() {
        let a: SocketAddr = "10.0.0.1:1000".parse().unwrap();
        let b: SocketAddr = "10.0.0.2:80".parse().unwrap();
        let c: SocketAddr = "10.0.0.1:1001".parse().unwrap();
        assert_ne!(ConnectionKey::new(a, b), ConnectionKey::new(c, b));
    }

    #[test]
    fn test_call_id_is_opaque() {
        assert_eq!(CallId::from("abc@host"), CallId::new(Bytes::from("abc@host")));
        assert_ne!(CallId::from("abc@host"), CallId::from("ABC@host"));
        assert_eq!(CallId::from("abc@host").to_string(), "abc@host");
    }

    #[test]
    fn test_ssrc_display() {
        assert_eq!(Ssrc::new(0xbeef).to_string(), "0x0000beef");
        assert_eq!(Ssrc::from(7).as_u32(), 7);
    }
}
