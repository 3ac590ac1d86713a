//! Protocols a decoded frame can be interpreted as

use std::fmt;

use serde::{Deserialize, Serialize};

/// A protocol layer recognised by the framer chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Ethernet II link layer
    Ethernet,
    /// Linux cooked capture link layer
    Sll,
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Sip,
    Rtp,
    /// Recognised as present but not decodable
    Unknown,
}

impl Protocol {
    /// Short lower-case name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Protocol::Ethernet => "eth",
            Protocol::Sll => "sll",
            Protocol::Ipv4 => "ipv4",
            Protocol::Ipv6 => "ipv6",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sip => "sip",
            Protocol::Rtp => "rtp",
            Protocol::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
