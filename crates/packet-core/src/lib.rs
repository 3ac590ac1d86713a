//! # pktflow-packet-core
//!
//! Decoded packet events for the pktflow stream engine.
//!
//! The capture reader and the link/network/transport framers live outside
//! this workspace. What they hand over is modelled here: a [`Frame`] that
//! knows which protocols it can be interpreted as, and the protocol views
//! the engine cares about, [`TcpSegment`], [`SipMessage`] and [`RtpPacket`].
//!
//! The views are immutable once built and cheap to clone (the raw bytes
//! are reference counted), so streams can retain them and observers can
//! re-serialize them unmodified through `write`.
//!
//! ## Building events
//!
//! ```rust
//! use pktflow_packet_core::prelude::*;
//!
//! let invite = SipMessageBuilder::request(Method::Invite, "sip:bob@example.com")
//!     .call_id("a84b4c76e66710")
//!     .from_tag("1928301774")
//!     .cseq(314159, Method::Invite)
//!     .at(Timestamp::from_micros(1_000))
//!     .build();
//!
//! assert!(invite.is_request());
//! assert!(invite.is_initial());
//! assert_eq!(invite.method().unwrap(), &Method::Invite);
//! ```

pub mod builder;
pub mod error;
pub mod frame;
pub mod rtp;
pub mod sip;
pub mod tcp;
pub mod types;

pub use builder::{RtpPacketBuilder, SipMessageBuilder, TcpSegmentBuilder};
pub use error::{PacketError, PacketResult};
pub use frame::Frame;
pub use rtp::RtpPacket;
pub use sip::{SipMessage, StartLine};
pub use tcp::{FlowId, TcpFlags, TcpSegment};
pub use types::{CSeq, Method, Protocol, StatusCode, Timestamp};

/// Commonly used types
pub mod prelude {
    pub use crate::builder::{RtpPacketBuilder, SipMessageBuilder, TcpSegmentBuilder};
    pub use crate::error::{PacketError, PacketResult};
    pub use crate::frame::Frame;
    pub use crate::rtp::RtpPacket;
    pub use crate::sip::{SipMessage, StartLine};
    pub use crate::tcp::{FlowId, TcpFlags, TcpSegment};
    pub use crate::types::{CSeq, Method, Protocol, StatusCode, Timestamp};
}
