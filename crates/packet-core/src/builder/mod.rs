//! Builders for packet views
//!
//! The framer chain normally produces [`TcpSegment`](crate::TcpSegment),
//! [`SipMessage`](crate::SipMessage) and [`RtpPacket`](crate::RtpPacket)
//! values. These builders create the same
//! values directly, together with a faithful wire rendering in `raw`, which
//! is what test fixtures and replay tools need.
//!
//! ```rust
//! use pktflow_packet_core::prelude::*;
//!
//! let syn = TcpSegmentBuilder::new("10.0.0.1:40000".parse().unwrap(), "10.0.0.2:5060".parse().unwrap())
//!     .flags(TcpFlags::SYN)
//!     .sequence(1000)
//!     .at(Timestamp::from_millis(5))
//!     .build();
//! assert!(syn.flags().is_syn());
//! assert_eq!(syn.raw().len(), 20);
//!
//! let ringing = SipMessageBuilder::response(StatusCode::Ringing)
//!     .call_id("call-1")
//!     .to_tag("callee")
//!     .cseq(1, Method::Invite)
//!     .build();
//! assert!(ringing.status().unwrap().is_ringing());
//! ```

mod rtp;
mod sip;
mod tcp;

pub use rtp::RtpPacketBuilder;
pub use sip::SipMessageBuilder;
pub use tcp::TcpSegmentBuilder;
