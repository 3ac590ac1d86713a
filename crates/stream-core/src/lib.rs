//! # pktflow-stream-core
//!
//! Reconstructs TCP connections, SIP dialogs and RTP streams from a
//! time-ordered (but not strictly ordered) sequence of decoded packets.
//!
//! ## Architecture
//!
//! ```text
//!   Frame ──► DefaultStreamHandler ──┬──► StreamRegistry<TcpStream> ──► TcpStateMachine
//!                                    │
//!                                    ├──► StreamRegistry<SipDialogStream> ──► CallStateMachine
//!                                    │
//!                                    └──► StreamRegistry<RtpStream>
//!                                                 │
//!                                                 ▼
//!                                   StreamListener callbacks
//!                             (start_stream, packet_received, end_stream)
//! ```
//!
//! - [`key`]: session keys ([`ConnectionKey`], [`CallId`], [`Ssrc`]) and [`StreamId`]
//! - [`registry`]: key to stream mapping, key reuse, listener fan-out
//! - [`tcp`]: TCP state machine and stream
//! - [`sip`]: call state machine, dialog stream with re-drive, light stream
//! - [`rtp`]: media streams keyed by SSRC
//! - [`handler`]: routes frames to the registries
//!
//! Processing is synchronous: one packet at a time, all callbacks invoked
//! on the calling thread before `admit` returns. Stream handles can be read
//! from other threads.
//!
//! ## Quick start
//!
//! ```rust
//! use pktflow_packet_core::prelude::*;
//! use pktflow_stream_core::prelude::*;
//!
//! let mut registry: StreamRegistry<SipDialogStream> = StreamRegistry::new(StreamConfig::default());
//!
//! let invite = SipMessageBuilder::request(Method::Invite, "sip:bob@example.com")
//!     .call_id("call-1")
//!     .from_tag("a")
//!     .cseq(1, Method::Invite)
//!     .at(Timestamp::from_millis(0))
//!     .build();
//! let ringing = SipMessageBuilder::response(StatusCode::Ringing)
//!     .call_id("call-1")
//!     .from_tag("a")
//!     .to_tag("b")
//!     .cseq(1, Method::Invite)
//!     .at(Timestamp::from_millis(250))
//!     .build();
//!
//! let id = registry.admit(invite).unwrap();
//! registry.admit(ringing).unwrap();
//!
//! let stream = registry.stream(id).unwrap();
//! assert_eq!(stream.read().state(), CallState::Ringing);
//! assert_eq!(stream.read().post_dial_delay(), Some(std::time::Duration::from_millis(250)));
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod key;
pub mod listener;
pub mod registry;
pub mod rtp;
pub mod sip;
pub mod stream;
pub mod summary;
pub mod tcp;

pub use config::{RtpConfig, SipConfig, StreamConfig, TcpConfig};
pub use error::{ErrorSink, StreamError, StreamResult};
pub use handler::{DefaultStreamHandler, HandlerStats};
pub use key::{CallId, ConnectionKey, Ssrc, StreamId};
pub use listener::StreamListener;
pub use registry::{RegistryStats, StreamRegistry};
pub use rtp::{Jitter, RtpStream};
pub use sip::{CallState, CallStateMachine, LightSipStream, SipDialogStream, SipStatistics};
pub use stream::{Disposition, PacketLog, Stream, StreamHandle, StreamPacket, Transition};
pub use summary::{RtpStreamSummary, SipStreamSummary, TcpStreamSummary};
pub use tcp::{TcpState, TcpStateMachine, TcpStream};

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{
        CallId, CallState, ConnectionKey, DefaultStreamHandler, Disposition, ErrorSink, LightSipStream,
        RtpStream, RtpStreamSummary, SipDialogStream, SipStreamSummary, Ssrc, Stream, StreamConfig,
        StreamError, StreamHandle, StreamId, StreamListener, StreamRegistry, StreamResult, TcpState,
        TcpStream, TcpStreamSummary,
    };
}
