//! # pktflow
//!
//! Offline reconstruction of TCP connections and SIP dialogs from decoded
//! capture records.
//!
//! This crate bundles the workspace crates behind one dependency:
//!
//! - [`packet_core`]: the decoded packet events (`Frame`, `TcpSegment`,
//!   `SipMessage`) and their builders
//! - [`stream_core`]: the reconstruction engine (registries, state machines,
//!   listeners, the default frame handler)
//! - [`infra_common`]: logging bootstrap and log context
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pktflow::prelude::*;
//!
//! struct EndedCalls;
//!
//! impl StreamListener<SipDialogStream> for EndedCalls {
//!     fn end_stream(&self, stream: &StreamHandle<SipDialogStream>) -> anyhow::Result<()> {
//!         let call = stream.read();
//!         println!("{} ended in {}", call.key(), call.state());
//!         Ok(())
//!     }
//! }
//!
//! let mut handler: DefaultStreamHandler = DefaultStreamHandler::new(StreamConfig::default());
//! handler.add_sip_listener(Arc::new(EndedCalls));
//!
//! let bye = SipMessageBuilder::request(Method::Bye, "sip:bob@example.com")
//!     .call_id("f81d4fae")
//!     .from_tag("a")
//!     .to_tag("b")
//!     .cseq(2, Method::Bye)
//!     .build();
//! handler.next_frame(&Frame::from(bye));
//! ```

pub use pktflow_infra_common as infra_common;
pub use pktflow_packet_core as packet_core;
pub use pktflow_stream_core as stream_core;

/// Re-export of common types for easier use
pub mod prelude {
    pub use pktflow_infra_common::{LoggingConfig, setup_logging};
    pub use pktflow_packet_core::prelude::*;
    pub use pktflow_stream_core::prelude::*;
}
