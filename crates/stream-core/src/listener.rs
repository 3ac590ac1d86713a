//! Stream lifecycle observers
//!
//! Listeners are registered on a registry before packets flow. Each
//! callback receives a [`StreamHandle`] that stays valid after the call
//! returns, so a listener may keep it and read the stream later, including
//! after `end_stream`.
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use pktflow_stream_core::prelude::*;
//!
//! #[derive(Default)]
//! struct CallCounter {
//!     ended: AtomicUsize,
//! }
//!
//! impl StreamListener<SipDialogStream> for CallCounter {
//!     fn end_stream(&self, _stream: &StreamHandle<SipDialogStream>) -> anyhow::Result<()> {
//!         self.ended.fetch_add(1, Ordering::Relaxed);
//!         Ok(())
//!     }
//! }
//! ```

use crate::stream::{Stream, StreamHandle};

/// Observer of stream lifecycle events
///
/// All callbacks default to doing nothing. An error returned from a
/// callback is logged and counted by the registry; it never stops packet
/// processing and never prevents other listeners from being called.
///
/// Callbacks run synchronously inside [`StreamRegistry::admit`]. Only
/// returned errors are isolated: a panic is not caught and unwinds out of
/// `admit`, skipping the remaining listeners for that packet. The release
/// profiles built with `panic = "abort"` end the process instead. Report
/// failures through `Err`, never by panicking.
///
/// [`StreamRegistry::admit`]: crate::registry::StreamRegistry::admit
pub trait StreamListener<S: Stream>: Send + Sync {
    /// A new stream was created; `packet` is its first packet
    fn start_stream(&self, stream: &StreamHandle<S>, packet: &S::Packet) -> anyhow::Result<()> {
        let _ = (stream, packet);
        Ok(())
    }

    /// An existing stream accepted `packet`
    fn packet_received(&self, stream: &StreamHandle<S>, packet: &S::Packet) -> anyhow::Result<()> {
        let _ = (stream, packet);
        Ok(())
    }

    /// The stream reached a terminal state; called at most once per stream
    fn end_stream(&self, stream: &StreamHandle<S>) -> anyhow::Result<()> {
        let _ = stream;
        Ok(())
    }
}
