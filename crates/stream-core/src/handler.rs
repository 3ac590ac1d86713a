//! Frame dispatch
//!
//! [`DefaultStreamHandler`] is the entry point for a capture reader: it
//! takes framed packets one at a time and routes each one to the registry
//! of every protocol it carries. A registry exists only once a listener for
//! it has been added (or it was enabled explicitly), so a caller interested
//! in SIP alone never pays for TCP or RTP tracking.
//!
//! ```rust
//! use std::sync::Arc;
//! use pktflow_packet_core::{Frame, Method, SipMessageBuilder};
//! use pktflow_stream_core::prelude::*;
//!
//! struct Printer;
//! impl StreamListener<SipDialogStream> for Printer {}
//!
//! let mut handler: DefaultStreamHandler = DefaultStreamHandler::new(StreamConfig::default());
//! handler.add_sip_listener(Arc::new(Printer));
//!
//! let invite = SipMessageBuilder::request(Method::Invite, "sip:bob@example.com")
//!     .call_id("abc")
//!     .cseq(1, Method::Invite)
//!     .build();
//! handler.next_frame(&Frame::from(invite));
//!
//! assert_eq!(handler.sip().map(|r| r.len()), Some(1));
//! assert_eq!(handler.sip_statistics().invite, 1);
//! ```

use std::sync::Arc;

use pktflow_packet_core::{Frame, Protocol, SipMessage};
use serde::Serialize;
use tracing::trace;

use crate::config::StreamConfig;
use crate::error::ErrorSink;
use crate::listener::StreamListener;
use crate::registry::StreamRegistry;
use crate::rtp::RtpStream;
use crate::sip::{SipDialogStream, SipStatistics};
use crate::stream::Stream;
use crate::tcp::TcpStream;

/// Frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HandlerStats {
    pub frames: u64,
    pub tcp_segments: u64,
    pub sip_messages: u64,
    pub rtp_packets: u64,
    /// SIP messages whose method is configured as ignored
    pub ignored: u64,
    /// Frames carrying none of TCP, SIP or RTP
    pub skipped: u64,
}

/// Routes frames to the TCP, SIP and RTP registries
///
/// The SIP stream type defaults to [`SipDialogStream`]; use
/// `DefaultStreamHandler<LightSipStream>` for the lightweight variant.
///
/// [`LightSipStream`]: crate::sip::LightSipStream
pub struct DefaultStreamHandler<Sip = SipDialogStream>
where
    Sip: Stream<Packet = SipMessage>,
{
    config: StreamConfig,
    tcp: Option<StreamRegistry<TcpStream>>,
    sip: Option<StreamRegistry<Sip>>,
    rtp: Option<StreamRegistry<RtpStream>>,
    error_sink: Option<Arc<dyn ErrorSink>>,
    sip_statistics: SipStatistics,
    stats: HandlerStats,
}

impl<Sip> DefaultStreamHandler<Sip>
where
    Sip: Stream<Packet = SipMessage>,
{
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            tcp: None,
            sip: None,
            rtp: None,
            error_sink: None,
            sip_statistics: SipStatistics::new(),
            stats: HandlerStats::default(),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Track TCP connections even without a listener
    pub fn enable_tcp(&mut self) -> &mut StreamRegistry<TcpStream> {
        let config = &self.config;
        let sink = &self.error_sink;
        self.tcp.get_or_insert_with(|| new_registry(config, sink))
    }

    /// Track SIP dialogs even without a listener
    pub fn enable_sip(&mut self) -> &mut StreamRegistry<Sip> {
        let config = &self.config;
        let sink = &self.error_sink;
        self.sip.get_or_insert_with(|| new_registry(config, sink))
    }

    /// Track RTP streams even without a listener
    pub fn enable_rtp(&mut self) -> &mut StreamRegistry<RtpStream> {
        let config = &self.config;
        let sink = &self.error_sink;
        self.rtp.get_or_insert_with(|| new_registry(config, sink))
    }

    pub fn add_tcp_listener(&mut self, listener: Arc<dyn StreamListener<TcpStream>>) {
        self.enable_tcp().add_listener(listener);
    }

    pub fn add_sip_listener(&mut self, listener: Arc<dyn StreamListener<Sip>>) {
        self.enable_sip().add_listener(listener);
    }

    pub fn add_rtp_listener(&mut self, listener: Arc<dyn StreamListener<RtpStream>>) {
        self.enable_rtp().add_listener(listener);
    }

    /// Install an error sink on every registry, present and future
    pub fn set_error_sink(&mut self, sink: Arc<dyn ErrorSink>) {
        if let Some(tcp) = &mut self.tcp {
            tcp.set_error_sink(Arc::clone(&sink));
        }
        if let Some(sip) = &mut self.sip {
            sip.set_error_sink(Arc::clone(&sink));
        }
        if let Some(rtp) = &mut self.rtp {
            rtp.set_error_sink(Arc::clone(&sink));
        }
        self.error_sink = Some(sink);
    }

    /// Route one frame
    ///
    /// Never fails: per-packet errors are logged, counted and reported by
    /// the registries.
    pub fn next_frame(&mut self, frame: &Frame) {
        self.stats.frames += 1;
        let mut routed = false;

        if frame.has_protocol(Protocol::Sip) {
            if let Some(msg) = frame.sip() {
                routed = true;
                self.on_sip(msg);
            }
        }
        if frame.has_protocol(Protocol::Tcp) {
            if let Some(segment) = frame.tcp() {
                routed = true;
                self.stats.tcp_segments += 1;
                if let Some(tcp) = &mut self.tcp {
                    let _ = tcp.admit(segment.clone());
                }
            }
        }
        if frame.has_protocol(Protocol::Rtp) {
            if let Some(packet) = frame.rtp() {
                routed = true;
                self.stats.rtp_packets += 1;
                if let Some(rtp) = &mut self.rtp {
                    let _ = rtp.admit(packet.clone());
                }
            }
        }

        if !routed {
            self.stats.skipped += 1;
            trace!(protocols = ?frame.protocols(), "frame carries nothing tracked");
        }
    }

    fn on_sip(&mut self, msg: &SipMessage) {
        self.stats.sip_messages += 1;
        self.sip_statistics.count(msg);

        let Some(sip) = &mut self.sip else {
            return;
        };
        if let Ok(method) = msg.method() {
            if self.config.sip.is_ignored(method) {
                self.stats.ignored += 1;
                trace!(method = %method, "ignored method");
                return;
            }
        }
        let _ = sip.admit(msg.clone());
    }

    pub fn tcp(&self) -> Option<&StreamRegistry<TcpStream>> {
        self.tcp.as_ref()
    }

    pub fn tcp_mut(&mut self) -> Option<&mut StreamRegistry<TcpStream>> {
        self.tcp.as_mut()
    }

    pub fn sip(&self) -> Option<&StreamRegistry<Sip>> {
        self.sip.as_ref()
    }

    pub fn sip_mut(&mut self) -> Option<&mut StreamRegistry<Sip>> {
        self.sip.as_mut()
    }

    pub fn rtp(&self) -> Option<&StreamRegistry<RtpStream>> {
        self.rtp.as_ref()
    }

    pub fn rtp_mut(&mut self) -> Option<&mut StreamRegistry<RtpStream>> {
        self.rtp.as_mut()
    }

    pub fn sip_statistics(&self) -> &SipStatistics {
        &self.sip_statistics
    }

    pub fn stats(&self) -> HandlerStats {
        self.stats
    }
}

fn new_registry<S: Stream>(config: &StreamConfig, sink: &Option<Arc<dyn ErrorSink>>) -> StreamRegistry<S> {
    let mut registry = StreamRegistry::new(config.clone());
    if let Some(sink) = sink {
        registry.set_error_sink(Arc::clone(sink));
    }
    registry
}
