//! The stream abstraction
//!
//! A stream is one reconstructed session: a TCP connection, a SIP dialog or
//! an RTP media stream.
//! It owns its key, its state machine and every packet it accepted. The
//! registry drives it through [`Stream::add_packet`]; observers read it
//! through a [`StreamHandle`].

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use pktflow_packet_core::{PacketResult, RtpPacket, SipMessage, TcpSegment, Timestamp};
use serde::Serialize;

use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::key::StreamId;

/// A packet a stream can retain
pub trait StreamPacket: Clone + fmt::Debug + Send + Sync + 'static {
    /// Capture arrival time
    fn arrival(&self) -> Timestamp;

    /// Write the packet's original bytes
    fn write_to(&self, out: &mut dyn io::Write) -> PacketResult<()>;
}

impl StreamPacket for TcpSegment {
    fn arrival(&self) -> Timestamp {
        TcpSegment::arrival(self)
    }

    fn write_to(&self, mut out: &mut dyn io::Write) -> PacketResult<()> {
        self.write(&mut out)
    }
}

impl StreamPacket for SipMessage {
    fn arrival(&self) -> Timestamp {
        SipMessage::arrival(self)
    }

    fn write_to(&self, mut out: &mut dyn io::Write) -> PacketResult<()> {
        self.write(&mut out)
    }
}

impl StreamPacket for RtpPacket {
    fn arrival(&self) -> Timestamp {
        RtpPacket::arrival(self)
    }

    fn write_to(&self, mut out: &mut dyn io::Write) -> PacketResult<()> {
        self.write(&mut out)
    }
}

/// Outcome of offering a packet to a stream
#[derive(Debug)]
pub enum Disposition<P> {
    /// The stream retained the packet
    Accepted,
    /// The packet opens a new incarnation of the key; the stream has ended
    /// and hands the packet back untouched
    Reused(P),
}

/// One recorded state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
    /// Arrival time of the packet that caused it
    pub at: Timestamp,
}

/// Packets ordered by arrival time
///
/// Packets with equal timestamps keep their insertion order; none is ever
/// dropped or replaced.
#[derive(Debug, Clone)]
pub struct PacketLog<P> {
    entries: BTreeMap<(Timestamp, u64), P>,
    next_seq: u64,
}

impl<P> Default for PacketLog<P> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<P: StreamPacket> PacketLog<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, packet: P) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((packet.arrival(), seq), packet);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.entries.values()
    }

    pub fn first(&self) -> Option<&P> {
        self.entries.values().next()
    }

    pub fn last(&self) -> Option<&P> {
        self.entries.values().next_back()
    }

    pub fn first_time(&self) -> Option<Timestamp> {
        self.entries.keys().next().map(|(ts, _)| *ts)
    }

    pub fn last_time(&self) -> Option<Timestamp> {
        self.entries.keys().next_back().map(|(ts, _)| *ts)
    }
}

/// A reconstructed session
pub trait Stream: Send + Sync + Sized + 'static {
    type Packet: StreamPacket;
    type Key: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Protocol name used in logs and errors
    const PROTOCOL: &'static str;

    /// Extract the key of the stream a packet belongs to
    fn key_for(packet: &Self::Packet) -> StreamResult<Self::Key>;

    /// A fresh stream that has not seen any packet yet
    fn create(id: StreamId, key: Self::Key, config: &StreamConfig) -> Self;

    fn id(&self) -> StreamId;

    fn key(&self) -> &Self::Key;

    /// Offer a packet; see [`Disposition`]
    ///
    /// A fresh stream always accepts its first packet.
    fn add_packet(&mut self, packet: Self::Packet) -> Disposition<Self::Packet>;

    /// The state machine reached a terminal state
    fn is_ended(&self) -> bool;

    /// Label of the current state
    fn state_name(&self) -> &'static str;

    /// Retained packets
    fn packets(&self) -> Vec<&Self::Packet>;

    fn packet_count(&self) -> usize {
        self.packets().len()
    }

    fn time_of_first_packet(&self) -> Option<Timestamp>;

    fn time_of_last_packet(&self) -> Option<Timestamp>;

    /// Time between the first and the last retained packet
    fn duration(&self) -> Option<Duration> {
        let first = self.time_of_first_packet()?;
        self.time_of_last_packet()?.checked_duration_since(first)
    }

    /// Write every retained packet's original bytes, in order
    fn write(&self, out: &mut dyn io::Write) -> StreamResult<()> {
        for packet in self.packets() {
            packet.write_to(out)?;
        }
        Ok(())
    }

    /// Hand over non-fatal errors collected while processing packets
    fn drain_errors(&mut self) -> Vec<StreamError> {
        Vec::new()
    }
}

/// Shared view of a stream
///
/// Cheap to clone. Observers may keep a handle after the stream ended and
/// read it from any thread; only the registry mutates the stream.
pub struct StreamHandle<S> {
    inner: Arc<RwLock<S>>,
}

impl<S> Clone for StreamHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Stream> StreamHandle<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self {
            inner: Arc::new(RwLock::new(stream)),
        }
    }

    /// Read access to the stream
    pub fn read(&self) -> RwLockReadGuard<'_, S> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, S> {
        self.inner.write()
    }

    pub fn id(&self) -> StreamId {
        self.read().id()
    }

    pub fn key(&self) -> S::Key {
        self.read().key().clone()
    }

    pub fn is_ended(&self) -> bool {
        self.read().is_ended()
    }

    /// Both handles refer to the same stream
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<S: Stream> fmt::Debug for StreamHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stream = self.read();
        f.debug_struct("StreamHandle")
            .field("id", &stream.id())
            .field("key", stream.key())
            .field("state", &stream.state_name())
            .field("packets", &stream.packet_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pktflow_packet_core::{Method, SipMessageBuilder};

    fn msg(ts: u64, method: Method) -> SipMessage {
        SipMessageBuilder::request(method, "sip:a@b")
            .call_id("c")
            .at(Timestamp::from_micros(ts))
            .build()
    }

    #[test]
    fn test_packet_log_orders_by_time() {
        let mut log = PacketLog::new();
        log.insert(msg(30, Method::Bye));
        log.insert(msg(10, Method::Invite));
        log.insert(msg(20, Method::Ack));

        let methods: Vec<_> = log.iter().map(|m| m.method().unwrap().clone()).collect();
        assert_eq!(methods, vec![Method::Invite, Method::Ack, Method::Bye]);
        assert_eq!(log.first_time(), Some(Timestamp::from_micros(10)));
        assert_eq!(log.last_time(), Some(Timestamp::from_micros(30)));
    }

    #[test]
    fn test_packet_log_keeps_equal_timestamps() {
        let mut log = PacketLog::new();
        log.insert(msg(10, Method::Invite));
        log.insert(msg(10, Method::Cancel));
        log.insert(msg(10, Method::Invite));

        assert_eq!(log.len(), 3);
        let methods: Vec<_> = log.iter().map(|m| m.method().unwrap().clone()).collect();
        assert_eq!(methods, vec![Method::Invite, Method::Cancel, Method::Invite]);
    }
}
