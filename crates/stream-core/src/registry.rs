//! Stream registry
//!
//! Maps each session key to its current stream, creates streams on first
//! sight of a key, starts a new incarnation when a stream reports key reuse
//! and fans lifecycle events out to the registered listeners.
//!
//! ## Admission
//!
//! ```text
//!   packet ──► key_for ──✗──► keying failure: logged, counted, dropped
//!                 │
//!                 ▼
//!         active stream for key?
//!          │ no                   │ yes
//!          ▼                      ▼
//!     create + start_stream   add_packet ──► Accepted ──► packet_received
//!                                  │
//!                                  └──► Reused(packet): end_stream (once),
//!                                       then create + start_stream
//!
//!   after either path: stream ended and not yet notified ──► end_stream
//! ```
//!
//! Streams are never evicted automatically. Call
//! [`StreamRegistry::prune_ended`] to drop ended streams once their
//! consumers are done with them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use pktflow_infra_common::LogContext;
use serde::Serialize;
use tracing::{Level, debug, trace, warn};

use crate::config::StreamConfig;
use crate::error::{ErrorSink, StreamError, StreamResult};
use crate::key::StreamId;
use crate::listener::StreamListener;
use crate::stream::{Disposition, Stream, StreamHandle};

/// Counters maintained by a registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Streams created, reuse incarnations included
    pub streams_created: u64,
    /// Packets offered to a stream
    pub packets_admitted: u64,
    /// Packets dropped because no key could be extracted
    pub keying_failures: u64,
    /// Listener callbacks that returned an error
    pub listener_failures: u64,
    /// Errors reported by streams (ambiguous transitions, replay skips)
    pub stream_errors: u64,
    /// New incarnations started on a reused key
    pub reuses: u64,
}

struct Entry<S> {
    handle: StreamHandle<S>,
    end_notified: bool,
}

/// Registry of streams of one kind
pub struct StreamRegistry<S: Stream> {
    config: StreamConfig,
    active: HashMap<S::Key, Entry<S>>,
    all: BTreeMap<StreamId, StreamHandle<S>>,
    listeners: Vec<Arc<dyn StreamListener<S>>>,
    error_sink: Option<Arc<dyn ErrorSink>>,
    next_id: u64,
    stats: RegistryStats,
    log_context: LogContext,
}

impl<S: Stream> StreamRegistry<S> {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            active: HashMap::new(),
            all: BTreeMap::new(),
            listeners: Vec::new(),
            error_sink: None,
            next_id: 1,
            stats: RegistryStats::default(),
            log_context: LogContext::with_operation(format!("{}-registry", S::PROTOCOL), "admit"),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Register a listener; listeners are called in registration order
    pub fn add_listener(&mut self, listener: Arc<dyn StreamListener<S>>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Install a sink that receives every non-fatal error
    pub fn set_error_sink(&mut self, sink: Arc<dyn ErrorSink>) {
        self.error_sink = Some(sink);
    }

    /// Feed one packet through the registry
    ///
    /// Returns the id of the stream that now holds the packet. The only
    /// error is a keying failure, which has already been logged and
    /// reported when it is returned.
    pub fn admit(&mut self, packet: S::Packet) -> StreamResult<StreamId> {
        let span = self.log_context.span(Level::DEBUG);
        let _guard = span.enter();

        let key = match S::key_for(&packet) {
            Ok(key) => key,
            Err(e) => {
                self.stats.keying_failures += 1;
                warn!(protocol = S::PROTOCOL, error = %e, "dropping packet without a usable key");
                self.report(&e);
                return Err(e);
            }
        };
        self.stats.packets_admitted += 1;

        let (handle, end_notified) = match self.active.get(&key) {
            Some(entry) => (entry.handle.clone(), entry.end_notified),
            None => return Ok(self.start(key, packet)),
        };

        let disposition = handle.write().add_packet(packet.clone());
        self.collect_errors(&handle);

        match disposition {
            Disposition::Accepted => {
                trace!(stream = %handle.id(), key = %key, "packet accepted");
                self.notify_packet(&handle, &packet);
                if !end_notified && handle.is_ended() {
                    self.notify_end(&key, &handle);
                }
                Ok(handle.id())
            }
            Disposition::Reused(packet) => {
                self.stats.reuses += 1;
                debug!(stream = %handle.id(), key = %key, "key reused, starting a new stream");
                if !end_notified {
                    self.notify_end(&key, &handle);
                }
                Ok(self.start(key, packet))
            }
        }
    }

    fn start(&mut self, key: S::Key, packet: S::Packet) -> StreamId {
        let id = StreamId::new(self.next_id);
        self.next_id += 1;
        self.stats.streams_created += 1;

        let mut stream = S::create(id, key.clone(), &self.config);
        if let Disposition::Reused(_) = stream.add_packet(packet.clone()) {
            // fresh streams always accept; keep going with an empty stream
            warn!(stream = %id, key = %key, "fresh stream refused its first packet");
        }
        let handle = StreamHandle::new(stream);
        self.collect_errors(&handle);

        debug!(stream = %id, key = %key, state = handle.read().state_name(), "stream started");
        self.active.insert(
            key.clone(),
            Entry {
                handle: handle.clone(),
                end_notified: false,
            },
        );
        self.all.insert(id, handle.clone());

        self.notify_start(&handle, &packet);
        if handle.is_ended() {
            self.notify_end(&key, &handle);
        }
        id
    }

    fn notify_start(&mut self, handle: &StreamHandle<S>, packet: &S::Packet) {
        for i in 0..self.listeners.len() {
            let listener = Arc::clone(&self.listeners[i]);
            if let Err(e) = listener.start_stream(handle, packet) {
                self.listener_failed("start_stream", handle, e);
            }
        }
    }

    fn notify_packet(&mut self, handle: &StreamHandle<S>, packet: &S::Packet) {
        for i in 0..self.listeners.len() {
            let listener = Arc::clone(&self.listeners[i]);
            if let Err(e) = listener.packet_received(handle, packet) {
                self.listener_failed("packet_received", handle, e);
            }
        }
    }

    fn notify_end(&mut self, key: &S::Key, handle: &StreamHandle<S>) {
        if let Some(entry) = self.active.get_mut(key) {
            if entry.handle.ptr_eq(handle) {
                entry.end_notified = true;
            }
        }
        debug!(stream = %handle.id(), key = %key, state = handle.read().state_name(), "stream ended");
        for i in 0..self.listeners.len() {
            let listener = Arc::clone(&self.listeners[i]);
            if let Err(e) = listener.end_stream(handle) {
                self.listener_failed("end_stream", handle, e);
            }
        }
    }

    fn listener_failed(&mut self, callback: &'static str, handle: &StreamHandle<S>, error: anyhow::Error) {
        self.stats.listener_failures += 1;
        let error = StreamError::Listener {
            callback,
            stream: handle.id(),
            reason: format!("{:#}", error),
        };
        warn!(error = %error, "listener failed");
        self.report(&error);
    }

    fn collect_errors(&mut self, handle: &StreamHandle<S>) {
        let errors = handle.write().drain_errors();
        for error in errors {
            self.stats.stream_errors += 1;
            match &error {
                StreamError::Transition { .. } => debug!(error = %error, "ambiguous transition"),
                _ => warn!(kind = error.kind(), error = %error, "stream error"),
            }
            self.report(&error);
        }
    }

    fn report(&self, error: &StreamError) {
        if let Some(sink) = &self.error_sink {
            sink.report(error);
        }
    }

    /// Current stream for a key
    pub fn active(&self, key: &S::Key) -> Option<StreamHandle<S>> {
        self.active.get(key).map(|entry| entry.handle.clone())
    }

    /// Look a stream up by id, including superseded incarnations
    pub fn stream(&self, id: StreamId) -> Option<StreamHandle<S>> {
        self.all.get(&id).cloned()
    }

    /// Every stream not yet pruned, in creation order
    pub fn streams(&self) -> Vec<StreamHandle<S>> {
        self.all.values().cloned().collect()
    }

    /// Number of streams not yet pruned
    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Remove every ended stream and return the handles
    ///
    /// A later packet on a pruned key starts a brand new stream.
    pub fn prune_ended(&mut self) -> Vec<StreamHandle<S>> {
        let ended: Vec<StreamId> = self
            .all
            .iter()
            .filter(|(_, handle)| handle.is_ended())
            .map(|(id, _)| *id)
            .collect();

        self.active.retain(|_, entry| !entry.handle.is_ended());
        let pruned: Vec<StreamHandle<S>> = ended.iter().filter_map(|id| self.all.remove(id)).collect();
        if !pruned.is_empty() {
            debug!(protocol = S::PROTOCOL, count = pruned.len(), "pruned ended streams");
        }
        pruned
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }
}
