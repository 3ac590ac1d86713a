//! Error types for stream-core
//!
//! Nothing in the engine is fatal to a run. Every error below describes one
//! packet or one callback that could not be handled; the registry logs it,
//! counts it, hands it to the installed [`ErrorSink`] and moves on to the
//! next packet.
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | [`StreamError::Keying`] | the session key cannot be extracted; the packet is dropped |
//! | [`StreamError::Transition`] | no rule of the current state matches; the packet is kept, state unchanged |
//! | [`StreamError::Listener`] | an observer callback returned an error |
//! | [`StreamError::Replay`] | a retained message failed to classify while re-driving |
//! | [`StreamError::Packet`] | a packet field was unreadable during live processing, or writing failed |
//! | [`StreamError::Config`] | configuration could not be read or parsed |

use pktflow_packet_core::PacketError;
use thiserror::Error;

use crate::key::StreamId;

/// Result type for stream operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Errors surfaced by the stream engine
#[derive(Error, Debug)]
pub enum StreamError {
    /// The session key could not be extracted from a packet
    #[error("Keying failed for {protocol} packet: {source}")]
    Keying {
        protocol: &'static str,
        #[source]
        source: PacketError,
    },

    /// No transition rule of the current state matches the event
    #[error("Stream {stream}: no transition from {state} on {event}")]
    Transition {
        stream: String,
        state: &'static str,
        event: String,
    },

    /// An observer callback failed
    #[error("Listener {callback} failed for stream {stream}: {reason}")]
    Listener {
        callback: &'static str,
        stream: StreamId,
        reason: String,
    },

    /// A retained message could not be classified during re-drive
    #[error("Stream {stream}: replay skipped a message: {source}")]
    Replay {
        stream: String,
        #[source]
        source: PacketError,
    },

    /// A packet field could not be read, or the packet could not be written
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StreamError {
    /// Short category name, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            StreamError::Keying { .. } => "keying",
            StreamError::Transition { .. } => "transition",
            StreamError::Listener { .. } => "listener",
            StreamError::Replay { .. } => "replay",
            StreamError::Packet(_) => "packet",
            StreamError::Config(_) => "config",
        }
    }
}

/// Receiver for non-fatal engine errors
///
/// Install one on a registry to collect metrics or keep diagnostics. Without
/// a sink, errors are only logged.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &StreamError);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = StreamError::Keying {
            protocol: "sip",
            source: PacketError::MissingHeader("Call-ID"),
        };
        assert_eq!(err.to_string(), "Keying failed for sip packet: Missing header: Call-ID");
        assert_eq!(err.kind(), "keying");

        let err = StreamError::Listener {
            callback: "end_stream",
            stream: StreamId::new(7),
            reason: "disk full".into(),
        };
        assert_eq!(err.to_string(), "Listener end_stream failed for stream #7: disk full");
    }
}
