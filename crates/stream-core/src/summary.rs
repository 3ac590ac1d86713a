//! Serializable per-stream reports
//!
//! Snapshots taken from a stream, typically in `end_stream`, for logging as
//! JSON or writing to a report file. Durations are in microseconds.

use std::time::Duration;

use pktflow_packet_core::Timestamp;
use serde::Serialize;

use crate::key::{CallId, ConnectionKey, Ssrc, StreamId};
use crate::rtp::RtpStream;
use crate::sip::{CallState, SipDialogStream};
use crate::stream::Stream;
use crate::tcp::{TcpState, TcpStream};

fn micros(duration: Option<Duration>) -> Option<u64> {
    duration.map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TcpStreamSummary {
    pub id: StreamId,
    pub key: String,
    pub state: TcpState,
    pub states: Vec<TcpState>,
    pub packets: usize,
    pub first_packet: Option<Timestamp>,
    pub last_packet: Option<Timestamp>,
    pub duration_us: Option<u64>,
    pub reset: bool,
    pub ports_reused: bool,
    pub sequence_anomalies: u64,
}

impl From<&TcpStream> for TcpStreamSummary {
    fn from(stream: &TcpStream) -> Self {
        let key: &ConnectionKey = stream.key();
        Self {
            id: stream.id(),
            key: key.to_string(),
            state: stream.state(),
            states: stream.transitions().iter().map(|t| t.to).collect(),
            packets: stream.packet_count(),
            first_packet: stream.time_of_first_packet(),
            last_packet: stream.time_of_last_packet(),
            duration_us: micros(stream.duration()),
            reset: stream.was_reset(),
            ports_reused: stream.ports_reused(),
            sequence_anomalies: stream.sequence_anomalies(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SipStreamSummary {
    pub id: StreamId,
    pub call_id: CallId,
    pub state: CallState,
    pub states: Vec<CallState>,
    pub packets: usize,
    pub first_packet: Option<Timestamp>,
    pub last_packet: Option<Timestamp>,
    pub post_dial_delay_us: Option<u64>,
    pub call_duration_us: Option<u64>,
    pub handshake_complete: bool,
    pub retransmissions_detected: bool,
    pub redrives: u64,
}

impl From<&SipDialogStream> for SipStreamSummary {
    fn from(stream: &SipDialogStream) -> Self {
        Self {
            id: stream.id(),
            call_id: stream.key().clone(),
            state: stream.state(),
            states: stream.transitions().iter().map(|t| t.to).collect(),
            packets: stream.packet_count(),
            first_packet: stream.time_of_first_packet(),
            last_packet: stream.time_of_last_packet(),
            post_dial_delay_us: micros(stream.post_dial_delay()),
            call_duration_us: micros(stream.call_duration()),
            handshake_complete: stream.handshake_complete(),
            retransmissions_detected: stream.retransmissions_detected(),
            redrives: stream.redrives(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RtpStreamSummary {
    pub id: StreamId,
    pub ssrc: Ssrc,
    pub payload_type: Option<u8>,
    pub packets: usize,
    pub first_packet: Option<Timestamp>,
    pub last_packet: Option<Timestamp>,
    pub duration_us: Option<u64>,
    pub lost_packets: u64,
    pub sequence_errors: u64,
    pub late_arrivals: u64,
    pub max_delta_us: Option<u64>,
    pub max_jitter_us: Option<u64>,
    pub mean_jitter_us: Option<u64>,
}

impl From<&RtpStream> for RtpStreamSummary {
    fn from(stream: &RtpStream) -> Self {
        let jitter = stream.jitter();
        Self {
            id: stream.id(),
            ssrc: stream.ssrc(),
            payload_type: stream.payload_type(),
            packets: stream.packet_count(),
            first_packet: stream.time_of_first_packet(),
            last_packet: stream.time_of_last_packet(),
            duration_us: micros(stream.duration()),
            lost_packets: stream.lost_packets(),
            sequence_errors: stream.sequence_errors(),
            late_arrivals: stream.late_arrivals(),
            max_delta_us: micros(stream.max_delta()),
            max_jitter_us: micros(jitter.map(|j| j.max)),
            mean_jitter_us: micros(jitter.map(|j| j.mean)),
        }
    }
}
