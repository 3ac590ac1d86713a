use pktflow_packet_core::{FlowId, TcpSegment, Timestamp};
use tracing::trace;

use super::fsm::{TcpStateMachine, seq_lt};
use super::state::TcpState;
use crate::config::StreamConfig;
use crate::error::StreamResult;
use crate::key::{ConnectionKey, StreamId};
use crate::stream::{Disposition, PacketLog, Stream, Transition};

/// One reconstructed TCP connection
#[derive(Debug, Clone)]
pub struct TcpStream {
    id: StreamId,
    key: ConnectionKey,
    fsm: TcpStateMachine,
    packets: PacketLog<TcpSegment>,
    /// Lowest sequence number seen per direction
    base_sequences: Vec<(FlowId, u32)>,
    track_anomalies: bool,
    sequence_anomalies: u64,
}

impl TcpStream {
    pub fn state(&self) -> TcpState {
        self.fsm.state()
    }

    pub fn transitions(&self) -> &[Transition<TcpState>] {
        self.fsm.transitions()
    }

    /// The connection ended with a RST rather than a FIN exchange
    pub fn was_reset(&self) -> bool {
        self.fsm.was_reset()
    }

    /// A new handshake took over this connection's ports
    pub fn ports_reused(&self) -> bool {
        self.fsm.state() == TcpState::ClosedPortsReused
    }

    /// Segments whose sequence number was below their direction's base
    pub fn sequence_anomalies(&self) -> u64 {
        self.sequence_anomalies
    }

    fn observe_sequence(&mut self, segment: &TcpSegment) {
        let flow = segment.flow();
        match self.base_sequences.iter().find(|(f, _)| *f == flow) {
            None => self.base_sequences.push((flow, segment.sequence())),
            Some((_, base)) if seq_lt(segment.sequence(), *base) => {
                self.sequence_anomalies += 1;
                trace!(
                    stream = %self.id,
                    flow = %flow,
                    sequence = segment.sequence(),
                    base = *base,
                    "segment below base sequence"
                );
            }
            Some(_) => {}
        }
    }
}

impl Stream for TcpStream {
    type Packet = TcpSegment;
    type Key = ConnectionKey;

    const PROTOCOL: &'static str = "tcp";

    fn key_for(packet: &TcpSegment) -> StreamResult<ConnectionKey> {
        Ok(ConnectionKey::from(packet.flow()))
    }

    fn create(id: StreamId, key: ConnectionKey, config: &StreamConfig) -> Self {
        Self {
            id,
            key,
            fsm: TcpStateMachine::new(),
            packets: PacketLog::new(),
            base_sequences: Vec::with_capacity(2),
            track_anomalies: config.tcp.track_sequence_anomalies,
            sequence_anomalies: 0,
        }
    }

    fn id(&self) -> StreamId {
        self.id
    }

    fn key(&self) -> &ConnectionKey {
        &self.key
    }

    fn add_packet(&mut self, segment: TcpSegment) -> Disposition<TcpSegment> {
        let previous = self.fsm.state();
        let next = self.fsm.on_segment(&segment);
        if next == TcpState::ClosedPortsReused && previous != TcpState::ClosedPortsReused {
            // the SYN belongs to the connection that replaces this one
            return Disposition::Reused(segment);
        }

        if self.track_anomalies {
            self.observe_sequence(&segment);
        }
        self.packets.insert(segment);
        Disposition::Accepted
    }

    fn is_ended(&self) -> bool {
        self.fsm.state().is_terminal()
    }

    fn state_name(&self) -> &'static str {
        self.fsm.state().as_str()
    }

    fn packets(&self) -> Vec<&TcpSegment> {
        self.packets.iter().collect()
    }

    fn packet_count(&self) -> usize {
        self.packets.len()
    }

    fn time_of_first_packet(&self) -> Option<Timestamp> {
        self.packets.first_time()
    }

    fn time_of_last_packet(&self) -> Option<Timestamp> {
        self.packets.last_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pktflow_packet_core::{TcpFlags, TcpSegmentBuilder};
    use std::time::Duration;

    const A: &str = "192.168.1.10:51000";
    const B: &str = "192.168.1.20:5060";

    fn seg(from: &str, to: &str, flags: TcpFlags, seq: u32, ms: u64) -> TcpSegment {
        TcpSegmentBuilder::new(from.parse().unwrap(), to.parse().unwrap())
            .flags(flags)
            .sequence(seq)
            .at(Timestamp::from_millis(ms))
            .build()
    }

    fn stream() -> TcpStream {
        let key = ConnectionKey::new(A.parse().unwrap(), B.parse().unwrap());
        TcpStream::create(StreamId::new(1), key, &StreamConfig::default())
    }

    #[test]
    fn test_reusing_syn_is_handed_back() {
        let mut stream = stream();
        assert!(matches!(stream.add_packet(seg(A, B, TcpFlags::SYN, 10, 0)), Disposition::Accepted));
        assert!(matches!(stream.add_packet(seg(A, B, TcpFlags::ACK, 11, 5)), Disposition::Accepted));
        let reused = stream.add_packet(seg(A, B, TcpFlags::SYN, 90_000, 10));
        match reused {
            Disposition::Reused(syn) => assert_eq!(syn.sequence(), 90_000),
            Disposition::Accepted => panic!("expected reuse"),
        }
        assert!(stream.is_ended());
        assert!(stream.ports_reused());
        assert_eq!(stream.packet_count(), 2);
        assert_eq!(stream.state_name(), "CLOSED_PORTS_REUSED");
    }

    #[test]
    fn test_sequence_anomalies_are_counted_not_rejected() {
        let mut stream = stream();
        stream.add_packet(seg(A, B, TcpFlags::SYN, 1000, 0));
        stream.add_packet(seg(A, B, TcpFlags::ACK, 1001, 1));
        stream.add_packet(seg(A, B, TcpFlags::ACK, 900, 2));
        stream.add_packet(seg(B, A, TcpFlags::ACK, 5, 3));
        assert_eq!(stream.sequence_anomalies(), 1);
        assert_eq!(stream.packet_count(), 4);
        assert_eq!(stream.state(), TcpState::Established);

        let key = ConnectionKey::new(A.parse().unwrap(), B.parse().unwrap());
        let config = StreamConfig::default().with_sequence_anomalies(false);
        let mut quiet = TcpStream::create(StreamId::new(2), key, &config);
        quiet.add_packet(seg(A, B, TcpFlags::SYN, 1000, 0));
        quiet.add_packet(seg(A, B, TcpFlags::ACK, 900, 2));
        assert_eq!(quiet.sequence_anomalies(), 0);
    }

    #[test]
    fn test_timing_and_write() {
        let mut stream = stream();
        stream.add_packet(seg(A, B, TcpFlags::SYN, 1, 100));
        stream.add_packet(seg(B, A, TcpFlags::SYN | TcpFlags::ACK, 1, 150));
        stream.add_packet(seg(A, B, TcpFlags::ACK, 2, 130));

        assert_eq!(stream.time_of_first_packet(), Some(Timestamp::from_millis(100)));
        assert_eq!(stream.time_of_last_packet(), Some(Timestamp::from_millis(150)));
        assert_eq!(stream.duration(), Some(Duration::from_millis(50)));

        let mut out = Vec::new();
        stream.write(&mut out).unwrap();
        assert_eq!(out.len(), 3 * 20);
    }
}
