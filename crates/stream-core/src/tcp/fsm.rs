//! TCP connection state machine
//!
//! Driven by segments from both directions in capture order. The machine
//! never looks at timers: a connection only ends on RST, on the final ACK of
//! a FIN exchange, or when a new handshake takes over its ports.
//!
//! ```text
//!  INIT ──SYN──► HANDSHAKE ──ACK──► ESTABLISHED ──FIN(1)──► FIN_WAIT_1
//!                 │   ▲ SYN/ACK                               │   │
//!                 └───┘                              ACK(1)   │   │ FIN(2)
//!                                                     ┌───────┘   └────────┐
//!                                                     ▼                    ▼
//!                                                FIN_WAIT_2      CLOSING_1_CLOSING_2
//!                                                     │ FIN(2)     │ACK(1)     │ACK(2)
//!                                                     ▼            ▼           ▼
//!                                            CLOSED_1_CLOSING_2 ◄──┘  CLOSING_1_CLOSED_2
//!                                                     │ ACK(2)                 │ ACK(1)
//!                                                     └──────────► CLOSED ◄────┘
//!
//!  any state ──RST──► CLOSED
//!  any state but INIT ──new SYN──► CLOSED_PORTS_REUSED
//!
//!  In HANDSHAKE only the first SYN from the responder is part of the
//!  handshake; a SYN with a fresh sequence number from the initiator, or a
//!  second responder SYN, starts a new connection.
//! ```

use pktflow_packet_core::{FlowId, TcpSegment};
use tracing::debug;

use super::state::TcpState;
use crate::stream::Transition;

/// `a < b` in 32-bit serial number arithmetic (RFC 1982)
pub(crate) fn seq_lt(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// `a >= b` in 32-bit serial number arithmetic
pub(crate) fn seq_ge(a: u32, b: u32) -> bool {
    !seq_lt(a, b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SynMarker {
    flow: FlowId,
    sequence: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FinMarker {
    flow: FlowId,
    /// Lowest acknowledgement number that covers the FIN
    acked_by: u32,
}

impl FinMarker {
    fn of(segment: &TcpSegment) -> Self {
        let len = segment.payload().len() as u32;
        Self {
            flow: segment.flow(),
            acked_by: segment.sequence().wrapping_add(len).wrapping_add(1),
        }
    }

    fn is_acked_by(&self, segment: &TcpSegment) -> bool {
        segment.flags().is_ack()
            && segment.flow() == self.flow.reversed()
            && seq_ge(segment.acknowledgement(), self.acked_by)
    }
}

/// State machine of one TCP connection
#[derive(Debug, Clone)]
pub struct TcpStateMachine {
    state: TcpState,
    transitions: Vec<Transition<TcpState>>,
    syn1: Option<SynMarker>,
    syn2: Option<SynMarker>,
    fin1: Option<FinMarker>,
    fin2: Option<FinMarker>,
    reset: bool,
}

impl Default for TcpStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpStateMachine {
    pub fn new() -> Self {
        Self {
            state: TcpState::Init,
            transitions: Vec::new(),
            syn1: None,
            syn2: None,
            fin1: None,
            fin2: None,
            reset: false,
        }
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    /// Recorded state changes, oldest first
    pub fn transitions(&self) -> &[Transition<TcpState>] {
        &self.transitions
    }

    /// The connection was torn down by a RST
    pub fn was_reset(&self) -> bool {
        self.reset
    }

    /// Feed one segment and return the resulting state
    pub fn on_segment(&mut self, segment: &TcpSegment) -> TcpState {
        let next = self.next_state(segment);
        if next != self.state {
            debug!(
                "{} -> {} on [{}] {}",
                self.state,
                next,
                segment.flags(),
                segment.flow()
            );
            self.transitions.push(Transition {
                from: self.state,
                to: next,
                at: segment.arrival(),
            });
            self.state = next;
        }
        next
    }

    fn next_state(&mut self, segment: &TcpSegment) -> TcpState {
        let flags = segment.flags();

        if self.state == TcpState::ClosedPortsReused {
            return TcpState::ClosedPortsReused;
        }

        if flags.is_rst() {
            if !self.state.is_terminal() {
                self.reset = true;
            }
            return TcpState::Closed;
        }

        match self.state {
            TcpState::Init => {
                if flags.is_syn() {
                    self.syn1 = Some(SynMarker {
                        flow: segment.flow(),
                        sequence: segment.sequence(),
                    });
                    TcpState::Handshake
                } else if flags.is_fin() {
                    self.fin1 = Some(FinMarker::of(segment));
                    TcpState::FinWait1
                } else {
                    // capture started mid-connection
                    TcpState::Established
                }
            }
            TcpState::Handshake => {
                if flags.is_syn() {
                    if self.is_duplicate_syn(segment) {
                        TcpState::Handshake
                    } else if self.is_syn_ack_slot(segment) {
                        self.syn2 = Some(SynMarker {
                            flow: segment.flow(),
                            sequence: segment.sequence(),
                        });
                        TcpState::Handshake
                    } else {
                        debug!("new SYN in {}, ports reused", self.state);
                        TcpState::ClosedPortsReused
                    }
                } else if flags.is_fin() {
                    self.fin1 = Some(FinMarker::of(segment));
                    TcpState::FinWait1
                } else {
                    TcpState::Established
                }
            }
            state if self.is_new_syn(segment) => {
                debug!("new SYN in {}, ports reused", state);
                TcpState::ClosedPortsReused
            }
            TcpState::Established => {
                if flags.is_fin() {
                    self.fin1 = Some(FinMarker::of(segment));
                    TcpState::FinWait1
                } else {
                    TcpState::Established
                }
            }
            TcpState::FinWait1 => {
                let acked = self.acks_fin1(segment);
                let second_fin = self.record_second_fin(segment);
                match (acked, second_fin) {
                    (true, true) => TcpState::Closed1Closing2,
                    (true, false) => TcpState::FinWait2,
                    (false, true) => TcpState::Closing1Closing2,
                    (false, false) => TcpState::FinWait1,
                }
            }
            TcpState::FinWait2 => {
                if self.record_second_fin(segment) {
                    TcpState::Closed1Closing2
                } else {
                    TcpState::FinWait2
                }
            }
            TcpState::Closing1Closing2 => {
                if self.acks_fin1(segment) {
                    TcpState::Closed1Closing2
                } else if self.acks_fin2(segment) {
                    TcpState::Closing1Closed2
                } else {
                    TcpState::Closing1Closing2
                }
            }
            TcpState::Closed1Closing2 => {
                if self.acks_fin2(segment) {
                    TcpState::Closed
                } else {
                    TcpState::Closed1Closing2
                }
            }
            TcpState::Closing1Closed2 => {
                if self.acks_fin1(segment) {
                    TcpState::Closed
                } else {
                    TcpState::Closing1Closed2
                }
            }
            TcpState::Closed => TcpState::Closed,
            TcpState::ClosedPortsReused => TcpState::ClosedPortsReused,
        }
    }

    fn is_duplicate_syn(&self, segment: &TcpSegment) -> bool {
        let marker = SynMarker {
            flow: segment.flow(),
            sequence: segment.sequence(),
        };
        self.syn1 == Some(marker) || self.syn2 == Some(marker)
    }

    /// The responder's SYN/ACK: opposite direction to the first SYN, none recorded yet
    fn is_syn_ack_slot(&self, segment: &TcpSegment) -> bool {
        self.syn2.is_none()
            && self
                .syn1
                .is_some_and(|syn1| segment.flow() == syn1.flow.reversed())
    }

    fn is_new_syn(&self, segment: &TcpSegment) -> bool {
        segment.flags().is_syn() && !self.is_duplicate_syn(segment)
    }

    fn acks_fin1(&self, segment: &TcpSegment) -> bool {
        self.fin1.is_some_and(|fin| fin.is_acked_by(segment))
    }

    fn acks_fin2(&self, segment: &TcpSegment) -> bool {
        self.fin2.is_some_and(|fin| fin.is_acked_by(segment))
    }

    /// Is this the other side's FIN; remembers the first one seen
    fn record_second_fin(&mut self, segment: &TcpSegment) -> bool {
        let Some(fin1) = self.fin1 else {
            return false;
        };
        if !segment.flags().is_fin() || segment.flow() != fin1.flow.reversed() {
            return false;
        }
        if self.fin2.is_none() {
            self.fin2 = Some(FinMarker::of(segment));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pktflow_packet_core::{TcpFlags, TcpSegmentBuilder, Timestamp};

    const A: &str = "10.0.0.1:40000";
    const B: &str = "10.0.0.2:80";

    fn seg(from: &str, to: &str, flags: TcpFlags, seq: u32, ack: u32) -> TcpSegment {
        TcpSegmentBuilder::new(from.parse().unwrap(), to.parse().unwrap())
            .flags(flags)
            .sequence(seq)
            .acknowledgement(ack)
            .at(Timestamp::from_micros(seq as u64))
            .build()
    }

    fn established() -> TcpStateMachine {
        let mut fsm = TcpStateMachine::new();
        fsm.on_segment(&seg(A, B, TcpFlags::SYN, 100, 0));
        fsm.on_segment(&seg(B, A, TcpFlags::SYN | TcpFlags::ACK, 500, 101));
        fsm.on_segment(&seg(A, B, TcpFlags::ACK, 101, 501));
        fsm
    }

    #[test]
    fn test_serial_arithmetic() {
        assert!(seq_lt(1, 2));
        assert!(seq_lt(u32::MAX, 0));
        assert!(!seq_lt(0, u32::MAX));
        assert!(seq_ge(5, 5));
    }

    #[test]
    fn test_handshake() {
        let fsm = established();
        assert_eq!(fsm.state(), TcpState::Established);
        let states: Vec<_> = fsm.transitions().iter().map(|t| t.to).collect();
        assert_eq!(states, vec![TcpState::Handshake, TcpState::Established]);
    }

    #[test]
    fn test_duplicate_syn_ack_stays_in_handshake() {
        let mut fsm = TcpStateMachine::new();
        fsm.on_segment(&seg(A, B, TcpFlags::SYN, 100, 0));
        fsm.on_segment(&seg(B, A, TcpFlags::SYN | TcpFlags::ACK, 500, 101));
        fsm.on_segment(&seg(B, A, TcpFlags::SYN | TcpFlags::ACK, 500, 101));
        fsm.on_segment(&seg(A, B, TcpFlags::SYN, 100, 0));
        assert_eq!(fsm.state(), TcpState::Handshake);
        assert_eq!(fsm.transitions().len(), 1);
    }

    #[test]
    fn test_new_syn_during_handshake_reuses_ports() {
        let mut fsm = TcpStateMachine::new();
        fsm.on_segment(&seg(A, B, TcpFlags::SYN, 100, 0));
        fsm.on_segment(&seg(B, A, TcpFlags::SYN | TcpFlags::ACK, 500, 101));
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::SYN, 77777, 0)), TcpState::ClosedPortsReused);

        // a second initiator SYN never takes the SYN/ACK slot
        let mut fsm = TcpStateMachine::new();
        fsm.on_segment(&seg(A, B, TcpFlags::SYN, 100, 0));
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::SYN, 200, 0)), TcpState::ClosedPortsReused);

        // nor does a second, different SYN/ACK
        let mut fsm = TcpStateMachine::new();
        fsm.on_segment(&seg(A, B, TcpFlags::SYN, 100, 0));
        fsm.on_segment(&seg(B, A, TcpFlags::SYN | TcpFlags::ACK, 500, 101));
        assert_eq!(
            fsm.on_segment(&seg(B, A, TcpFlags::SYN | TcpFlags::ACK, 600, 101)),
            TcpState::ClosedPortsReused
        );
    }

    #[test]
    fn test_retransmitted_syn_ack_after_established() {
        let mut fsm = established();
        assert_eq!(
            fsm.on_segment(&seg(B, A, TcpFlags::SYN | TcpFlags::ACK, 500, 101)),
            TcpState::Established
        );
        assert_eq!(fsm.transitions().len(), 2);
    }

    #[test]
    fn test_orderly_close() {
        let mut fsm = established();
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::FIN | TcpFlags::ACK, 101, 501)), TcpState::FinWait1);
        // data ACK below the FIN does not count
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::ACK, 501, 101)), TcpState::FinWait1);
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::ACK, 501, 102)), TcpState::FinWait2);
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::FIN | TcpFlags::ACK, 501, 102)), TcpState::Closed1Closing2);
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::ACK, 102, 502)), TcpState::Closed);
        assert!(!fsm.was_reset());
    }

    #[test]
    fn test_fin_ack_combined() {
        let mut fsm = established();
        fsm.on_segment(&seg(A, B, TcpFlags::FIN | TcpFlags::ACK, 101, 501));
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::FIN | TcpFlags::ACK, 501, 102)), TcpState::Closed1Closing2);
    }

    #[test]
    fn test_simultaneous_close_either_side_first() {
        let mut fsm = established();
        fsm.on_segment(&seg(A, B, TcpFlags::FIN, 101, 501));
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::FIN, 501, 101)), TcpState::Closing1Closing2);
        // second side's FIN is acknowledged first
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::ACK, 102, 502)), TcpState::Closing1Closed2);
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::ACK, 502, 102)), TcpState::Closed);
    }

    #[test]
    fn test_fin_with_payload_needs_ack_past_payload() {
        let mut fsm = established();
        let fin = TcpSegmentBuilder::new(A.parse().unwrap(), B.parse().unwrap())
            .flags(TcpFlags::FIN | TcpFlags::ACK)
            .sequence(101)
            .acknowledgement(501)
            .payload(&b"bye"[..])
            .build();
        fsm.on_segment(&fin);
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::ACK, 501, 104)), TcpState::FinWait1);
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::ACK, 501, 105)), TcpState::FinWait2);
    }

    #[test]
    fn test_rst_from_any_state() {
        let mut fsm = TcpStateMachine::new();
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::RST, 1, 0)), TcpState::Closed);
        assert!(fsm.was_reset());

        let mut fsm = TcpStateMachine::new();
        fsm.on_segment(&seg(A, B, TcpFlags::SYN, 100, 0));
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::RST | TcpFlags::ACK, 0, 101)), TcpState::Closed);

        let mut fsm = established();
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::RST, 501, 0)), TcpState::Closed);
        // stray RST after close changes nothing
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::RST, 101, 0)), TcpState::Closed);
        assert_eq!(fsm.transitions().len(), 3);
    }

    #[test]
    fn test_new_syn_reuses_ports() {
        let mut fsm = established();
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::SYN, 100, 0)), TcpState::Established);
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::SYN, 9000, 0)), TcpState::ClosedPortsReused);
        // final: nothing leaves it
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::RST, 9001, 0)), TcpState::ClosedPortsReused);
    }

    #[test]
    fn test_closed_accepts_retransmissions() {
        let mut fsm = established();
        fsm.on_segment(&seg(A, B, TcpFlags::RST, 101, 0));
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::ACK, 501, 101)), TcpState::Closed);
        assert_eq!(fsm.on_segment(&seg(B, A, TcpFlags::SYN | TcpFlags::ACK, 500, 101)), TcpState::Closed);
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::SYN, 7, 0)), TcpState::ClosedPortsReused);
    }

    #[test]
    fn test_mid_connection_start() {
        let mut fsm = TcpStateMachine::new();
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::ACK, 5000, 9000)), TcpState::Established);

        let mut fsm = TcpStateMachine::new();
        assert_eq!(fsm.on_segment(&seg(A, B, TcpFlags::FIN | TcpFlags::ACK, 5000, 9000)), TcpState::FinWait1);
    }
}
