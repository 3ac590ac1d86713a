use std::time::Duration;

use bytes::Bytes;
use pktflow_packet_core::{SipMessage, Timestamp};
use tracing::{info, trace};

use super::call_state::CallState;
use super::state_machine::CallStateMachine;
use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::key::{CallId, StreamId};
use crate::stream::{Disposition, PacketLog, Stream, Transition};

/// One reconstructed SIP dialog
///
/// Messages are kept in timestamp order. A message that arrives with a
/// timestamp earlier than the latest retained one re-drives the state
/// machine: it is reset and every retained message is replayed in order, so
/// the final state does not depend on the order the capture delivered them
/// in.
#[derive(Debug)]
pub struct SipDialogStream {
    id: StreamId,
    key: CallId,
    fsm: CallStateMachine,
    packets: PacketLog<SipMessage>,
    reuse_on_new_invite: bool,
    errors: Vec<StreamError>,
    redrives: u64,
}

impl SipDialogStream {
    pub fn state(&self) -> CallState {
        self.fsm.state()
    }

    pub fn transitions(&self) -> &[Transition<CallState>] {
        self.fsm.transitions()
    }

    /// An ACK was seen
    pub fn handshake_complete(&self) -> bool {
        self.fsm.handshake_complete()
    }

    /// A duplicate INVITE or a repeated 2xx was seen
    pub fn retransmissions_detected(&self) -> bool {
        self.fsm.retransmissions_detected()
    }

    /// How many times an out-of-order message forced a replay
    pub fn redrives(&self) -> u64 {
        self.redrives
    }

    /// Post-dial delay: first packet to the first ringing response, or to
    /// the answer when the callee never rang
    ///
    /// `None` when neither was seen or when it coincides with the first
    /// packet.
    pub fn post_dial_delay(&self) -> Option<Duration> {
        let reference = self.fsm.ringing().or(self.fsm.success())?;
        self.since_first_packet(reference.arrival())
    }

    /// First packet to the first BYE
    pub fn call_duration(&self) -> Option<Duration> {
        let bye = self.fsm.bye()?;
        self.since_first_packet(bye.arrival())
    }

    /// SDP offer carried by the dialog-initial INVITE
    pub fn invite_sdp(&self) -> Option<&Bytes> {
        self.fsm.invite().and_then(|m| m.sdp())
    }

    /// SDP answer carried by the first 2xx to the INVITE
    pub fn ok_sdp(&self) -> Option<&Bytes> {
        self.fsm.success().and_then(|m| m.sdp())
    }

    /// The dialog-initial INVITE, if captured
    pub fn initial_invite(&self) -> Option<&SipMessage> {
        self.fsm.invite()
    }

    fn since_first_packet(&self, at: Timestamp) -> Option<Duration> {
        let first = self.packets.first_time()?;
        at.checked_duration_since(first).filter(|d| !d.is_zero())
    }

    /// A fresh dialog-initial INVITE on a Call-ID whose dialog has ended
    fn starts_new_dialog(&self, msg: &SipMessage) -> bool {
        if !self.reuse_on_new_invite || !self.fsm.state().is_terminal() {
            return false;
        }
        if !(msg.is_request() && msg.is_invite() && msg.is_initial()) {
            return false;
        }

        let first = self.fsm.invite().and_then(|m| m.cseq().ok());
        match (first, msg.cseq().ok()) {
            (Some(first), Some(cseq)) => cseq.seq > first.seq,
            _ => self.packets.last_time().is_some_and(|last| msg.arrival() > last),
        }
    }

    fn redrive(&mut self) {
        self.redrives += 1;
        info!(
            call_id = %self.key,
            messages = self.packets.len(),
            "out-of-order message, re-driving call state"
        );

        self.fsm.reset();
        for msg in self.packets.iter() {
            match self.fsm.on_message(msg) {
                Ok(_) => {}
                Err(StreamError::Packet(source)) => self.errors.push(StreamError::Replay {
                    stream: self.key.to_string(),
                    source,
                }),
                // already reported when the message was first seen
                Err(e @ StreamError::Transition { .. }) => trace!(error = %e, "replay"),
                Err(e) => self.errors.push(e),
            }
        }
    }
}

impl Stream for SipDialogStream {
    type Packet = SipMessage;
    type Key = CallId;

    const PROTOCOL: &'static str = "sip";

    fn key_for(msg: &SipMessage) -> StreamResult<CallId> {
        msg.call_id()
            .map(|id| CallId::new(id.clone()))
            .map_err(|source| StreamError::Keying {
                protocol: Self::PROTOCOL,
                source,
            })
    }

    fn create(id: StreamId, key: CallId, config: &StreamConfig) -> Self {
        Self {
            id,
            fsm: CallStateMachine::new(key.to_string()),
            key,
            packets: PacketLog::new(),
            reuse_on_new_invite: config.sip.reuse_on_new_invite,
            errors: Vec::new(),
            redrives: 0,
        }
    }

    fn id(&self) -> StreamId {
        self.id
    }

    fn key(&self) -> &CallId {
        &self.key
    }

    fn add_packet(&mut self, msg: SipMessage) -> Disposition<SipMessage> {
        if self.starts_new_dialog(&msg) {
            return Disposition::Reused(msg);
        }

        let out_of_order = self.packets.last_time().is_some_and(|last| msg.arrival() < last);
        if out_of_order {
            self.packets.insert(msg);
            self.redrive();
        } else {
            if let Err(e) = self.fsm.on_message(&msg) {
                self.errors.push(e);
            }
            self.packets.insert(msg);
        }
        Disposition::Accepted
    }

    fn is_ended(&self) -> bool {
        self.fsm.state().is_terminal()
    }

    fn state_name(&self) -> &'static str {
        self.fsm.state().as_str()
    }

    fn packets(&self) -> Vec<&SipMessage> {
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

    fn drain_errors(&mut self) -> Vec<StreamError> {
        std::mem::take(&mut self.errors)
    }
}
