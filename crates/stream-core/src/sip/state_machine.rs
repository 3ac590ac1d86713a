//! SIP call state machine
//!
//! A deliberately simple model of an INVITE dialog keyed by Call-ID only.
//! Each message is classified by its method (for responses: the CSeq
//! method) and status code; there is no branch or tag matching.
//!
//! ```text
//!                ┌──────────── CANCEL ─────────────┐
//!                │                                 ▼
//!  START ─► INITIAL ─► TRYING ─► RINGING ─┬─► CANCELLING ─487─► CANCELLED
//!    │         (provisional states)       │        │
//!    │                                    │       2xx
//!    │                                    ▼        ▼
//!    │                  3xx ◄── final ──► IN_CALL ─BYE─► COMPLETED
//!    │               REDIRECT   4xx-6xx
//!    │                          REJECTED / FAILED
//!    └─► entry inferred from the first message when the capture
//!        starts mid-dialog (ACK ► IN_CALL, BYE ► COMPLETED, ...)
//! ```
//!
//! Only real changes are recorded as transitions; a message that
//! re-confirms the current state leaves the history untouched.

use pktflow_packet_core::{Method, SipMessage, StatusCode};
use tracing::{debug, trace};

use super::call_state::CallState;
use crate::error::{StreamError, StreamResult};
use crate::stream::Transition;

/// Final responses that mean the callee refused the call
const REJECTED_CODES: [u16; 7] = [401, 403, 404, 407, 480, 486, 603];

fn is_rejection(status: StatusCode) -> bool {
    REJECTED_CODES.contains(&status.as_u16())
}

/// State machine of one call
#[derive(Debug, Clone)]
pub struct CallStateMachine {
    label: String,
    state: CallState,
    transitions: Vec<Transition<CallState>>,
    invite: Option<SipMessage>,
    ringing: Option<SipMessage>,
    success: Option<SipMessage>,
    bye: Option<SipMessage>,
    handshake_complete: bool,
    retransmissions_detected: bool,
}

impl CallStateMachine {
    /// `label` names the call in logs and errors, normally its Call-ID
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: CallState::Start,
            transitions: Vec::new(),
            invite: None,
            ringing: None,
            success: None,
            bye: None,
            handshake_complete: false,
            retransmissions_detected: false,
        }
    }

    /// Forget everything, back to START
    pub fn reset(&mut self) {
        let label = std::mem::take(&mut self.label);
        *self = Self::new(label);
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn transitions(&self) -> &[Transition<CallState>] {
        &self.transitions
    }

    /// First dialog-initial INVITE request
    pub fn invite(&self) -> Option<&SipMessage> {
        self.invite.as_ref()
    }

    /// First 180/183 response to the INVITE
    pub fn ringing(&self) -> Option<&SipMessage> {
        self.ringing.as_ref()
    }

    /// First 2xx response to the INVITE
    pub fn success(&self) -> Option<&SipMessage> {
        self.success.as_ref()
    }

    /// First BYE request
    pub fn bye(&self) -> Option<&SipMessage> {
        self.bye.as_ref()
    }

    /// An ACK completed the INVITE transaction
    pub fn handshake_complete(&self) -> bool {
        self.handshake_complete
    }

    /// A duplicate INVITE or a repeated 2xx was observed
    pub fn retransmissions_detected(&self) -> bool {
        self.retransmissions_detected
    }

    /// Feed one message and return the resulting state
    ///
    /// Fails with [`StreamError::Packet`] when the message cannot be
    /// classified (a response without CSeq) and with
    /// [`StreamError::Transition`] when no rule of the current state
    /// matches. In both cases the state is unchanged.
    pub fn on_message(&mut self, msg: &SipMessage) -> StreamResult<CallState> {
        let method = msg.method()?.clone();

        if msg.is_request() && method == Method::Invite && msg.is_initial() {
            self.note_initial_invite(msg);
        }

        let next = match self.state {
            CallState::Start => self.on_start(msg, &method),
            CallState::Initial | CallState::Trying | CallState::Ringing => self.in_provisional(msg, &method),
            CallState::InCall => self.in_call(msg, &method),
            CallState::Completed => self.in_completed(&method),
            CallState::Cancelling => self.in_cancelling(msg, &method),
            CallState::Redirect | CallState::Rejected | CallState::Failed | CallState::Cancelled => {
                // terminal, trailing messages only confirm it
                if msg.is_request() && method == Method::Ack {
                    self.handshake_complete = true;
                }
                Some(self.state)
            }
        };

        match next {
            Some(next) => {
                self.transition(next, msg);
                Ok(next)
            }
            None => Err(StreamError::Transition {
                stream: self.label.clone(),
                state: self.state.as_str(),
                event: msg.summary(),
            }),
        }
    }

    fn note_initial_invite(&mut self, msg: &SipMessage) {
        match &self.invite {
            None => self.invite = Some(msg.clone()),
            Some(first) => {
                if first.cseq().ok() == msg.cseq().ok() {
                    self.retransmissions_detected = true;
                }
            }
        }
    }

    fn on_start(&mut self, msg: &SipMessage, method: &Method) -> Option<CallState> {
        if msg.is_request() {
            return match method {
                Method::Invite if msg.is_initial() => Some(CallState::Initial),
                Method::Ack => {
                    self.handshake_complete = true;
                    Some(CallState::InCall)
                }
                Method::Bye => {
                    self.record_bye(msg);
                    Some(CallState::Completed)
                }
                _ => None,
            };
        }

        let status = msg.status().ok()?;
        match method {
            Method::Invite if status.is_trying() => Some(CallState::Trying),
            Method::Invite if status.is_ringing() => {
                self.record_ringing(msg);
                Some(CallState::Ringing)
            }
            Method::Invite if status.is_provisional() => Some(CallState::Trying),
            Method::Invite if status.is_success() => {
                self.record_success(msg);
                Some(CallState::InCall)
            }
            Method::Bye => Some(CallState::Completed),
            _ => None,
        }
    }

    fn in_provisional(&mut self, msg: &SipMessage, method: &Method) -> Option<CallState> {
        if msg.is_request() {
            return match method {
                Method::Cancel => Some(CallState::Cancelling),
                // retransmission, or the same request captured at another hop
                _ => Some(self.state),
            };
        }

        let status = msg.status().ok()?;
        let next = if status.is_trying() {
            CallState::Trying
        } else if status.is_ringing() {
            self.record_ringing(msg);
            CallState::Ringing
        } else if status.is_provisional() {
            self.state
        } else if status.is_success() {
            if *method != Method::Invite {
                // 2xx to PRACK, UPDATE, CANCEL, ... does not answer the call
                return Some(self.state);
            }
            self.record_success(msg);
            CallState::InCall
        } else if status.is_redirection() {
            CallState::Redirect
        } else if is_rejection(status) {
            CallState::Rejected
        } else {
            CallState::Failed
        };
        Some(next)
    }

    fn in_call(&mut self, msg: &SipMessage, method: &Method) -> Option<CallState> {
        if msg.is_request() {
            return match method {
                Method::Bye => {
                    self.record_bye(msg);
                    Some(CallState::Completed)
                }
                Method::Ack => {
                    self.handshake_complete = true;
                    Some(CallState::InCall)
                }
                Method::Cancel => None,
                // in-dialog traffic (re-INVITE, INFO, UPDATE, ...)
                _ => Some(CallState::InCall),
            };
        }

        let status = msg.status().ok()?;
        if *method == Method::Invite && status.is_success() {
            self.retransmissions_detected = true;
        }
        Some(CallState::InCall)
    }

    fn in_completed(&mut self, method: &Method) -> Option<CallState> {
        match method {
            Method::Bye => Some(CallState::Completed),
            _ => None,
        }
    }

    fn in_cancelling(&mut self, msg: &SipMessage, method: &Method) -> Option<CallState> {
        if *method == Method::Cancel {
            return Some(CallState::Cancelling);
        }
        if msg.is_request() || *method != Method::Invite {
            return None;
        }

        let status = msg.status().ok()?;
        if status.as_u16() == 487 {
            Some(CallState::Cancelled)
        } else if status.is_success() {
            // the CANCEL lost the race with the answer
            self.record_success(msg);
            Some(CallState::InCall)
        } else if status.is_provisional() {
            Some(CallState::Cancelling)
        } else {
            None
        }
    }

    fn record_ringing(&mut self, msg: &SipMessage) {
        if self.ringing.is_none() {
            self.ringing = Some(msg.clone());
        }
    }

    fn record_success(&mut self, msg: &SipMessage) {
        if self.success.is_none() {
            self.success = Some(msg.clone());
        }
    }

    fn record_bye(&mut self, msg: &SipMessage) {
        if self.bye.is_none() {
            self.bye = Some(msg.clone());
        }
    }

    fn transition(&mut self, next: CallState, msg: &SipMessage) {
        let previous = self.state;
        if previous == next {
            trace!("[{}] {} confirmed by {}", self.label, previous, msg.summary());
            return;
        }
        debug!("[{}] {} -> {} Event: {}", self.label, previous, next, msg.summary());
        self.transitions.push(Transition {
            from: previous,
            to: next,
            at: msg.arrival(),
        });
        self.state = next;
    }
}
