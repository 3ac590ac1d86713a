use std::fmt;

use serde::Serialize;

/// Progress of a call as inferred from its signalling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CallState {
    /// Nothing seen yet
    Start,
    /// Dialog-initial INVITE seen
    Initial,
    /// 100 Trying seen
    Trying,
    /// 180 Ringing or 183 Session Progress seen
    Ringing,
    /// INVITE answered with 2xx
    InCall,
    /// BYE seen
    Completed,
    /// INVITE answered with 3xx
    Redirect,
    /// INVITE refused by the callee (401, 403, 404, 407, 480, 486, 603)
    Rejected,
    /// INVITE answered with any other error
    Failed,
    /// CANCEL sent, waiting for the outcome
    Cancelling,
    /// 487 to the INVITE after CANCEL
    Cancelled,
}

impl CallState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CallState::Start => "START",
            CallState::Initial => "INITIAL",
            CallState::Trying => "TRYING",
            CallState::Ringing => "RINGING",
            CallState::InCall => "IN_CALL",
            CallState::Completed => "COMPLETED",
            CallState::Redirect => "REDIRECT",
            CallState::Rejected => "REJECTED",
            CallState::Failed => "FAILED",
            CallState::Cancelling => "CANCELLING",
            CallState::Cancelled => "CANCELLED",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallState::Completed
                | CallState::Redirect
                | CallState::Rejected
                | CallState::Failed
                | CallState::Cancelled
        )
    }

    /// INITIAL, TRYING or RINGING
    pub const fn is_provisional(&self) -> bool {
        matches!(self, CallState::Initial | CallState::Trying | CallState::Ringing)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
