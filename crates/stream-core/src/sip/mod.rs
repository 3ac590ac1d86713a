//! SIP dialog tracking
//!
//! - [`CallState`]: call states
//! - [`CallStateMachine`]: the transition rules
//! - [`SipDialogStream`]: a dialog with out-of-order recovery and call metrics
//! - [`LightSipStream`]: arrival-order stream with timing metrics only
//! - [`SipStatistics`]: per-method and per-status counters

pub mod call_state;
pub mod dialog_stream;
pub mod light_stream;
pub mod state_machine;
pub mod statistics;

pub use call_state::CallState;
pub use dialog_stream::SipDialogStream;
pub use light_stream::LightSipStream;
pub use state_machine::CallStateMachine;
pub use statistics::SipStatistics;
