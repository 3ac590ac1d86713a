//! TCP connection tracking
//!
//! - [`TcpState`]: connection states
//! - [`TcpStateMachine`]: the transition rules
//! - [`TcpStream`]: a connection's packets, state and counters

pub mod fsm;
pub mod state;
pub mod stream;

pub use fsm::TcpStateMachine;
pub use state::TcpState;
pub use stream::TcpStream;
