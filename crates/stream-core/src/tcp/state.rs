use std::fmt;

use serde::Serialize;

/// TCP connection state as seen by a passive observer
///
/// Both directions are tracked together, so the teardown states name the
/// progress of each side: `CLOSED_1_CLOSING_2` means the side that sent the
/// first FIN has had it acknowledged while the other side's FIN is still
/// outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TcpState {
    Init,
    Handshake,
    Established,
    FinWait1,
    FinWait2,
    Closing1Closing2,
    Closed1Closing2,
    Closing1Closed2,
    Closed,
    ClosedPortsReused,
}

impl TcpState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TcpState::Init => "INIT",
            TcpState::Handshake => "HANDSHAKE",
            TcpState::Established => "ESTABLISHED",
            TcpState::FinWait1 => "FIN_WAIT_1",
            TcpState::FinWait2 => "FIN_WAIT_2",
            TcpState::Closing1Closing2 => "CLOSING_1_CLOSING_2",
            TcpState::Closed1Closing2 => "CLOSED_1_CLOSING_2",
            TcpState::Closing1Closed2 => "CLOSING_1_CLOSED_2",
            TcpState::Closed => "CLOSED",
            TcpState::ClosedPortsReused => "CLOSED_PORTS_REUSED",
        }
    }

    /// The connection is over
    pub const fn is_terminal(&self) -> bool {
        matches!(self, TcpState::Closed | TcpState::ClosedPortsReused)
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
