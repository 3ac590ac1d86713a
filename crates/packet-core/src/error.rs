//! Error types for packet-core
//!
//! Raised when a field needed by the stream engine cannot be extracted from
//! an already decoded packet (missing or malformed header, wrong message
//! kind) or when re-serializing a packet fails.

use thiserror::Error;

/// Result type for packet accessors
pub type PacketResult<T> = std::result::Result<T, PacketError>;

/// Errors raised while reading fields out of a decoded packet
#[derive(Error, Debug)]
pub enum PacketError {
    /// A header the caller asked for is not present
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// A header is present but its value cannot be used
    #[error("Malformed {header} header: {reason}")]
    MalformedHeader {
        header: &'static str,
        reason: String,
    },

    /// Status code outside the 100-699 range
    #[error("Invalid status code: {0}")]
    InvalidStatus(u16),

    /// Method token could not be parsed
    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    /// Operation only valid on requests
    #[error("Not a request")]
    NotARequest,

    /// Operation only valid on responses
    #[error("Not a response")]
    NotAResponse,

    /// Fewer bytes than the header needs
    #[error("Truncated {protocol} packet: need {needed} bytes, have {available}")]
    Truncated {
        protocol: &'static str,
        needed: usize,
        available: usize,
    },

    /// Version field this decoder does not handle
    #[error("Unsupported {protocol} version {version}")]
    UnsupportedVersion { protocol: &'static str, version: u8 },

    /// Writing the raw bytes out failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PacketError {
    /// Create a malformed-header error
    pub fn malformed(header: &'static str, reason: impl Into<String>) -> Self {
        PacketError::MalformedHeader {
            header,
            reason: reason.into(),
        }
    }
}
