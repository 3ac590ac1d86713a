//! SIP message view
//!
//! A [`SipMessage`] holds the handful of fields the stream engine
//! classifies messages by, already extracted by the SIP grammar parser:
//! the start line, the raw Call-ID, the From/To tags, the CSeq and the body.
//! The full message text is kept in `raw` for re-serialization.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{PacketError, PacketResult};
use crate::types::{CSeq, Method, StatusCode, Timestamp};

/// First line of a SIP message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartLine {
    /// `METHOD Request-URI SIP/2.0`
    Request { method: Method, uri: String },
    /// `SIP/2.0 Status-Code Reason-Phrase`
    Response { status: StatusCode, reason: String },
}

impl fmt::Display for StartLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartLine::Request { method, uri } => write!(f, "{} {} SIP/2.0", method, uri),
            StartLine::Response { status, reason } => {
                write!(f, "SIP/2.0 {} {}", status.as_u16(), reason)
            }
        }
    }
}

/// A decoded SIP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipMessage {
    pub(crate) arrival: Timestamp,
    pub(crate) source: SocketAddr,
    pub(crate) destination: SocketAddr,
    pub(crate) start_line: StartLine,
    pub(crate) call_id: Option<Bytes>,
    pub(crate) from_tag: Option<String>,
    pub(crate) to_tag: Option<String>,
    pub(crate) cseq: Option<CSeq>,
    pub(crate) content_type: Option<String>,
    pub(crate) body: Bytes,
    pub(crate) raw: Bytes,
}

impl SipMessage {
    /// Arrival time of the frame carrying this message
    pub fn arrival(&self) -> Timestamp {
        self.arrival
    }

    pub fn source(&self) -> SocketAddr {
        self.source
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn start_line(&self) -> &StartLine {
        &self.start_line
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start_line, StartLine::Request { .. })
    }

    pub fn is_response(&self) -> bool {
        matches!(self.start_line, StartLine::Response { .. })
    }

    /// The Call-ID header value as an opaque byte sequence
    ///
    /// Fails when the header is absent or blank; such a message cannot be
    /// correlated with anything.
    pub fn call_id(&self) -> PacketResult<&Bytes> {
        let call_id = self
            .call_id
            .as_ref()
            .ok_or(PacketError::MissingHeader("Call-ID"))?;
        if call_id.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(PacketError::malformed("Call-ID", "empty value"));
        }
        Ok(call_id)
    }

    /// Method of a request, or the CSeq method a response answers
    pub fn method(&self) -> PacketResult<&Method> {
        match &self.start_line {
            StartLine::Request { method, .. } => Ok(method),
            StartLine::Response { .. } => self.cseq().map(|cseq| &cseq.method),
        }
    }

    /// Status code of a response
    pub fn status(&self) -> PacketResult<StatusCode> {
        match &self.start_line {
            StartLine::Response { status, .. } => Ok(*status),
            StartLine::Request { .. } => Err(PacketError::NotAResponse),
        }
    }

    /// Request-URI of a request
    pub fn request_uri(&self) -> PacketResult<&str> {
        match &self.start_line {
            StartLine::Request { uri, .. } => Ok(uri),
            StartLine::Response { .. } => Err(PacketError::NotARequest),
        }
    }

    pub fn cseq(&self) -> PacketResult<&CSeq> {
        self.cseq.as_ref().ok_or(PacketError::MissingHeader("CSeq"))
    }

    pub fn from_tag(&self) -> Option<&str> {
        self.from_tag.as_deref()
    }

    pub fn to_tag(&self) -> Option<&str> {
        self.to_tag.as_deref()
    }

    /// True when the To header carries no tag, i.e. the message was sent
    /// before a dialog existed
    pub fn is_initial(&self) -> bool {
        self.to_tag.is_none()
    }

    /// INVITE request or response to INVITE
    pub fn is_invite(&self) -> bool {
        self.is_method(&Method::Invite)
    }

    pub fn is_ack(&self) -> bool {
        self.is_method(&Method::Ack)
    }

    pub fn is_bye(&self) -> bool {
        self.is_method(&Method::Bye)
    }

    pub fn is_cancel(&self) -> bool {
        self.is_method(&Method::Cancel)
    }

    fn is_method(&self, method: &Method) -> bool {
        self.method().map(|m| m == method).unwrap_or(false)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body when it is a non-empty `application/sdp` payload
    pub fn sdp(&self) -> Option<&Bytes> {
        let is_sdp = self
            .content_type
            .as_deref()
            .map(|ct| {
                ct.split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .eq_ignore_ascii_case("application/sdp")
            })
            .unwrap_or(false);
        (is_sdp && !self.body.is_empty()).then_some(&self.body)
    }

    /// The complete message text as captured
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Write the original bytes out unmodified
    pub fn write<W: io::Write>(&self, out: &mut W) -> PacketResult<()> {
        out.write_all(&self.raw)?;
        Ok(())
    }

    /// One-line description for logs: request line or status line
    pub fn summary(&self) -> String {
        match &self.start_line {
            StartLine::Request { method, .. } => method.to_string(),
            StartLine::Response { status, .. } => match &self.cseq {
                Some(cseq) => format!("{} ({})", status.as_u16(), cseq.method),
                None => status.as_u16().to_string(),
            },
        }
    }
}

impl fmt::Display for SipMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.arrival, self.start_line)
    }
}
