use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use bytes::Bytes;

use crate::sip::{SipMessage, StartLine};
use crate::types::{CSeq, Method, StatusCode, Timestamp};

const DEFAULT_SOURCE: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 5060);
const DEFAULT_DESTINATION: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2)), 5060);

/// Builder for [`SipMessage`]
///
/// Headers that are not set are omitted from the rendering, which makes it
/// easy to produce the broken messages real captures contain.
#[derive(Debug, Clone)]
pub struct SipMessageBuilder {
    arrival: Timestamp,
    source: SocketAddr,
    destination: SocketAddr,
    start_line: StartLine,
    call_id: Option<Bytes>,
    from_tag: Option<String>,
    to_tag: Option<String>,
    cseq: Option<CSeq>,
    content_type: Option<String>,
    body: Bytes,
}

impl SipMessageBuilder {
    fn with_start_line(start_line: StartLine) -> Self {
        Self {
            arrival: Timestamp::EPOCH,
            source: DEFAULT_SOURCE,
            destination: DEFAULT_DESTINATION,
            start_line,
            call_id: None,
            from_tag: None,
            to_tag: None,
            cseq: None,
            content_type: None,
            body: Bytes::new(),
        }
    }

    /// Start a request
    pub fn request(method: Method, uri: impl Into<String>) -> Self {
        Self::with_start_line(StartLine::Request {
            method,
            uri: uri.into(),
        })
    }

    /// Start a response with the standard reason phrase
    pub fn response(status: StatusCode) -> Self {
        Self::with_start_line(StartLine::Response {
            status,
            reason: status.reason_phrase().to_string(),
        })
    }

    /// Override the reason phrase of a response
    pub fn reason(mut self, text: impl Into<String>) -> Self {
        if let StartLine::Response { reason, .. } = &mut self.start_line {
            *reason = text.into();
        }
        self
    }

    pub fn at(mut self, arrival: Timestamp) -> Self {
        self.arrival = arrival;
        self
    }

    pub fn source(mut self, source: SocketAddr) -> Self {
        self.source = source;
        self
    }

    pub fn destination(mut self, destination: SocketAddr) -> Self {
        self.destination = destination;
        self
    }

    pub fn call_id(mut self, call_id: impl Into<Bytes>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    pub fn from_tag(mut self, tag: impl Into<String>) -> Self {
        self.from_tag = Some(tag.into());
        self
    }

    pub fn to_tag(mut self, tag: impl Into<String>) -> Self {
        self.to_tag = Some(tag.into());
        self
    }

    pub fn cseq(mut self, seq: u32, method: Method) -> Self {
        self.cseq = Some(CSeq::new(seq, method));
        self
    }

    pub fn body(mut self, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = body.into();
        self
    }

    pub fn build(self) -> SipMessage {
        let raw = self.render();
        SipMessage {
            arrival: self.arrival,
            source: self.source,
            destination: self.destination,
            start_line: self.start_line,
            call_id: self.call_id,
            from_tag: self.from_tag,
            to_tag: self.to_tag,
            cseq: self.cseq,
            content_type: self.content_type,
            body: self.body,
            raw,
        }
    }

    fn render(&self) -> Bytes {
        let mut text = String::with_capacity(256 + self.body.len());
        // write! into a String cannot fail
        let _ = write!(text, "{}\r\n", self.start_line);
        let _ = write!(text, "Via: SIP/2.0/UDP {}\r\n", self.source);
        match &self.from_tag {
            Some(tag) => {
                let _ = write!(text, "From: <sip:{}>;tag={}\r\n", self.source, tag);
            }
            None => {
                let _ = write!(text, "From: <sip:{}>\r\n", self.source);
            }
        }
        match &self.to_tag {
            Some(tag) => {
                let _ = write!(text, "To: <sip:{}>;tag={}\r\n", self.destination, tag);
            }
            None => {
                let _ = write!(text, "To: <sip:{}>\r\n", self.destination);
            }
        }
        if let Some(call_id) = &self.call_id {
            let _ = write!(text, "Call-ID: {}\r\n", String::from_utf8_lossy(call_id));
        }
        if let Some(cseq) = &self.cseq {
            let _ = write!(text, "CSeq: {}\r\n", cseq);
        }
        if let Some(content_type) = &self.content_type {
            let _ = write!(text, "Content-Type: {}\r\n", content_type);
        }
        let _ = write!(text, "Content-Length: {}\r\n\r\n", self.body.len());

        let mut raw = text.into_bytes();
        raw.extend_from_slice(&self.body);
        Bytes::from(raw)
    }
}
