//! # SIP Status Codes
//!
//! Status codes as defined in
//! [RFC 3261 Section 21](https://datatracker.ietf.org/doc/html/rfc3261#section-21).
//!
//! - `1xx`: Provisional
//! - `2xx`: Success
//! - `3xx`: Redirection
//! - `4xx`: Client Error
//! - `5xx`: Server Error
//! - `6xx`: Global Failure
//!
//! Captures contain whatever the endpoints sent, so any code in the
//! 100-699 range is accepted; codes without a named variant are kept as
//! [`StatusCode::Custom`].
//!
//! ```rust
//! use pktflow_packet_core::StatusCode;
//!
//! let status = StatusCode::from_u16(183).unwrap();
//! assert_eq!(status, StatusCode::SessionProgress);
//! assert!(status.is_ringing());
//!
//! let status = StatusCode::from_u16(499).unwrap();
//! assert_eq!(status, StatusCode::Custom(499));
//! assert!(status.is_client_error());
//!
//! assert!(StatusCode::from_u16(99).is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PacketError, PacketResult};

/// SIP status codes as defined in RFC 3261 and extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum StatusCode {
    // 1xx: Provisional
    /// 100 Trying
    Trying,
    /// 180 Ringing
    Ringing,
    /// 181 Call Is Being Forwarded
    CallIsBeingForwarded,
    /// 182 Queued
    Queued,
    /// 183 Session Progress
    SessionProgress,

    // 2xx: Success
    /// 200 OK
    Ok,
    /// 202 Accepted
    Accepted,

    // 3xx: Redirection
    /// 300 Multiple Choices
    MultipleChoices,
    /// 301 Moved Permanently
    MovedPermanently,
    /// 302 Moved Temporarily
    MovedTemporarily,

    // 4xx: Client Error
    /// 400 Bad Request
    BadRequest,
    /// 401 Unauthorized
    Unauthorized,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 407 Proxy Authentication Required
    ProxyAuthenticationRequired,
    /// 408 Request Timeout
    RequestTimeout,
    /// 480 Temporarily Unavailable
    TemporarilyUnavailable,
    /// 481 Call/Transaction Does Not Exist
    CallOrTransactionDoesNotExist,
    /// 486 Busy Here
    BusyHere,
    /// 487 Request Terminated
    RequestTerminated,
    /// 488 Not Acceptable Here
    NotAcceptableHere,

    // 5xx: Server Error
    /// 500 Server Internal Error
    ServerInternalError,
    /// 503 Service Unavailable
    ServiceUnavailable,

    // 6xx: Global Failure
    /// 600 Busy Everywhere
    BusyEverywhere,
    /// 603 Decline
    Decline,

    /// Any other code in the 100-699 range
    Custom(u16),
}

impl StatusCode {
    /// Creates a status code from a raw u16 value
    ///
    /// Known codes map to their named variant, other codes in the valid
    /// range map to [`StatusCode::Custom`], anything else is an error.
    pub fn from_u16(code: u16) -> PacketResult<Self> {
        match code {
            100 => Ok(StatusCode::Trying),
            180 => Ok(StatusCode::Ringing),
            181 => Ok(StatusCode::CallIsBeingForwarded),
            182 => Ok(StatusCode::Queued),
            183 => Ok(StatusCode::SessionProgress),

            200 => Ok(StatusCode::Ok),
            202 => Ok(StatusCode::Accepted),

            300 => Ok(StatusCode::MultipleChoices),
            301 => Ok(StatusCode::MovedPermanently),
            302 => Ok(StatusCode::MovedTemporarily),

            400 => Ok(StatusCode::BadRequest),
            401 => Ok(StatusCode::Unauthorized),
            403 => Ok(StatusCode::Forbidden),
            404 => Ok(StatusCode::NotFound),
            407 => Ok(StatusCode::ProxyAuthenticationRequired),
            408 => Ok(StatusCode::RequestTimeout),
            480 => Ok(StatusCode::TemporarilyUnavailable),
            481 => Ok(StatusCode::CallOrTransactionDoesNotExist),
            486 => Ok(StatusCode::BusyHere),
            487 => Ok(StatusCode::RequestTerminated),
            488 => Ok(StatusCode::NotAcceptableHere),

            500 => Ok(StatusCode::ServerInternalError),
            503 => Ok(StatusCode::ServiceUnavailable),

            600 => Ok(StatusCode::BusyEverywhere),
            603 => Ok(StatusCode::Decline),

            _ if (100..700).contains(&code) => Ok(StatusCode::Custom(code)),
            _ => Err(PacketError::InvalidStatus(code)),
        }
    }

    /// Returns the numeric value of this status code
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Trying => 100,
            StatusCode::Ringing => 180,
            StatusCode::CallIsBeingForwarded => 181,
            StatusCode::Queued => 182,
            StatusCode::SessionProgress => 183,

            StatusCode::Ok => 200,
            StatusCode::Accepted => 202,

            StatusCode::MultipleChoices => 300,
            StatusCode::MovedPermanently => 301,
            StatusCode::MovedTemporarily => 302,

            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::ProxyAuthenticationRequired => 407,
            StatusCode::RequestTimeout => 408,
            StatusCode::TemporarilyUnavailable => 480,
            StatusCode::CallOrTransactionDoesNotExist => 481,
            StatusCode::BusyHere => 486,
            StatusCode::RequestTerminated => 487,
            StatusCode::NotAcceptableHere => 488,

            StatusCode::ServerInternalError => 500,
            StatusCode::ServiceUnavailable => 503,

            StatusCode::BusyEverywhere => 600,
            StatusCode::Decline => 603,

            StatusCode::Custom(code) => *code,
        }
    }

    /// Returns the standard reason phrase, "Unknown" for custom codes
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Trying => "Trying",
            StatusCode::Ringing => "Ringing",
            StatusCode::CallIsBeingForwarded => "Call Is Being Forwarded",
            StatusCode::Queued => "Queued",
            StatusCode::SessionProgress => "Session Progress",
            StatusCode::Ok => "OK",
            StatusCode::Accepted => "Accepted",
            StatusCode::MultipleChoices => "Multiple Choices",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::MovedTemporarily => "Moved Temporarily",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::ProxyAuthenticationRequired => "Proxy Authentication Required",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::TemporarilyUnavailable => "Temporarily Unavailable",
            StatusCode::CallOrTransactionDoesNotExist => "Call/Transaction Does Not Exist",
            StatusCode::BusyHere => "Busy Here",
            StatusCode::RequestTerminated => "Request Terminated",
            StatusCode::NotAcceptableHere => "Not Acceptable Here",
            StatusCode::ServerInternalError => "Server Internal Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::BusyEverywhere => "Busy Everywhere",
            StatusCode::Decline => "Decline",
            StatusCode::Custom(_) => "Unknown",
        }
    }

    /// 1xx
    pub fn is_provisional(&self) -> bool {
        (100..200).contains(&self.as_u16())
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// 3xx
    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.as_u16())
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    /// 5xx
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }

    /// 6xx
    pub fn is_global_failure(&self) -> bool {
        (600..700).contains(&self.as_u16())
    }

    /// Any 4xx, 5xx or 6xx
    pub fn is_error(&self) -> bool {
        self.as_u16() >= 400
    }

    /// 100 Trying
    pub fn is_trying(&self) -> bool {
        matches!(self, StatusCode::Trying)
    }

    /// 180 Ringing or 183 Session Progress (early media)
    pub fn is_ringing(&self) -> bool {
        matches!(self, StatusCode::Ringing | StatusCode::SessionProgress)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

impl FromStr for StatusCode {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s
            .trim()
            .parse::<u16>()
            .map_err(|_| PacketError::malformed("Status-Line", format!("invalid status code '{}'", s)))?;
        StatusCode::from_u16(code)
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = PacketError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        StatusCode::from_u16(code)
    }
}

impl From<StatusCode> for u16 {
    fn from(status: StatusCode) -> Self {
        status.as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes() {
        assert!(StatusCode::Trying.is_provisional());
        assert!(StatusCode::Trying.is_trying());
        assert!(!StatusCode::Trying.is_ringing());
        assert!(StatusCode::Accepted.is_success());
        assert!(StatusCode::MovedTemporarily.is_redirection());
        assert!(StatusCode::RequestTerminated.is_client_error());
        assert!(StatusCode::ServiceUnavailable.is_server_error());
        assert!(StatusCode::Decline.is_global_failure());
        assert!(StatusCode::Custom(599).is_error());
        assert!(!StatusCode::Ok.is_error());
    }

    #[test]
    fn test_custom_codes_keep_their_value() {
        assert_eq!(StatusCode::from_u16(487).unwrap(), StatusCode::RequestTerminated);
        assert_eq!(StatusCode::from_u16(199).unwrap().as_u16(), 199);
        assert!(StatusCode::from_u16(700).is_err());
        assert_eq!("486".parse::<StatusCode>().unwrap(), StatusCode::BusyHere);
        assert!("abc".parse::<StatusCode>().is_err());
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
    }
}
