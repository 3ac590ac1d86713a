//! CSeq header value

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::method::Method;
use crate::error::PacketError;

/// CSeq header: sequence number plus the method of the transaction
///
/// For responses the CSeq method is the only way to tell which request the
/// response answers, which is why the stream engine reads it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CSeq {
    /// Sequence number
    pub seq: u32,
    /// Method of the request this transaction belongs to
    pub method: Method,
}

impl CSeq {
    /// Create a new CSeq value
    pub fn new(seq: u32, method: Method) -> Self {
        Self { seq, method }
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

impl FromStr for CSeq {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let seq = parts
            .next()
            .ok_or_else(|| PacketError::malformed("CSeq", "empty value"))?
            .parse::<u32>()
            .map_err(|e| PacketError::malformed("CSeq", e.to_string()))?;
        let method = parts
            .next()
            .ok_or_else(|| PacketError::malformed("CSeq", "missing method"))?
            .parse::<Method>()?;
        if parts.next().is_some() {
            return Err(PacketError::malformed("CSeq", "trailing data"));
        }
        Ok(CSeq { seq, method })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let cseq: CSeq = "314159 INVITE".parse().unwrap();
        assert_eq!(cseq, CSeq::new(314159, Method::Invite));
        assert_eq!(cseq.to_string(), "314159 INVITE");

        assert!("INVITE".parse::<CSeq>().is_err());
        assert!("12".parse::<CSeq>().is_err());
        assert!("12 BYE extra".parse::<CSeq>().is_err());
    }
}
