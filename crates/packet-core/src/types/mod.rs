//! Value types shared by the packet views
//!
//! - [`Timestamp`]: capture arrival time with microsecond resolution
//! - [`Protocol`]: protocols a decoded frame can be interpreted as
//! - [`Method`], [`StatusCode`], [`CSeq`]: the SIP fields the stream engine
//!   classifies messages by

pub mod cseq;
pub mod method;
pub mod protocol;
pub mod status;
pub mod timestamp;

pub use cseq::CSeq;
pub use method::Method;
pub use protocol::Protocol;
pub use status::StatusCode;
pub use timestamp::Timestamp;
