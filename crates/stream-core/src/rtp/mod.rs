//! RTP media tracking
//!
//! - [`RtpStream`]: packets of one synchronization source with loss,
//!   sequence and jitter figures

pub mod stream;

pub use stream::{Jitter, RtpStream};
