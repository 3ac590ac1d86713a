//! # pktflow-infra-common
//!
//! Infrastructure shared by the pktflow crates:
//!
//! - [`logging`]: subscriber bootstrap ([`setup_logging`]) and structured
//!   log context ([`LogContext`])
//! - [`errors`]: the infrastructure error type

pub mod errors;
pub mod logging;

pub use errors::types::{Error, Result};
pub use logging::context::LogContext;
pub use logging::setup::{LoggingConfig, parse_log_level, setup_logging};
