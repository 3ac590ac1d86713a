//! Logging bootstrap and structured context

pub mod context;
pub mod setup;
