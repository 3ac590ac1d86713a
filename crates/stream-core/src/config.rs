//! Engine configuration
//!
//! ```rust
//! use pktflow_stream_core::config::StreamConfig;
//!
//! let config = StreamConfig::from_toml_str(r#"
//!     [tcp]
//!     track_sequence_anomalies = false
//!
//!     [sip]
//!     ignored_methods = ["OPTIONS", "INFO"]
//!
//!     [rtp]
//!     clock_rate = 16000
//! "#).unwrap();
//!
//! assert!(!config.tcp.track_sequence_anomalies);
//! assert_eq!(config.sip.ignored_methods.len(), 2);
//! assert!(config.sip.reuse_on_new_invite);
//! assert_eq!(config.rtp.clock_rate, 16000);
//! ```

use std::path::Path;

use pktflow_packet_core::Method;
use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};

/// Top level configuration shared by all registries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub tcp: TcpConfig,
    pub sip: SipConfig,
    pub rtp: RtpConfig,
}

/// TCP connection tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// Count segments whose sequence number is below the direction's base
    pub track_sequence_anomalies: bool,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            track_sequence_anomalies: true,
        }
    }
}

/// SIP dialog tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SipConfig {
    /// Messages of these methods (requests and their responses) are counted
    /// in the statistics but never admitted to a stream
    pub ignored_methods: Vec<Method>,

    /// Start a new stream when a terminated dialog's Call-ID shows up on a
    /// fresh dialog-initial INVITE
    pub reuse_on_new_invite: bool,
}

impl Default for SipConfig {
    fn default() -> Self {
        Self {
            ignored_methods: Vec::new(),
            reuse_on_new_invite: true,
        }
    }
}

impl SipConfig {
    /// Ignore the out-of-dialog chatter that never forms a call
    /// (INFO, OPTIONS, MESSAGE)
    pub fn signalling_only() -> Self {
        Self {
            ignored_methods: vec![Method::Info, Method::Options, Method::Message],
            ..Default::default()
        }
    }

    pub fn is_ignored(&self, method: &Method) -> bool {
        self.ignored_methods.contains(method)
    }
}

/// RTP stream tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtpConfig {
    /// Media clock rate in Hz used to express jitter in wall-clock time
    pub clock_rate: u32,
}

impl Default for RtpConfig {
    fn default() -> Self {
        // G.711 and most narrowband codecs
        Self { clock_rate: 8000 }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tcp(mut self, tcp: TcpConfig) -> Self {
        self.tcp = tcp;
        self
    }

    pub fn with_sip(mut self, sip: SipConfig) -> Self {
        self.sip = sip;
        self
    }

    pub fn with_rtp(mut self, rtp: RtpConfig) -> Self {
        self.rtp = rtp;
        self
    }

    pub fn with_sequence_anomalies(mut self, enabled: bool) -> Self {
        self.tcp.track_sequence_anomalies = enabled;
        self
    }

    pub fn with_ignored_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.sip.ignored_methods = methods.into_iter().collect();
        self
    }

    pub fn with_sip_reuse(mut self, enabled: bool) -> Self {
        self.sip.reuse_on_new_invite = enabled;
        self
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(input: &str) -> StreamResult<Self> {
        toml::from_str(input).map_err(|e| StreamError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> StreamResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| StreamError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> StreamResult<String> {
        toml::to_string(self).map_err(|e| StreamError::Config(e.to_string()))
    }
}
