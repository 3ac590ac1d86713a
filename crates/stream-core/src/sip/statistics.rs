use std::collections::BTreeMap;
use std::fmt::Write as _;

use pktflow_packet_core::{Method, SipMessage};
use serde::Serialize;

/// Message counters for every SIP message seen, filtered or not
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SipStatistics {
    pub total: u64,
    pub invite: u64,
    pub ack: u64,
    pub bye: u64,
    pub cancel: u64,
    pub options: u64,
    pub info: u64,
    pub message: u64,
    pub other_requests: u64,
    /// Response count per status code
    pub responses: BTreeMap<u16, u64>,
}

impl SipStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&mut self, msg: &SipMessage) {
        self.total += 1;
        if let Ok(status) = msg.status() {
            *self.responses.entry(status.as_u16()).or_insert(0) += 1;
            return;
        }

        let Ok(method) = msg.method() else {
            return;
        };
        let counter = match method {
            Method::Invite => &mut self.invite,
            Method::Ack => &mut self.ack,
            Method::Bye => &mut self.bye,
            Method::Cancel => &mut self.cancel,
            Method::Options => &mut self.options,
            Method::Info => &mut self.info,
            Method::Message => &mut self.message,
            _ => &mut self.other_requests,
        };
        *counter += 1;
    }

    pub fn requests(&self) -> u64 {
        self.invite + self.ack + self.bye + self.cancel + self.options + self.info + self.message + self.other_requests
    }

    pub fn response_total(&self) -> u64 {
        self.responses.values().sum()
    }

    /// Human readable report
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "SIP messages: {}", self.total);
        let _ = writeln!(out, "  requests: {}", self.requests());
        for (name, count) in [
            ("INVITE", self.invite),
            ("ACK", self.ack),
            ("BYE", self.bye),
            ("CANCEL", self.cancel),
            ("OPTIONS", self.options),
            ("INFO", self.info),
            ("MESSAGE", self.message),
            ("other", self.other_requests),
        ] {
            let _ = writeln!(out, "    {:<8} {}", name, count);
        }
        let _ = writeln!(out, "  responses: {}", self.response_total());
        for (code, count) in &self.responses {
            let _ = writeln!(out, "    {:<8} {}", code, count);
        }
        out
    }
}
