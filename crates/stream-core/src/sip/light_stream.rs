use std::time::Duration;

use pktflow_packet_core::{SipMessage, Timestamp};

use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::key::{CallId, StreamId};
use crate::stream::{Disposition, Stream};

/// Minimal SIP stream without a state machine
///
/// Keeps messages in arrival order and remembers three reference points:
/// the first dialog-initial INVITE, the first 18x response and the first
/// BYE. It ends on the first BYE. Useful when only the two timing metrics
/// are wanted and out-of-order recovery is not.
#[derive(Debug, Clone)]
pub struct LightSipStream {
    id: StreamId,
    key: CallId,
    packets: Vec<SipMessage>,
    invite: Option<usize>,
    ringing: Option<usize>,
    bye: Option<usize>,
}

impl LightSipStream {
    /// First INVITE to first 18x
    pub fn post_dial_delay(&self) -> Option<Duration> {
        self.between(self.invite?, self.ringing?)
    }

    /// First INVITE to first BYE
    pub fn call_duration(&self) -> Option<Duration> {
        self.between(self.invite?, self.bye?)
    }

    fn between(&self, start: usize, stop: usize) -> Option<Duration> {
        let start = self.packets.get(start)?.arrival();
        let stop = self.packets.get(stop)?.arrival();
        stop.checked_duration_since(start).filter(|d| !d.is_zero())
    }
}

impl Stream for LightSipStream {
    type Packet = SipMessage;
    type Key = CallId;

    const PROTOCOL: &'static str = "sip";

    fn key_for(msg: &SipMessage) -> StreamResult<CallId> {
        msg.call_id()
            .map(|id| CallId::new(id.clone()))
            .map_err(|source| StreamError::Keying {
                protocol: Self::PROTOCOL,
                source,
            })
    }

    fn create(id: StreamId, key: CallId, _config: &StreamConfig) -> Self {
        Self {
            id,
            key,
            packets: Vec::new(),
            invite: None,
            ringing: None,
            bye: None,
        }
    }

    fn id(&self) -> StreamId {
        self.id
    }

    fn key(&self) -> &CallId {
        &self.key
    }

    fn add_packet(&mut self, msg: SipMessage) -> Disposition<SipMessage> {
        let index = self.packets.len();
        if msg.is_request() {
            if self.invite.is_none() && msg.is_invite() && msg.is_initial() {
                self.invite = Some(index);
            } else if self.bye.is_none() && msg.is_bye() {
                self.bye = Some(index);
            }
        } else if self.ringing.is_none() && msg.status().is_ok_and(|s| s.as_u16() / 10 == 18) {
            self.ringing = Some(index);
        }
        self.packets.push(msg);
        Disposition::Accepted
    }

    fn is_ended(&self) -> bool {
        self.bye.is_some()
    }

    fn state_name(&self) -> &'static str {
        if self.is_ended() { "ENDED" } else { "ACTIVE" }
    }

    /// Messages in the order they were added
    fn packets(&self) -> Vec<&SipMessage> {
        self.packets.iter().collect()
    }

    fn packet_count(&self) -> usize {
        self.packets.len()
    }

    fn time_of_first_packet(&self) -> Option<Timestamp> {
        self.packets.iter().map(|m| m.arrival()).min()
    }

    fn time_of_last_packet(&self) -> Option<Timestamp> {
        self.packets.iter().map(|m| m.arrival()).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pktflow_packet_core::{Method, SipMessageBuilder, StatusCode};

    fn request(method: Method, to_tag: Option<&str>, ms: u64) -> SipMessage {
        let mut builder = SipMessageBuilder::request(method.clone(), "sip:bob@example.com")
            .call_id("light")
            .from_tag("a")
            .cseq(1, method)
            .at(Timestamp::from_millis(ms));
        if let Some(tag) = to_tag {
            builder = builder.to_tag(tag);
        }
        builder.build()
    }

    fn response(status: StatusCode, ms: u64) -> SipMessage {
        SipMessageBuilder::response(status)
            .call_id("light")
            .from_tag("a")
            .to_tag("b")
            .cseq(1, Method::Invite)
            .at(Timestamp::from_millis(ms))
            .build()
    }

    #[test]
    fn test_metrics_and_end() {
        let mut s = LightSipStream::create(StreamId::new(7), CallId::from("light"), &StreamConfig::default());
        s.add_packet(request(Method::Invite, None, 100));
        s.add_packet(response(StatusCode::Trying, 110));
        s.add_packet(response(StatusCode::SessionProgress, 600));
        s.add_packet(response(StatusCode::Ringing, 700));
        assert!(!s.is_ended());
        assert_eq!(s.state_name(), "ACTIVE");

        s.add_packet(request(Method::Bye, Some("b"), 10_100));
        assert!(s.is_ended());
        assert_eq!(s.state_name(), "ENDED");
        assert_eq!(s.post_dial_delay(), Some(Duration::from_millis(500)));
        assert_eq!(s.call_duration(), Some(Duration::from_millis(10_000)));
    }

    #[test]
    fn test_keeps_arrival_order() {
        let mut s = LightSipStream::create(StreamId::new(1), CallId::from("light"), &StreamConfig::default());
        s.add_packet(response(StatusCode::Ringing, 50));
        s.add_packet(request(Method::Invite, None, 10));

        let order: Vec<_> = s.packets().iter().map(|m| m.arrival()).collect();
        assert_eq!(order, vec![Timestamp::from_millis(50), Timestamp::from_millis(10)]);
        assert_eq!(s.time_of_first_packet(), Some(Timestamp::from_millis(10)));
        assert_eq!(s.post_dial_delay(), None);
    }

    #[test]
    fn test_reinvite_is_not_the_initial_invite() {
        let mut s = LightSipStream::create(StreamId::new(1), CallId::from("light"), &StreamConfig::default());
        s.add_packet(request(Method::Invite, Some("b"), 10));
        s.add_packet(response(StatusCode::Ringing, 50));
        assert_eq!(s.post_dial_delay(), None);
    }
}
