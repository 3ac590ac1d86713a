//! Order independence, re-confirmation and packet retention

use std::time::Duration;

use pktflow_packet_core::prelude::*;
use pktflow_stream_core::prelude::*;
use pktflow_stream_core::Transition;
use proptest::prelude::*;

const CALL_ID: &str = "7a1c5e@host.example.com";

fn request(method: Method, cseq: u32, to_tag: bool) -> SipMessageBuilder {
    let builder = SipMessageBuilder::request(method.clone(), "sip:bob@example.com")
        .call_id(CALL_ID)
        .from_tag("from")
        .cseq(cseq, method);
    if to_tag { builder.to_tag("to") } else { builder }
}

fn response(status: StatusCode, method: Method, cseq: u32) -> SipMessageBuilder {
    SipMessageBuilder::response(status)
        .call_id(CALL_ID)
        .from_tag("from")
        .to_tag("to")
        .cseq(cseq, method)
}

/// Complete calls with strictly increasing timestamps
fn scenario(kind: usize) -> Vec<SipMessage> {
    let builders = match kind {
        0 => vec![
            request(Method::Invite, 1, false),
            response(StatusCode::Trying, Method::Invite, 1),
            response(StatusCode::Ringing, Method::Invite, 1),
            response(StatusCode::Ok, Method::Invite, 1),
            request(Method::Ack, 1, true),
            request(Method::Bye, 2, true),
            response(StatusCode::Ok, Method::Bye, 2),
        ],
        1 => vec![
            request(Method::Invite, 1, false),
            response(StatusCode::Trying, Method::Invite, 1),
            response(StatusCode::Ringing, Method::Invite, 1),
            request(Method::Cancel, 1, false),
            response(StatusCode::Ok, Method::Cancel, 1),
            response(StatusCode::RequestTerminated, Method::Invite, 1),
            request(Method::Ack, 1, false),
        ],
        2 => vec![
            request(Method::Invite, 1, false),
            response(StatusCode::Trying, Method::Invite, 1),
            response(StatusCode::BusyHere, Method::Invite, 1),
            request(Method::Ack, 1, true),
        ],
        _ => vec![
            request(Method::Invite, 1, false),
            response(StatusCode::Trying, Method::Invite, 1),
            response(StatusCode::SessionProgress, Method::Invite, 1),
            request(Method::Cancel, 1, false),
            response(StatusCode::Ok, Method::Invite, 1),
            request(Method::Ack, 1, true),
        ],
    };
    builders
        .into_iter()
        .enumerate()
        .map(|(i, b)| b.at(Timestamp::from_millis(1_000 + 100 * i as u64)).build())
        .collect()
}

#[derive(Debug, PartialEq)]
struct Outcome {
    state: CallState,
    transitions: Vec<Transition<CallState>>,
    post_dial_delay: Option<Duration>,
    call_duration: Option<Duration>,
    handshake_complete: bool,
    packets: usize,
}

fn run(messages: impl IntoIterator<Item = SipMessage>) -> Outcome {
    let mut stream = SipDialogStream::create(StreamId::new(1), CallId::from(CALL_ID), &StreamConfig::default());
    for msg in messages {
        assert!(matches!(stream.add_packet(msg), Disposition::Accepted));
    }
    Outcome {
        state: stream.state(),
        transitions: stream.transitions().to_vec(),
        post_dial_delay: stream.post_dial_delay(),
        call_duration: stream.call_duration(),
        handshake_complete: stream.handshake_complete(),
        packets: stream.packet_count(),
    }
}

fn shuffled_scenario() -> impl Strategy<Value = (usize, Vec<SipMessage>)> {
    (0..4usize).prop_flat_map(|kind| (Just(kind), Just(scenario(kind)).prop_shuffle()))
}

fn arb_sip_message() -> impl Strategy<Value = SipMessage> {
    let palette = prop_oneof![
        Just(request(Method::Invite, 1, false)),
        Just(request(Method::Invite, 2, false)),
        Just(request(Method::Ack, 1, true)),
        Just(request(Method::Bye, 2, true)),
        Just(request(Method::Cancel, 1, false)),
        Just(request(Method::Options, 1, false)),
        Just(response(StatusCode::Trying, Method::Invite, 1)),
        Just(response(StatusCode::Ringing, Method::Invite, 1)),
        Just(response(StatusCode::Ok, Method::Invite, 1)),
        Just(response(StatusCode::BusyHere, Method::Invite, 1)),
        Just(response(StatusCode::RequestTerminated, Method::Invite, 1)),
        Just(response(StatusCode::Ok, Method::Bye, 2)),
        Just(SipMessageBuilder::response(StatusCode::Ok).call_id(CALL_ID)),
    ];
    (palette, 0..50u64).prop_map(|(builder, ms)| builder.at(Timestamp::from_millis(ms)).build())
}

fn arb_segment() -> impl Strategy<Value = TcpSegment> {
    let flags = prop_oneof![
        Just(TcpFlags::SYN),
        Just(TcpFlags::SYN | TcpFlags::ACK),
        Just(TcpFlags::ACK),
        Just(TcpFlags::FIN | TcpFlags::ACK),
        Just(TcpFlags::RST),
        Just(TcpFlags::PSH | TcpFlags::ACK),
    ];
    (any::<bool>(), flags, 0..4u32, 0..4u32, 0..100u64).prop_map(|(forward, flags, seq, ack, ms)| {
        let a = "172.16.0.1:33000".parse().unwrap();
        let b = "172.16.0.2:5060".parse().unwrap();
        let (from, to) = if forward { (a, b) } else { (b, a) };
        TcpSegmentBuilder::new(from, to)
            .flags(flags)
            .sequence(1_000 + seq)
            .acknowledgement(1_000 + ack)
            .at(Timestamp::from_millis(ms))
            .build()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any arrival order with correct timestamps reconstructs the same call
    #[test]
    fn prop_arrival_order_does_not_matter((kind, shuffled) in shuffled_scenario()) {
        let expected = run(scenario(kind));
        let actual = run(shuffled);
        prop_assert_eq!(actual, expected);
    }

    /// Repeating a message right after itself never adds a transition
    #[test]
    fn prop_repeated_message_only_confirms(kind in 0..4usize, index in 0..4usize) {
        let messages = scenario(kind);
        let expected = run(messages.clone());

        let mut doubled = messages.clone();
        doubled.insert(index, messages[index].clone());
        let actual = run(doubled);

        prop_assert_eq!(actual.transitions.len(), expected.transitions.len());
        prop_assert_eq!(actual.state, expected.state);
        prop_assert_eq!(actual.packets, expected.packets + 1);
    }

    /// Every keyed SIP message ends up in exactly one stream
    #[test]
    fn prop_no_sip_message_is_lost(messages in prop::collection::vec(arb_sip_message(), 1..40)) {
        let mut registry: StreamRegistry<SipDialogStream> = StreamRegistry::new(StreamConfig::default());
        let total = messages.len();
        for msg in messages {
            registry.admit(msg).unwrap();
        }
        let retained: usize = registry.streams().iter().map(|s| s.read().packet_count()).sum();
        prop_assert_eq!(retained, total);
        prop_assert_eq!(registry.stats().packets_admitted, total as u64);
    }

    /// Every TCP segment ends up in exactly one stream, port reuse included
    #[test]
    fn prop_no_tcp_segment_is_lost(segments in prop::collection::vec(arb_segment(), 1..60)) {
        let mut registry: StreamRegistry<TcpStream> = StreamRegistry::new(StreamConfig::default());
        let total = segments.len();
        for segment in segments {
            registry.admit(segment).unwrap();
        }
        let retained: usize = registry.streams().iter().map(|s| s.read().packet_count()).sum();
        prop_assert_eq!(retained, total);
        prop_assert_eq!(registry.len() as u64, registry.stats().streams_created);
    }
}
