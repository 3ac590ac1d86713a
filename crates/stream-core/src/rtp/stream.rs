use std::time::Duration;

use pktflow_packet_core::{RtpPacket, Timestamp};
use tracing::debug;

use crate::config::StreamConfig;
use crate::error::StreamResult;
use crate::key::{Ssrc, StreamId};
use crate::stream::{Disposition, PacketLog, Stream};

/// Interarrival jitter (RFC 3550 section 6.4.1) over a whole stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    /// Highest running estimate
    pub max: Duration,
    /// Average of the running estimate over all packets after the first
    pub mean: Duration,
}

/// One RTP stream, identified by its synchronization source
///
/// RTP has no teardown on the wire, so the stream never ends by itself and
/// the key is never reused. Packets are kept in capture-time order and every
/// metric is computed from that order, so late arrivals need no replay.
#[derive(Debug, Clone)]
pub struct RtpStream {
    id: StreamId,
    key: Ssrc,
    packets: PacketLog<RtpPacket>,
    clock_rate: u32,
    late_arrivals: u64,
}

impl RtpStream {
    pub fn ssrc(&self) -> Ssrc {
        self.key
    }

    /// Payload type of the first packet
    pub fn payload_type(&self) -> Option<u8> {
        self.packets.first().map(|p| p.payload_type())
    }

    /// Packets that arrived with a timestamp earlier than the latest one seen
    pub fn late_arrivals(&self) -> u64 {
        self.late_arrivals
    }

    /// Consecutive packets whose sequence numbers do not follow each other
    pub fn sequence_errors(&self) -> u64 {
        self.packets
            .iter()
            .zip(self.packets.iter().skip(1))
            .filter(|(prev, next)| next.sequence_number() != prev.sequence_number().wrapping_add(1))
            .count() as u64
    }

    /// Packets expected from the sequence number range but never seen
    ///
    /// Duplicates offset losses, as in an RTCP receiver report; the result
    /// never goes below zero.
    pub fn lost_packets(&self) -> u64 {
        let mut iter = self.packets.iter();
        let Some(first) = iter.next() else {
            return 0;
        };
        let mut prev = first.sequence_number();
        let (mut ext, mut low, mut high) = (0i64, 0i64, 0i64);
        for packet in iter {
            let seq = packet.sequence_number();
            ext += i64::from(seq.wrapping_sub(prev) as i16);
            low = low.min(ext);
            high = high.max(ext);
            prev = seq;
        }
        let expected = (high - low + 1) as u64;
        expected.saturating_sub(self.packets.len() as u64)
    }

    /// Largest capture-time gap between consecutive packets
    pub fn max_delta(&self) -> Option<Duration> {
        self.packets
            .iter()
            .zip(self.packets.iter().skip(1))
            .map(|(prev, next)| next.arrival().saturating_duration_since(prev.arrival()))
            .max()
    }

    /// Interarrival jitter at the configured clock rate
    pub fn jitter(&self) -> Option<Jitter> {
        if self.clock_rate == 0 || self.packets.len() < 2 {
            return None;
        }
        let rate = f64::from(self.clock_rate);
        let to_units = |ts: Timestamp| ts.as_micros() as f64 * rate / 1_000_000.0;

        let (mut estimate, mut max, mut sum) = (0.0f64, 0.0f64, 0.0f64);
        let mut count = 0u32;
        for (prev, next) in self.packets.iter().zip(self.packets.iter().skip(1)) {
            let arrival = to_units(next.arrival()) - to_units(prev.arrival());
            let sent = f64::from(next.rtp_timestamp().wrapping_sub(prev.rtp_timestamp()) as i32);
            estimate += ((arrival - sent).abs() - estimate) / 16.0;
            max = max.max(estimate);
            sum += estimate;
            count += 1;
        }

        let to_duration = |units: f64| Duration::from_nanos((units * 1e9 / rate).round() as u64);
        Some(Jitter {
            max: to_duration(max),
            mean: to_duration(sum / f64::from(count)),
        })
    }
}

impl Stream for RtpStream {
    type Packet = RtpPacket;
    type Key = Ssrc;

    const PROTOCOL: &'static str = "rtp";

    fn key_for(packet: &RtpPacket) -> StreamResult<Ssrc> {
        Ok(Ssrc::new(packet.ssrc()))
    }

    fn create(id: StreamId, key: Ssrc, config: &StreamConfig) -> Self {
        Self {
            id,
            key,
            packets: PacketLog::new(),
            clock_rate: config.rtp.clock_rate,
            late_arrivals: 0,
        }
    }

    fn id(&self) -> StreamId {
        self.id
    }

    fn key(&self) -> &Ssrc {
        &self.key
    }

    fn add_packet(&mut self, packet: RtpPacket) -> Disposition<RtpPacket> {
        if self.packets.last_time().is_some_and(|last| packet.arrival() < last) {
            self.late_arrivals += 1;
            debug!(stream = %self.id, ssrc = %self.key, seq = packet.sequence_number(), "out-of-order RTP packet");
        }
        self.packets.insert(packet);
        Disposition::Accepted
    }

    fn is_ended(&self) -> bool {
        false
    }

    fn state_name(&self) -> &'static str {
        "ACTIVE"
    }

    fn packets(&self) -> Vec<&RtpPacket> {
        self.packets.iter().collect()
    }

    fn packet_count(&self) -> usize {
        self.packets.len()
    }

    fn time_of_first_packet(&self) -> Option<Timestamp> {
        self.packets.first_time()
    }

    fn time_of_last_packet(&self) -> Option<Timestamp> {
        self.packets.last_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pktflow_packet_core::RtpPacketBuilder;

    const SSRC: u32 = 0x5eed_0001;

    /// 20 ms G.711 frames: 160 clock units apart
    fn rtp(seq: u16, ms: u64) -> RtpPacket {
        RtpPacketBuilder::new("10.0.0.1:16384".parse().unwrap(), "10.0.0.2:20000".parse().unwrap())
            .ssrc(SSRC)
            .payload_type(0)
            .sequence_number(seq)
            .rtp_timestamp(u32::from(seq) * 160)
            .at(Timestamp::from_millis(ms))
            .build()
    }

    fn stream() -> RtpStream {
        RtpStream::create(StreamId::new(1), Ssrc::new(SSRC), &StreamConfig::default())
    }

    #[test]
    fn test_steady_stream_has_no_errors() {
        let mut s = stream();
        for i in 0..50u16 {
            s.add_packet(rtp(i, 20 * u64::from(i)));
        }
        assert_eq!(s.packet_count(), 50);
        assert_eq!(s.sequence_errors(), 0);
        assert_eq!(s.lost_packets(), 0);
        assert_eq!(s.max_delta(), Some(Duration::from_millis(20)));
        let jitter = s.jitter().unwrap();
        assert_eq!(jitter.max, Duration::ZERO);
        assert_eq!(s.payload_type(), Some(0));
        assert!(!s.is_ended());
    }

    #[test]
    fn test_gap_counts_loss_and_sequence_error() {
        let mut s = stream();
        s.add_packet(rtp(10, 0));
        s.add_packet(rtp(11, 20));
        s.add_packet(rtp(14, 80));
        s.add_packet(rtp(15, 100));
        assert_eq!(s.lost_packets(), 2);
        assert_eq!(s.sequence_errors(), 1);
        assert_eq!(s.max_delta(), Some(Duration::from_millis(60)));
    }

    #[test]
    fn test_sequence_wrap_is_not_loss() {
        let mut s = stream();
        s.add_packet(rtp(65_534, 0));
        s.add_packet(rtp(65_535, 20));
        s.add_packet(rtp(0, 40));
        s.add_packet(rtp(1, 60));
        assert_eq!(s.lost_packets(), 0);
        assert_eq!(s.sequence_errors(), 0);
    }

    #[test]
    fn test_late_arrival_is_ordered_by_capture_time() {
        let mut s = stream();
        s.add_packet(rtp(1, 20));
        s.add_packet(rtp(2, 40));
        s.add_packet(rtp(0, 0));
        assert_eq!(s.late_arrivals(), 1);
        let order: Vec<u16> = s.packets().iter().map(|p| p.sequence_number()).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(s.sequence_errors(), 0);
        assert_eq!(s.time_of_first_packet(), Some(Timestamp::from_millis(0)));
    }

    #[test]
    fn test_jitter_follows_delay_variation() {
        let mut s = stream();
        s.add_packet(rtp(0, 0));
        // 10 ms late: |D| = 80 clock units, J = 80 / 16 = 5 units = 625 us
        s.add_packet(rtp(1, 30));
        let jitter = s.jitter().unwrap();
        assert_eq!(jitter.max, Duration::from_micros(625));
        assert_eq!(jitter.mean, Duration::from_micros(625));

        let config = StreamConfig::default().with_rtp(crate::config::RtpConfig { clock_rate: 0 });
        let mut quiet = RtpStream::create(StreamId::new(2), Ssrc::new(SSRC), &config);
        quiet.add_packet(rtp(0, 0));
        quiet.add_packet(rtp(1, 30));
        assert_eq!(quiet.jitter(), None);
    }
}
