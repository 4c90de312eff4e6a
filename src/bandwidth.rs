// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! Delivery-rate estimation, per draft-cheng-iccrg-delivery-rate-estimation.
//!
//! This is the "out of scope" per-packet bookkeeping named in §1: the
//! controller consumes an [`AckSample`]/[`RateSample`] built from this
//! module's types, but a host with its own bookkeeping may construct samples
//! however it likes.

use crate::time::Timestamp;
use core::{cmp::max, ops};

/// A transfer rate in bytes per second, stored internally as bits per second
/// for precision when multiplying by small gains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bandwidth {
    bits_per_second: u64,
}

/// Bits per byte, scaled by 1e6 so `Bandwidth::new` can divide by an interval
/// in microseconds without losing precision for small transfers.
const MICRO_BITS_PER_BYTE: u64 = 8_000_000;

impl Bandwidth {
    pub const ZERO: Bandwidth = Bandwidth { bits_per_second: 0 };
    pub const MAX: Bandwidth = Bandwidth {
        bits_per_second: u64::MAX,
    };

    /// Constructs a `Bandwidth` from a byte count delivered over `interval`.
    pub fn new(bytes: u64, interval: core::time::Duration) -> Self {
        if interval.is_zero() {
            return Self::ZERO;
        }
        let micros = interval.as_micros().max(1) as u64;
        let bits_per_second = bytes
            .checked_mul(MICRO_BITS_PER_BYTE)
            .map(|v| v / micros)
            .unwrap_or(u64::MAX);
        Self { bits_per_second }
    }

    pub const fn from_bits_per_second(bits_per_second: u64) -> Self {
        Self { bits_per_second }
    }

    pub const fn as_bits_per_second(self) -> u64 {
        self.bits_per_second
    }

    pub const fn as_bytes_per_second(self) -> u64 {
        self.bits_per_second / 8
    }
}

impl ops::Mul<num_rational::Ratio<u64>> for Bandwidth {
    type Output = Bandwidth;

    fn mul(self, rhs: num_rational::Ratio<u64>) -> Self::Output {
        let bps = self
            .bits_per_second
            .checked_mul(*rhs.numer())
            .map(|v| v / rhs.denom())
            .unwrap_or(u64::MAX);
        Bandwidth {
            bits_per_second: bps,
        }
    }
}

impl ops::Mul<core::time::Duration> for Bandwidth {
    type Output = u64;

    /// Returns the number of bytes transferable in `rhs` at this rate.
    fn mul(self, rhs: core::time::Duration) -> Self::Output {
        let micros = rhs.as_micros().min(u64::MAX as u128) as u64;
        self.bits_per_second
            .checked_mul(micros)
            .map(|bits| bits / MICRO_BITS_PER_BYTE)
            .unwrap_or(u64::MAX)
    }
}

/// Metadata recorded at the time a packet was sent, carried forward to the
/// corresponding ACK so the rate sample can be computed per §3.2/§4.3.
#[derive(Clone, Copy, Debug)]
pub struct PacketInfo {
    pub delivered_bytes: u64,
    pub delivered_time: Timestamp,
    pub lost_bytes: u64,
    pub first_sent_time: Timestamp,
    pub bytes_in_flight: u32,
    pub is_app_limited: bool,
}

/// The per-ACK delivery rate sample described in §3.2.
#[derive(Clone, Copy, Debug, Default)]
pub struct RateSample {
    pub interval: core::time::Duration,
    pub delivered_bytes: u64,
    pub lost_bytes: u64,
    pub is_app_limited: bool,
    pub prior_delivered_bytes: u64,
    pub bytes_in_flight: u32,
    pub prior_lost_bytes: u64,
}

impl RateSample {
    fn on_ack(&mut self, packet_info: PacketInfo) {
        self.prior_delivered_bytes = packet_info.delivered_bytes;
        self.prior_lost_bytes = packet_info.lost_bytes;
        self.is_app_limited = packet_info.is_app_limited;
        self.bytes_in_flight = packet_info.bytes_in_flight;
    }

    /// Delivery rate for this sample, falling back to the conservative
    /// 40,000 B/s floor described in §3.2/§7 when no interval was observed.
    pub fn delivery_rate(&self) -> Bandwidth {
        if self.interval.is_zero() {
            return Bandwidth::from_bits_per_second(40_000 * 8);
        }
        Bandwidth::new(self.delivered_bytes, self.interval)
    }
}

/// Tracks per-path delivered/lost byte totals and produces [`RateSample`]s.
#[derive(Clone, Debug, Default)]
pub struct Estimator {
    delivered_bytes: u64,
    delivered_time: Option<Timestamp>,
    lost_bytes: u64,
    first_sent_time: Option<Timestamp>,
    app_limited_delivered_bytes: Option<u64>,
    rate_sample: RateSample,
}

impl Estimator {
    pub fn delivered_bytes(&self) -> u64 {
        self.delivered_bytes
    }

    pub fn lost_bytes(&self) -> u64 {
        self.lost_bytes
    }

    pub fn rate_sample(&self) -> RateSample {
        self.rate_sample
    }

    pub fn is_app_limited(&self) -> bool {
        self.app_limited_delivered_bytes.is_some()
    }

    pub fn on_packet_sent(
        &mut self,
        bytes_in_flight: u32,
        app_limited: Option<bool>,
        now: Timestamp,
    ) -> PacketInfo {
        if bytes_in_flight == 0 {
            self.first_sent_time = Some(now);
            self.delivered_time = Some(now);
        }

        if app_limited.unwrap_or(false) {
            self.on_app_limited(bytes_in_flight);
        }

        PacketInfo {
            delivered_bytes: self.delivered_bytes,
            delivered_time: self.delivered_time.unwrap_or(now),
            lost_bytes: self.lost_bytes,
            first_sent_time: self.first_sent_time.unwrap_or(now),
            bytes_in_flight,
            is_app_limited: self.app_limited_delivered_bytes.is_some(),
        }
    }

    pub fn on_ack(
        &mut self,
        bytes_acknowledged: usize,
        newest_acked_time_sent: Timestamp,
        newest_acked_packet_info: PacketInfo,
        now: Timestamp,
    ) {
        self.delivered_bytes += bytes_acknowledged as u64;
        self.delivered_time = Some(now);

        if self
            .app_limited_delivered_bytes
            .is_some_and(|bytes| self.delivered_bytes > bytes)
        {
            self.app_limited_delivered_bytes = None;
        }

        if self.rate_sample.prior_delivered_bytes == 0
            || newest_acked_packet_info.delivered_bytes > self.rate_sample.prior_delivered_bytes
        {
            self.rate_sample.on_ack(newest_acked_packet_info);
            self.first_sent_time = Some(newest_acked_time_sent);

            let send_elapsed = newest_acked_time_sent - newest_acked_packet_info.first_sent_time;
            let ack_elapsed = now - newest_acked_packet_info.delivered_time;

            // Delivery cannot outrun the send rate in a sustained fashion;
            // cap the sample interval at whichever elapsed time is larger.
            self.rate_sample.interval = max(send_elapsed, ack_elapsed);
        }

        self.rate_sample.delivered_bytes =
            self.delivered_bytes - self.rate_sample.prior_delivered_bytes;
    }

    pub fn on_loss(&mut self, lost_bytes: usize) {
        self.lost_bytes += lost_bytes as u64;
        self.rate_sample.lost_bytes = self.lost_bytes - self.rate_sample.prior_lost_bytes;
    }

    pub fn on_app_limited(&mut self, bytes_in_flight: u32) {
        self.app_limited_delivered_bytes = Some(self.delivered_bytes + bytes_in_flight as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    fn ts(micros: u64) -> Timestamp {
        Timestamp::from_duration(Duration::from_micros(micros))
    }

    #[test]
    fn bandwidth_new_computes_bytes_per_second() {
        let bw = Bandwidth::new(1_000_000, Duration::from_secs(1));
        assert_eq!(bw.as_bytes_per_second(), 1_000_000);
    }

    #[test]
    fn bandwidth_mul_duration_round_trips() {
        let bw = Bandwidth::new(1_000, Duration::from_millis(1));
        let bytes = bw * Duration::from_millis(10);
        assert_eq!(bytes, 10_000);
    }

    #[test]
    fn estimator_tracks_delivered_bytes_across_acks() {
        let mut est = Estimator::default();
        let info = est.on_packet_sent(0, Some(false), ts(0));
        est.on_ack(1200, ts(1_000), info, ts(1_000));
        assert_eq!(est.delivered_bytes(), 1200);
        assert!(!est.is_app_limited());
    }

    #[test]
    fn app_limited_clears_once_bubble_acked() {
        let mut est = Estimator::default();
        let info = est.on_packet_sent(1200, Some(true), ts(0));
        assert!(est.is_app_limited());
        est.on_ack(1200, ts(1_000), info, ts(1_000));
        est.on_ack(1, ts(2_000), info, ts(2_000));
        assert!(!est.is_app_limited());
    }

    #[test]
    fn rate_sample_falls_back_to_floor_with_zero_interval() {
        let sample = RateSample::default();
        assert_eq!(sample.delivery_rate().as_bytes_per_second(), 40_000);
    }
}
