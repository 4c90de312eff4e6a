// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! Volume model (§3.1 "Volume model", §4.5, §4.6.5): `min_rtt`, the
//! `inflight_hi`/`inflight_lo` bounds, and ACK aggregation (`extra_acked`).
//!
//! `min_rtt`'s windowed-minimum behavior and the min-RTT-margin local
//! extension have no literal counterpart anywhere in the retrieved teacher
//! sources (the pack's reference to a `MinRttWindowedFilter` type has no
//! matching definition); both are built from scratch here, following the
//! general slot/stamp idiom already established by `windowed_filter.rs` and
//! the spec's explicit field list (§3.1).

use crate::{bandwidth::Bandwidth, data_rate::BETA, time::Timestamp, windowed_filter::ExtraAckedFilter};
use core::time::Duration;

pub const MIN_RTT_FILTER_LEN: Duration = Duration::from_secs(10);
pub const PROBE_RTT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct Model {
    min_rtt: Duration,
    min_rtt_stamp: Option<Timestamp>,
    extra_acked_filter: ExtraAckedFilter,
    extra_acked_interval_start: Option<Timestamp>,
    extra_acked_delivered: u64,
    inflight_hi: u64,
    inflight_lo: u64,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            min_rtt: Duration::MAX,
            min_rtt_stamp: None,
            extra_acked_filter: ExtraAckedFilter::new(),
            extra_acked_interval_start: None,
            extra_acked_delivered: 0,
            inflight_hi: u64::MAX,
            inflight_lo: u64::MAX,
        }
    }
}

impl Model {
    pub fn min_rtt(&self) -> Duration {
        self.min_rtt
    }

    pub fn extra_acked(&self) -> u64 {
        self.extra_acked_filter.value()
    }

    pub fn inflight_hi(&self) -> u64 {
        self.inflight_hi
    }

    pub fn inflight_lo(&self) -> u64 {
        self.inflight_lo
    }

    /// `min_rtt_margin` (§4.6.5, local extension): `min_rtt * 2% + 2*mtu /
    /// max_bw`. Bandwidth of zero (no samples yet) contributes no margin.
    fn min_rtt_margin(&self, mtu: u16, bw: Bandwidth) -> Duration {
        let percent_component = self.min_rtt / 50; // 2%
        let bytes = 2 * mtu as u64;
        let bps = bw.as_bytes_per_second();
        let byte_component = if bps > 0 {
            Duration::from_secs_f64(bytes as f64 / bps as f64)
        } else {
            Duration::ZERO
        };
        percent_component.saturating_add(byte_component)
    }

    /// `UpdateMinRtt`: lowers `min_rtt` on a new minimum, or — within the
    /// local min-RTT-margin band — refreshes the staleness stamp without
    /// lowering `min_rtt`, suppressing a spurious `ProbeRtt` entry caused by
    /// RTT noise rather than a genuine path change (§4.6.5). Independent of
    /// that margin band, `min_rtt` force-expires and re-windows from the
    /// current sample once it has gone `MIN_RTT_FILTER_LEN` without a fresh
    /// minimum, the way a real windowed-min filter ages out a stale entry.
    pub fn update_min_rtt(&mut self, rtt_sample: Duration, mtu: u16, bw: Bandwidth, now: Timestamp) {
        let expired = match self.min_rtt_stamp {
            None => true,
            Some(stamp) => now.saturating_duration_since(stamp) > MIN_RTT_FILTER_LEN,
        };

        if rtt_sample <= self.min_rtt || expired {
            self.min_rtt = rtt_sample;
            self.min_rtt_stamp = Some(now);
            return;
        }

        let margin = self.min_rtt_margin(mtu, bw);
        if rtt_sample <= self.min_rtt.saturating_add(margin) {
            self.min_rtt_stamp = Some(now);
        }
    }

    /// `no new min_rtt for ProbeRTTInterval`.
    pub fn probe_rtt_expired(&self, now: Timestamp) -> bool {
        match self.min_rtt_stamp {
            None => true,
            Some(stamp) => now.saturating_duration_since(stamp) >= PROBE_RTT_INTERVAL,
        }
    }

    /// Called on exit from `ProbeRtt` to re-arm the expiry window from the
    /// freshly re-measured `min_rtt`.
    pub fn schedule_next_probe_rtt(&mut self, now: Timestamp) {
        self.min_rtt_stamp = Some(now);
    }

    pub fn update_upper_bound(&mut self, inflight_hi: u64) {
        self.inflight_hi = self.inflight_hi.max(inflight_hi);
    }

    pub fn set_upper_bound(&mut self, inflight_hi: u64) {
        self.inflight_hi = inflight_hi;
    }

    /// `AdaptLowerBoundsFromCongestion` for the volume side (§4.4): initialize
    /// `inflight_lo` from `cwnd` the first time it's needed, then back it off
    /// towards `inflight_latest` by `Beta`.
    pub fn update_lower_bound(&mut self, cwnd: u64, inflight_latest: u64) {
        if self.inflight_lo == u64::MAX {
            self.inflight_lo = cwnd;
        }
        let backed_off = (self.inflight_lo as u128 * *BETA.numer() as u128 / *BETA.denom() as u128) as u64;
        self.inflight_lo = inflight_latest.max(backed_off);
    }

    pub fn reset_lower_bound(&mut self) {
        self.inflight_lo = u64::MAX;
    }

    /// Rotates the `ExtraAckedFilter` slot on a round boundary (§4.2).
    pub fn advance_extra_acked_filter(&mut self, round_count: u64) {
        self.extra_acked_filter.start_period(round_count);
    }

    /// `UpdateAckAggregation` (§4.5).
    pub fn update_ack_aggregation(
        &mut self,
        bw: Bandwidth,
        newly_acked: u64,
        cwnd: u64,
        round_count: u64,
        now: Timestamp,
    ) {
        let interval_start = *self.extra_acked_interval_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(interval_start);
        let expected_delivered = bw * elapsed;

        if self.extra_acked_delivered <= expected_delivered {
            self.extra_acked_interval_start = Some(now);
            self.extra_acked_delivered = 0;
        }

        self.extra_acked_delivered += newly_acked;
        let extra = self
            .extra_acked_delivered
            .saturating_sub(expected_delivered)
            .min(cwnd);
        self.extra_acked_filter.update(round_count, extra);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration as Dur;

    fn ts(micros: u64) -> Timestamp {
        Timestamp::from_duration(Dur::from_micros(micros))
    }

    #[test]
    fn min_rtt_lowers_on_new_minimum() {
        let mut model = Model::default();
        model.update_min_rtt(Dur::from_millis(50), 1200, Bandwidth::ZERO, ts(0));
        assert_eq!(model.min_rtt(), Dur::from_millis(50));
        model.update_min_rtt(Dur::from_millis(40), 1200, Bandwidth::ZERO, ts(1));
        assert_eq!(model.min_rtt(), Dur::from_millis(40));
    }

    #[test]
    fn rtt_within_margin_refreshes_stamp_without_lowering_min_rtt() {
        let mut model = Model::default();
        let bw = Bandwidth::from_bits_per_second(8_000_000); // 1 MB/s
        model.update_min_rtt(Dur::from_millis(50), 1200, bw, ts(0));
        // small increase, well within the 2% + small byte term margin
        model.update_min_rtt(Dur::from_micros(50_500), 1200, bw, ts(1_000_000));
        assert_eq!(model.min_rtt(), Dur::from_millis(50));
        assert!(!model.probe_rtt_expired(ts(1_000_000)));
    }

    #[test]
    fn min_rtt_force_expires_and_rewindows_after_filter_len_without_a_new_minimum() {
        let mut model = Model::default();
        model.update_min_rtt(Dur::from_millis(50), 1200, Bandwidth::ZERO, ts(0));

        // a later, higher sample within MIN_RTT_FILTER_LEN must not raise
        // min_rtt (outside the noise margin, so it's simply ignored).
        let still_within_window = MIN_RTT_FILTER_LEN - Dur::from_secs(1);
        model.update_min_rtt(
            Dur::from_millis(80),
            1200,
            Bandwidth::ZERO,
            ts(still_within_window.as_micros() as u64),
        );
        assert_eq!(model.min_rtt(), Dur::from_millis(50));

        // once MIN_RTT_FILTER_LEN has elapsed without a fresh minimum, the
        // window force-expires and re-centers on the latest sample even
        // though it's higher than the old min_rtt.
        let past_window = MIN_RTT_FILTER_LEN + Dur::from_secs(1);
        model.update_min_rtt(
            Dur::from_millis(80),
            1200,
            Bandwidth::ZERO,
            ts(past_window.as_micros() as u64),
        );
        assert_eq!(model.min_rtt(), Dur::from_millis(80));
    }

    #[test]
    fn probe_rtt_expires_after_interval_without_refresh() {
        let mut model = Model::default();
        model.update_min_rtt(Dur::from_millis(50), 1200, Bandwidth::ZERO, ts(0));
        assert!(!model.probe_rtt_expired(ts(1)));
        assert!(model.probe_rtt_expired(ts(
            PROBE_RTT_INTERVAL.as_micros() as u64 + 1
        )));
    }

    #[test]
    fn extra_acked_resets_interval_when_delivery_catches_up() {
        let mut model = Model::default();
        let bw = Bandwidth::from_bits_per_second(8_000_000_000); // 1 GB/s, fast
        model.update_ack_aggregation(bw, 1000, 100_000, 0, ts(0));
        assert!(model.extra_acked() <= 1000);
    }
}
