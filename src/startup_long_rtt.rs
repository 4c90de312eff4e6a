// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! `StartupLongRtt` (§4.6.2): the local Hystart-based alternate startup used
//! for paths whose minimum RTT is too large for ordinary BBR Startup to be
//! well behaved (satellite / long-haul links).
//!
//! The delay-based trigger (`hystart_test`) is grounded on the host
//! transport's `recovery::hybrid_slow_start::HybridSlowStart`: the same
//! `N_SAMPLING = 8`, the same `clamp(last_min_rtt / 8, 4ms, 16ms)` threshold,
//! and the same `low_ssthresh = 16 * mtu` floor below which the heuristic is
//! not trusted. `hystart_loss_volume_test` has no analogue in the host's own
//! Hystart (which has no loss-based trigger); per SPEC_FULL.md it reuses
//! `IsInflightTooHigh` (§4.6.1), called by the caller in `bbr.rs` rather than
//! duplicated here.

use core::time::Duration;

/// `TargetRenoRtt`: the RTT above which Startup hands off to StartupLongRtt.
pub const TARGET_RENO_RTT: Duration = Duration::from_millis(100);
/// `TargetSatelliteRtt`: the cap applied to the initial cwnd scale factor.
pub const TARGET_SATELLITE_RTT: Duration = Duration::from_millis(800);

const LOW_SSTHRESH_MTU_MULTIPLE: u64 = 16;
const N_SAMPLING: usize = 8;
const MIN_DELAY_THRESHOLD: Duration = Duration::from_millis(4);
const MAX_DELAY_THRESHOLD: Duration = Duration::from_millis(16);
const THRESHOLD_DIVIDEND: u32 = 8;

/// Delay-based Hystart filter used while the state is `StartupLongRtt`.
#[derive(Clone, Debug)]
pub struct HystartFilter {
    sample_count: usize,
    last_min_rtt: Option<Duration>,
    cur_min_rtt: Option<Duration>,
    max_datagram_size: u16,
}

impl HystartFilter {
    pub fn new(max_datagram_size: u16) -> Self {
        Self {
            sample_count: 0,
            last_min_rtt: None,
            cur_min_rtt: None,
            max_datagram_size,
        }
    }

    pub fn low_ssthresh(&self) -> u64 {
        LOW_SSTHRESH_MTU_MULTIPLE * self.max_datagram_size as u64
    }

    /// Called on every RTT sample while in `StartupLongRtt`. `round_start`
    /// marks the start of a new BBR round (the Hystart sampling round is
    /// tied to BBR's own round boundary rather than a separate timer).
    /// Returns `true` the instant the delay-increase trigger fires
    /// (`hystart_test`).
    pub fn on_rtt_sample(&mut self, round_start: bool, rtt: Duration, cwnd: u64) -> bool {
        if round_start {
            self.last_min_rtt = self.cur_min_rtt;
            self.cur_min_rtt = None;
            self.sample_count = 0;
        }

        if self.sample_count < N_SAMPLING {
            self.cur_min_rtt = Some(match self.cur_min_rtt {
                Some(cur) => cur.min(rtt),
                None => rtt,
            });
        }
        self.sample_count += 1;

        if self.sample_count != N_SAMPLING {
            return false;
        }

        let (Some(last_min_rtt), Some(cur_min_rtt)) = (self.last_min_rtt, self.cur_min_rtt) else {
            return false;
        };

        let threshold = (last_min_rtt / THRESHOLD_DIVIDEND)
            .clamp(MIN_DELAY_THRESHOLD, MAX_DELAY_THRESHOLD);

        let delay_increase_is_over_threshold = cur_min_rtt >= last_min_rtt + threshold;
        let cwnd_is_above_minimum = cwnd >= self.low_ssthresh();

        delay_increase_is_over_threshold && cwnd_is_above_minimum
    }
}

/// Scale factor applied to the initial cwnd on entry to `StartupLongRtt`:
/// `rtt_min / TargetRenoRtt`, capped so the scale never exceeds
/// `TargetSatelliteRtt / TargetRenoRtt`.
pub fn initial_cwnd_scale(rtt_min: Duration) -> num_rational::Ratio<u64> {
    let capped_rtt = rtt_min.min(TARGET_SATELLITE_RTT);
    num_rational::Ratio::new(
        capped_rtt.as_micros() as u64,
        TARGET_RENO_RTT.as_micros() as u64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_one_at_target_reno_rtt() {
        let scale = initial_cwnd_scale(TARGET_RENO_RTT);
        assert_eq!(scale, num_rational::Ratio::new(1, 1));
    }

    #[test]
    fn scale_caps_at_satellite_rtt() {
        let scale = initial_cwnd_scale(Duration::from_secs(10));
        assert_eq!(
            scale,
            num_rational::Ratio::new(
                TARGET_SATELLITE_RTT.as_micros() as u64,
                TARGET_RENO_RTT.as_micros() as u64
            )
        );
    }

    #[test]
    fn hystart_test_does_not_fire_below_low_ssthresh() {
        let mut filter = HystartFilter::new(1200);
        // cwnd well below low_ssthresh (16 * 1200 = 19200)
        let cwnd = 4000;
        let mut fired = false;
        for round in 0..2 {
            for i in 0..8 {
                let rtt = if round == 0 {
                    Duration::from_millis(100)
                } else {
                    Duration::from_millis(200)
                };
                fired |= filter.on_rtt_sample(i == 0, rtt, cwnd);
            }
        }
        assert!(!fired);
    }

    #[test]
    fn hystart_test_fires_on_sustained_delay_increase() {
        let mut filter = HystartFilter::new(1200);
        let cwnd = 40_000; // above low_ssthresh
        let mut fired = false;
        for i in 0..8 {
            fired |= filter.on_rtt_sample(i == 0, Duration::from_millis(100), cwnd);
        }
        assert!(!fired);
        for i in 0..8 {
            fired |= filter.on_rtt_sample(i == 0, Duration::from_millis(130), cwnd);
        }
        assert!(fired);
    }
}
