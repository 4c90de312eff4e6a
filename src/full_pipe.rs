// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! Full-pipe detection (§4.6.1): decides when Startup (or StartupLongRtt) has
//! filled the bottleneck and should hand off to Drain.

use crate::{bandwidth::Bandwidth, counter::Counter, startup};

/// Consecutive high-loss rounds that independently declare the pipe full,
/// mirroring the high-loss Startup exit (§4.6.1).
const STARTUP_FULL_LOSS_COUNT: u8 = 3;

#[derive(Clone, Debug, Default)]
pub struct Estimator {
    filled_pipe: bool,
    full_bw: Bandwidth,
    full_bw_count: Counter<u8>,
    loss_bursts: Counter<u8>,
    in_recovery_last_round: bool,
}

impl Estimator {
    pub fn filled_pipe(&self) -> bool {
        self.filled_pipe
    }

    /// Called once per round while in Startup/StartupLongRtt. `max_bw` is the
    /// current windowed maximum delivery rate.
    pub fn on_round_start(&mut self, max_bw: Bandwidth, in_recovery: bool) {
        if self.bandwidth_plateaued(max_bw) || self.excessive_loss(in_recovery) {
            self.filled_pipe = true;
        }
        self.in_recovery_last_round = in_recovery;
    }

    pub fn on_packet_lost(&mut self, new_loss_burst: bool) {
        if new_loss_burst {
            self.loss_bursts += 1u8;
        }
    }

    /// `4 * max_bw >= 5 * full_bw` ⇒ the pipe is still growing (§4.6.1); three
    /// consecutive rounds below that growth rate declare it full.
    fn bandwidth_plateaued(&mut self, max_bw: Bandwidth) -> bool {
        if self.full_bw == Bandwidth::ZERO
            || max_bw.as_bits_per_second() * startup::DELIVERY_RATE_INCREASE_DENOMINATOR
                >= self.full_bw.as_bits_per_second() * startup::DELIVERY_RATE_INCREASE_NUMERATOR
        {
            // Still growing: reset the plateau counter against the new peak.
            self.full_bw = max_bw;
            self.full_bw_count.set(0);
            return false;
        }

        self.full_bw_count += 1u8;
        *self.full_bw_count >= startup::BANDWIDTH_PLATEAU_ROUND_COUNT
    }

    fn excessive_loss(&self, in_recovery: bool) -> bool {
        in_recovery && self.in_recovery_last_round && *self.loss_bursts >= STARTUP_FULL_LOSS_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plateau_over_three_rounds_fills_pipe() {
        let mut est = Estimator::default();
        let bw = Bandwidth::from_bits_per_second(100_000_000);
        est.on_round_start(bw, false);
        assert!(!est.filled_pipe());

        for _ in 0..3 {
            est.on_round_start(bw, false);
        }
        assert!(est.filled_pipe());
    }

    #[test]
    fn growth_at_or_above_twenty_five_percent_resets_counter() {
        let mut est = Estimator::default();
        let mut bw = Bandwidth::from_bits_per_second(1_000_000);
        est.on_round_start(bw, false);
        for _ in 0..2 {
            bw = Bandwidth::from_bits_per_second(bw.as_bits_per_second() * 5 / 4);
            est.on_round_start(bw, false);
            assert!(!est.filled_pipe());
        }
    }
}
