// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! Control output: pacing rate and send quantum (§4.7).

use crate::bandwidth::Bandwidth;
use num_rational::Ratio;

/// `PacingMarginPercent` (§6): the pacing rate target is shaded down by this
/// fraction to leave headroom against measurement error.
pub const PACING_MARGIN_PERCENT: u64 = 1;
const PACING_RATIO: Ratio<u64> = Ratio::new_raw(99, 100);

/// Floor below which `send_quantum` drops to a single MTU instead of two.
const SEND_QUANTUM_THRESHOLD: u64 = 150_000 * 8;
const MAX_SEND_QUANTUM: usize = 64 * 1024;

#[derive(Clone, Copy, Debug)]
pub struct Pacer {
    pacing_rate: Bandwidth,
    send_quantum: usize,
}

impl Pacer {
    pub fn new(max_datagram_size: u16) -> Self {
        let nominal_cwnd = 10 * max_datagram_size as u64;
        let nominal_bandwidth = Bandwidth::new(nominal_cwnd, core::time::Duration::from_millis(1));
        let pacing_rate = bandwidth_to_pacing_rate(nominal_bandwidth, crate::startup::PACING_GAIN);
        let mut pacer = Self {
            pacing_rate,
            send_quantum: max_datagram_size as usize,
        };
        pacer.set_send_quantum(max_datagram_size);
        pacer
    }

    pub fn pacing_rate(&self) -> Bandwidth {
        self.pacing_rate
    }

    pub fn send_quantum(&self) -> usize {
        self.send_quantum
    }

    /// `pacing_rate` is only *lowered* before `filled_pipe`; once the pipe is
    /// full it tracks the gain-scaled target directly (§4.7).
    pub fn set_pacing_rate(&mut self, bw: Bandwidth, gain: Ratio<u64>, filled_pipe: bool) {
        let rate = bandwidth_to_pacing_rate(bw, gain);
        if filled_pipe || rate.as_bits_per_second() > self.pacing_rate.as_bits_per_second() {
            self.pacing_rate = rate;
        }
    }

    pub fn set_send_quantum(&mut self, max_datagram_size: u16) {
        let floor = if self.pacing_rate.as_bits_per_second() < SEND_QUANTUM_THRESHOLD {
            max_datagram_size as usize
        } else {
            2 * max_datagram_size as usize
        };

        let burst = (self.pacing_rate * core::time::Duration::from_millis(1)) as usize;
        self.send_quantum = burst.max(floor).min(MAX_SEND_QUANTUM);
    }
}

/// `bandwidth * gain * (1 - PacingMarginPercent / 100)`.
fn bandwidth_to_pacing_rate(bw: Bandwidth, gain: Ratio<u64>) -> Bandwidth {
    bw * gain * PACING_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pacer_has_a_startup_gain_scaled_nominal_rate() {
        let pacer = Pacer::new(1200);
        assert!(pacer.pacing_rate().as_bits_per_second() > 0);
        assert!(pacer.send_quantum() >= 1200);
    }

    #[test]
    fn set_pacing_rate_only_raises_before_filled_pipe() {
        let mut pacer = Pacer::new(1200);
        let high = Bandwidth::from_bits_per_second(1_000_000_000);
        pacer.set_pacing_rate(high, Ratio::new(1, 1), false);
        let after_high = pacer.pacing_rate();

        let low = Bandwidth::from_bits_per_second(1_000);
        pacer.set_pacing_rate(low, Ratio::new(1, 1), false);
        // a lower target is ignored before filled_pipe: Startup's pacing rate
        // only ever grows until the pipe is judged full.
        assert_eq!(pacer.pacing_rate(), after_high);
    }

    #[test]
    fn set_pacing_rate_always_tracks_target_after_filled_pipe() {
        let mut pacer = Pacer::new(1200);
        let low = Bandwidth::from_bits_per_second(1_000);
        pacer.set_pacing_rate(low, Ratio::new(1, 1), true);
        assert_eq!(pacer.pacing_rate(), bandwidth_to_pacing_rate(low, Ratio::new(1, 1)));
    }

    #[test]
    fn send_quantum_uses_two_mtu_floor_above_threshold() {
        let mut pacer = Pacer::new(1200);
        pacer.set_pacing_rate(
            Bandwidth::from_bits_per_second(SEND_QUANTUM_THRESHOLD * 10),
            Ratio::new(1, 1),
            true,
        );
        pacer.set_send_quantum(1200);
        assert!(pacer.send_quantum() >= 2 * 1200);
    }
}
