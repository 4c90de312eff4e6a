// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! `ProbeRtt` (§4.6.5): periodically shrinks `cwnd` to a floor for one round
//! trip so `min_rtt` can be re-measured without queueing delay masking it.

use crate::{round, time::Timestamp};

pub const PROBE_RTT_DURATION: core::time::Duration = core::time::Duration::from_millis(200);
const MIN_PIPE_CWND_MTU_MULTIPLE: u64 = 4;

#[derive(Clone, Copy, Debug, Default)]
pub struct State {
    done_timestamp: Option<Timestamp>,
    round_done: bool,
    prior_cwnd: u64,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_pipe_cwnd(mtu: u16) -> u64 {
        MIN_PIPE_CWND_MTU_MULTIPLE * mtu as u64
    }

    /// Saves `cwnd` so it can be restored on exit, and clears any state left
    /// over from a previous `ProbeRtt` pass.
    pub fn enter(&mut self, cwnd: u64) {
        self.prior_cwnd = cwnd;
        self.done_timestamp = None;
        self.round_done = false;
    }

    /// Called once per ACK while in `ProbeRtt`. `bytes_in_transit` is the
    /// inflight count *after* this ACK is applied. `probe_rtt_cwnd` is
    /// `max(MinPipeCwnd*mtu, 0.5*bdp)` (invariant 6, §4.6.5) — the same floor
    /// `bbr.rs::set_cwnd` bounds `cwnd` against elsewhere. Returns `true` the
    /// instant a full round has elapsed with inflight at the floor and the
    /// 200ms dwell has passed — the caller should then exit `ProbeRtt`.
    pub fn on_ack(
        &mut self,
        bytes_in_transit: u64,
        probe_rtt_cwnd: u64,
        now: Timestamp,
        round_counter: &mut round::Counter,
        delivered: u64,
        round_start: bool,
    ) -> bool {
        if bytes_in_transit > probe_rtt_cwnd {
            return false;
        }

        match self.done_timestamp {
            None => {
                self.done_timestamp = now.checked_add(PROBE_RTT_DURATION);
                self.round_done = false;
                round_counter.start(delivered, bytes_in_transit);
                false
            }
            Some(done_timestamp) => {
                if round_start {
                    self.round_done = true;
                }
                self.round_done && now >= done_timestamp
            }
        }
    }

    /// `cwin = max(cwin, prior_cwnd)` on exit (§4.6.5).
    pub fn restore_cwnd(&self, cwnd: u64) -> u64 {
        cwnd.max(self.prior_cwnd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    fn ts(millis: u64) -> Timestamp {
        Timestamp::from_duration(Duration::from_millis(millis))
    }

    #[test]
    fn stays_in_probe_rtt_until_floor_and_dwell_and_round_all_pass() {
        let mut state = State::new();
        let mtu = 1200;
        let floor = State::min_pipe_cwnd(mtu);
        state.enter(40_000);
        let mut round_counter = round::Counter::default();

        // inflight still above the floor: no progress towards exit.
        assert!(!state.on_ack(floor + 1, floor, ts(0), &mut round_counter, 0, false));

        // inflight reaches the floor: arms the 200ms dwell timer.
        assert!(!state.on_ack(floor, floor, ts(0), &mut round_counter, 0, false));

        // dwell not yet elapsed.
        assert!(!state.on_ack(floor, floor, ts(100), &mut round_counter, 0, true));

        // dwell elapsed and a round has passed: exit.
        assert!(state.on_ack(floor, floor, ts(250), &mut round_counter, 1000, true));
    }

    #[test]
    fn arms_the_dwell_timer_against_the_larger_bdp_scaled_floor() {
        let mut state = State::new();
        let mtu = 1200;
        let min_pipe_cwnd = State::min_pipe_cwnd(mtu);
        // 0.5*bdp is well above min_pipe_cwnd here: an inflight count between
        // the two floors must still be treated as "at the floor" and allowed
        // to arm the dwell timer, not rejected against the smaller
        // min_pipe_cwnd alone.
        let probe_rtt_cwnd = min_pipe_cwnd + 10_000;
        let inflight = min_pipe_cwnd + 1_000;
        state.enter(200_000);
        let mut round_counter = round::Counter::default();

        assert!(!state.on_ack(inflight, probe_rtt_cwnd, ts(0), &mut round_counter, 0, false));
        assert!(!state.on_ack(inflight, probe_rtt_cwnd, ts(100), &mut round_counter, 0, true));
        assert!(state.on_ack(inflight, probe_rtt_cwnd, ts(250), &mut round_counter, 1000, true));
    }

    #[test]
    fn restore_cwnd_never_goes_below_prior_cwnd() {
        let mut state = State::new();
        state.enter(50_000);
        assert_eq!(state.restore_cwnd(4_000), 50_000);
        assert_eq!(state.restore_cwnd(60_000), 60_000);
    }
}
