// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! The ProbeBw cycle (§4.6.4): DOWN → CRUISE → REFILL → UP → DOWN.
//!
//! Deviates from the teacher's `recovery::bbr::probe_bw` in one place: the
//! teacher uses the same gain constant for CRUISE and REFILL (1.0), but
//! SPEC_FULL.md's gain table (§4.6.4) gives REFILL a distinct 1.25 gain,
//! matching the UP phase. This implementation follows the spec's table.

use crate::{
    counter::Counter, data_rate, data_volume, random::Generator, round, time::Timestamp,
};
use core::time::Duration;
use num_rational::Ratio;

pub const MAX_BW_PROBE_UP_ROUNDS: u8 = 30;
pub const MAX_BW_PROBE_ROUNDS: u64 = 63;

const CWND_GAIN: Ratio<u64> = Ratio::new_raw(2, 1);
const DOWN_PACING_GAIN: Ratio<u64> = Ratio::new_raw(9, 10);
const CRUISE_PACING_GAIN: Ratio<u64> = Ratio::new_raw(1, 1);
const REFILL_PACING_GAIN: Ratio<u64> = Ratio::new_raw(5, 4);
const UP_PACING_GAIN: Ratio<u64> = Ratio::new_raw(5, 4);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CyclePhase {
    Down,
    Cruise,
    Refill,
    Up,
}

impl CyclePhase {
    pub fn pacing_gain(&self) -> Ratio<u64> {
        match self {
            CyclePhase::Down => DOWN_PACING_GAIN,
            CyclePhase::Cruise => CRUISE_PACING_GAIN,
            CyclePhase::Refill => REFILL_PACING_GAIN,
            CyclePhase::Up => UP_PACING_GAIN,
        }
    }

    pub fn cwnd_gain(&self) -> Ratio<u64> {
        CWND_GAIN
    }

    fn transition_to(&mut self, next: CyclePhase) {
        debug_assert!(
            matches!(
                (*self, next),
                (CyclePhase::Down, CyclePhase::Cruise)
                    | (CyclePhase::Down, CyclePhase::Refill)
                    | (CyclePhase::Cruise, CyclePhase::Refill)
                    | (CyclePhase::Refill, CyclePhase::Up)
                    | (CyclePhase::Up, CyclePhase::Down)
            ),
            "invalid ProbeBw transition {:?} -> {:?}",
            self,
            next
        );
        *self = next;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckPhase {
    Init,
    ProbeStopping,
    Refilling,
    ProbeStarting,
    ProbeFeedback,
}

#[derive(Clone, Debug)]
pub struct State {
    cycle_phase: CyclePhase,
    ack_phase: AckPhase,
    bw_probe_wait: Duration,
    rounds_since_bw_probe: Counter<u8>,
    bw_probe_up_cnt: u64,
    bw_probe_up_acks: u64,
    bw_probe_up_rounds: u8,
    cycle_stamp: Option<Timestamp>,
    bw_probe_samples: bool,
}

impl State {
    pub fn new() -> Self {
        Self {
            cycle_phase: CyclePhase::Down,
            ack_phase: AckPhase::Init,
            bw_probe_wait: Duration::ZERO,
            rounds_since_bw_probe: Counter::new(0),
            bw_probe_up_cnt: u64::MAX,
            bw_probe_up_acks: 0,
            bw_probe_up_rounds: 0,
            cycle_stamp: None,
            bw_probe_samples: false,
        }
    }

    pub fn cycle_phase(&self) -> CyclePhase {
        self.cycle_phase
    }

    pub fn ack_phase(&self) -> AckPhase {
        self.ack_phase
    }

    pub fn set_ack_phase(&mut self, ack_phase: AckPhase) {
        self.ack_phase = ack_phase;
    }

    pub fn bw_probe_samples(&self) -> bool {
        self.bw_probe_samples
    }

    pub fn set_bw_probe_samples(&mut self, value: bool) {
        self.bw_probe_samples = value;
    }

    pub fn on_round_start(&mut self) {
        self.rounds_since_bw_probe += 1u8;
    }

    fn has_elapsed_in_phase(&self, interval: Duration, now: Timestamp) -> bool {
        self.cycle_stamp
            .is_some_and(|stamp| now.saturating_duration_since(stamp) >= interval)
    }

    pub fn is_time_to_probe_bw(&self, target_inflight: u64, mtu: u16, now: Timestamp) -> bool {
        self.has_elapsed_in_phase(self.bw_probe_wait, now)
            || self.is_reno_coexistence_probe_time(target_inflight, mtu)
    }

    fn is_reno_coexistence_probe_time(&self, target_inflight: u64, mtu: u16) -> bool {
        let reno_rounds = (target_inflight / mtu.max(1) as u64).min(MAX_BW_PROBE_ROUNDS);
        *self.rounds_since_bw_probe as u64 >= reno_rounds
    }

    pub fn has_elapsed_since_cycle_start(&self, interval: Duration, now: Timestamp) -> bool {
        self.has_elapsed_in_phase(interval, now)
    }

    fn raise_inflight_hi_slope(&mut self, cwnd: u64, mtu: u16) {
        let growth_this_round: u64 = 1u64 << self.bw_probe_up_rounds.min(MAX_BW_PROBE_UP_ROUNDS - 1);
        self.bw_probe_up_rounds = (self.bw_probe_up_rounds + 1).min(MAX_BW_PROBE_UP_ROUNDS);
        self.bw_probe_up_cnt = (cwnd / growth_this_round.max(1)).max(mtu as u64);
    }

    /// Grows `inflight_hi` by `newly_acked / bw_probe_up_cnt` each ACK while
    /// in UP (§4.6.4 `ProbeInflightHiUpward`).
    pub fn probe_inflight_hi_upward(
        &mut self,
        bytes_acknowledged: u64,
        data_volume: &mut data_volume::Model,
        cwnd: u64,
        mtu: u16,
        round_start: bool,
    ) {
        self.bw_probe_up_acks += bytes_acknowledged;
        let bw_probe_up_cnt = self.bw_probe_up_cnt.max(1);
        if self.bw_probe_up_acks >= bw_probe_up_cnt {
            let delta = self.bw_probe_up_acks / bw_probe_up_cnt;
            self.bw_probe_up_acks -= delta * bw_probe_up_cnt;
            let grown = data_volume
                .inflight_hi()
                .saturating_add(delta.saturating_mul(mtu as u64));
            data_volume.update_upper_bound(grown);
        }
        if round_start {
            self.raise_inflight_hi_slope(cwnd, mtu);
        }
    }

    pub fn start_cruise(&mut self) {
        self.cycle_phase.transition_to(CyclePhase::Cruise);
    }

    pub fn start_up(
        &mut self,
        round_counter: &mut round::Counter,
        delivered: u64,
        bytes_in_transit: u64,
        cwnd: u64,
        mtu: u16,
        now: Timestamp,
    ) {
        self.ack_phase = AckPhase::ProbeStarting;
        round_counter.start(delivered, bytes_in_transit);
        self.cycle_stamp = Some(now);
        self.cycle_phase.transition_to(CyclePhase::Up);
        self.raise_inflight_hi_slope(cwnd, mtu);
    }

    pub fn start_refill(
        &mut self,
        data_rate: &mut data_rate::Model,
        data_volume: &mut data_volume::Model,
        round_counter: &mut round::Counter,
        delivered: u64,
        bytes_in_transit: u64,
    ) {
        data_rate.reset_lower_bound();
        data_volume.reset_lower_bound();
        self.bw_probe_up_rounds = 0;
        self.bw_probe_up_acks = 0;
        self.ack_phase = AckPhase::Refilling;
        round_counter.start(delivered, bytes_in_transit);
        self.cycle_phase.transition_to(CyclePhase::Refill);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn start_down(
        &mut self,
        round_counter: &mut round::Counter,
        delivered: u64,
        bytes_in_transit: u64,
        random_generator: &mut dyn Generator,
        now: Timestamp,
    ) {
        self.bw_probe_up_cnt = u64::MAX;
        self.pick_probe_wait(random_generator);
        self.cycle_stamp = Some(now);
        self.ack_phase = AckPhase::ProbeStopping;
        round_counter.start(delivered, bytes_in_transit);
        self.cycle_phase.transition_to(CyclePhase::Down);
    }

    fn pick_probe_wait(&mut self, random_generator: &mut dyn Generator) {
        self.rounds_since_bw_probe.set(random_generator.gen_range(2) as u8);
        let wait_ms = 2000 + random_generator.gen_range(1000);
        self.bw_probe_wait = Duration::from_millis(wait_ms);
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::testing::Deterministic;

    #[test]
    fn pacing_gain_matches_spec_table() {
        assert_eq!(CyclePhase::Down.pacing_gain(), Ratio::new(9, 10));
        assert_eq!(CyclePhase::Cruise.pacing_gain(), Ratio::new(1, 1));
        assert_eq!(CyclePhase::Refill.pacing_gain(), Ratio::new(5, 4));
        assert_eq!(CyclePhase::Up.pacing_gain(), Ratio::new(5, 4));
    }

    #[test]
    fn refill_and_cruise_gains_are_distinct() {
        assert_ne!(CyclePhase::Refill.pacing_gain(), CyclePhase::Cruise.pacing_gain());
    }

    #[test]
    #[should_panic(expected = "invalid ProbeBw transition")]
    fn invalid_transition_panics_in_debug() {
        let mut phase = CyclePhase::Down;
        phase.transition_to(CyclePhase::Up);
    }

    #[test]
    fn pick_probe_wait_stays_within_spec_bounds() {
        let mut state = State::new();
        let mut rng = Deterministic::new(42);
        state.pick_probe_wait(&mut rng);
        assert!(*state.rounds_since_bw_probe <= 1);
        assert!(state.bw_probe_wait >= Duration::from_secs(2));
        assert!(state.bw_probe_wait < Duration::from_secs(3));
    }

    #[test]
    fn raise_inflight_hi_slope_saturates_rounds_at_thirty() {
        let mut state = State::new();
        for _ in 0..40 {
            state.raise_inflight_hi_slope(100_000, 1200);
        }
        assert_eq!(state.bw_probe_up_rounds, MAX_BW_PROBE_UP_ROUNDS);
    }
}
