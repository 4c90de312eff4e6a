// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! `BbrCongestionController`: the six-state machine and per-ACK pipeline
//! (§2, §4.6) that ties every other module together.

use crate::{
    bandwidth::{Bandwidth, RateSample},
    congestion_controller::{self, AckSample, PathInfo},
    data_rate, data_volume, drain, full_pipe, loss, pacing, plugin, probe_bw, probe_rtt,
    random::Generator,
    recovery, round, startup, startup_long_rtt,
    time::Timestamp,
};
use core::time::Duration;
use num_rational::Ratio;

const MIN_PIPE_CWND_MULTIPLE: u64 = 4;
const INITIAL_CWND_MULTIPLE: u64 = 10;
/// `1 - Headroom` (§6).
const HEADROOM_COMPLEMENT: Ratio<u64> = Ratio::new_raw(17, 20);

/// `IsInflightTooHigh`: `lost > LossThresh * tx_in_flight` (§4.6.1, §6).
fn is_inflight_too_high(tx_in_flight: u64, lost: u64) -> bool {
    (lost as u128) * (*startup::LOSS_THRESH.denom() as u128)
        > (tx_in_flight as u128) * (*startup::LOSS_THRESH.numer() as u128)
}

#[derive(Clone, Debug)]
enum State {
    Startup,
    StartupLongRtt(startup_long_rtt::HystartFilter),
    Drain,
    ProbeBw(probe_bw::State),
    ProbeRtt(probe_rtt::State),
}

/// The per-path BBRv3 congestion controller.
#[derive(Debug)]
pub struct BbrCongestionController {
    max_datagram_size: u16,
    client_mode: bool,
    unique_path_id: u64,

    state: State,
    round: round::Counter,
    data_rate: data_rate::Model,
    data_volume: data_volume::Model,
    full_pipe: full_pipe::Estimator,
    loss: loss::SmoothedLossRate,
    pacer: pacing::Pacer,
    recovery: recovery::State,

    cwnd: u64,
    delivered_total: u64,
    bw_latest: Bandwidth,
    inflight_latest: u64,
    loss_in_round: bool,
    loss_round_delivered: u64,
    bdp_seed: Option<u64>,
    idle_restart: bool,
    is_ssthresh_initialized: bool,
}

impl BbrCongestionController {
    pub fn new(path_info: PathInfo) -> Self {
        let mtu = path_info.max_datagram_size;
        Self {
            max_datagram_size: mtu,
            client_mode: path_info.client_mode,
            unique_path_id: path_info.unique_path_id,
            state: State::Startup,
            round: round::Counter::default(),
            data_rate: data_rate::Model::default(),
            data_volume: data_volume::Model::default(),
            full_pipe: full_pipe::Estimator::default(),
            loss: loss::SmoothedLossRate::default(),
            pacer: pacing::Pacer::new(mtu),
            recovery: recovery::State::default(),
            cwnd: INITIAL_CWND_MULTIPLE * mtu as u64,
            delivered_total: 0,
            bw_latest: Bandwidth::ZERO,
            inflight_latest: 0,
            loss_in_round: false,
            loss_round_delivered: 0,
            bdp_seed: None,
            idle_restart: false,
            is_ssthresh_initialized: false,
        }
    }

    pub fn congestion_window(&self) -> u64 {
        self.cwnd
    }

    pub fn pacing_rate(&self) -> Bandwidth {
        self.pacer.pacing_rate()
    }

    pub fn send_quantum(&self) -> usize {
        self.pacer.send_quantum()
    }

    pub fn loss_rate(&self) -> f64 {
        self.loss.loss_rate()
    }

    pub fn is_ssthresh_initialized(&self) -> bool {
        self.is_ssthresh_initialized
    }

    fn filled_pipe(&self) -> bool {
        !matches!(self.state, State::Startup | State::StartupLongRtt(_))
    }

    fn pacing_gain(&self) -> Ratio<u64> {
        match &self.state {
            State::Startup | State::StartupLongRtt(_) => startup::PACING_GAIN,
            State::Drain => drain::PACING_GAIN,
            State::ProbeBw(state) => state.cycle_phase().pacing_gain(),
            State::ProbeRtt(_) => Ratio::new(1, 1),
        }
    }

    fn cwnd_gain(&self) -> Ratio<u64> {
        match &self.state {
            State::Startup | State::StartupLongRtt(_) => startup::CWND_GAIN,
            State::Drain => drain::CWND_GAIN,
            State::ProbeBw(state) => state.cycle_phase().cwnd_gain(),
            State::ProbeRtt(_) => Ratio::new(1, 2),
        }
    }

    /// `bdp = bw * min_rtt`, falling back to `InitialCwnd*mtu` before the
    /// first RTT sample (invariant 5).
    fn bdp(&self) -> u64 {
        self.inflight_with_bw(Ratio::new(1, 1), self.data_rate.bw())
    }

    fn inflight_with_bw(&self, gain: Ratio<u64>, bw: Bandwidth) -> u64 {
        if self.data_volume.min_rtt() == Duration::MAX {
            return INITIAL_CWND_MULTIPLE * self.max_datagram_size as u64;
        }
        (bw * gain) * self.data_volume.min_rtt()
    }

    fn bdp_multiple(&self, gain: Ratio<u64>) -> u64 {
        self.inflight_with_bw(gain, self.data_rate.bw())
    }

    fn target_inflight(&self) -> u64 {
        self.bdp().min(self.cwnd)
    }

    /// `ProbeRTTCwnd = max(MinPipeCwnd*mtu, 0.5*bdp)` (invariant 6, §4.6.5).
    fn probe_rtt_cwnd(&self) -> u64 {
        (self.bdp() / 2).max(MIN_PIPE_CWND_MULTIPLE * self.max_datagram_size as u64)
    }

    fn inflight_with_headroom(&self) -> u64 {
        let inflight_hi = self.data_volume.inflight_hi();
        if inflight_hi == u64::MAX {
            return u64::MAX;
        }
        let scaled = (inflight_hi as u128 * *HEADROOM_COMPLEMENT.numer() as u128
            / *HEADROOM_COMPLEMENT.denom() as u128) as u64;
        scaled.max(MIN_PIPE_CWND_MULTIPLE * self.max_datagram_size as u64)
    }

    fn quantization_budget(&self, inflight: u64) -> u64 {
        let mtu = self.max_datagram_size as u64;
        let mut budget = inflight
            .max(3 * self.pacer.send_quantum() as u64)
            .max(MIN_PIPE_CWND_MULTIPLE * mtu);
        if matches!(&self.state, State::ProbeBw(state) if state.cycle_phase() == probe_bw::CyclePhase::Up)
        {
            budget += 2 * mtu;
        }
        budget
    }

    /// Full ACK pipeline (§2).
    pub fn on_ack(&mut self, now: Timestamp, sample: AckSample, random_generator: &mut dyn Generator) {
        self.idle_restart = false;
        let mtu = self.max_datagram_size;
        let delivery_rate = sample.delivery_rate_or_fallback();

        // §4.3 UpdateLatestDeliverySignals
        self.bw_latest = self.bw_latest.max(delivery_rate);
        self.inflight_latest = self.inflight_latest.max(sample.delivered);
        let prior_delivered = self.delivered_total;
        self.delivered_total = self.delivered_total.saturating_add(sample.newly_acked);
        let loss_round_start = prior_delivered >= self.loss_round_delivered;
        if loss_round_start {
            self.loss_round_delivered = self.delivered_total;
        }

        self.round.on_ack(self.delivered_total);
        let round_start = self.round.round_start();
        if round_start {
            // Re-arms the next round boundary. ProbeBw/ProbeRtt phase
            // transitions additionally call `round.start` themselves to pin
            // a new boundary exactly at the transition point; this call
            // keeps rounds advancing the rest of the time (Startup, Drain,
            // ProbeBw Down/Cruise between transitions).
            self.round.start(self.delivered_total, sample.tx_in_flight);
        }

        self.data_rate.update_max_bw(RateSample {
            interval: sample.rtt_sample,
            delivered_bytes: sample.delivered,
            lost_bytes: sample.lost,
            is_app_limited: sample.is_app_limited,
            ..Default::default()
        });

        // §4.4 UpdateCongestionSignals / AdaptLowerBoundsFromCongestion
        if sample.newly_lost > 0 {
            self.loss_in_round = true;
        }
        if loss_round_start {
            if self.loss_in_round && !matches!(self.state, State::ProbeBw(_)) {
                self.data_rate.update_lower_bound(self.bw_latest);
                self.data_volume.update_lower_bound(self.cwnd, self.inflight_latest);
            }
            self.loss_in_round = false;
            self.bw_latest = delivery_rate;
            self.inflight_latest = sample.delivered;
        }

        // §4.4.1 loss-rate smoothing
        self.loss.update(sample.newly_acked, sample.newly_lost);

        // §4.2/4.5 ACK aggregation
        if round_start {
            self.data_volume.advance_extra_acked_filter(self.round.round_count());
        }
        self.data_volume.update_ack_aggregation(
            self.data_rate.bw(),
            sample.newly_acked,
            self.cwnd,
            self.round.round_count(),
            now,
        );

        self.check_startup_long_rtt(sample);
        self.check_startup_done(sample, round_start);
        self.check_drain(sample, now, random_generator);
        self.update_probe_bw_cycle_phase(sample, round_start, now, random_generator);

        self.data_volume
            .update_min_rtt(sample.rtt_sample, mtu, self.data_rate.bw(), now);
        self.check_probe_rtt(sample, round_start, now, random_generator);

        // BoundBWForModel must be the last model step.
        self.data_rate.bound_bw_for_model();

        if !self.is_ssthresh_initialized && self.filled_pipe() {
            self.is_ssthresh_initialized = true;
        }

        self.set_pacing_rate();
        self.pacer.set_send_quantum(mtu);
        self.set_cwnd(sample);
    }

    fn check_startup_long_rtt(&mut self, sample: AckSample) {
        if !matches!(self.state, State::Startup) {
            return;
        }
        if sample.rtt_sample <= startup_long_rtt::TARGET_RENO_RTT {
            return;
        }

        let scale = startup_long_rtt::initial_cwnd_scale(sample.rtt_sample);
        let mut cwnd = (self.cwnd as u128 * *scale.numer() as u128 / *scale.denom() as u128) as u64;
        if let Some(bdp_seed) = self.bdp_seed {
            cwnd = cwnd.max(bdp_seed);
        }
        self.cwnd = cwnd;
        self.state = State::StartupLongRtt(startup_long_rtt::HystartFilter::new(self.max_datagram_size));
    }

    fn check_startup_done(&mut self, sample: AckSample, round_start: bool) {
        match core::mem::replace(&mut self.state, State::Drain) {
            State::Startup => {
                if round_start {
                    self.full_pipe
                        .on_round_start(self.data_rate.max_bw(), self.recovery.in_recovery());
                }
                let inflight_too_high = is_inflight_too_high(sample.tx_in_flight, sample.lost);
                self.full_pipe.on_packet_lost(inflight_too_high);
                let rtt_too_high = sample.is_cwnd_limited && self.is_high_rtt_exit(sample);
                // IsInflightTooHigh and the high-RTT exit are their own,
                // immediate Startup-exit triggers (§4.6.1 high-loss exit,
                // high-RTT exit) independent of full_pipe's multi-round
                // loss-burst counter, which only tracks the bandwidth-plateau
                // path.
                if inflight_too_high || rtt_too_high || self.full_pipe.filled_pipe() {
                    self.enter_drain();
                } else {
                    self.state = State::Startup;
                }
            }
            State::StartupLongRtt(mut hystart) => {
                let fired = hystart.on_rtt_sample(round_start, sample.rtt_sample, self.cwnd);
                let inflight_too_high = is_inflight_too_high(sample.tx_in_flight, sample.lost);
                if fired || inflight_too_high {
                    self.enter_drain();
                } else {
                    let peak_bdp = if self.data_volume.min_rtt() == Duration::MAX {
                        INITIAL_CWND_MULTIPLE * self.max_datagram_size as u64
                    } else {
                        self.data_rate.max_bw() * self.data_volume.min_rtt()
                    };
                    let floor = peak_bdp.max(self.bdp_seed.unwrap_or(0)) / 2;
                    self.cwnd = self.cwnd.max(floor);
                    self.state = State::StartupLongRtt(hystart);
                }
            }
            other => {
                self.state = other;
            }
        }
    }

    /// High-RTT Startup exit (§4.6.1 local extension): `rtt_sample > min_rtt +
    /// min_rtt/4 + 2*rtt_variant` while cwnd-limited. `false` before the
    /// first RTT sample, since `min_rtt` is undefined until then.
    fn is_high_rtt_exit(&self, sample: AckSample) -> bool {
        let min_rtt = self.data_volume.min_rtt();
        if min_rtt == Duration::MAX {
            return false;
        }
        let threshold = min_rtt + min_rtt / 4 + 2 * sample.rtt_variant;
        sample.rtt_sample > threshold
    }

    /// Hands off from Startup/StartupLongRtt to Drain. The source's
    /// "patch a pathological min_rtt above 30s" edge case has no remaining
    /// purpose here since `min_rtt` is already bounded by `MIN_RTT_FILTER_LEN`
    /// refresh logic in `data_volume::Model`, so it is intentionally omitted.
    fn enter_drain(&mut self) {
        if self.data_volume.inflight_hi() == u64::MAX {
            self.data_volume.set_upper_bound(self.bdp());
        }
        self.state = State::Drain;
    }

    fn check_drain(&mut self, sample: AckSample, now: Timestamp, random_generator: &mut dyn Generator) {
        if !matches!(self.state, State::Drain) {
            return;
        }
        if sample.tx_in_flight <= self.bdp_multiple(Ratio::new(1, 1)) {
            self.enter_probe_bw(sample, now, random_generator);
        }
    }

    fn enter_probe_bw(&mut self, sample: AckSample, now: Timestamp, random_generator: &mut dyn Generator) {
        let mut state = probe_bw::State::new();
        state.start_down(
            &mut self.round,
            self.delivered_total,
            sample.tx_in_flight,
            random_generator,
            now,
        );
        self.data_rate.advance_max_bw_filter();
        self.state = State::ProbeBw(state);
    }

    fn adapt_upper_bounds(
        &mut self,
        state: &mut probe_bw::State,
        sample: AckSample,
        round_start: bool,
        now: Timestamp,
        random_generator: &mut dyn Generator,
    ) {
        if round_start && state.ack_phase() == probe_bw::AckPhase::ProbeStarting {
            state.set_ack_phase(probe_bw::AckPhase::ProbeFeedback);
        }

        if state.bw_probe_samples() && is_inflight_too_high(sample.tx_in_flight, sample.lost) {
            state.set_bw_probe_samples(false);
            if !sample.is_app_limited {
                let target_inflight = self.target_inflight();
                let backed_off = (target_inflight as u128 * *data_rate::BETA.numer() as u128
                    / *data_rate::BETA.denom() as u128) as u64;
                self.data_volume.set_upper_bound(sample.tx_in_flight.max(backed_off));
            }
            if state.cycle_phase() == probe_bw::CyclePhase::Up {
                state.start_down(
                    &mut self.round,
                    self.delivered_total,
                    sample.tx_in_flight,
                    random_generator,
                    now,
                );
                self.data_rate.advance_max_bw_filter();
            }
        } else {
            self.data_volume.update_upper_bound(sample.tx_in_flight);
            self.data_rate.update_upper_bound(sample.delivery_rate_or_fallback());
        }
    }

    fn update_probe_bw_cycle_phase(
        &mut self,
        sample: AckSample,
        round_start: bool,
        now: Timestamp,
        random_generator: &mut dyn Generator,
    ) {
        if !self.filled_pipe() {
            return;
        }
        let mut state = match core::mem::replace(&mut self.state, State::Drain) {
            State::ProbeBw(state) => state,
            other => {
                self.state = other;
                return;
            }
        };

        if round_start {
            state.on_round_start();
        }

        self.adapt_upper_bounds(&mut state, sample, round_start, now, random_generator);

        let target_inflight = self.target_inflight();
        let mtu = self.max_datagram_size;

        match state.cycle_phase() {
            probe_bw::CyclePhase::Down => {
                let headroom_ok = sample.tx_in_flight <= self.inflight_with_headroom();
                let bw_ok =
                    sample.tx_in_flight <= self.inflight_with_bw(Ratio::new(1, 1), self.data_rate.max_bw());
                if headroom_ok && bw_ok {
                    state.start_cruise();
                } else if state.is_time_to_probe_bw(target_inflight, mtu, now) {
                    state.start_refill(
                        &mut self.data_rate,
                        &mut self.data_volume,
                        &mut self.round,
                        self.delivered_total,
                        sample.tx_in_flight,
                    );
                }
            }
            probe_bw::CyclePhase::Cruise => {
                if state.is_time_to_probe_bw(target_inflight, mtu, now) {
                    state.start_refill(
                        &mut self.data_rate,
                        &mut self.data_volume,
                        &mut self.round,
                        self.delivered_total,
                        sample.tx_in_flight,
                    );
                }
            }
            probe_bw::CyclePhase::Refill => {
                if round_start {
                    state.start_up(
                        &mut self.round,
                        self.delivered_total,
                        sample.tx_in_flight,
                        self.cwnd,
                        mtu,
                        now,
                    );
                }
            }
            probe_bw::CyclePhase::Up => {
                let elapsed = state.has_elapsed_since_cycle_start(self.data_volume.min_rtt(), now);
                let above_bw = sample.tx_in_flight
                    > self.inflight_with_bw(Ratio::new(5, 4), self.data_rate.max_bw());
                if elapsed && above_bw {
                    state.start_down(
                        &mut self.round,
                        self.delivered_total,
                        sample.tx_in_flight,
                        random_generator,
                        now,
                    );
                    self.data_rate.advance_max_bw_filter();
                } else {
                    state.probe_inflight_hi_upward(
                        sample.newly_acked,
                        &mut self.data_volume,
                        self.cwnd,
                        mtu,
                        round_start,
                    );
                }
            }
        }

        self.state = State::ProbeBw(state);
    }

    fn check_probe_rtt(
        &mut self,
        sample: AckSample,
        round_start: bool,
        now: Timestamp,
        random_generator: &mut dyn Generator,
    ) {
        match core::mem::replace(&mut self.state, State::Drain) {
            State::ProbeRtt(mut probe_rtt_state) => {
                let done = probe_rtt_state.on_ack(
                    sample.tx_in_flight,
                    self.probe_rtt_cwnd(),
                    now,
                    &mut self.round,
                    self.delivered_total,
                    round_start,
                );
                if done {
                    self.cwnd = probe_rtt_state.restore_cwnd(self.cwnd);
                    self.data_volume.schedule_next_probe_rtt(now);
                    if self.full_pipe.filled_pipe() {
                        let mut state = probe_bw::State::new();
                        state.start_down(
                            &mut self.round,
                            self.delivered_total,
                            sample.tx_in_flight,
                            random_generator,
                            now,
                        );
                        state.start_cruise();
                        self.data_rate.advance_max_bw_filter();
                        self.state = State::ProbeBw(state);
                    } else {
                        self.state = State::Startup;
                    }
                } else {
                    self.state = State::ProbeRtt(probe_rtt_state);
                }
            }
            other @ State::StartupLongRtt(_) => {
                self.state = other;
            }
            other => {
                self.state = other;
                if self.data_volume.probe_rtt_expired(now) && !self.idle_restart {
                    let mut probe_rtt_state = probe_rtt::State::new();
                    probe_rtt_state.enter(self.cwnd);
                    self.round.start(self.delivered_total, sample.tx_in_flight);
                    self.state = State::ProbeRtt(probe_rtt_state);
                }
            }
        }
    }

    fn set_pacing_rate(&mut self) {
        if matches!(self.state, State::StartupLongRtt(_)) {
            return;
        }
        let gain = self.pacing_gain();
        let filled_pipe = self.filled_pipe();
        let bw = self.data_rate.bw();
        self.pacer.set_pacing_rate(bw, gain, filled_pipe);
    }

    fn bound_cwnd_for_model(&self, mut cwnd: u64) -> u64 {
        match &self.state {
            State::ProbeBw(state) if state.cycle_phase() != probe_bw::CyclePhase::Cruise => {
                if self.data_volume.inflight_hi() != u64::MAX {
                    cwnd = cwnd.min(self.data_volume.inflight_hi());
                }
            }
            State::ProbeRtt(_) => {
                cwnd = cwnd.min(self.inflight_with_headroom());
            }
            State::ProbeBw(_) => {
                cwnd = cwnd.min(self.inflight_with_headroom());
            }
            _ => {}
        }
        if self.data_volume.inflight_lo() != u64::MAX {
            cwnd = cwnd.min(self.data_volume.inflight_lo());
        }
        cwnd.max(MIN_PIPE_CWND_MULTIPLE * self.max_datagram_size as u64)
    }

    fn set_cwnd(&mut self, sample: AckSample) {
        if matches!(self.state, State::StartupLongRtt(_)) {
            return;
        }

        let mtu = self.max_datagram_size as u64;
        let gain = self.cwnd_gain();
        let target = self.bdp_multiple(gain).saturating_add(self.data_volume.extra_acked());
        let max_inflight = self.quantization_budget(target);

        let packet_conservation = self.recovery.packet_conservation(self.delivered_total);
        if sample.newly_lost > 0 {
            self.recovery
                .on_congestion_event(self.cwnd, self.delivered_total, sample.tx_in_flight);
        }
        self.recovery.on_ack(self.delivered_total);

        let mut cwnd = self.cwnd.saturating_sub(sample.newly_lost).max(mtu);

        if !packet_conservation {
            if self.delivered_total < INITIAL_CWND_MULTIPLE * mtu || cwnd < max_inflight {
                cwnd = cwnd.saturating_add(sample.newly_acked);
            }
            cwnd = cwnd.min(max_inflight);
        }

        cwnd = self.recovery.restore_cwnd(cwnd);

        if let State::ProbeRtt(_) = &self.state {
            cwnd = cwnd.min(self.probe_rtt_cwnd());
        }

        self.cwnd = self.bound_cwnd_for_model(cwnd);
    }

    /// `repeat` / `timeout` notifications (§4.8 `UpdateOnLoss`). Reuses the
    /// same `Beta`-scaled bound `AdaptUpperBounds` applies rather than
    /// re-deriving the source's "prefix at which losses crossed 2%"
    /// interpolation, which depends on per-packet prior-loss bookkeeping this
    /// crate does not retain (out of scope, §1).
    pub fn update_on_loss(&mut self, tx_in_flight: u64, lost: u64, is_app_limited: bool) {
        let probing = matches!(&self.state, State::ProbeBw(state) if state.bw_probe_samples());
        if probing && is_inflight_too_high(tx_in_flight, lost) {
            if !is_app_limited {
                let target_inflight = self.target_inflight();
                let backed_off = (target_inflight as u128 * *data_rate::BETA.numer() as u128
                    / *data_rate::BETA.denom() as u128) as u64;
                self.data_volume.set_upper_bound(tx_in_flight.max(backed_off));
            }
            if let State::ProbeBw(state) = &mut self.state {
                state.set_bw_probe_samples(false);
            }
        }
        self.recovery
            .on_congestion_event(self.cwnd, self.delivered_total, tx_in_flight);
    }

    fn state_code(&self) -> plugin::StateCode {
        match &self.state {
            State::Startup => plugin::StateCode::Startup,
            State::StartupLongRtt(_) => plugin::StateCode::StartupLongRtt,
            State::Drain => plugin::StateCode::Drain,
            State::ProbeBw(state) => match state.cycle_phase() {
                probe_bw::CyclePhase::Down => plugin::StateCode::ProbeBwDown,
                probe_bw::CyclePhase::Cruise => plugin::StateCode::ProbeBwCruise,
                probe_bw::CyclePhase::Refill => plugin::StateCode::ProbeBwRefill,
                probe_bw::CyclePhase::Up => plugin::StateCode::ProbeBwUp,
            },
            State::ProbeRtt(_) => plugin::StateCode::ProbeRtt,
        }
    }
}

impl congestion_controller::CongestionController for BbrCongestionController {
    fn congestion_window(&self) -> u64 {
        self.cwnd
    }

    fn pacing_rate(&self) -> Bandwidth {
        self.pacer.pacing_rate()
    }

    fn send_quantum(&self) -> usize {
        self.pacer.send_quantum()
    }

    fn on_ack(&mut self, now: Timestamp, sample: AckSample, random_generator: &mut dyn Generator) {
        BbrCongestionController::on_ack(self, now, sample, random_generator)
    }

    fn on_loss(&mut self, _now: Timestamp, tx_in_flight: u64, lost: u64, is_app_limited: bool) {
        self.update_on_loss(tx_in_flight, lost, is_app_limited)
    }

    fn on_spurious_loss(&mut self) {
        self.cwnd = self.recovery.restore_cwnd(self.cwnd);
    }

    fn on_reset(&mut self, _random_generator: &mut dyn Generator, _now: Timestamp) {
        *self = Self::new(PathInfo::new(self.max_datagram_size, self.client_mode, self.unique_path_id));
    }

    fn on_seed_cwnd(&mut self, bdp_seed: u64) {
        self.bdp_seed = Some(bdp_seed);
        self.cwnd = self.cwnd.max(bdp_seed);
    }
}

impl plugin::Descriptor for BbrCongestionController {
    fn init(path_info: PathInfo) -> Self {
        Self::new(path_info)
    }

    fn notify(&mut self, notification: plugin::Notification, random_generator: &mut dyn Generator, now: Timestamp) {
        use congestion_controller::CongestionController as _;
        match notification {
            plugin::Notification::Acknowledgement(sample) => self.on_ack(now, sample, random_generator),
            plugin::Notification::Repeat(loss) | plugin::Notification::Timeout(loss) => {
                self.update_on_loss(loss.tx_in_flight, loss.lost, loss.is_app_limited);
            }
            plugin::Notification::SpuriousRepeat => self.on_spurious_loss(),
            plugin::Notification::EcnEc => {}
            plugin::Notification::RttMeasurement => {}
            plugin::Notification::CwinBlocked => {}
            plugin::Notification::Reset => self.on_reset(random_generator, now),
            plugin::Notification::SeedCwin { bdp_seed } => self.on_seed_cwnd(bdp_seed),
        }
    }

    fn observe(&self) -> plugin::Observation {
        plugin::Observation {
            state: self.state_code(),
            informational_bandwidth: self.data_rate.bw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::testing::Deterministic;

    fn ts(micros: u64) -> Timestamp {
        Timestamp::from_duration(Duration::from_micros(micros))
    }

    fn path_info() -> PathInfo {
        PathInfo::new(1200, true, 1)
    }

    fn ack(delivered: u64, rtt: Duration, tx_in_flight: u64, bw: Bandwidth) -> AckSample {
        AckSample {
            delivery_rate: bw,
            delivered,
            rtt_sample: rtt,
            rtt_variant: Duration::ZERO,
            newly_acked: delivered,
            newly_lost: 0,
            tx_in_flight,
            lost: 0,
            is_app_limited: false,
            is_cwnd_limited: true,
        }
    }

    #[test]
    fn cwnd_never_drops_below_the_pipe_floor() {
        let mut cc = BbrCongestionController::new(path_info());
        let mut rng = Deterministic::new(7);
        let mut now = ts(1);
        for round in 0..20 {
            let bw = Bandwidth::from_bits_per_second(100_000_000);
            now = now + Duration::from_millis(30);
            cc.on_ack(now, ack(12_000, Duration::from_millis(30), 12_000 * (round + 1), bw), &mut rng);
            assert!(cc.congestion_window() >= MIN_PIPE_CWND_MULTIPLE * 1200);
        }
    }

    #[test]
    fn plateaued_bandwidth_eventually_leaves_startup() {
        let mut cc = BbrCongestionController::new(path_info());
        let mut rng = Deterministic::new(11);
        let mut now = ts(1);
        let bw = Bandwidth::from_bits_per_second(100_000_000);
        for _ in 0..10 {
            now = now + Duration::from_millis(30);
            cc.on_ack(now, ack(12_000, Duration::from_millis(30), 12_000, bw), &mut rng);
        }
        assert!(matches!(cc.state, State::Drain) || matches!(cc.state, State::ProbeBw(_)));
    }

    #[test]
    fn high_rtt_first_sample_enters_startup_long_rtt() {
        let mut cc = BbrCongestionController::new(path_info());
        let mut rng = Deterministic::new(3);
        let now = ts(1);
        let bw = Bandwidth::from_bits_per_second(10_000_000);
        cc.on_ack(now, ack(12_000, Duration::from_millis(400), 12_000, bw), &mut rng);
        assert!(matches!(cc.state, State::StartupLongRtt(_)));
        assert!(cc.congestion_window() > INITIAL_CWND_MULTIPLE * 1200);
    }

    #[test]
    fn high_loss_forces_full_pipe_in_startup() {
        let mut cc = BbrCongestionController::new(path_info());
        let mut rng = Deterministic::new(5);
        let now = ts(1);
        let bw = Bandwidth::from_bits_per_second(10_000_000);
        let mut sample = ack(12_000, Duration::from_millis(30), 10_000, bw);
        sample.lost = 1000; // 10% of tx_in_flight, above the 2% threshold
        sample.newly_lost = 1000;
        cc.on_ack(now, sample, &mut rng);
        assert!(matches!(cc.state, State::Drain) || matches!(cc.state, State::ProbeBw(_)));
    }

    #[test]
    fn seed_cwnd_raises_the_floor() {
        use congestion_controller::CongestionController as _;
        let mut cc = BbrCongestionController::new(path_info());
        cc.on_seed_cwnd(1_000_000);
        assert!(cc.congestion_window() >= 1_000_000);
    }
}
