// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! `packet_conservation` and the saved `prior_cwnd` used while recovering
//! from a loss episode (§3.1 outputs, §4.7, invariant 7).
//!
//! The host transport's own `recovery::State` tracks a fast-retransmission
//! episode by packet number (`Recovering { sent_packet_number }`, cleared once
//! an ACK for a later packet number arrives). This crate has no packet-number
//! bookkeeping of its own — only the delivered-byte/bytes-in-transit markers
//! already used by `round::Counter` — so the episode boundary is expressed the
//! same way a round is: a byte-delivered mark opened at the moment of loss.

#[derive(Clone, Copy, Debug, Default)]
pub struct State {
    in_recovery: bool,
    recovery_round_delivered: u64,
    prior_cwnd: u64,
}

impl State {
    pub fn in_recovery(&self) -> bool {
        self.in_recovery
    }

    /// `packet_conservation` holds for the remainder of the round the loss
    /// was detected in.
    pub fn packet_conservation(&self, delivered: u64) -> bool {
        self.in_recovery && delivered < self.recovery_round_delivered
    }

    /// Opens (or extends) a recovery episode. `cwnd` is saved as
    /// `prior_cwnd` only the first time an episode opens.
    pub fn on_congestion_event(&mut self, cwnd: u64, delivered: u64, bytes_in_transit: u64) {
        if !self.in_recovery {
            self.prior_cwnd = cwnd;
            self.in_recovery = true;
        }
        self.recovery_round_delivered = delivered + bytes_in_transit;
    }

    /// Called on every ACK; closes the episode once the marker byte has been
    /// delivered.
    pub fn on_ack(&mut self, delivered: u64) {
        if self.in_recovery && delivered >= self.recovery_round_delivered {
            self.in_recovery = false;
        }
    }

    /// `cwin = max(cwin, prior_cwnd)` (invariant 7).
    pub fn restore_cwnd(&self, cwnd: u64) -> u64 {
        cwnd.max(self.prior_cwnd)
    }

    /// Forces an immediate exit, used by `reset`/`seed_cwin`.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conservation_holds_for_the_rest_of_the_round() {
        let mut state = State::default();
        state.on_congestion_event(100_000, 0, 5_000);
        assert!(state.packet_conservation(1_000));
        state.on_ack(4_000);
        assert!(state.in_recovery());
        state.on_ack(5_000);
        assert!(!state.in_recovery());
        assert!(!state.packet_conservation(5_000));
    }

    #[test]
    fn restore_cwnd_takes_the_larger_value() {
        let mut state = State::default();
        state.on_congestion_event(80_000, 0, 1_000);
        assert_eq!(state.restore_cwnd(10_000), 80_000);
        assert_eq!(state.restore_cwnd(90_000), 90_000);
    }
}
