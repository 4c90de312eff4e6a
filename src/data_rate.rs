// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! Bandwidth model (§3.1 "Bandwidth model", §4.3, §4.4): `max_bw`, the long
//! and short term bounds `bw_hi`/`bw_lo`, and the bounded `bw` derived from
//! all three.

use crate::{
    bandwidth::{Bandwidth, RateSample},
    windowed_filter::MaxBwFilter,
};
use num_rational::Ratio;

/// `Beta` (§4.4, §6): the multiplicative backoff applied to the lower bound
/// on each congestion signal.
pub const BETA: Ratio<u64> = Ratio::new_raw(7, 10);

#[derive(Clone, Debug)]
pub struct Model {
    max_bw_filter: MaxBwFilter,
    bw_hi: Bandwidth,
    bw_lo: Bandwidth,
    bw: Bandwidth,
    cycle_count: u64,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            max_bw_filter: MaxBwFilter::new(),
            bw_hi: Bandwidth::MAX,
            bw_lo: Bandwidth::MAX,
            bw: Bandwidth::ZERO,
            cycle_count: 0,
        }
    }
}

impl Model {
    pub fn max_bw(&self) -> Bandwidth {
        self.max_bw_filter.value()
    }

    pub fn bw_hi(&self) -> Bandwidth {
        self.bw_hi
    }

    pub fn bw_lo(&self) -> Bandwidth {
        self.bw_lo
    }

    pub fn bw(&self) -> Bandwidth {
        self.bw
    }

    /// Advances the 2-slot max filter to the next logical cycle (called when
    /// entering a new ProbeBw DOWN phase).
    pub fn advance_max_bw_filter(&mut self) {
        self.cycle_count += 1;
        self.max_bw_filter.start_period(self.cycle_count);
    }

    /// `UpdateMaxBw` (§4.3): feeds `delivery_rate` into the filter only if it
    /// is not lower than an app-limited sample would be trusted to confirm.
    pub fn update_max_bw(&mut self, rate_sample: RateSample) {
        let delivery_rate = rate_sample.delivery_rate();
        if delivery_rate.as_bits_per_second() >= self.max_bw().as_bits_per_second()
            || !rate_sample.is_app_limited
        {
            self.max_bw_filter.update(self.cycle_count, delivery_rate);
        }
    }

    pub fn update_upper_bound(&mut self, bw: Bandwidth) {
        self.bw_hi = bw.max(self.bw_hi);
    }

    pub fn set_upper_bound(&mut self, bw: Bandwidth) {
        self.bw_hi = bw;
    }

    /// `AdaptLowerBoundsFromCongestion` (§4.4): initializes `bw_lo` from
    /// `max_bw` the first time it's needed in a cycle, then backs it off
    /// towards `bw_latest` by `Beta`.
    pub fn update_lower_bound(&mut self, bw_latest: Bandwidth) {
        if self.bw_lo == Bandwidth::MAX {
            self.bw_lo = self.max_bw();
        }
        self.bw_lo = bw_latest.max(self.bw_lo * BETA);
    }

    pub fn reset_lower_bound(&mut self) {
        self.bw_lo = Bandwidth::MAX;
    }

    /// `BoundBwForModel` (§2 data flow, last model step): `bw =
    /// min(max_bw, bw_lo, bw_hi)`.
    pub fn bound_bw_for_model(&mut self) {
        self.bw = self.max_bw().min(self.bw_lo).min(self.bw_hi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    fn sample(bytes: u64, app_limited: bool) -> RateSample {
        RateSample {
            interval: Duration::from_millis(10),
            delivered_bytes: bytes,
            is_app_limited: app_limited,
            ..Default::default()
        }
    }

    #[test]
    fn update_max_bw_ignores_lower_app_limited_samples() {
        let mut model = Model::default();
        model.update_max_bw(sample(1_000_000, false));
        let before = model.max_bw();
        model.update_max_bw(sample(10, true));
        assert_eq!(model.max_bw(), before);
    }

    #[test]
    fn update_max_bw_accepts_confirming_app_limited_samples() {
        let mut model = Model::default();
        model.update_max_bw(sample(1_000_000, true));
        assert!(model.max_bw().as_bits_per_second() > 0);
    }

    #[test]
    fn bound_bw_for_model_takes_the_minimum() {
        let mut model = Model::default();
        model.update_max_bw(sample(10_000_000, false));
        model.set_upper_bound(Bandwidth::from_bits_per_second(1000));
        model.bound_bw_for_model();
        assert_eq!(model.bw(), Bandwidth::from_bits_per_second(1000));
    }

    #[test]
    fn reset_lower_bound_restores_infinity() {
        let mut model = Model::default();
        model.update_lower_bound(Bandwidth::from_bits_per_second(1000));
        assert_ne!(model.bw_lo(), Bandwidth::MAX);
        model.reset_lower_bound();
        assert_eq!(model.bw_lo(), Bandwidth::MAX);
    }
}
