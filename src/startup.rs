// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! Startup state (§4.6.1): maximal pacing and cwnd gain until the pipe is
//! judged full.

use num_rational::Ratio;

pub const PACING_GAIN: Ratio<u64> = Ratio::new_raw(277, 100);
pub const CWND_GAIN: Ratio<u64> = Ratio::new_raw(2, 1);

/// Growth threshold for exiting Startup: `max_bw` must grow by at least 25%
/// (`4 * max_bw >= 5 * full_bw`) across a round to be considered still
/// growing the pipe.
pub const DELIVERY_RATE_INCREASE_NUMERATOR: u64 = 5;
pub const DELIVERY_RATE_INCREASE_DENOMINATOR: u64 = 4;

/// Rounds of plateaued `max_bw` required before declaring the pipe full.
pub const BANDWIDTH_PLATEAU_ROUND_COUNT: u8 = 3;

/// High-loss Startup exit threshold (`LossThresh`, shared with §4.6.1/§4.8).
pub const LOSS_THRESH: Ratio<u32> = Ratio::new_raw(1, 50);
