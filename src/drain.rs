// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! Drain state (§4.6.3): pace slowly to let the queue built up during
//! Startup dissipate before beginning the probe-BW cycle.

use crate::startup;
use num_rational::Ratio;

/// `1 / StartupCwndGain`.
pub const PACING_GAIN: Ratio<u64> = Ratio::new_raw(1, 2);
pub const CWND_GAIN: Ratio<u64> = startup::CWND_GAIN;
