// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! A per-path BBRv3 congestion controller for QUIC-like transports, plus a
//! Hystart-based high-RTT alternate startup and a loss-rate smoothing
//! extension. See `SPEC_FULL.md` for the module map this crate implements.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod bandwidth;
pub mod bbr;
pub mod congestion_controller;
pub mod counter;
pub mod data_rate;
pub mod data_volume;
pub mod drain;
pub mod full_pipe;
pub mod loss;
pub mod number;
pub mod pacing;
pub mod plugin;
pub mod probe_bw;
pub mod probe_rtt;
pub mod random;
pub mod recovery;
pub mod round;
pub mod startup;
pub mod startup_long_rtt;
pub mod time;
pub mod windowed_filter;

pub use bbr::BbrCongestionController;
pub use congestion_controller::{AckSample, CongestionController, Endpoint, PathInfo};
pub use plugin::{Descriptor, Notification, Observation, StateCode};
