// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! The seam between a host transport and a congestion controller: `Endpoint`
//! constructs one `CongestionController` per path, `AckSample` is the
//! per-ACK input §3.2 defines, and `CongestionController::on_*` methods are
//! the caller-facing entry points the `plugin` descriptor dispatches to.
//!
//! Grounded on the teacher's `recovery::congestion_controller::{Endpoint,
//! CongestionController, PathInfo}` trio, which plays the identical
//! "pluggable algorithm behind a stable interface" role. Narrowed from the
//! teacher's packet-lifecycle API (`on_packet_sent`/`on_packet_ack` keyed by
//! a per-packet `PacketInfo`) to the flatter `AckSample`-based API §3.2
//! describes, since per-packet `delivered_prior`/`first_sent_time`
//! bookkeeping is explicitly out of scope (§1) and left to the caller.

use crate::{bandwidth::Bandwidth, random::Generator, time::Timestamp};
use core::{fmt::Debug, time::Duration};

/// Per-path construction parameters (§6 inputs, ambient: `mtu` plus the
/// random-seed inputs named in §5).
#[derive(Clone, Copy, Debug)]
pub struct PathInfo {
    pub max_datagram_size: u16,
    pub client_mode: bool,
    pub unique_path_id: u64,
}

impl PathInfo {
    pub fn new(max_datagram_size: u16, client_mode: bool, unique_path_id: u64) -> Self {
        // a zero MTU can never appear on the wire; clamp so arithmetic that
        // divides by `max_datagram_size` elsewhere never panics.
        Self {
            max_datagram_size: max_datagram_size.max(1),
            client_mode,
            unique_path_id,
        }
    }
}

pub trait Endpoint: Send + Debug {
    type CongestionController: CongestionController;

    fn new_congestion_controller(&mut self, path_info: PathInfo) -> Self::CongestionController;
}

/// The per-ACK sample a caller constructs and hands to the CC (§3.2).
#[derive(Clone, Copy, Debug, Default)]
pub struct AckSample {
    pub delivery_rate: Bandwidth,
    pub delivered: u64,
    pub rtt_sample: Duration,
    /// The RTT variance estimate (e.g. a smoothed mean deviation), used by
    /// the high-RTT Startup-exit check (§4.6.1 local extension).
    pub rtt_variant: Duration,
    pub newly_acked: u64,
    pub newly_lost: u64,
    pub tx_in_flight: u64,
    pub lost: u64,
    pub is_app_limited: bool,
    pub is_cwnd_limited: bool,
}

impl AckSample {
    /// `1e6 * delivered / rtt_sample`, floored at 40 000 B/s (§3.2, §7).
    pub fn delivery_rate_or_fallback(&self) -> Bandwidth {
        if self.delivery_rate.as_bits_per_second() > 0 {
            return self.delivery_rate;
        }
        if self.rtt_sample.is_zero() {
            return Bandwidth::from_bits_per_second(40_000 * 8);
        }
        Bandwidth::new(self.delivered, self.rtt_sample).max(Bandwidth::from_bits_per_second(40_000 * 8))
    }
}

/// An algorithm for controlling congestion on a single path.
pub trait CongestionController: Send + Debug {
    /// Current congestion window, in bytes.
    fn congestion_window(&self) -> u64;

    /// Current pacing rate target.
    fn pacing_rate(&self) -> Bandwidth;

    /// Current burst cap, in bytes.
    fn send_quantum(&self) -> usize;

    /// Full ACK pipeline (§2).
    fn on_ack(&mut self, now: Timestamp, sample: AckSample, random_generator: &mut dyn Generator);

    /// `repeat` / `timeout` notifications (§4.8 `UpdateOnLoss`).
    fn on_loss(&mut self, now: Timestamp, tx_in_flight: u64, lost: u64, is_app_limited: bool);

    /// `spurious_repeat` notification: restores `prior_cwnd` (§4.8, resolved
    /// open question).
    fn on_spurious_loss(&mut self);

    /// `reset` notification: full re-init preserving only the path identity.
    fn on_reset(&mut self, random_generator: &mut dyn Generator, now: Timestamp);

    /// `seed_cwin` notification.
    fn on_seed_cwnd(&mut self, bdp_seed: u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mtu_is_clamped_to_one() {
        let info = PathInfo::new(0, true, 1);
        assert_eq!(info.max_datagram_size, 1);
    }

    #[test]
    fn delivery_rate_falls_back_when_unset() {
        let sample = AckSample {
            delivered: 1500,
            rtt_sample: Duration::from_millis(30),
            ..Default::default()
        };
        assert!(sample.delivery_rate_or_fallback().as_bits_per_second() > 0);
    }

    #[test]
    fn delivery_rate_fallback_floors_at_forty_thousand_bytes_per_second() {
        let sample = AckSample {
            delivered: 1,
            rtt_sample: Duration::from_secs(10),
            ..Default::default()
        };
        assert!(sample.delivery_rate_or_fallback().as_bytes_per_second() >= 40_000);
    }
}
