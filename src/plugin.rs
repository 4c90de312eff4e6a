// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! The control-plane registration surface (§6): a descriptor identified by
//! `"bbr"`, dispatching `init`/`notify`/`delete`/`observe`.
//!
//! The spec describes these as four function pointers on a C-style
//! descriptor. Grounded on the same role the teacher's
//! `congestion_controller::Endpoint`/`CongestionController` pair plays, this
//! is expressed as a safe trait instead: `init` becomes an associated
//! constructor, `notify`'s kind tag becomes the [`Notification`] enum
//! (carrying its kind-specific payload instead of a tagged union), `delete`
//! stays as an explicit teardown hook since the host may need to observe a
//! final state before the instance is dropped, and `observe` returns a
//! plain [`Observation`] struct.

use crate::{
    bandwidth::Bandwidth,
    congestion_controller::PathInfo,
    random::Generator,
    time::Timestamp,
};
use core::fmt;

/// The string identifier the descriptor registers under (§6).
pub const IDENTIFIER: &str = "bbr";

/// Mirrors the six top-level states plus the four `ProbeBw` sub-phases, for
/// diagnostic `observe` calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateCode {
    Startup,
    StartupLongRtt,
    Drain,
    ProbeBwDown,
    ProbeBwCruise,
    ProbeBwRefill,
    ProbeBwUp,
    ProbeRtt,
}

/// The result of `observe(path)` (§6): `informational_bandwidth` is
/// populated from the model's bounded `bw` (resolving the open question that
/// the source never wrote anything to `btl_bw`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    pub state: StateCode,
    pub informational_bandwidth: Bandwidth,
}

/// A lost-packet notification payload shared by `repeat` and `timeout`
/// (§4.8 `UpdateOnLoss`).
#[derive(Clone, Copy, Debug, Default)]
pub struct LossNotification {
    pub tx_in_flight: u64,
    pub lost: u64,
    pub is_app_limited: bool,
}

/// The kind-tagged payload `notify` dispatches on (§6 "Notification kinds
/// consumed").
#[derive(Clone, Copy, Debug)]
pub enum Notification {
    Acknowledgement(crate::congestion_controller::AckSample),
    Repeat(LossNotification),
    Timeout(LossNotification),
    /// Reserved: restores `prior_cwnd` (§4.8, §9 resolved open question).
    SpuriousRepeat,
    /// Reserved no-op placeholder (§9 resolved open question).
    EcnEc,
    /// No-op: subsumed by `Acknowledgement`.
    RttMeasurement,
    /// No-op.
    CwinBlocked,
    Reset,
    SeedCwin { bdp_seed: u64 },
}

/// The safe-Rust expression of the four-function-pointer descriptor.
pub trait Descriptor: Send + fmt::Debug {
    fn init(path_info: PathInfo) -> Self
    where
        Self: Sized;

    fn notify(&mut self, notification: Notification, random_generator: &mut dyn Generator, now: Timestamp);

    /// Host-initiated teardown. Most implementations need no explicit
    /// action beyond `Drop`; the default is a no-op.
    fn delete(&mut self) {}

    fn observe(&self) -> Observation;
}

/// Returned by [`Registration::register`] when an identifier is already
/// registered — a host integration error, not a per-packet error (§7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationError {
    DuplicateIdentifier(&'static str),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::DuplicateIdentifier(id) => {
                write!(f, "a congestion controller is already registered under {id:?}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RegistrationError {}

/// A minimal identifier registry, so a host wiring up multiple pluggable
/// algorithms can detect a duplicate `"bbr"` registration at startup.
#[cfg(feature = "alloc")]
#[derive(Debug, Default)]
pub struct Registration {
    identifiers: alloc::vec::Vec<&'static str>,
}

#[cfg(feature = "alloc")]
impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identifier: &'static str) -> Result<(), RegistrationError> {
        if self.identifiers.contains(&identifier) {
            return Err(RegistrationError::DuplicateIdentifier(identifier));
        }
        self.identifiers.push(identifier);
        Ok(())
    }
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = Registration::new();
        assert!(registry.register(IDENTIFIER).is_ok());
        assert_eq!(
            registry.register(IDENTIFIER),
            Err(RegistrationError::DuplicateIdentifier(IDENTIFIER))
        );
    }
}
