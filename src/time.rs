// Copyright held by the crate authors.
// SPDX-License-Identifier: Apache-2.0

//! Minimal time types used by the congestion controller.
//!
//! The controller never reads the wall clock itself; timestamps are always
//! supplied by the host transport, which owns RTT measurement and pacing.

use core::{fmt, num::NonZeroU64, ops};

/// An absolute point in time, opaque outside of a single host clock.
///
/// Mirrors the host transport's own `Timestamp` type: a microsecond count
/// since an unspecified epoch, comparable only against other `Timestamp`s
/// produced by the same clock.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub struct Timestamp(NonZeroU64);

const ONE_MICROSECOND: NonZeroU64 = NonZeroU64::new(1).unwrap();

impl Timestamp {
    /// Constructs a `Timestamp` from a duration since the host clock's epoch.
    ///
    /// This should only be called by the host transport's time source.
    #[inline]
    pub fn from_duration(duration: core::time::Duration) -> Self {
        let micros = duration.as_micros().min(u64::MAX as u128) as u64;
        Self(NonZeroU64::new(micros).unwrap_or(ONE_MICROSECOND))
    }

    #[inline]
    pub fn as_duration(self) -> core::time::Duration {
        core::time::Duration::from_micros(self.0.get())
    }

    #[inline]
    pub fn checked_add(self, duration: core::time::Duration) -> Option<Self> {
        self.as_duration()
            .checked_add(duration)
            .map(Self::from_duration)
    }

    #[inline]
    pub fn saturating_duration_since(self, earlier: Self) -> core::time::Duration {
        self.as_duration()
            .checked_sub(earlier.as_duration())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Timestamp({:?})", self.as_duration())
    }
}

impl ops::Add<core::time::Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: core::time::Duration) -> Self::Output {
        Timestamp::from_duration(self.as_duration() + rhs)
    }
}

impl ops::Sub for Timestamp {
    type Output = core::time::Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Self::Output {
        self.as_duration().saturating_sub(rhs.as_duration())
    }
}

impl ops::Sub<core::time::Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn sub(self, rhs: core::time::Duration) -> Self::Output {
        Timestamp::from_duration(self.as_duration().saturating_sub(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn add_and_sub_round_trip() {
        let t0 = Timestamp::from_duration(Duration::from_millis(100));
        let t1 = t0 + Duration::from_millis(50);
        assert_eq!(t1 - t0, Duration::from_millis(50));
        assert_eq!(t1 - Duration::from_millis(50), t0);
    }

    #[test]
    fn saturating_duration_since_never_goes_negative() {
        let earlier = Timestamp::from_duration(Duration::from_millis(200));
        let later = Timestamp::from_duration(Duration::from_millis(100));
        assert_eq!(
            later.saturating_duration_since(earlier),
            Duration::from_millis(0)
        );
    }
}
