// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::ops::{Add, Sub};
use std::time::Duration;
#[cfg(not(any(test, feature = "test_utils")))]
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

#[cfg(any(test, feature = "test_utils"))]
use mock_instant::SystemTimeError;
#[cfg(any(test, feature = "test_utils"))]
use mock_instant::thread_local::{SystemTime, UNIX_EPOCH};
use serde::{Deserialize, Serialize};

/// Microseconds since the UNIX epoch based on system time.
///
/// With the `test_utils` feature enabled the system time is read from a thread-local mock clock
/// which tests can set and advance.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn new(micros: u64) -> Self {
        Self(micros)
    }

    pub fn now() -> Self {
        let now = SystemTime::now();
        now.try_into().expect("system time went backwards")
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }
}

impl From<Timestamp> for u64 {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl TryFrom<SystemTime> for Timestamp {
    type Error = SystemTimeError;

    fn try_from(system_time: SystemTime) -> Result<Self, Self::Error> {
        let duration = system_time.duration_since(UNIX_EPOCH)?;
        Ok(Self(saturating_micros(duration)))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(saturating_micros(rhs)))
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_sub(saturating_micros(rhs)))
    }
}

fn saturating_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mock_instant::thread_local::MockClock;

    use super::Timestamp;

    #[test]
    fn follows_mock_clock() {
        MockClock::set_system_time(Duration::from_secs(10));
        assert_eq!(Timestamp::now(), Timestamp::new(10_000_000));

        MockClock::advance_system_time(Duration::from_secs(1));
        assert_eq!(Timestamp::now(), Timestamp::new(11_000_000));
    }

    #[test]
    fn duration_arithmetic_saturates() {
        let timestamp = Timestamp::new(5);
        assert_eq!(timestamp - Duration::from_secs(1), Timestamp::new(0));
        assert_eq!(
            Timestamp::new(u64::MAX) + Duration::from_secs(1),
            Timestamp::new(u64::MAX)
        );
        assert_eq!(timestamp + Duration::from_micros(10), Timestamp::new(15));
        assert_eq!(timestamp + Duration::MAX, Timestamp::new(u64::MAX));
        assert_eq!(timestamp - Duration::MAX, Timestamp::new(0));
    }
}
