//! Discovery network parameters.
//!
//! All instances on one LAN must agree on these values to interoperate.
//!
//! # Why the beacon period must be shorter than the timeout
//!
//! A late starter listens for `discovery_timeout` before electing itself.  The
//! server beacons every `beacon_period`.  As long as
//! `beacon_period < discovery_timeout`, every listening window is guaranteed to
//! contain at least one beacon send, so a second instance always finds the
//! first instead of becoming a rival server.  [`DiscoveryTiming::new`] refuses
//! any pair that breaks this.

use std::net::Ipv4Addr;
use std::time::Duration;

use thiserror::Error;

/// UDP port every instance listens on for beacons.
pub const BROADCAST_PORT: u16 = 8765;

/// Interval between two beacons sent by the elected server.
pub const BEACON_PERIOD: Duration = Duration::from_millis(3000);

/// How long a probing instance waits for a beacon before electing itself.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Limited-broadcast destination for beacons.
pub const BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Rejected timing combinations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    /// A zero beacon period would spin the broadcast loop.
    #[error("beacon period must be greater than zero")]
    ZeroPeriod,

    /// The period/timeout ordering invariant is violated.
    #[error("beacon period ({period:?}) must be shorter than the discovery timeout ({timeout:?})")]
    PeriodNotShorterThanTimeout { period: Duration, timeout: Duration },
}

/// A validated beacon period / discovery timeout pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryTiming {
    beacon_period: Duration,
    discovery_timeout: Duration,
}

impl DiscoveryTiming {
    /// Validates and builds a timing pair.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::ZeroPeriod`] for a zero period and
    /// [`TimingError::PeriodNotShorterThanTimeout`] when
    /// `beacon_period >= discovery_timeout`.
    pub fn new(beacon_period: Duration, discovery_timeout: Duration) -> Result<Self, TimingError> {
        if beacon_period.is_zero() {
            return Err(TimingError::ZeroPeriod);
        }
        if beacon_period >= discovery_timeout {
            return Err(TimingError::PeriodNotShorterThanTimeout {
                period: beacon_period,
                timeout: discovery_timeout,
            });
        }
        Ok(Self {
            beacon_period,
            discovery_timeout,
        })
    }

    /// Interval between beacons.
    pub fn beacon_period(&self) -> Duration {
        self.beacon_period
    }

    /// Election timeout.
    pub fn discovery_timeout(&self) -> Duration {
        self.discovery_timeout
    }
}

impl Default for DiscoveryTiming {
    fn default() -> Self {
        Self {
            beacon_period: BEACON_PERIOD,
            discovery_timeout: DISCOVERY_TIMEOUT,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants_satisfy_period_shorter_than_timeout() {
        assert!(BEACON_PERIOD < DISCOVERY_TIMEOUT);
        assert_eq!(
            DiscoveryTiming::new(BEACON_PERIOD, DISCOVERY_TIMEOUT),
            Ok(DiscoveryTiming::default())
        );
    }

    #[test]
    fn test_default_network_parameters() {
        assert_eq!(BROADCAST_PORT, 8765);
        assert_eq!(BEACON_PERIOD, Duration::from_millis(3000));
        assert_eq!(DISCOVERY_TIMEOUT, Duration::from_millis(5000));
        assert_eq!(BROADCAST_ADDR.to_string(), "255.255.255.255");
    }

    #[test]
    fn test_new_rejects_zero_period() {
        let result = DiscoveryTiming::new(Duration::ZERO, Duration::from_secs(1));
        assert_eq!(result, Err(TimingError::ZeroPeriod));
    }

    #[test]
    fn test_new_rejects_period_equal_to_timeout() {
        // Arrange
        let d = Duration::from_millis(500);

        // Act
        let result = DiscoveryTiming::new(d, d);

        // Assert
        assert!(matches!(
            result,
            Err(TimingError::PeriodNotShorterThanTimeout { .. })
        ));
    }

    #[test]
    fn test_new_rejects_period_longer_than_timeout() {
        let result = DiscoveryTiming::new(Duration::from_secs(6), Duration::from_secs(5));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_accepts_short_test_timing() {
        let timing = DiscoveryTiming::new(Duration::from_millis(50), Duration::from_millis(200))
            .expect("valid timing");
        assert_eq!(timing.beacon_period(), Duration::from_millis(50));
        assert_eq!(timing.discovery_timeout(), Duration::from_millis(200));
    }
}
