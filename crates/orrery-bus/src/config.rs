//! Bus configuration, validation, and error types.

use std::error::Error;
use std::fmt;
use std::time::Duration;

// ── OverrunPolicy ──────────────────────────────────────────────────

/// What `publish` does when the topic's previous event was never
/// delivered to any observer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverrunPolicy {
    /// Store and wake as usual, then report
    /// [`BusError::Overrun`](crate::BusError::Overrun) to the publisher.
    #[default]
    Error,
    /// Silently replace the undelivered event.
    Coalesce,
}

// ── BusConfig ──────────────────────────────────────────────────────

/// Configuration for [`NotificationBus`](crate::NotificationBus).
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Upper bound on one observer wait before it re-probes its
    /// connection, even if nothing was published. Default: 3 s.
    pub wake_interval: Duration,
    /// Timeout of the per-iteration connection liveness probe.
    /// Default: 1 ms.
    pub probe_timeout: Duration,
    /// Behavior on publishing over an undelivered event. Default:
    /// [`OverrunPolicy::Error`].
    pub overrun: OverrunPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            wake_interval: Duration::from_secs(3),
            probe_timeout: Duration::from_millis(1),
            overrun: OverrunPolicy::Error,
        }
    }
}

impl BusConfig {
    /// Check that both timeouts are non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wake_interval.is_zero() {
            return Err(ConfigError::ZeroWakeInterval);
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::ZeroProbeTimeout);
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`BusConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `wake_interval` is zero; observers would spin.
    ZeroWakeInterval,
    /// `probe_timeout` is zero.
    ZeroProbeTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWakeInterval => write!(f, "wake_interval must be non-zero"),
            Self::ZeroProbeTimeout => write!(f, "probe_timeout must be non-zero"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_validate() {
        let cfg = BusConfig::default();
        assert_eq!(cfg.wake_interval, Duration::from_secs(3));
        assert_eq!(cfg.probe_timeout, Duration::from_millis(1));
        assert_eq!(cfg.overrun, OverrunPolicy::Error);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_durations_rejected() {
        let cfg = BusConfig {
            wake_interval: Duration::ZERO,
            ..BusConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroWakeInterval));
        let cfg = BusConfig {
            probe_timeout: Duration::ZERO,
            ..BusConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroProbeTimeout));
    }

    proptest! {
        #[test]
        fn validate_accepts_exactly_nonzero_durations(wake_ms in 0u64..50, probe_us in 0u64..50) {
            let cfg = BusConfig {
                wake_interval: Duration::from_millis(wake_ms),
                probe_timeout: Duration::from_micros(probe_us),
                overrun: OverrunPolicy::Coalesce,
            };
            prop_assert_eq!(cfg.validate().is_ok(), wake_ms > 0 && probe_us > 0);
        }
    }
}
