//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::clock::SystemClock;
use crate::error::{AuditError, AuditResult};

/// Configuration for an [`AuditStore`](crate::AuditStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Number of notifications buffered per subscriber before it lags.
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,

    /// Seconds between ordering positions for [`SystemClock`].
    #[serde(default = "default_block_interval_secs")]
    pub block_interval_secs: u64,
}

const fn default_notification_capacity() -> usize {
    1024
}

const fn default_block_interval_secs() -> u64 {
    SystemClock::DEFAULT_BLOCK_INTERVAL_SECS
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            notification_capacity: default_notification_capacity(),
            block_interval_secs: default_block_interval_secs(),
        }
    }
}

impl AuditConfig {
    /// Largest accepted [`AuditConfig::notification_capacity`]. The broadcast
    /// buffer is allocated up front.
    pub const MAX_NOTIFICATION_CAPACITY: usize = 1 << 16;

    /// Sets the notification buffer size.
    #[must_use]
    pub const fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Sets the block interval used by [`SystemClock`].
    #[must_use]
    pub const fn with_block_interval_secs(mut self, secs: u64) -> Self {
        self.block_interval_secs = secs;
        self
    }

    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidConfig`] if the JSON is malformed or the
    /// resulting values fail [`AuditConfig::validate`].
    pub fn from_json(json: &str) -> AuditResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| AuditError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidConfig`] if a value is zero or the
    /// notification capacity exceeds [`AuditConfig::MAX_NOTIFICATION_CAPACITY`].
    pub fn validate(&self) -> AuditResult<()> {
        if self.notification_capacity == 0 {
            return Err(AuditError::InvalidConfig(
                "notification_capacity must be greater than zero".to_string(),
            ));
        }
        if self.notification_capacity > Self::MAX_NOTIFICATION_CAPACITY {
            return Err(AuditError::InvalidConfig(format!(
                "notification_capacity must be at most {}",
                Self::MAX_NOTIFICATION_CAPACITY
            )));
        }
        if self.block_interval_secs == 0 {
            return Err(AuditError::InvalidConfig(
                "block_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let config = AuditConfig::default();
        assert_eq!(config.notification_capacity, 1024);
        assert_eq!(config.block_interval_secs, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_builder_pattern() {
        let config = AuditConfig::default()
            .with_notification_capacity(8)
            .with_block_interval_secs(2);
        assert_eq!(config.notification_capacity, 8);
        assert_eq!(config.block_interval_secs, 2);
    }

    #[test]
    fn config_from_partial_json() {
        let config = AuditConfig::from_json(r#"{"notification_capacity": 16}"#).unwrap();
        assert_eq!(config.notification_capacity, 16);
        assert_eq!(config.block_interval_secs, 12);
    }

    #[test]
    fn config_rejects_zero_capacity() {
        let err = AuditConfig::from_json(r#"{"notification_capacity": 0}"#).unwrap_err();
        assert!(matches!(err, AuditError::InvalidConfig(_)));
    }

    #[test]
    fn config_rejects_oversized_capacity() {
        let err = AuditConfig::from_json(r#"{"notification_capacity": 18446744073709551615}"#)
            .unwrap_err();
        assert!(matches!(err, AuditError::InvalidConfig(_)));

        let too_big = AuditConfig::default()
            .with_notification_capacity(AuditConfig::MAX_NOTIFICATION_CAPACITY + 1);
        assert!(too_big.validate().is_err());

        let largest = AuditConfig::default()
            .with_notification_capacity(AuditConfig::MAX_NOTIFICATION_CAPACITY);
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn config_rejects_malformed_json() {
        assert!(AuditConfig::from_json("{").is_err());
    }
}
