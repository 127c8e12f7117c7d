//! Retention configuration for stored items.
//!
//! Every stored item carries an absolute expiry (`ttl`, epoch seconds)
//! computed at write time; reclamation is left to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default retention in days.
pub const DEFAULT_TTL_DAYS: u32 = 7;

/// Longest retention accepted (10 years).
pub const MAX_TTL_DAYS: u32 = 3650;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Errors raised by an invalid retention policy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetentionError {
    /// TTL of zero days.
    #[error("TTL must be greater than zero")]
    Zero,

    /// TTL above [`MAX_TTL_DAYS`].
    #[error("TTL cannot exceed 3650 days (10 years), got {0}")]
    TooLong(u32),
}

/// Retention policy applied to every stored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Time-to-live in days.
    pub ttl_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_DAYS)
    }
}

impl RetentionPolicy {
    /// Creates a new retention policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::RetentionPolicy;
    ///
    /// let policy = RetentionPolicy::new(30);
    /// assert_eq!(policy.ttl_days, 30);
    /// ```
    #[must_use]
    pub fn new(ttl_days: u32) -> Self {
        Self { ttl_days }
    }

    /// Returns the TTL as a `Duration`.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::RetentionPolicy;
    ///
    /// let duration = RetentionPolicy::default().as_duration();
    /// assert_eq!(duration.as_secs(), 7 * 24 * 60 * 60);
    /// ```
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_days) * SECONDS_PER_DAY)
    }

    /// Expiry (epoch seconds) for an item written at `now`.
    #[must_use]
    pub fn expires_at(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp() + i64::from(self.ttl_days) * 24 * 60 * 60
    }

    /// Validates the retention policy.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - TTL is zero
    /// - TTL exceeds maximum allowed (3650 days / 10 years)
    pub fn validate(&self) -> Result<(), RetentionError> {
        if self.ttl_days == 0 {
            return Err(RetentionError::Zero);
        }
        if self.ttl_days > MAX_TTL_DAYS {
            return Err(RetentionError::TooLong(self.ttl_days));
        }
        Ok(())
    }
}
