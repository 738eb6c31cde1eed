//! Configuration for the polling engine
//!
//! The engine has exactly one tunable: the delay between the settlement of
//! one fetch attempt and the issuance of the next. There is no backoff,
//! jitter or retry limit.

use std::time::Duration;

use crate::error::{PollingError, Result};

/// Environment variable read by [`PollingConfig::from_env`]
pub const DELAY_ENV_VAR: &str = "API_POLLING_DELAY_MS";

/// Cadence settings for a polling engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Time between the settlement of one attempt and the issuance of the next
    /// Default: 1 second
    pub delay: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
        }
    }
}

impl PollingConfig {
    /// Create a new PollingConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a PollingConfig for near-live dashboards
    pub fn fast() -> Self {
        Self {
            delay: Duration::from_millis(250),
        }
    }

    /// Create a PollingConfig for slow-moving data
    pub fn relaxed() -> Self {
        Self {
            delay: Duration::from_secs(30),
        }
    }

    /// Build a config from `API_POLLING_DELAY_MS`, falling back to defaults
    /// when the variable is unset
    pub fn from_env() -> Result<Self> {
        match std::env::var(DELAY_ENV_VAR) {
            Ok(raw) => Self::default().with_delay_str(&raw),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(PollingError::Configuration(format!(
                "{}: {}",
                DELAY_ENV_VAR, e
            ))),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the delay from human-readable text
    ///
    /// Accepts a whole number followed by `ms`, `s` or `m`. A bare number is
    /// read as milliseconds, so `"250"` and `"250ms"` are equivalent.
    pub fn with_delay_str(self, raw: &str) -> Result<Self> {
        let text = raw.trim();
        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (amount, unit) = text.split_at(split);

        let invalid = || {
            PollingError::Configuration(format!(
                "delay must be a whole number with an optional ms/s/m unit, got {:?}",
                raw
            ))
        };

        let amount: u64 = amount.parse().map_err(|_| invalid())?;
        let delay = match unit.trim() {
            "" | "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.checked_mul(60).ok_or_else(invalid)?),
            _ => return Err(invalid()),
        };

        Ok(self.with_delay(delay))
    }
}
