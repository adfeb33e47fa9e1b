//! Configuration for one editor instance.
//!
//! Settings can be constructed programmatically or loaded from environment
//! variables. Values are clamped rather than rejected.

use core::time::Duration;
use std::env;

use crate::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy};

/// Runtime configuration for the synchronization engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Delay between internal-element polling attempts, in milliseconds
    pub retry_delay_ms: u64,
    /// Polling attempts before a write is abandoned
    pub retry_max_attempts: u32,
    /// Whether text-like traits get a dedicated per-attribute listener on select
    pub fast_text_listeners: bool,
    /// Whether counters are logged as a JSON line when a bridge is destroyed
    pub telemetry_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            retry_max_attempts: DEFAULT_MAX_ATTEMPTS,
            fast_text_listeners: true,
            telemetry_enabled: false,
        }
    }
}

impl SyncConfig {
    /// Construct a configuration with explicit values (each minimum 1).
    #[inline]
    #[must_use]
    pub fn new(
        retry_delay_ms: u64,
        retry_max_attempts: u32,
        fast_text_listeners: bool,
        telemetry_enabled: bool,
    ) -> Self {
        Self {
            retry_delay_ms: retry_delay_ms.max(1),
            retry_max_attempts: retry_max_attempts.max(1),
            fast_text_listeners,
            telemetry_enabled,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `TRAIT_SYNC_RETRY_DELAY_MS`: polling delay in milliseconds (default: 50)
    /// - `TRAIT_SYNC_RETRY_MAX_ATTEMPTS`: polling attempts (default: 10)
    /// - `TRAIT_SYNC_FAST_TEXT`: set to "0" to disable per-attribute text listeners
    /// - `TRAIT_SYNC_TELEMETRY`: set to "1" to log counters on teardown
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let retry_delay_ms = lookup("TRAIT_SYNC_RETRY_DELAY_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(defaults.retry_delay_ms)
            .max(1);
        let retry_max_attempts = lookup("TRAIT_SYNC_RETRY_MAX_ATTEMPTS")
            .and_then(|val| val.trim().parse::<u32>().ok())
            .unwrap_or(defaults.retry_max_attempts)
            .max(1);
        let fast_text_listeners = lookup("TRAIT_SYNC_FAST_TEXT").as_deref() != Some("0");
        let telemetry_enabled = lookup("TRAIT_SYNC_TELEMETRY").as_deref() == Some("1");
        Self {
            retry_delay_ms,
            retry_max_attempts,
            fast_text_listeners,
            telemetry_enabled,
        }
    }

    /// Polling delay as a `Duration`.
    #[inline]
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Default retry policy for internal-element writes.
    #[inline]
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_delay(), self.retry_max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_and_clamps() {
        let vars: HashMap<&str, &str> = [
            ("TRAIT_SYNC_RETRY_DELAY_MS", "0"),
            ("TRAIT_SYNC_RETRY_MAX_ATTEMPTS", " 4 "),
            ("TRAIT_SYNC_FAST_TEXT", "0"),
            ("TRAIT_SYNC_TELEMETRY", "1"),
        ]
        .into_iter()
        .collect();
        let config = SyncConfig::from_lookup(|key| vars.get(key).map(|val| (*val).to_owned()));
        assert_eq!(config, SyncConfig::new(1, 4, false, true));
        assert_eq!(config.retry_policy().max_attempts, 4);
    }

    #[test]
    fn missing_or_garbage_values_fall_back_to_defaults() {
        let config = SyncConfig::from_lookup(|key| {
            (key == "TRAIT_SYNC_RETRY_DELAY_MS").then(|| "soon".to_owned())
        });
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }
}
