//! Configuration types for bulk-reports

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Longest configurable polling deadline (24 hours)
pub const MAX_POLL_DEADLINE: Duration = Duration::from_secs(24 * 60 * 60);

/// Main configuration for [`ReportOrchestrator`](crate::ReportOrchestrator)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Scope (marketplace) ids used when a request does not name any
    #[serde(default)]
    pub default_scope_ids: Vec<String>,

    /// Status polling cadence and deadline
    #[serde(default)]
    pub polling: PollingConfig,

    /// Retry policy for [`RetryingTransport`](crate::RetryingTransport)
    #[serde(default)]
    pub retry: RetryConfig,

    /// Buffer size of the lifecycle event channel (default: 256)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_scope_ids: Vec::new(),
            polling: PollingConfig::default(),
            retry: RetryConfig::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Config {
    /// Check the configuration for values the core cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.polling.poll_interval.is_zero() {
            return Err(Error::config(
                "polling.poll_interval",
                "poll interval must be greater than zero",
            ));
        }
        if self.polling.deadline.is_zero() {
            return Err(Error::config(
                "polling.deadline",
                "polling deadline must be greater than zero",
            ));
        }
        if self.polling.deadline > MAX_POLL_DEADLINE {
            return Err(Error::config(
                "polling.deadline",
                format!(
                    "polling deadline must not exceed {} seconds",
                    MAX_POLL_DEADLINE.as_secs()
                ),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::config(
                "event_capacity",
                "event channel capacity must be greater than zero",
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "backoff multiplier must be at least 1.0",
            ));
        }
        if self.default_scope_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(Error::config(
                "default_scope_ids",
                "default scope ids must not be blank",
            ));
        }
        Ok(())
    }
}

/// Status polling configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Fixed delay between status requests (default: 5 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Maximum time to wait for a terminal state (default: 300 seconds)
    #[serde(default = "default_deadline", with = "duration_serde")]
    pub deadline: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            deadline: default_deadline(),
        }
    }
}

/// Retry behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    256
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_deadline() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Durations are plain seconds: integers for whole seconds, floats otherwise
mod duration_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Whole(u64),
        Fractional(f64),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Seconds::deserialize(deserializer)? {
            Seconds::Whole(secs) => Ok(Duration::from_secs(secs)),
            Seconds::Fractional(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|e| D::Error::custom(format!("invalid duration {secs}: {e}"))),
        }
    }
}
