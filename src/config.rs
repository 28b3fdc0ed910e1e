use anyhow::{Context, Result, ensure};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::delivery::{
    Backoff, DEFAULT_INITIAL_INTERVAL, DEFAULT_JITTER, DEFAULT_MAX_ELAPSED, DEFAULT_MAX_INTERVAL,
    DEFAULT_MULTIPLIER, DEFAULT_NAME, Retrier, RetryPolicy, SuccessSet,
};

/// Per-attempt timeout used when none is configured.
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 5_000;

/// Retrier settings as stored in a JSON file. Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrierConfig {
    pub name: String,
    pub attempt_timeout_ms: u64,
    pub max_elapsed_ms: u64,
    pub max_attempts: Option<u32>,
    pub backoff: BackoffConfig,
    pub jitter: f64,
    /// Accepted status codes. Any 2xx when absent.
    pub success_codes: Option<Vec<u16>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum BackoffConfig {
    Fixed {
        interval_ms: u64,
    },
    Exponential {
        initial_ms: u64,
        multiplier: f64,
        max_interval_ms: u64,
    },
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig::Exponential {
            initial_ms: DEFAULT_INITIAL_INTERVAL.as_millis() as u64,
            multiplier: DEFAULT_MULTIPLIER,
            max_interval_ms: DEFAULT_MAX_INTERVAL.as_millis() as u64,
        }
    }
}

impl Default for RetrierConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
            max_elapsed_ms: DEFAULT_MAX_ELAPSED.as_millis() as u64,
            max_attempts: None,
            backoff: BackoffConfig::default(),
            jitter: DEFAULT_JITTER,
            success_codes: None,
        }
    }
}

impl RetrierConfig {
    /// Loads a config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading retrier config from {:?}", path);
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Converts the file representation into a validated [`RetryPolicy`].
    pub fn policy(&self) -> Result<RetryPolicy> {
        let backoff = match self.backoff {
            BackoffConfig::Fixed { interval_ms } => Backoff::Fixed {
                interval: Duration::from_millis(interval_ms),
            },
            BackoffConfig::Exponential {
                initial_ms,
                multiplier,
                max_interval_ms,
            } => {
                ensure!(
                    multiplier.is_finite() && multiplier >= 1.0,
                    "backoff multiplier must be at least 1.0, got {}",
                    multiplier
                );
                Backoff::Exponential {
                    initial: Duration::from_millis(initial_ms),
                    multiplier,
                    max_interval: Duration::from_millis(max_interval_ms),
                }
            }
        };

        let success = match &self.success_codes {
            None => SuccessSet::AnySuccess,
            Some(codes) => {
                ensure!(!codes.is_empty(), "success_codes must not be empty");
                for code in codes {
                    ensure!(
                        (100..=599).contains(code),
                        "invalid HTTP status code in success_codes: {}",
                        code
                    );
                }
                SuccessSet::codes(codes.iter().copied())
            }
        };

        let mut policy = RetryPolicy {
            max_elapsed: Duration::from_millis(self.max_elapsed_ms),
            max_attempts: None,
            backoff,
            jitter: 0.0,
            success,
        }
        .with_jitter(self.jitter);
        if let Some(max_attempts) = self.max_attempts {
            ensure!(max_attempts > 0, "max_attempts must be at least 1");
            policy = policy.with_max_attempts(max_attempts);
        }
        Ok(policy)
    }

    /// Builds a retrier with its own HTTP client.
    pub fn build(&self) -> Result<Retrier> {
        Ok(Retrier::new(self.attempt_timeout())?
            .with_policy(self.policy()?)
            .with_name(self.name.clone()))
    }
}
