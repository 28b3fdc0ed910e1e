//! Retry budget and backoff schedule.

use std::time::Duration;

use super::status::SuccessSet;

/// Overall retry budget for one delivery.
pub const DEFAULT_MAX_ELAPSED: Duration = Duration::from_secs(60);

/// First backoff interval of the default exponential schedule.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);

/// Growth factor of the default exponential schedule.
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

/// Upper bound for a single backoff interval.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(10);

/// Default proportional jitter (±50%).
pub const DEFAULT_JITTER: f64 = 0.5;

/// How long to wait between two attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Same interval after every failure.
    Fixed { interval: Duration },
    /// `initial * multiplier^retry`, capped at `max_interval`.
    Exponential {
        initial: Duration,
        multiplier: f64,
        max_interval: Duration,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential {
            initial: DEFAULT_INITIAL_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }
}

impl Backoff {
    /// Delay before retry number `retry` (0 after the first failure), without jitter.
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            Backoff::Fixed { interval } => *interval,
            Backoff::Exponential {
                initial,
                multiplier,
                max_interval,
            } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let secs = initial.as_secs_f64() * multiplier.max(1.0).powi(exponent);
                if !secs.is_finite() || secs >= max_interval.as_secs_f64() {
                    *max_interval
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

/// Immutable retry configuration held by a [`Retrier`](super::Retrier).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total time after which no further attempt is started.
    pub max_elapsed: Duration,
    /// Optional cap on the number of attempts, including the first one.
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
    /// Proportional randomisation of each delay, in `[0, 1]`.
    pub jitter: f64,
    pub success: SuccessSet,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_elapsed: DEFAULT_MAX_ELAPSED,
            max_attempts: None,
            backoff: Backoff::default(),
            jitter: DEFAULT_JITTER,
            success: SuccessSet::default(),
        }
    }
}

impl RetryPolicy {
    /// Fixed-interval policy without jitter.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            backoff: Backoff::Fixed { interval },
            jitter: 0.0,
            ..Self::default()
        }
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Sets the jitter factor, clamped to `[0, 1]`.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_nan() { 0.0 } else { jitter.clamp(0.0, 1.0) };
        self
    }

    pub fn with_success(mut self, success: SuccessSet) -> Self {
        self.success = success;
        self
    }

    /// Whether another attempt may start after `attempts_made` attempts.
    pub fn allows_attempt(&self, attempts_made: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts_made < max)
    }

    /// Jittered delay before retry number `retry`.
    pub fn next_delay(&self, retry: u32) -> Duration {
        apply_jitter(self.backoff.delay(retry), self.jitter)
    }
}

fn apply_jitter(delay: Duration, factor: f64) -> Duration {
    if factor.is_nan() || factor <= 0.0 {
        return delay;
    }
    let spread = delay.as_secs_f64() * factor.min(1.0);
    let low = delay.as_secs_f64() - spread;
    Duration::try_from_secs_f64(low + fastrand::f64() * 2.0 * spread).unwrap_or(Duration::MAX)
}
