//! Retry loop that drives one webhook delivery to a terminal outcome.

use std::{sync::Arc, time::Duration};

use anyhow::{Result, ensure};
use log::{debug, info, warn};
use reqwest::{Client, Request, StatusCode};
use tokio::time::Instant;

use super::{
    builder::BuildRequest,
    context::DeliveryContext,
    error::{AttemptError, DeliveryError},
    policy::RetryPolicy,
};
use crate::http::{HttpTransport, Transport};

/// Label used in log lines when none is configured.
pub const DEFAULT_NAME: &str = "webhook";

/// Classification of a finished attempt.
///
/// A builder failure is the fatal case. It ends the delivery with
/// [`DeliveryError::Build`] before any request is sent, so it never
/// produces a [`DeliveryAttempt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Retryable,
}

/// One request/response cycle. Lives only for a single loop iteration.
#[derive(Debug)]
pub struct DeliveryAttempt {
    /// 0-based attempt index.
    pub index: u32,
    pub result: Result<StatusCode, AttemptError>,
}

impl DeliveryAttempt {
    pub fn outcome(&self) -> AttemptOutcome {
        match self.result {
            Ok(_) => AttemptOutcome::Success,
            Err(_) => AttemptOutcome::Retryable,
        }
    }
}

/// Delivers payloads to a webhook endpoint, retrying until success or until
/// the policy's budget is spent.
///
/// Holds only immutable configuration and a shared transport, so one
/// instance can serve concurrent deliveries.
#[derive(Debug)]
pub struct Retrier<T: Transport = HttpTransport> {
    transport: Arc<T>,
    attempt_timeout: Duration,
    policy: RetryPolicy,
    name: String,
}

impl<T: Transport> Clone for Retrier<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            attempt_timeout: self.attempt_timeout,
            policy: self.policy.clone(),
            name: self.name.clone(),
        }
    }
}

impl Retrier {
    /// Creates a retrier with its own pooled HTTP client.
    ///
    /// `attempt_timeout` bounds each individual attempt, not the whole
    /// delivery. It must be positive. Attempts are logged through the `log`
    /// facade, so the sink is whatever logger the process installs; use
    /// [`Retrier::with_name`] to tell retriers apart in its output.
    pub fn new(attempt_timeout: Duration) -> Result<Self> {
        Self::with_transport(HttpTransport::with_defaults()?, attempt_timeout)
    }

    /// Creates a retrier that shares an existing client's connection pool.
    pub fn with_client(client: Client, attempt_timeout: Duration) -> Result<Self> {
        Self::with_transport(HttpTransport::new(client), attempt_timeout)
    }
}

impl<T: Transport> Retrier<T> {
    pub fn with_transport(transport: T, attempt_timeout: Duration) -> Result<Self> {
        ensure!(!attempt_timeout.is_zero(), "attempt timeout must be positive");
        Ok(Self {
            transport: Arc::new(transport),
            attempt_timeout,
            policy: RetryPolicy::default(),
            name: DEFAULT_NAME.to_string(),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the label that prefixes every log line of this retrier.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivers `payload`, building a fresh request with `builder` for every attempt.
    ///
    /// Returns `Ok(())` as soon as the endpoint answers with a status in the
    /// success set. Builder failures end the delivery immediately. Transport
    /// errors, timeouts and other statuses are retried until the policy gives
    /// up, which yields [`DeliveryError::Exhausted`]. If `ctx` fires at any
    /// point, the in-flight request or backoff sleep is abandoned and
    /// [`DeliveryError::Cancelled`] is returned.
    #[tracing::instrument(
        skip(self, ctx, payload, builder),
        fields(webhook = %self.name, payload_len = payload.len())
    )]
    pub async fn request_retry<B>(
        &self,
        ctx: &DeliveryContext,
        payload: &[u8],
        builder: &B,
    ) -> Result<(), DeliveryError>
    where
        B: BuildRequest + ?Sized,
    {
        let started = Instant::now();
        let mut index: u32 = 0;

        loop {
            if ctx.is_done() {
                info!("{}: delivery cancelled before attempt {}", self.name, index + 1);
                return Err(DeliveryError::Cancelled);
            }

            let request = builder.build(ctx, payload).map_err(|e| {
                warn!("{}: failed to build request: {:#}", self.name, e);
                DeliveryError::Build(e)
            })?;

            let attempt = self.attempt(ctx, index, request).await?;
            let error = match attempt.result {
                Ok(status) => {
                    info!(
                        "{}: delivered on attempt {} (status {})",
                        self.name,
                        attempt.index + 1,
                        status.as_u16()
                    );
                    return Ok(());
                }
                Err(e) => e,
            };

            let attempts = attempt.index + 1;
            if !self.policy.allows_attempt(attempts) {
                return Err(self.give_up(attempts, error));
            }

            let delay = self.policy.next_delay(attempt.index);
            let over_budget = started
                .elapsed()
                .checked_add(delay)
                .is_none_or(|total| total > self.policy.max_elapsed);
            if over_budget {
                return Err(self.give_up(attempts, error));
            }

            warn!(
                "{}: attempt {} failed ({}), retrying in {}ms...",
                self.name,
                attempts,
                error,
                delay.as_millis()
            );

            tokio::select! {
                () = ctx.done() => {
                    info!("{}: delivery cancelled during backoff", self.name);
                    return Err(DeliveryError::Cancelled);
                }
                () = tokio::time::sleep(delay) => {}
            }

            index += 1;
        }
    }

    /// Sends one request within the per-attempt timeout, racing it against `ctx`.
    async fn attempt(
        &self,
        ctx: &DeliveryContext,
        index: u32,
        request: Request,
    ) -> Result<DeliveryAttempt, DeliveryError> {
        debug!(
            "{}: attempt {}: {} {}",
            self.name,
            index + 1,
            request.method(),
            request.url()
        );

        let send = tokio::time::timeout(self.attempt_timeout, self.transport.send(request));
        let result = tokio::select! {
            () = ctx.done() => {
                info!("{}: delivery cancelled during attempt {}", self.name, index + 1);
                return Err(DeliveryError::Cancelled);
            }
            sent = send => match sent {
                Err(_) => Err(AttemptError::Timeout(self.attempt_timeout)),
                Ok(Err(e)) => Err(AttemptError::Transport(e)),
                Ok(Ok(status)) if self.policy.success.accepts(status) => Ok(status),
                Ok(Ok(status)) => Err(AttemptError::UnacceptedStatus(status)),
            },
        };

        Ok(DeliveryAttempt { index, result })
    }

    fn give_up(&self, attempts: u32, last: AttemptError) -> DeliveryError {
        warn!(
            "{}: giving up after {} attempt(s), last error: {}",
            self.name, attempts, last
        );
        DeliveryError::Exhausted { attempts, last }
    }
}
