//! Webhook delivery: request building, retry policy and the retry loop.

mod builder;
mod context;
mod error;
mod policy;
mod retrier;
mod status;

pub use builder::{BuildRequest, RequestTemplate};
pub use context::DeliveryContext;
pub use error::{AttemptError, DeliveryError, EXHAUSTED_MESSAGE};
pub use policy::{
    Backoff, DEFAULT_INITIAL_INTERVAL, DEFAULT_JITTER, DEFAULT_MAX_ELAPSED, DEFAULT_MAX_INTERVAL,
    DEFAULT_MULTIPLIER, RetryPolicy,
};
pub use retrier::{AttemptOutcome, DEFAULT_NAME, DeliveryAttempt, Retrier};
pub use status::SuccessSet;
