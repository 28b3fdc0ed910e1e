use std::time::Duration;

use reqwest::StatusCode;

/// Caller-facing message for a delivery that ran out of retries.
pub const EXHAUSTED_MESSAGE: &str = "failed to send event to webhook";

/// Why a single attempt failed. Every variant is retryable.
#[derive(Debug)]
pub enum AttemptError {
    /// The request could not be sent or the response could not be read.
    Transport(reqwest::Error),
    /// No response arrived within the per-attempt timeout.
    Timeout(Duration),
    /// The endpoint answered with a status outside the success set.
    UnacceptedStatus(StatusCode),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Transport(e) => write!(f, "transport error: {}", e),
            AttemptError::Timeout(timeout) => {
                write!(f, "no response within {}ms", timeout.as_millis())
            }
            AttemptError::UnacceptedStatus(status) => {
                write!(f, "unaccepted status {}", status.as_u16())
            }
        }
    }
}

impl std::error::Error for AttemptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttemptError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Terminal outcome of a failed delivery.
#[derive(Debug)]
pub enum DeliveryError {
    /// The request builder failed. Never retried.
    Build(anyhow::Error),
    /// Every allowed attempt failed. The last failure is kept as the source.
    Exhausted { attempts: u32, last: AttemptError },
    /// The delivery context was cancelled or hit its deadline.
    Cancelled,
}

impl DeliveryError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, DeliveryError::Exhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DeliveryError::Cancelled)
    }
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Build(e) => write!(f, "failed to build webhook request: {:#}", e),
            DeliveryError::Exhausted { .. } => f.write_str(EXHAUSTED_MESSAGE),
            DeliveryError::Cancelled => f.write_str("webhook delivery cancelled"),
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeliveryError::Build(e) => Some(&**e),
            DeliveryError::Exhausted { last, .. } => Some(last),
            DeliveryError::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_exhausted_display_hides_cause() {
        let err = DeliveryError::Exhausted {
            attempts: 3,
            last: AttemptError::UnacceptedStatus(StatusCode::INTERNAL_SERVER_ERROR),
        };
        assert_eq!(err.to_string(), "failed to send event to webhook");
        assert!(err.is_exhausted());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_exhausted_source_is_last_attempt() {
        let err = DeliveryError::Exhausted {
            attempts: 2,
            last: AttemptError::Timeout(Duration::from_millis(1500)),
        };
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "no response within 1500ms");
    }

    #[test]
    fn test_build_display_includes_cause() {
        let err = DeliveryError::Build(anyhow::anyhow!("invalid url"));
        assert!(err.to_string().contains("failed to build webhook request"));
        assert!(err.to_string().contains("invalid url"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_cancelled_display() {
        let err = DeliveryError::Cancelled;
        assert_eq!(err.to_string(), "webhook delivery cancelled");
        assert!(err.is_cancelled());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_unaccepted_status_display() {
        let err = AttemptError::UnacceptedStatus(StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "unaccepted status 502");
    }
}
