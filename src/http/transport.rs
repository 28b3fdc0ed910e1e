use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Request, StatusCode};

/// User agent sent when the request builder does not set one.
pub const USER_AGENT: &str = concat!("webhook-retrier/", env!("WEBHOOK_RETRIER_VERSION"));

/// Sends a single webhook request and reports the response status.
///
/// Only the status line matters to the retry loop; the body is never read.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<StatusCode, reqwest::Error>;
}

/// Transport backed by a pooled `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a transport with a fresh client that identifies itself with [`USER_AGENT`].
    pub fn with_defaults() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<StatusCode, reqwest::Error> {
        debug!("{} {}...", request.method(), request.url());
        let response = self.client.execute(request).await?;
        Ok(response.status())
    }
}
