use anyhow::{Context, Result};
use reqwest::{
    Body, Method, Request, Url,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};

use super::context::DeliveryContext;

/// Produces the HTTP request for one attempt.
///
/// Called once per attempt with the untouched payload. Any closure
/// `Fn(&DeliveryContext, &[u8]) -> anyhow::Result<Request>` qualifies.
#[cfg_attr(test, mockall::automock)]
pub trait BuildRequest: Send + Sync {
    fn build(&self, ctx: &DeliveryContext, payload: &[u8]) -> Result<Request>;
}

impl<F> BuildRequest for F
where
    F: Fn(&DeliveryContext, &[u8]) -> Result<Request> + Send + Sync,
{
    fn build(&self, ctx: &DeliveryContext, payload: &[u8]) -> Result<Request> {
        self(ctx, payload)
    }
}

/// Fixed method, URL and headers; the payload becomes the body.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    url: Url,
    headers: HeaderMap,
}

impl RequestTemplate {
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid webhook URL: {}", url))?;
        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
        })
    }

    /// `POST` with `Content-Type: application/json`.
    pub fn post_json(url: &str) -> Result<Self> {
        Self::new(Method::POST, url)?.header(CONTENT_TYPE.as_str(), "application/json")
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header name: {}", name))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header {}", name))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl BuildRequest for RequestTemplate {
    fn build(&self, _ctx: &DeliveryContext, payload: &[u8]) -> Result<Request> {
        let mut request = Request::new(self.method.clone(), self.url.clone());
        *request.headers_mut() = self.headers.clone();
        *request.body_mut() = Some(Body::from(payload.to_vec()));
        Ok(request)
    }
}
