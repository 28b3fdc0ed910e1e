//! HTTP transport used to send webhook requests.

mod transport;

pub use transport::{HttpTransport, Transport, USER_AGENT};

#[cfg(test)]
pub use transport::MockTransport;
