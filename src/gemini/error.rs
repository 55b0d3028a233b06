//! Gateway error types

use thiserror::Error;

/// A failed call to the generative language API. Carries the HTTP
/// status when the service answered at all.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub http_status: Option<u16>,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Network, message)
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Http, message).with_status(status)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::MalformedResponse, message)
    }

    pub fn empty_content(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::EmptyContent, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidRequest, message)
    }
}

// The request URL carries the API key as a query parameter so it
// must never reach the message
impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status();
        let error = Self::network(err.without_url().to_string());
        match status {
            Some(status) => error.with_status(status.as_u16()),
            None => error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Connection failures, timeouts, TLS errors
    Network,
    /// The service answered with a non-2xx status
    Http,
    /// The body could not be parsed as JSON
    MalformedResponse,
    /// The reply had no text in the first candidate
    EmptyContent,
    /// The request could not be built, nothing was sent
    InvalidRequest,
}
