use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable credentials. Raised before any network access.
    #[error("client is not configured: {0}")]
    Configuration(String),

    /// DNS, connect, timeout and other failures below HTTP.
    #[error("connection failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("request failed: ({status}) {message}: {body}")]
    Request {
        status: u16,
        message: String,
        body: String,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("index '{name}' did not start within {waited:?}")]
    WaitTimeout { name: String, waited: Duration },

    #[error("wait for index '{0}' was cancelled")]
    Cancelled(String),
}

impl Error {
    /// HTTP status of a `Request` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
