//! Error types for the portal session client.
//!
//! Display strings matter here: they become the `error` field of a
//! `failed` municipality result, so they keep the exact wording the
//! deployed system's consumers already match on.

use thiserror::Error;

/// Errors that can occur while driving the portal protocol.
#[derive(Error, Debug)]
pub enum PortalError {
    /// Timeout or connection-level failure at any step
    #[error("timeout/connection error")]
    Transport,

    /// The search step answered with a non-200 status
    #[error("HTTP {status}")]
    HttpStatus {
        /// The HTTP status code received
        status: u16,
    },

    /// The detail step answered with a non-200 status
    #[error("step2 HTTP {status}")]
    DetailHttpStatus {
        /// The HTTP status code received
        status: u16,
    },

    /// The search step answered with a body that is not JSON
    #[error("not JSON response")]
    NotJson,

    /// Any other HTTP-client failure (TLS, redirect policy, body read)
    #[error("{0}")]
    Http(reqwest::Error),
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Transport
        } else {
            Self::Http(err)
        }
    }
}

/// Result type alias using `PortalError`.
pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_wording_is_stable() {
        assert_eq!(PortalError::Transport.to_string(), "timeout/connection error");
        assert_eq!(
            PortalError::HttpStatus { status: 503 }.to_string(),
            "HTTP 503"
        );
        assert_eq!(
            PortalError::DetailHttpStatus { status: 500 }.to_string(),
            "step2 HTTP 500"
        );
        assert_eq!(PortalError::NotJson.to_string(), "not JSON response");
    }
}
