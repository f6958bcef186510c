//! Gateway error types.

use thiserror::Error;

use crate::payout::error::PayoutError;

/// Errors returned by the payout provider client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Provider refused the request (4xx other than 408/429).
    #[error("Provider rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the provider.
        status: u16,
        /// Provider message.
        message: String,
    },

    /// Provider unreachable or failing (network error, 5xx, 408, 429).
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Request exceeded the configured timeout.
    #[error("Provider request timed out")]
    Timeout,

    /// Provider answered with a body that could not be understood.
    #[error("Malformed provider response: {0}")]
    Malformed(String),

    /// Client misconfiguration.
    #[error("Gateway configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Returns true when the outcome of the call is unknown and may be retried
    /// by the user later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout | Self::Malformed(_))
    }
}

impl From<GatewayError> for PayoutError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected { message, .. } => Self::GatewayRejected(message),
            GatewayError::Unavailable(_) | GatewayError::Timeout | GatewayError::Malformed(_) => {
                Self::GatewayUnavailable(err.to_string())
            }
            GatewayError::Configuration(msg) => Self::Configuration(msg),
        }
    }
}
