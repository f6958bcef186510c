//! Payout error types.
//!
//! Every failure the settlement engine, the ledger and the store ports can
//! report. Each variant maps to an HTTP status and a stable error code.

use kiosk_shared::types::{OrganizationId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::payout::types::{ProviderStatus, WithdrawalStatus};

/// Errors that can occur during payout operations.
#[derive(Debug, Error)]
pub enum PayoutError {
    /// Requested amount is not positive or is finer than the currency's
    /// minor unit.
    #[error("Invalid withdrawal amount: {0}")]
    InvalidAmount(Decimal),

    /// Requested amount exceeds what the organization can withdraw.
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Requested amount.
        requested: Decimal,
        /// Withdrawable amount at check time.
        available: Decimal,
    },

    /// Actor may not manage payouts of the organization.
    #[error("User {user_id} may not manage payouts of organization {organization_id}")]
    Forbidden {
        /// Target organization.
        organization_id: OrganizationId,
        /// Acting user.
        user_id: UserId,
    },

    /// Provider refused the transfer.
    #[error("Payout provider rejected the transfer: {0}")]
    GatewayRejected(String),

    /// Provider unreachable, timed out or failing.
    #[error("Payout provider unavailable: {0}")]
    GatewayUnavailable(String),

    /// Provider reported the transfer as failed or cancelled.
    #[error("Transfer {reference} ended with provider status {status}")]
    TransferFailed {
        /// Provider reference.
        reference: String,
        /// Provider status.
        status: ProviderStatus,
    },

    /// A record with this reference already exists.
    #[error("Withdrawal with reference {0} already exists")]
    DuplicateReference(String),

    /// Attempted an invalid status transition.
    #[error("Invalid withdrawal status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: WithdrawalStatus,
        /// Attempted status.
        to: WithdrawalStatus,
    },

    /// Attempted to create a record in a status that cannot start a lifecycle.
    #[error("Withdrawal cannot be created with status {0}")]
    InvalidInitialStatus(WithdrawalStatus),

    /// No record for the reference.
    #[error("Withdrawal with reference {0} not found")]
    WithdrawalNotFound(String),

    /// Another reconciliation for the reference is running in this process.
    #[error("Reconciliation for reference {0} is already in progress")]
    ReconciliationInProgress(String),

    /// Organization has no payout account.
    #[error("Organization {0} has no payout account configured")]
    RecipientNotConfigured(OrganizationId),

    /// Invalid payout configuration.
    #[error("Payout configuration error: {0}")]
    Configuration(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl PayoutError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_) => 400,

            Self::Forbidden { .. } => 403,

            Self::WithdrawalNotFound(_) => 404,

            Self::DuplicateReference(_) | Self::ReconciliationInProgress(_) => 409,

            Self::InsufficientBalance { .. }
            | Self::GatewayRejected(_)
            | Self::TransferFailed { .. }
            | Self::RecipientNotConfigured(_) => 422,

            Self::GatewayUnavailable(_) => 503,

            Self::InvalidTransition { .. }
            | Self::InvalidInitialStatus(_)
            | Self::Configuration(_)
            | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::GatewayRejected(_) => "GATEWAY_REJECTED",
            Self::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            Self::TransferFailed { .. } => "TRANSFER_FAILED",
            Self::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InvalidInitialStatus(_) => "INVALID_INITIAL_STATUS",
            Self::WithdrawalNotFound(_) => "WITHDRAWAL_NOT_FOUND",
            Self::ReconciliationInProgress(_) => "RECONCILIATION_IN_PROGRESS",
            Self::RecipientNotConfigured(_) => "RECIPIENT_NOT_CONFIGURED",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Message safe to show to the requesting user.
    ///
    /// Internal failures collapse into a generic message; their detail is
    /// only logged.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidAmount(_) => {
                "Enter an amount greater than zero, with no more decimals than the currency allows."
                    .to_string()
            }
            Self::InsufficientBalance { available, .. } => {
                format!("Insufficient balance. You can withdraw at most {available}.")
            }
            Self::Forbidden { .. } => {
                "You are not allowed to manage payouts for this organization.".to_string()
            }
            Self::GatewayRejected(reason) => {
                format!("The payout provider rejected the withdrawal: {reason}")
            }
            Self::GatewayUnavailable(_) => {
                "The payout provider is unavailable. Please check back later.".to_string()
            }
            Self::TransferFailed { status, .. } => {
                format!("The transfer was {status} by the payout provider. No funds were moved.")
            }
            Self::WithdrawalNotFound(_) => "Withdrawal not found.".to_string(),
            Self::ReconciliationInProgress(_) => {
                "This withdrawal is already being verified. Please check back shortly.".to_string()
            }
            Self::RecipientNotConfigured(_) => {
                "Configure a payout account before requesting a withdrawal.".to_string()
            }
            Self::DuplicateReference(_)
            | Self::InvalidTransition { .. }
            | Self::InvalidInitialStatus(_)
            | Self::Configuration(_)
            | Self::Database(_) => "An internal error occurred.".to_string(),
        }
    }

    /// Returns true for transient provider failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::GatewayUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(PayoutError::InvalidAmount(dec!(0)), 400, "INVALID_AMOUNT")]
    #[case(
        PayoutError::InsufficientBalance { requested: dec!(10), available: dec!(5) },
        422,
        "INSUFFICIENT_BALANCE"
    )]
    #[case(
        PayoutError::Forbidden { organization_id: OrganizationId::new(), user_id: UserId::new() },
        403,
        "FORBIDDEN"
    )]
    #[case(PayoutError::GatewayRejected("bad account".into()), 422, "GATEWAY_REJECTED")]
    #[case(PayoutError::GatewayUnavailable("timeout".into()), 503, "GATEWAY_UNAVAILABLE")]
    #[case(
        PayoutError::TransferFailed { reference: "TRF-1".into(), status: ProviderStatus::Failed },
        422,
        "TRANSFER_FAILED"
    )]
    #[case(PayoutError::DuplicateReference("TRF-1".into()), 409, "DUPLICATE_REFERENCE")]
    #[case(
        PayoutError::InvalidTransition { from: WithdrawalStatus::Completed, to: WithdrawalStatus::Failed },
        500,
        "INVALID_TRANSITION"
    )]
    #[case(PayoutError::WithdrawalNotFound("TRF-1".into()), 404, "WITHDRAWAL_NOT_FOUND")]
    #[case(
        PayoutError::ReconciliationInProgress("TRF-1".into()),
        409,
        "RECONCILIATION_IN_PROGRESS"
    )]
    #[case(PayoutError::Database("boom".into()), 500, "DATABASE_ERROR")]
    fn test_status_and_code(
        #[case] err: PayoutError,
        #[case] status: u16,
        #[case] code: &str,
    ) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = PayoutError::InvalidTransition {
            from: WithdrawalStatus::Completed,
            to: WithdrawalStatus::Failed,
        };
        assert!(err.to_string().contains("completed"));
        assert!(err.to_string().contains("failed"));
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = PayoutError::Database("connection refused on 10.0.0.5".into());
        assert!(!err.user_message().contains("10.0.0.5"));
    }

    #[test]
    fn test_insufficient_balance_message_shows_available() {
        let err = PayoutError::InsufficientBalance {
            requested: dec!(500),
            available: dec!(300),
        };
        assert!(err.user_message().contains("300"));
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(PayoutError::GatewayUnavailable("x".into()).is_transient());
        assert!(!PayoutError::GatewayRejected("x".into()).is_transient());
    }
}
