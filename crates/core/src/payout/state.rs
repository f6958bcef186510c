//! Withdrawal status state machine.
//!
//! ```text
//! (none)     --initiate accepted-->            pending
//! pending    --provider initiated/pending-->   processing
//! pending    --provider success-->             completed   [terminal]
//! processing --provider success-->             completed   [terminal]
//! pending    --provider failed/cancelled-->    failed / cancelled   [terminal]
//! processing --provider failed/cancelled-->    failed / cancelled   [terminal]
//! ```

use crate::payout::error::PayoutError;
use crate::payout::types::{ProviderStatus, WithdrawalStatus};

/// Stateless service validating withdrawal status transitions.
pub struct WithdrawalStateMachine;

impl WithdrawalStateMachine {
    /// Maps a provider status to the record status it implies.
    #[must_use]
    pub fn map_provider_status(status: ProviderStatus) -> WithdrawalStatus {
        match status {
            ProviderStatus::Success => WithdrawalStatus::Completed,
            ProviderStatus::Initiated | ProviderStatus::Pending => WithdrawalStatus::Processing,
            ProviderStatus::Failed => WithdrawalStatus::Failed,
            ProviderStatus::Cancelled => WithdrawalStatus::Cancelled,
        }
    }

    /// Returns true if a record may move from `from` to `to`.
    #[must_use]
    pub fn is_valid_transition(from: WithdrawalStatus, to: WithdrawalStatus) -> bool {
        use WithdrawalStatus::{Cancelled, Completed, Failed, Pending, Processing};
        matches!(
            (from, to),
            (Pending, Processing | Completed | Failed | Cancelled)
                | (Processing, Completed | Failed | Cancelled)
        )
    }

    /// Validates a transition.
    pub fn transition(
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    ) -> Result<WithdrawalStatus, PayoutError> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(PayoutError::InvalidTransition { from, to })
        }
    }

    /// Validates the status a new record is created with.
    pub fn initial(status: WithdrawalStatus) -> Result<WithdrawalStatus, PayoutError> {
        if status.is_initial() {
            Ok(status)
        } else {
            Err(PayoutError::InvalidInitialStatus(status))
        }
    }

    /// Computes the next status of a record given the provider's view.
    ///
    /// Returns `Ok(None)` when the record already reflects the provider status.
    pub fn next(
        current: WithdrawalStatus,
        provider: ProviderStatus,
    ) -> Result<Option<WithdrawalStatus>, PayoutError> {
        let target = Self::map_provider_status(provider);
        if target == current {
            return Ok(None);
        }
        Self::transition(current, target).map(Some)
    }
}
