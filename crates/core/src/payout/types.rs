//! Payout domain types.
//!
//! Withdrawal records, provider statuses and the inputs/outputs of the
//! settlement engine.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use kiosk_shared::types::{Currency, OrganizationId, UserId, WithdrawalId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a withdrawal record.
///
/// Valid transitions:
/// - Pending → Processing | Completed | Failed | Cancelled
/// - Processing → Completed | Failed | Cancelled
///
/// Completed, Failed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    /// Gateway accepted the transfer but its status could not be confirmed yet.
    Pending,
    /// Provider reported the transfer as initiated or pending.
    Processing,
    /// Provider confirmed the transfer.
    Completed,
    /// Provider reported the transfer as failed.
    Failed,
    /// Provider reported the transfer as cancelled.
    Cancelled,
}

impl WithdrawalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if no further transition is allowed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the amount counts toward `withdrawn_amount`.
    #[must_use]
    pub fn counts_as_withdrawn(&self) -> bool {
        matches!(self, Self::Processing | Self::Completed)
    }

    /// Rank of the status along the lifecycle. Every legal transition
    /// increases it.
    #[must_use]
    pub fn progress(&self) -> u64 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed | Self::Cancelled => 2,
        }
    }

    /// Returns true if a record may be created in this status.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing | Self::Completed)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transfer status as reported by the payout provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    /// Money reached the recipient.
    Success,
    /// Transfer accepted, not yet moving.
    Initiated,
    /// Transfer in flight.
    Pending,
    /// Transfer failed at the provider.
    Failed,
    /// Transfer cancelled at the provider.
    Cancelled,
}

impl ProviderStatus {
    /// Returns the provider's string for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Initiated => "initiated",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Record id.
    pub id: WithdrawalId,
    /// Organization the money is paid out for.
    pub organization_id: OrganizationId,
    /// User who requested the withdrawal.
    pub requested_by: UserId,
    /// Amount in major units, always positive.
    pub amount: Decimal,
    /// Payout currency.
    pub currency: Currency,
    /// Optional free-form notes.
    pub notes: Option<String>,
    /// Current lifecycle status.
    pub status: WithdrawalStatus,
    /// Provider reference, unique across all records.
    pub external_reference: String,
    /// When the withdrawal was requested.
    pub requested_at: DateTime<Utc>,
    /// Set once the record reaches a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a withdrawal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWithdrawal {
    /// Record id, allocated before initiation so the provider can echo it.
    pub id: WithdrawalId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Requesting user.
    pub requested_by: UserId,
    /// Amount in major units.
    pub amount: Decimal,
    /// Payout currency.
    pub currency: Currency,
    /// Optional notes.
    pub notes: Option<String>,
    /// Initial status (pending, processing or completed).
    pub status: WithdrawalStatus,
    /// Provider reference.
    pub external_reference: String,
    /// Request time.
    pub requested_at: DateTime<Utc>,
    /// Completion time, only for completed records.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Withdrawal amounts of one organization summed per status bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalTotals {
    /// Sum of `pending` records.
    pub pending: Decimal,
    /// Sum of `processing` records.
    pub processing: Decimal,
    /// Sum of `completed` records.
    pub completed: Decimal,
}

impl WithdrawalTotals {
    /// Amount that counts toward `withdrawn_amount`.
    #[must_use]
    pub fn withdrawn(&self) -> Decimal {
        self.processing + self.completed
    }

    /// Amount that is withdrawn or reserved by a pending transfer.
    #[must_use]
    pub fn reserved(&self) -> Decimal {
        self.pending + self.withdrawn()
    }

    /// Adds `amount` to the bucket of `status`. Failed and cancelled are ignored.
    pub fn add(&mut self, status: WithdrawalStatus, amount: Decimal) {
        match status {
            WithdrawalStatus::Pending => self.pending += amount,
            WithdrawalStatus::Processing => self.processing += amount,
            WithdrawalStatus::Completed => self.completed += amount,
            WithdrawalStatus::Failed | WithdrawalStatus::Cancelled => {}
        }
    }
}

/// Change stamp of an organization's withdrawal records.
///
/// An insert adds a record and a status update moves a record forward, so
/// the stamp never repeats once either happens. It is derived from stored
/// rows only and reads the same in every process sharing the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WithdrawalVersion {
    /// Number of records.
    pub records: u64,
    /// Sum of [`WithdrawalStatus::progress`] over the records.
    pub progress: u64,
}

impl WithdrawalVersion {
    /// Counts `count` records in `status`.
    pub fn add(&mut self, status: WithdrawalStatus, count: u64) {
        self.records += count;
        self.progress += status.progress() * count;
    }
}

/// Revenue figures reported by the sales collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSummary {
    /// Sum of paid sales.
    pub total_revenue: Decimal,
    /// Number of paid sales.
    pub total_sales_count: u64,
}

/// Result of a provider status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferVerification {
    /// Provider status.
    pub status: ProviderStatus,
    /// When the provider accepted the transfer.
    pub initiated_at: Option<DateTime<Utc>>,
    /// When the provider finished processing.
    pub processed_at: Option<DateTime<Utc>>,
}

/// Contact details sent to the provider with a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutCustomer {
    /// Account holder name.
    pub name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
}

/// Where the provider sends the money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutDestination {
    /// Payout channel, e.g. `mobile_money` or `bank`.
    pub channel: String,
    /// Account or wallet number on that channel.
    pub account_number: String,
}

/// Configured payout recipient of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecipient {
    /// Contact details.
    pub customer: PayoutCustomer,
    /// Destination account.
    pub destination: PayoutDestination,
}

/// Instruction passed to the gateway on initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInstruction {
    /// Amount in major units.
    pub amount: Decimal,
    /// Payout currency.
    pub currency: Currency,
    /// Recipient contact details.
    pub customer: PayoutCustomer,
    /// Recipient account.
    pub destination: PayoutDestination,
    /// Opaque metadata echoed by the provider.
    pub metadata: BTreeMap<String, String>,
}

/// A transfer the gateway accepted, waiting for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatedTransfer {
    /// Id the withdrawal record will carry.
    pub withdrawal_id: WithdrawalId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Requesting user.
    pub requested_by: UserId,
    /// Requested amount.
    pub amount: Decimal,
    /// Payout currency.
    pub currency: Currency,
    /// Optional notes.
    pub notes: Option<String>,
    /// Provider reference, the idempotency key of reconciliation.
    pub reference: String,
    /// Request time.
    pub requested_at: DateTime<Utc>,
}

/// User-facing classification of a withdrawal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalOutcome {
    /// Transfer confirmed.
    Completed,
    /// Transfer in flight.
    Processing,
    /// Transfer status unknown, verification was unavailable.
    Pending,
    /// Transfer failed.
    Failed,
    /// Transfer cancelled.
    Cancelled,
}

impl WithdrawalOutcome {
    /// Classifies a stored record.
    #[must_use]
    pub fn of(record: &WithdrawalRequest) -> Self {
        match record.status {
            WithdrawalStatus::Completed => Self::Completed,
            WithdrawalStatus::Processing => Self::Processing,
            WithdrawalStatus::Pending => Self::Pending,
            WithdrawalStatus::Failed => Self::Failed,
            WithdrawalStatus::Cancelled => Self::Cancelled,
        }
    }

    /// Message shown to the requesting user.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Completed => "Withdrawal completed. Your balance has been updated.",
            Self::Processing | Self::Pending => {
                "Withdrawal is pending. Check back later or verify its status again."
            }
            Self::Failed => "Withdrawal failed at the payout provider. No funds were moved.",
            Self::Cancelled => "Withdrawal was cancelled at the payout provider.",
        }
    }

    /// Returns true if the user may trigger a manual re-verification.
    #[must_use]
    pub fn can_reverify(&self) -> bool {
        matches!(self, Self::Processing | Self::Pending)
    }
}
