//! Collaborator interfaces of the settlement engine.
//!
//! The database crate implements the store, sales and directory ports on
//! PostgreSQL; [`crate::gateway::HttpPayoutGateway`] implements the gateway
//! port. In-process implementations live in [`crate::payout::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kiosk_shared::types::{OrganizationId, UserId, WithdrawalId};
use rust_decimal::Decimal;

use crate::gateway::GatewayError;
use crate::payout::error::PayoutError;
use crate::payout::types::{
    NewWithdrawal, PayoutRecipient, RevenueSummary, TransferInstruction, TransferVerification,
    WithdrawalRequest, WithdrawalStatus, WithdrawalTotals, WithdrawalVersion,
};

/// Durable withdrawal records.
#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    /// Inserts a record.
    ///
    /// `entitlement` is the organization's share of revenue. The store must
    /// atomically check that existing pending, processing and completed
    /// amounts plus the new one do not exceed it, failing with
    /// `InsufficientBalance` otherwise, and must fail with
    /// `DuplicateReference` when the reference exists.
    async fn insert(
        &self,
        withdrawal: NewWithdrawal,
        entitlement: Decimal,
    ) -> Result<WithdrawalRequest, PayoutError>;

    /// Finds a record by provider reference.
    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<WithdrawalRequest>, PayoutError>;

    /// Lists records of an organization, newest first.
    async fn list_by_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<WithdrawalRequest>, PayoutError>;

    /// Moves a record to `status`. Fails with `InvalidTransition` out of a
    /// terminal status.
    async fn update_status(
        &self,
        id: WithdrawalId,
        status: WithdrawalStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<WithdrawalRequest, PayoutError>;

    /// Sums record amounts of an organization per status bucket.
    async fn totals(&self, organization_id: OrganizationId)
    -> Result<WithdrawalTotals, PayoutError>;

    /// Returns the change stamp of an organization's records.
    async fn version(
        &self,
        organization_id: OrganizationId,
    ) -> Result<WithdrawalVersion, PayoutError>;
}

/// Sales figures of an organization.
#[async_trait]
pub trait SalesLedger: Send + Sync {
    /// Returns total revenue and sales count.
    async fn revenue_summary(
        &self,
        organization_id: OrganizationId,
    ) -> Result<RevenueSummary, PayoutError>;
}

/// Organization membership and payout account details.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// Returns true if `user_id` may manage payouts of `organization_id`.
    async fn can_manage_payouts(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<bool, PayoutError>;

    /// Returns the configured payout recipient, if any.
    async fn payout_recipient(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<PayoutRecipient>, PayoutError>;
}

/// External payout provider.
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    /// Starts a transfer and returns the provider reference.
    async fn initiate(&self, instruction: &TransferInstruction) -> Result<String, GatewayError>;

    /// Queries the status of a transfer. Read-only.
    async fn verify(&self, reference: &str) -> Result<TransferVerification, GatewayError>;
}
