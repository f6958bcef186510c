//! In-process implementations of the payout ports.
//!
//! Used by the engine and API tests, and handy for local runs without a
//! database or provider account. The withdrawal store enforces the same
//! guarantees as the PostgreSQL repository: unique references, write-time
//! balance recheck and terminal statuses.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kiosk_shared::types::{OrganizationId, UserId, WithdrawalId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};

use crate::gateway::GatewayError;
use crate::payout::error::PayoutError;
use crate::payout::ports::{OrganizationDirectory, PayoutGateway, SalesLedger, WithdrawalStore};
use crate::payout::state::WithdrawalStateMachine;
use crate::payout::types::{
    NewWithdrawal, PayoutRecipient, ProviderStatus, RevenueSummary, TransferInstruction,
    TransferVerification, WithdrawalRequest, WithdrawalStatus, WithdrawalTotals,
    WithdrawalVersion,
};

/// Withdrawal store backed by a mutex-guarded vector.
#[derive(Debug, Default)]
pub struct InMemoryWithdrawalStore {
    records: Mutex<Vec<WithdrawalRequest>>,
}

impl InMemoryWithdrawalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Snapshot of every stored record.
    pub async fn all(&self) -> Vec<WithdrawalRequest> {
        self.records.lock().await.clone()
    }
}

fn totals_of<'a>(records: impl Iterator<Item = &'a WithdrawalRequest>) -> WithdrawalTotals {
    records.fold(WithdrawalTotals::default(), |mut totals, r| {
        totals.add(r.status, r.amount);
        totals
    })
}

#[async_trait]
impl WithdrawalStore for InMemoryWithdrawalStore {
    async fn insert(
        &self,
        withdrawal: NewWithdrawal,
        entitlement: Decimal,
    ) -> Result<WithdrawalRequest, PayoutError> {
        let status = WithdrawalStateMachine::initial(withdrawal.status)?;
        let mut records = self.records.lock().await;

        if records
            .iter()
            .any(|r| r.external_reference == withdrawal.external_reference)
        {
            return Err(PayoutError::DuplicateReference(withdrawal.external_reference));
        }

        let reserved = totals_of(
            records
                .iter()
                .filter(|r| r.organization_id == withdrawal.organization_id),
        )
        .reserved();
        if reserved + withdrawal.amount > entitlement {
            return Err(PayoutError::InsufficientBalance {
                requested: withdrawal.amount,
                available: (entitlement - reserved).max(Decimal::ZERO),
            });
        }

        let record = WithdrawalRequest {
            id: withdrawal.id,
            organization_id: withdrawal.organization_id,
            requested_by: withdrawal.requested_by,
            amount: withdrawal.amount,
            currency: withdrawal.currency,
            notes: withdrawal.notes,
            status,
            external_reference: withdrawal.external_reference,
            requested_at: withdrawal.requested_at,
            completed_at: withdrawal.completed_at,
            updated_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<WithdrawalRequest>, PayoutError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .find(|r| r.external_reference == reference)
            .cloned())
    }

    async fn list_by_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<WithdrawalRequest>, PayoutError> {
        let records = self.records.lock().await;
        let mut list: Vec<_> = records
            .iter()
            .rev()
            .filter(|r| r.organization_id == organization_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(list)
    }

    async fn update_status(
        &self,
        id: WithdrawalId,
        status: WithdrawalStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<WithdrawalRequest, PayoutError> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PayoutError::WithdrawalNotFound(id.to_string()))?;

        record.status = WithdrawalStateMachine::transition(record.status, status)?;
        record.completed_at = completed_at;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn totals(
        &self,
        organization_id: OrganizationId,
    ) -> Result<WithdrawalTotals, PayoutError> {
        let records = self.records.lock().await;
        Ok(totals_of(
            records
                .iter()
                .filter(|r| r.organization_id == organization_id),
        ))
    }

    async fn version(
        &self,
        organization_id: OrganizationId,
    ) -> Result<WithdrawalVersion, PayoutError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.organization_id == organization_id)
            .fold(WithdrawalVersion::default(), |mut version, r| {
                version.add(r.status, 1);
                version
            }))
    }
}

/// Sales ledger with revenue set directly.
#[derive(Debug, Default)]
pub struct InMemorySalesLedger {
    revenue: RwLock<HashMap<OrganizationId, RevenueSummary>>,
}

impl InMemorySalesLedger {
    /// Creates an empty ledger. Unknown organizations have zero revenue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the revenue of an organization at construction.
    #[must_use]
    pub fn with_revenue(
        mut self,
        organization_id: OrganizationId,
        summary: RevenueSummary,
    ) -> Self {
        self.revenue.get_mut().insert(organization_id, summary);
        self
    }

    /// Replaces the revenue of an organization.
    pub async fn set_revenue(&self, organization_id: OrganizationId, summary: RevenueSummary) {
        self.revenue.write().await.insert(organization_id, summary);
    }
}

#[async_trait]
impl SalesLedger for InMemorySalesLedger {
    async fn revenue_summary(
        &self,
        organization_id: OrganizationId,
    ) -> Result<RevenueSummary, PayoutError> {
        Ok(self
            .revenue
            .read()
            .await
            .get(&organization_id)
            .copied()
            .unwrap_or_default())
    }
}

/// Organization directory with explicit managers and recipients.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    managers: HashSet<(OrganizationId, UserId)>,
    recipients: HashMap<OrganizationId, PayoutRecipient>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `user_id` to manage payouts of `organization_id`.
    #[must_use]
    pub fn with_manager(mut self, organization_id: OrganizationId, user_id: UserId) -> Self {
        self.managers.insert((organization_id, user_id));
        self
    }

    /// Sets the payout recipient of an organization.
    #[must_use]
    pub fn with_recipient(
        mut self,
        organization_id: OrganizationId,
        recipient: PayoutRecipient,
    ) -> Self {
        self.recipients.insert(organization_id, recipient);
        self
    }
}

#[async_trait]
impl OrganizationDirectory for InMemoryDirectory {
    async fn can_manage_payouts(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<bool, PayoutError> {
        Ok(self.managers.contains(&(organization_id, user_id)))
    }

    async fn payout_recipient(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<PayoutRecipient>, PayoutError> {
        Ok(self.recipients.get(&organization_id).cloned())
    }
}

#[derive(Debug)]
struct Script {
    next_reference: u64,
    initiate_error: Option<GatewayError>,
    statuses: HashMap<String, Result<ProviderStatus, GatewayError>>,
    default_status: ProviderStatus,
    instructions: Vec<TransferInstruction>,
}

/// Payout gateway whose answers are scripted per reference.
///
/// References are issued as `TRF-000001`, `TRF-000002`, ... Verification of a
/// reference without a scripted answer reports the default status.
#[derive(Debug)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
    verify_delay: Option<Duration>,
    initiate_calls: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl ScriptedGateway {
    /// Creates a gateway verifying every transfer as `default_status`.
    #[must_use]
    pub fn new(default_status: ProviderStatus) -> Self {
        Self {
            script: Mutex::new(Script {
                next_reference: 1,
                initiate_error: None,
                statuses: HashMap::new(),
                default_status,
                instructions: Vec::new(),
            }),
            verify_delay: None,
            initiate_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
        }
    }

    /// Delays every verification by `delay`.
    #[must_use]
    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = Some(delay);
        self
    }

    /// Makes every following initiation fail with `error`.
    pub async fn fail_initiate(&self, error: GatewayError) {
        self.script.lock().await.initiate_error = Some(error);
    }

    /// Scripts the verification answer for `reference`.
    pub async fn set_status(&self, reference: &str, status: ProviderStatus) {
        self.script
            .lock()
            .await
            .statuses
            .insert(reference.to_string(), Ok(status));
    }

    /// Makes verification of `reference` fail with `error`.
    pub async fn fail_verify(&self, reference: &str, error: GatewayError) {
        self.script
            .lock()
            .await
            .statuses
            .insert(reference.to_string(), Err(error));
    }

    /// Instructions received so far.
    pub async fn instructions(&self) -> Vec<TransferInstruction> {
        self.script.lock().await.instructions.clone()
    }

    /// Number of `initiate` calls.
    #[must_use]
    pub fn initiate_calls(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    /// Number of `verify` calls.
    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PayoutGateway for ScriptedGateway {
    async fn initiate(&self, instruction: &TransferInstruction) -> Result<String, GatewayError> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().await;
        if let Some(error) = &script.initiate_error {
            return Err(error.clone());
        }
        let reference = format!("TRF-{:06}", script.next_reference);
        script.next_reference += 1;
        script.instructions.push(instruction.clone());
        Ok(reference)
    }

    async fn verify(&self, reference: &str) -> Result<TransferVerification, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.verify_delay {
            tokio::time::sleep(delay).await;
        }
        let script = self.script.lock().await;
        let status = script
            .statuses
            .get(reference)
            .cloned()
            .unwrap_or(Ok(script.default_status))?;

        let now = Utc::now();
        let terminal = matches!(
            status,
            ProviderStatus::Success | ProviderStatus::Failed | ProviderStatus::Cancelled
        );
        Ok(TransferVerification {
            status,
            initiated_at: Some(now),
            processed_at: terminal.then_some(now),
        })
    }
}
