//! Withdrawal settlement engine.
//!
//! Turns a withdrawal request into a confirmed external transfer and exactly
//! one withdrawal record:
//!
//! 1. [`initiate_withdrawal`](SettlementEngine::initiate_withdrawal) checks the
//!    actor, the amount and the withdrawable balance, then starts the transfer.
//! 2. [`reconcile`](SettlementEngine::reconcile) verifies the transfer and
//!    writes the record. The provider reference is the idempotency key.
//! 3. [`reverify`](SettlementEngine::reverify) re-queries the provider for an
//!    existing record and applies the status change.
//!
//! The balance cache is invalidated after every write.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kiosk_shared::config::{GatewayConfig, PayoutConfig};
use kiosk_shared::types::{Currency, OrganizationId, UserId, WithdrawalId};
use rust_decimal::Decimal;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::gateway::GatewayError;
use crate::payout::balance::{BalanceLedger, OrganizationBalance, ShareRatio};
use crate::payout::cache::BalanceCache;
use crate::payout::error::PayoutError;
use crate::payout::guard::ReconciliationGuard;
use crate::payout::ports::{OrganizationDirectory, PayoutGateway, SalesLedger, WithdrawalStore};
use crate::payout::state::WithdrawalStateMachine;
use crate::payout::types::{
    InitiatedTransfer, NewWithdrawal, ProviderStatus, TransferInstruction, TransferVerification,
    WithdrawalRequest, WithdrawalStatus, WithdrawalTotals,
};

/// Collaborators of the engine.
#[derive(Clone)]
pub struct SettlementPorts {
    /// Withdrawal records.
    pub store: Arc<dyn WithdrawalStore>,
    /// Sales figures.
    pub sales: Arc<dyn SalesLedger>,
    /// Membership and payout accounts.
    pub directory: Arc<dyn OrganizationDirectory>,
    /// Payout provider.
    pub gateway: Arc<dyn PayoutGateway>,
}

/// Engine settings.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Platform share of revenue.
    pub share_ratio: ShareRatio,
    /// Payout currency.
    pub currency: Currency,
    /// Upper bound for a single verification call.
    pub verify_timeout: Duration,
    /// Maximum number of cached balances.
    pub balance_cache_capacity: u64,
    /// Time-to-live of a cached balance, in seconds.
    pub balance_cache_ttl_secs: u64,
}

impl SettlementConfig {
    /// Builds engine settings from application configuration.
    pub fn from_app(payout: &PayoutConfig, gateway: &GatewayConfig) -> Result<Self, PayoutError> {
        let currency = Currency::from_str(&payout.currency).map_err(PayoutError::Configuration)?;
        Ok(Self {
            share_ratio: ShareRatio::new(payout.platform_share_ratio)?,
            currency,
            verify_timeout: Duration::from_secs(gateway.timeout_secs),
            balance_cache_capacity: payout.balance_cache_capacity,
            balance_cache_ttl_secs: payout.balance_cache_ttl_secs,
        })
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            share_ratio: ShareRatio::default(),
            currency: Currency::Xaf,
            verify_timeout: Duration::from_secs(15),
            balance_cache_capacity: 10_000,
            balance_cache_ttl_secs: 60,
        }
    }
}

/// The settlement engine.
pub struct SettlementEngine {
    ports: SettlementPorts,
    cache: BalanceCache,
    guard: ReconciliationGuard,
    config: SettlementConfig,
}

impl SettlementEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(ports: SettlementPorts, config: SettlementConfig) -> Self {
        let cache =
            BalanceCache::with_config(config.balance_cache_capacity, config.balance_cache_ttl_secs);
        Self {
            ports,
            cache,
            guard: ReconciliationGuard::new(),
            config,
        }
    }

    /// Engine settings.
    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    async fn authorize(
        &self,
        organization_id: OrganizationId,
        actor: UserId,
    ) -> Result<(), PayoutError> {
        if self
            .ports
            .directory
            .can_manage_payouts(organization_id, actor)
            .await?
        {
            Ok(())
        } else {
            warn!(organization_id = %organization_id, user_id = %actor, "Payout access denied");
            Err(PayoutError::Forbidden {
                organization_id,
                user_id: actor,
            })
        }
    }

    /// Derives the balance of an organization from durable records.
    ///
    /// Always reads fresh data; integrity anomalies are logged.
    pub async fn compute_balance(
        &self,
        organization_id: OrganizationId,
    ) -> Result<OrganizationBalance, PayoutError> {
        let revenue = self.ports.sales.revenue_summary(organization_id).await?;
        let totals = self.ports.store.totals(organization_id).await?;
        let balance = BalanceLedger::compute(
            organization_id,
            &revenue,
            &totals,
            self.config.share_ratio,
            self.config.currency,
        );

        if let Some(anomaly) = &balance.anomaly {
            error!(
                organization_id = %organization_id,
                anomaly = ?anomaly,
                withdrawn = %balance.withdrawn_amount,
                pending = %balance.pending_amount,
                entitlement = %balance.organization_amount,
                "Balance integrity anomaly, available amount clamped"
            );
        }
        Ok(balance)
    }

    async fn cached_balance(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Arc<OrganizationBalance>, PayoutError> {
        // Read before computing so a concurrent write leaves the entry stale
        let version = self.ports.store.version(organization_id).await?;
        if let Some(balance) = self.cache.get(organization_id, version).await {
            return Ok(balance);
        }
        let balance = Arc::new(self.compute_balance(organization_id).await?);
        self.cache
            .insert(organization_id, version, Arc::clone(&balance))
            .await;
        Ok(balance)
    }

    /// Returns the balance of an organization.
    ///
    /// A cached balance is served only while the store's
    /// [`WithdrawalVersion`](crate::payout::WithdrawalVersion) is unchanged,
    /// so writes from any process show up on the next read.
    pub async fn get_balance(
        &self,
        organization_id: OrganizationId,
        actor: UserId,
    ) -> Result<OrganizationBalance, PayoutError> {
        self.authorize(organization_id, actor).await?;
        let balance = self.cached_balance(organization_id).await?;
        Ok((*balance).clone())
    }

    /// Lists withdrawals of an organization, newest first.
    pub async fn list_withdrawals(
        &self,
        organization_id: OrganizationId,
        actor: UserId,
    ) -> Result<Vec<WithdrawalRequest>, PayoutError> {
        self.authorize(organization_id, actor).await?;
        self.ports.store.list_by_organization(organization_id).await
    }

    /// Returns true for a positive amount expressible in the payout
    /// currency's minor unit.
    fn is_valid_amount(&self, amount: Decimal) -> bool {
        amount > Decimal::ZERO && amount.normalize().scale() <= self.config.currency.minor_units()
    }

    /// Validates a request and starts the external transfer.
    ///
    /// No record is written. A rejected or unavailable initiation leaves
    /// nothing behind.
    pub async fn initiate_withdrawal(
        &self,
        organization_id: OrganizationId,
        amount: Decimal,
        notes: Option<String>,
        actor: UserId,
    ) -> Result<InitiatedTransfer, PayoutError> {
        self.authorize(organization_id, actor).await?;

        if !self.is_valid_amount(amount) {
            return Err(PayoutError::InvalidAmount(amount));
        }

        let balance = self.compute_balance(organization_id).await?;
        let available = balance.withdrawable();
        if amount > available {
            info!(
                organization_id = %organization_id,
                amount = %amount,
                available = %available,
                "Withdrawal refused, insufficient balance"
            );
            return Err(PayoutError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let recipient = self
            .ports
            .directory
            .payout_recipient(organization_id)
            .await?
            .ok_or(PayoutError::RecipientNotConfigured(organization_id))?;

        let withdrawal_id = WithdrawalId::new();
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let mut metadata = BTreeMap::new();
        metadata.insert("withdrawal_id".to_string(), withdrawal_id.to_string());
        metadata.insert("organization_id".to_string(), organization_id.to_string());
        metadata.insert("requested_by".to_string(), actor.to_string());
        if let Some(notes) = &notes {
            metadata.insert("notes".to_string(), notes.clone());
        }

        let instruction = TransferInstruction {
            amount,
            currency: self.config.currency,
            customer: recipient.customer,
            destination: recipient.destination,
            metadata,
        };

        let reference = self
            .ports
            .gateway
            .initiate(&instruction)
            .await
            .map_err(|e| {
                if matches!(e, GatewayError::Malformed(_)) {
                    // A 2xx with an unreadable body may still be an accepted transfer
                    error!(
                        organization_id = %organization_id,
                        withdrawal_id = %withdrawal_id,
                        amount = %amount,
                        error = %e,
                        "Transfer initiation response unreadable, no withdrawal recorded, manual review required"
                    );
                } else {
                    warn!(
                        organization_id = %organization_id,
                        amount = %amount,
                        error = %e,
                        "Transfer initiation failed, no withdrawal recorded"
                    );
                }
                PayoutError::from(e)
            })?;

        info!(
            organization_id = %organization_id,
            reference = %reference,
            amount = %amount,
            "Transfer initiated"
        );

        Ok(InitiatedTransfer {
            withdrawal_id,
            organization_id,
            requested_by: actor,
            amount,
            currency: self.config.currency,
            notes,
            reference,
            requested_at: Utc::now(),
        })
    }

    async fn verify_with_timeout(
        &self,
        reference: &str,
    ) -> Result<TransferVerification, GatewayError> {
        timeout(
            self.config.verify_timeout,
            self.ports.gateway.verify(reference),
        )
        .await
        .unwrap_or(Err(GatewayError::Timeout))
    }

    async fn entitlement(&self, organization_id: OrganizationId) -> Result<Decimal, PayoutError> {
        let revenue = self.ports.sales.revenue_summary(organization_id).await?;
        let share = BalanceLedger::compute(
            organization_id,
            &revenue,
            &WithdrawalTotals::default(),
            self.config.share_ratio,
            self.config.currency,
        );
        Ok(share.organization_amount)
    }

    /// Verifies an initiated transfer and writes its withdrawal record.
    ///
    /// Calling it again for the same reference returns the stored record.
    pub async fn reconcile(
        &self,
        transfer: &InitiatedTransfer,
    ) -> Result<WithdrawalRequest, PayoutError> {
        let reference = transfer.reference.as_str();
        let organization_id = transfer.organization_id;

        let _permit = self
            .guard
            .try_acquire(reference)
            .ok_or_else(|| PayoutError::ReconciliationInProgress(reference.to_string()))?;

        if let Some(existing) = self.ports.store.find_by_reference(reference).await? {
            debug!(reference = %reference, status = %existing.status, "Transfer already reconciled");
            return Ok(existing);
        }

        let (status, completed_at) = match self.verify_with_timeout(reference).await {
            Ok(verification) => match verification.status {
                ProviderStatus::Failed | ProviderStatus::Cancelled => {
                    warn!(
                        organization_id = %organization_id,
                        reference = %reference,
                        status = %verification.status,
                        "Transfer did not go through, no withdrawal recorded"
                    );
                    return Err(PayoutError::TransferFailed {
                        reference: reference.to_string(),
                        status: verification.status,
                    });
                }
                provider => {
                    let status = WithdrawalStateMachine::map_provider_status(provider);
                    let completed_at = (status == WithdrawalStatus::Completed)
                        .then(|| verification.processed_at.unwrap_or_else(Utc::now));
                    (status, completed_at)
                }
            },
            Err(e) => {
                warn!(
                    organization_id = %organization_id,
                    reference = %reference,
                    error = %e,
                    "Verification unavailable after initiation, recording as pending"
                );
                (WithdrawalStatus::Pending, None)
            }
        };

        let entitlement = self.entitlement(organization_id).await?;
        let new = NewWithdrawal {
            id: transfer.withdrawal_id,
            organization_id,
            requested_by: transfer.requested_by,
            amount: transfer.amount,
            currency: transfer.currency,
            notes: transfer.notes.clone(),
            status,
            external_reference: reference.to_string(),
            requested_at: transfer.requested_at,
            completed_at,
        };

        let record = match self.ports.store.insert(new, entitlement).await {
            Ok(record) => record,
            Err(PayoutError::DuplicateReference(_)) => {
                info!(reference = %reference, "Withdrawal recorded concurrently, returning stored record");
                self.ports
                    .store
                    .find_by_reference(reference)
                    .await?
                    .ok_or_else(|| PayoutError::WithdrawalNotFound(reference.to_string()))?
            }
            Err(e @ PayoutError::InsufficientBalance { .. }) => {
                error!(
                    organization_id = %organization_id,
                    reference = %reference,
                    amount = %transfer.amount,
                    "Transfer initiated but balance recheck failed, manual review required"
                );
                return Err(e);
            }
            Err(e) => {
                error!(reference = %reference, error = %e, "Failed to record withdrawal");
                return Err(e);
            }
        };

        self.cache.invalidate(organization_id).await;
        info!(
            organization_id = %organization_id,
            reference = %reference,
            amount = %record.amount,
            status = %record.status,
            "Withdrawal reconciled"
        );
        Ok(record)
    }

    /// Requests a withdrawal: initiation followed by reconciliation.
    pub async fn request_withdrawal(
        &self,
        organization_id: OrganizationId,
        amount: Decimal,
        notes: Option<String>,
        actor: UserId,
    ) -> Result<WithdrawalRequest, PayoutError> {
        let transfer = self
            .initiate_withdrawal(organization_id, amount, notes, actor)
            .await?;
        self.reconcile(&transfer).await
    }

    /// Re-queries the provider for an existing withdrawal and applies the
    /// status change.
    ///
    /// A record of another organization is reported as not found. Terminal
    /// records are returned unchanged without contacting the provider.
    pub async fn reverify(
        &self,
        organization_id: OrganizationId,
        reference: &str,
        actor: UserId,
    ) -> Result<WithdrawalRequest, PayoutError> {
        self.authorize(organization_id, actor).await?;

        let record = self
            .ports
            .store
            .find_by_reference(reference)
            .await?
            .filter(|r| r.organization_id == organization_id)
            .ok_or_else(|| PayoutError::WithdrawalNotFound(reference.to_string()))?;

        if record.status.is_terminal() {
            debug!(reference = %reference, status = %record.status, "Withdrawal already final");
            return Ok(record);
        }

        let _permit = self
            .guard
            .try_acquire(reference)
            .ok_or_else(|| PayoutError::ReconciliationInProgress(reference.to_string()))?;

        let record = self
            .ports
            .store
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| PayoutError::WithdrawalNotFound(reference.to_string()))?;
        if record.status.is_terminal() {
            return Ok(record);
        }

        let verification = self.verify_with_timeout(reference).await.map_err(|e| {
            warn!(reference = %reference, error = %e, "Re-verification unavailable");
            PayoutError::from(e)
        })?;

        let next = WithdrawalStateMachine::next(record.status, verification.status)
            .inspect_err(|e| {
                error!(reference = %reference, error = %e, "Provider reported an impossible transition");
            })?;

        let Some(next) = next else {
            debug!(reference = %reference, status = %record.status, "Withdrawal status unchanged");
            return Ok(record);
        };

        let completed_at = next
            .is_terminal()
            .then(|| verification.processed_at.unwrap_or_else(Utc::now));

        let updated = self
            .ports
            .store
            .update_status(record.id, next, completed_at)
            .await
            .inspect_err(|e| {
                if matches!(e, PayoutError::InvalidTransition { .. }) {
                    error!(reference = %reference, error = %e, "Withdrawal status update refused");
                }
            })?;

        self.cache.invalidate(updated.organization_id).await;
        info!(
            organization_id = %updated.organization_id,
            reference = %reference,
            from = %record.status,
            to = %updated.status,
            "Withdrawal re-verified"
        );
        Ok(updated)
    }
}
