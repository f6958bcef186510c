//! Withdrawal repository.
//!
//! PostgreSQL implementation of [`WithdrawalStore`]. Inserts hold a
//! transaction-scoped advisory lock per organization while re-checking the
//! reserved balance, and the unique index on `external_reference` makes
//! reconciliation idempotent across processes.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, Statement, TransactionTrait,
    sea_query::Expr,
};
use tracing::{debug, warn};

use kiosk_core::payout::{
    NewWithdrawal, PayoutError, WithdrawalRequest, WithdrawalStateMachine,
    WithdrawalStatus as CoreStatus, WithdrawalStore, WithdrawalTotals, WithdrawalVersion,
};
use kiosk_shared::types::{Currency, OrganizationId, UserId, WithdrawalId};

use crate::entities::{sea_orm_active_enums::WithdrawalStatus, withdrawals};

/// Withdrawal repository backed by the `withdrawals` table.
#[derive(Debug, Clone)]
pub struct WithdrawalRepository {
    db: DatabaseConnection,
}

impl WithdrawalRepository {
    /// Creates a new withdrawal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> PayoutError {
    PayoutError::Database(e.to_string())
}

/// Sums `(status, amount)` rows into per-status buckets.
fn bucket_totals(rows: Vec<(WithdrawalStatus, Decimal)>) -> WithdrawalTotals {
    rows.into_iter()
        .fold(WithdrawalTotals::default(), |mut totals, (status, amount)| {
            totals.add(status_to_core(status), amount);
            totals
        })
}

/// Folds `(status, record count)` rows into a change stamp.
fn version_of(rows: Vec<(WithdrawalStatus, i64)>) -> WithdrawalVersion {
    rows.into_iter()
        .fold(WithdrawalVersion::default(), |mut version, (status, count)| {
            version.add(status_to_core(status), u64::try_from(count).unwrap_or(0));
            version
        })
}

async fn organization_totals<C: ConnectionTrait>(
    conn: &C,
    organization_id: OrganizationId,
) -> Result<WithdrawalTotals, DbErr> {
    let rows: Vec<(WithdrawalStatus, Decimal)> = withdrawals::Entity::find()
        .filter(withdrawals::Column::OrganizationId.eq(organization_id.into_inner()))
        .filter(withdrawals::Column::Status.is_in([
            WithdrawalStatus::Pending,
            WithdrawalStatus::Processing,
            WithdrawalStatus::Completed,
        ]))
        .select_only()
        .column(withdrawals::Column::Status)
        .column(withdrawals::Column::Amount)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(bucket_totals(rows))
}

#[async_trait]
impl WithdrawalStore for WithdrawalRepository {
    async fn insert(
        &self,
        withdrawal: NewWithdrawal,
        entitlement: Decimal,
    ) -> Result<WithdrawalRequest, PayoutError> {
        let status = WithdrawalStateMachine::initial(withdrawal.status)?;
        let reference = withdrawal.external_reference.clone();

        let txn = self.db.begin().await.map_err(db_err)?;

        // Serializes balance rechecks per organization until commit
        txn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))",
            [withdrawal.organization_id.to_string().into()],
        ))
        .await
        .map_err(db_err)?;

        let existing = withdrawals::Entity::find()
            .filter(withdrawals::Column::ExternalReference.eq(reference.as_str()))
            .one(&txn)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(PayoutError::DuplicateReference(reference));
        }

        let reserved = organization_totals(&txn, withdrawal.organization_id)
            .await
            .map_err(db_err)?
            .reserved();
        if reserved + withdrawal.amount > entitlement {
            warn!(
                organization_id = %withdrawal.organization_id,
                reference = %reference,
                amount = %withdrawal.amount,
                reserved = %reserved,
                "Write-time balance recheck failed"
            );
            return Err(PayoutError::InsufficientBalance {
                requested: withdrawal.amount,
                available: (entitlement - reserved).max(Decimal::ZERO),
            });
        }

        let now = Utc::now().into();
        let model = withdrawals::ActiveModel {
            id: Set(withdrawal.id.into_inner()),
            organization_id: Set(withdrawal.organization_id.into_inner()),
            requested_by: Set(withdrawal.requested_by.into_inner()),
            amount: Set(withdrawal.amount),
            currency: Set(withdrawal.currency.code().to_string()),
            notes: Set(withdrawal.notes),
            status: Set(status_to_db(status)),
            external_reference: Set(reference.clone()),
            requested_at: Set(withdrawal.requested_at.into()),
            completed_at: Set(withdrawal.completed_at.map(Into::into)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                PayoutError::DuplicateReference(reference.clone())
            }
            _ => db_err(e),
        })?;

        txn.commit().await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                PayoutError::DuplicateReference(reference.clone())
            }
            _ => db_err(e),
        })?;

        debug!(reference = %reference, status = %status, "Withdrawal inserted");
        model_to_core(model)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<WithdrawalRequest>, PayoutError> {
        withdrawals::Entity::find()
            .filter(withdrawals::Column::ExternalReference.eq(reference))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_core)
            .transpose()
    }

    async fn list_by_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<WithdrawalRequest>, PayoutError> {
        withdrawals::Entity::find()
            .filter(withdrawals::Column::OrganizationId.eq(organization_id.into_inner()))
            .order_by_desc(withdrawals::Column::RequestedAt)
            .order_by_desc(withdrawals::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_core)
            .collect()
    }

    async fn update_status(
        &self,
        id: WithdrawalId,
        status: CoreStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<WithdrawalRequest, PayoutError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let current = withdrawals::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| PayoutError::WithdrawalNotFound(id.to_string()))?;

        let next = WithdrawalStateMachine::transition(status_to_core(current.status), status)?;

        let mut active: withdrawals::ActiveModel = current.into();
        active.status = Set(status_to_db(next));
        active.completed_at = Set(completed_at.map(Into::into));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        model_to_core(updated)
    }

    async fn totals(
        &self,
        organization_id: OrganizationId,
    ) -> Result<WithdrawalTotals, PayoutError> {
        organization_totals(&self.db, organization_id)
            .await
            .map_err(db_err)
    }

    async fn version(
        &self,
        organization_id: OrganizationId,
    ) -> Result<WithdrawalVersion, PayoutError> {
        let rows: Vec<(WithdrawalStatus, i64)> = withdrawals::Entity::find()
            .filter(withdrawals::Column::OrganizationId.eq(organization_id.into_inner()))
            .select_only()
            .column(withdrawals::Column::Status)
            .column_as(Expr::col(withdrawals::Column::Id).count(), "records")
            .group_by(withdrawals::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(version_of(rows))
    }
}

// ============================================================================
// Conversion helpers
// ============================================================================

fn status_to_core(status: WithdrawalStatus) -> CoreStatus {
    match status {
        WithdrawalStatus::Pending => CoreStatus::Pending,
        WithdrawalStatus::Processing => CoreStatus::Processing,
        WithdrawalStatus::Completed => CoreStatus::Completed,
        WithdrawalStatus::Failed => CoreStatus::Failed,
        WithdrawalStatus::Cancelled => CoreStatus::Cancelled,
    }
}

fn status_to_db(status: CoreStatus) -> WithdrawalStatus {
    match status {
        CoreStatus::Pending => WithdrawalStatus::Pending,
        CoreStatus::Processing => WithdrawalStatus::Processing,
        CoreStatus::Completed => WithdrawalStatus::Completed,
        CoreStatus::Failed => WithdrawalStatus::Failed,
        CoreStatus::Cancelled => WithdrawalStatus::Cancelled,
    }
}

fn model_to_core(model: withdrawals::Model) -> Result<WithdrawalRequest, PayoutError> {
    let currency = Currency::from_str(&model.currency).map_err(PayoutError::Database)?;
    Ok(WithdrawalRequest {
        id: WithdrawalId::from_uuid(model.id),
        organization_id: OrganizationId::from_uuid(model.organization_id),
        requested_by: UserId::from_uuid(model.requested_by),
        amount: model.amount,
        currency,
        notes: model.notes,
        status: status_to_core(model.status),
        external_reference: model.external_reference,
        requested_at: model.requested_at.with_timezone(&Utc),
        completed_at: model.completed_at.map(|t| t.with_timezone(&Utc)),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
