//! Sales repository.
//!
//! Reads the storefront `orders` table to produce the lifetime revenue an
//! organization's payouts are entitled against.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, sea_query::Expr,
};

use kiosk_core::payout::{PayoutError, RevenueSummary, SalesLedger};
use kiosk_shared::types::OrganizationId;

use crate::entities::orders;

/// Order status counted as a completed sale.
pub const PAID_ORDER_STATUS: &str = "paid";

/// Sales repository backed by the `orders` table.
#[derive(Debug, Clone)]
pub struct SalesRepository {
    db: DatabaseConnection,
}

impl SalesRepository {
    /// Creates a new sales repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SalesLedger for SalesRepository {
    async fn revenue_summary(
        &self,
        organization_id: OrganizationId,
    ) -> Result<RevenueSummary, PayoutError> {
        let row: Option<(Option<Decimal>, i64)> = orders::Entity::find()
            .filter(orders::Column::OrganizationId.eq(organization_id.into_inner()))
            .filter(orders::Column::Status.eq(PAID_ORDER_STATUS))
            .select_only()
            .column_as(Expr::col(orders::Column::Amount).sum(), "total_revenue")
            .column_as(Expr::col(orders::Column::Id).count(), "total_sales_count")
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(|e| PayoutError::Database(e.to_string()))?;

        let (total, count) = row.unwrap_or((None, 0));
        Ok(RevenueSummary {
            total_revenue: total.unwrap_or(Decimal::ZERO),
            total_sales_count: u64::try_from(count).unwrap_or(0),
        })
    }
}
