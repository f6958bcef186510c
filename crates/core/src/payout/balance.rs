//! Organization balance derivation.
//!
//! Balances are never stored. They are derived from the sales summary and
//! the withdrawal totals of an organization:
//!
//! - `platform_amount = total_revenue × platform_share`
//! - `organization_amount = total_revenue − platform_amount`
//! - `withdrawn_amount = processing + completed`
//! - `available_amount = organization_amount − withdrawn_amount`
//!
//! No figure may be negative. Inconsistent inputs are clamped to zero and the
//! clamp is reported as a [`BalanceAnomaly`].

use kiosk_shared::types::{Currency, OrganizationId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::payout::error::PayoutError;
use crate::payout::types::{RevenueSummary, WithdrawalTotals};

/// Platform share of revenue, validated to lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareRatio {
    platform: Decimal,
}

impl ShareRatio {
    /// Creates a ratio from the platform share.
    pub fn new(platform: Decimal) -> Result<Self, PayoutError> {
        if platform < Decimal::ZERO || platform > Decimal::ONE {
            return Err(PayoutError::Configuration(format!(
                "platform share ratio must be within [0, 1], got {platform}"
            )));
        }
        Ok(Self { platform })
    }

    /// Platform share.
    #[must_use]
    pub fn platform(&self) -> Decimal {
        self.platform
    }

    /// Organization share, `1 − platform`.
    #[must_use]
    pub fn organization(&self) -> Decimal {
        Decimal::ONE - self.platform
    }
}

impl Default for ShareRatio {
    fn default() -> Self {
        Self {
            platform: Decimal::new(25, 2),
        }
    }
}

/// Integrity problem detected while deriving a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BalanceAnomaly {
    /// Sales collaborator reported negative revenue.
    NegativeRevenue {
        /// Reported revenue.
        reported: Decimal,
    },
    /// Withdrawn amount exceeds the organization's share.
    Overdrawn {
        /// Amount by which the share is exceeded.
        shortfall: Decimal,
    },
    /// Withdrawn plus pending amount exceeds the organization's share.
    OverReserved {
        /// Amount by which the share is exceeded.
        shortfall: Decimal,
    },
}

/// Derived balance of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationBalance {
    /// The organization.
    pub organization_id: OrganizationId,
    /// Currency of every amount below.
    pub currency: Currency,
    /// Sum of paid sales.
    pub total_revenue: Decimal,
    /// Number of paid sales.
    pub total_sales_count: u64,
    /// Platform share of revenue.
    pub platform_amount: Decimal,
    /// Organization share of revenue.
    pub organization_amount: Decimal,
    /// Processing plus completed withdrawals.
    pub withdrawn_amount: Decimal,
    /// Withdrawals whose provider status is not yet known.
    pub pending_amount: Decimal,
    /// Organization share minus withdrawn, never negative.
    pub available_amount: Decimal,
    /// Present when the inputs were inconsistent and a figure was clamped.
    pub anomaly: Option<BalanceAnomaly>,
}

impl OrganizationBalance {
    /// Amount a new withdrawal may take: available minus pending reservations.
    #[must_use]
    pub fn withdrawable(&self) -> Decimal {
        (self.available_amount - self.pending_amount).max(Decimal::ZERO)
    }
}

/// Pure balance derivation.
pub struct BalanceLedger;

impl BalanceLedger {
    /// Derives the balance of `organization_id`.
    ///
    /// Has no side effects; callers decide how to report anomalies.
    #[must_use]
    pub fn compute(
        organization_id: OrganizationId,
        revenue: &RevenueSummary,
        totals: &WithdrawalTotals,
        ratio: ShareRatio,
        currency: Currency,
    ) -> OrganizationBalance {
        let mut anomaly = None;

        let total_revenue = if revenue.total_revenue < Decimal::ZERO {
            anomaly = Some(BalanceAnomaly::NegativeRevenue {
                reported: revenue.total_revenue,
            });
            Decimal::ZERO
        } else {
            revenue.total_revenue
        };

        let platform_amount = total_revenue * ratio.platform();
        let organization_amount = total_revenue - platform_amount;
        let withdrawn_amount = totals.withdrawn();
        let pending_amount = totals.pending;

        let available_amount = if withdrawn_amount > organization_amount {
            if anomaly.is_none() {
                anomaly = Some(BalanceAnomaly::Overdrawn {
                    shortfall: withdrawn_amount - organization_amount,
                });
            }
            Decimal::ZERO
        } else {
            organization_amount - withdrawn_amount
        };

        let reserved = totals.reserved();
        if anomaly.is_none() && reserved > organization_amount {
            anomaly = Some(BalanceAnomaly::OverReserved {
                shortfall: reserved - organization_amount,
            });
        }

        OrganizationBalance {
            organization_id,
            currency,
            total_revenue,
            total_sales_count: revenue.total_sales_count,
            platform_amount,
            organization_amount,
            withdrawn_amount,
            pending_amount,
            available_amount,
            anomaly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn revenue(total: Decimal, count: u64) -> RevenueSummary {
        RevenueSummary {
            total_revenue: total,
            total_sales_count: count,
        }
    }

    fn totals(pending: Decimal, processing: Decimal, completed: Decimal) -> WithdrawalTotals {
        WithdrawalTotals {
            pending,
            processing,
            completed,
        }
    }

    #[test]
    fn test_share_split_default_ratio() {
        let org = OrganizationId::new();
        let balance = BalanceLedger::compute(
            org,
            &revenue(dec!(400000), 12),
            &WithdrawalTotals::default(),
            ShareRatio::default(),
            Currency::Xaf,
        );

        assert_eq!(balance.platform_amount, dec!(100000));
        assert_eq!(balance.organization_amount, dec!(300000));
        assert_eq!(balance.available_amount, dec!(300000));
        assert_eq!(balance.withdrawn_amount, Decimal::ZERO);
        assert_eq!(balance.total_sales_count, 12);
        assert!(balance.anomaly.is_none());
    }

    #[test]
    fn test_completed_withdrawal_reduces_available() {
        let balance = BalanceLedger::compute(
            OrganizationId::new(),
            &revenue(dec!(400000), 12),
            &totals(dec!(0), dec!(0), dec!(100000)),
            ShareRatio::default(),
            Currency::Xaf,
        );

        assert_eq!(balance.withdrawn_amount, dec!(100000));
        assert_eq!(balance.available_amount, dec!(200000));
    }

    #[test]
    fn test_processing_counts_pending_reserves() {
        let balance = BalanceLedger::compute(
            OrganizationId::new(),
            &revenue(dec!(400000), 12),
            &totals(dec!(20000), dec!(50000), dec!(0)),
            ShareRatio::default(),
            Currency::Xaf,
        );

        assert_eq!(balance.withdrawn_amount, dec!(50000));
        assert_eq!(balance.pending_amount, dec!(20000));
        assert_eq!(balance.available_amount, dec!(250000));
        assert_eq!(balance.withdrawable(), dec!(230000));
    }

    #[test]
    fn test_overdrawn_clamps_and_reports() {
        let balance = BalanceLedger::compute(
            OrganizationId::new(),
            &revenue(dec!(100), 1),
            &totals(dec!(0), dec!(0), dec!(90)),
            ShareRatio::default(),
            Currency::Xaf,
        );

        assert_eq!(balance.available_amount, Decimal::ZERO);
        assert_eq!(
            balance.anomaly,
            Some(BalanceAnomaly::Overdrawn { shortfall: dec!(15) })
        );
    }

    #[test]
    fn test_over_reserved_reports_without_clamping_available() {
        let balance = BalanceLedger::compute(
            OrganizationId::new(),
            &revenue(dec!(100), 1),
            &totals(dec!(30), dec!(50), dec!(0)),
            ShareRatio::default(),
            Currency::Xaf,
        );

        assert_eq!(balance.available_amount, dec!(25));
        assert_eq!(balance.withdrawable(), Decimal::ZERO);
        assert_eq!(
            balance.anomaly,
            Some(BalanceAnomaly::OverReserved { shortfall: dec!(5) })
        );
    }

    #[test]
    fn test_negative_revenue_is_anomaly() {
        let balance = BalanceLedger::compute(
            OrganizationId::new(),
            &revenue(dec!(-10), 1),
            &WithdrawalTotals::default(),
            ShareRatio::default(),
            Currency::Xaf,
        );

        assert_eq!(balance.total_revenue, Decimal::ZERO);
        assert_eq!(balance.platform_amount, Decimal::ZERO);
        assert_eq!(
            balance.anomaly,
            Some(BalanceAnomaly::NegativeRevenue { reported: dec!(-10) })
        );
    }

    #[test]
    fn test_share_ratio_bounds() {
        assert!(ShareRatio::new(dec!(0)).is_ok());
        assert!(ShareRatio::new(dec!(1)).is_ok());
        assert!(ShareRatio::new(dec!(-0.01)).is_err());
        assert!(ShareRatio::new(dec!(1.01)).is_err());
        assert_eq!(ShareRatio::new(dec!(0.3)).unwrap().organization(), dec!(0.7));
    }

    #[test]
    fn test_full_platform_share_leaves_nothing() {
        let balance = BalanceLedger::compute(
            OrganizationId::new(),
            &revenue(dec!(5000), 3),
            &WithdrawalTotals::default(),
            ShareRatio::new(dec!(1)).unwrap(),
            Currency::Xaf,
        );
        assert_eq!(balance.available_amount, Decimal::ZERO);
        assert!(balance.anomaly.is_none());
    }
}
