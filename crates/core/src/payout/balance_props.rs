//! Property-based tests for balance derivation.
//!
//! Covers non-negativity, the share split and the effect of completed
//! withdrawals on the available amount.

use kiosk_shared::types::{Currency, OrganizationId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{BalanceLedger, ShareRatio};
use super::types::{RevenueSummary, WithdrawalTotals};

/// Strategy for non-negative amounts from 0.00 to 10,000,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for any amount, including negative ones.
fn signed_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000_000i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for a platform share between 0.00 and 1.00.
fn ratio() -> impl Strategy<Value = ShareRatio> {
    (0i64..=100i64).prop_map(|pct| {
        ShareRatio::new(Decimal::new(pct, 2)).unwrap_or_default()
    })
}

fn summary(total_revenue: Decimal) -> RevenueSummary {
    RevenueSummary {
        total_revenue,
        total_sales_count: 1,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// No derived figure is ever negative, whatever the inputs.
    #[test]
    fn prop_figures_never_negative(
        revenue in signed_amount(),
        pending in amount(),
        processing in amount(),
        completed in amount(),
        ratio in ratio(),
    ) {
        let totals = WithdrawalTotals { pending, processing, completed };
        let balance = BalanceLedger::compute(
            OrganizationId::new(), &summary(revenue), &totals, ratio, Currency::Xaf,
        );

        prop_assert!(balance.available_amount >= Decimal::ZERO);
        prop_assert!(balance.platform_amount >= Decimal::ZERO);
        prop_assert!(balance.organization_amount >= Decimal::ZERO);
        prop_assert!(balance.withdrawable() >= Decimal::ZERO);
    }

    /// Platform and organization shares always add up to revenue.
    #[test]
    fn prop_shares_sum_to_revenue(revenue in amount(), ratio in ratio()) {
        let balance = BalanceLedger::compute(
            OrganizationId::new(), &summary(revenue), &WithdrawalTotals::default(), ratio, Currency::Xaf,
        );
        prop_assert_eq!(balance.platform_amount + balance.organization_amount, revenue);
    }

    /// A clamp is never silent: clamped or over-reserved inputs carry an anomaly.
    #[test]
    fn prop_clamp_is_reported(
        revenue in amount(),
        pending in amount(),
        processing in amount(),
        completed in amount(),
        ratio in ratio(),
    ) {
        let totals = WithdrawalTotals { pending, processing, completed };
        let balance = BalanceLedger::compute(
            OrganizationId::new(), &summary(revenue), &totals, ratio, Currency::Xaf,
        );

        let consistent = totals.reserved() <= balance.organization_amount;
        prop_assert_eq!(balance.anomaly.is_none(), consistent);
        if consistent {
            prop_assert_eq!(
                balance.available_amount,
                balance.organization_amount - totals.withdrawn()
            );
        }
    }

    /// Completing a withdrawal of at most the withdrawable amount moves it
    /// from available to withdrawn and keeps the balance consistent.
    #[test]
    fn prop_completion_within_withdrawable_stays_consistent(
        revenue in amount(),
        ratio in ratio(),
        fraction in 0u32..=100u32,
    ) {
        let before = BalanceLedger::compute(
            OrganizationId::new(), &summary(revenue), &WithdrawalTotals::default(), ratio, Currency::Xaf,
        );
        let take = (before.withdrawable() * Decimal::from(fraction) / Decimal::from(100)).round_dp(2);
        prop_assume!(take <= before.withdrawable());

        let totals = WithdrawalTotals { completed: take, ..WithdrawalTotals::default() };
        let after = BalanceLedger::compute(
            before.organization_id, &summary(revenue), &totals, ratio, Currency::Xaf,
        );

        prop_assert!(after.anomaly.is_none());
        prop_assert_eq!(after.withdrawn_amount, take);
        prop_assert_eq!(after.available_amount, before.available_amount - take);
    }

    /// Revenue growth never lowers the available amount.
    #[test]
    fn prop_revenue_increase_is_monotonic(
        revenue in amount(),
        increase in amount(),
        completed in amount(),
        ratio in ratio(),
    ) {
        let totals = WithdrawalTotals { completed, ..WithdrawalTotals::default() };
        let org = OrganizationId::new();
        let before = BalanceLedger::compute(org, &summary(revenue), &totals, ratio, Currency::Xaf);
        let after = BalanceLedger::compute(org, &summary(revenue + increase), &totals, ratio, Currency::Xaf);
        prop_assert!(after.available_amount >= before.available_amount);
    }

    /// Derivation is deterministic.
    #[test]
    fn prop_compute_is_deterministic(
        revenue in signed_amount(),
        processing in amount(),
        ratio in ratio(),
    ) {
        let totals = WithdrawalTotals { processing, ..WithdrawalTotals::default() };
        let org = OrganizationId::new();
        let a = BalanceLedger::compute(org, &summary(revenue), &totals, ratio, Currency::Xaf);
        let b = BalanceLedger::compute(org, &summary(revenue), &totals, ratio, Currency::Xaf);
        prop_assert_eq!(a, b);
    }
}
