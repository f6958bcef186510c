//! End-to-end settlement scenarios against the in-process ports.
//!
//! Covers the request, reconcile and re-verify flows, duplicate and
//! concurrent reconciliation, and the write-time balance recheck.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use kiosk_core::gateway::GatewayError;
use kiosk_core::payout::memory::{
    InMemoryDirectory, InMemorySalesLedger, InMemoryWithdrawalStore, ScriptedGateway,
};
use kiosk_core::payout::{
    PayoutCustomer, PayoutDestination, PayoutError, PayoutRecipient, ProviderStatus,
    RevenueSummary, SettlementConfig, SettlementEngine, SettlementPorts, WithdrawalStatus,
};
use kiosk_shared::types::{OrganizationId, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct Harness {
    store: Arc<InMemoryWithdrawalStore>,
    sales: Arc<InMemorySalesLedger>,
    gateway: Arc<ScriptedGateway>,
    org: OrganizationId,
    other_org: OrganizationId,
    owner: UserId,
}

impl Harness {
    fn new(revenue: Decimal, gateway: ScriptedGateway) -> Self {
        let org = OrganizationId::new();
        Self {
            store: Arc::new(InMemoryWithdrawalStore::new()),
            sales: Arc::new(InMemorySalesLedger::new().with_revenue(
                org,
                RevenueSummary {
                    total_revenue: revenue,
                    total_sales_count: 40,
                },
            )),
            gateway: Arc::new(gateway),
            org,
            other_org: OrganizationId::new(),
            owner: UserId::new(),
        }
    }

    /// A fresh engine over the shared ports, as a second process would have.
    fn engine(&self) -> SettlementEngine {
        let recipient = PayoutRecipient {
            customer: PayoutCustomer {
                name: "Cameroon Tribune".into(),
                email: Some("compta@cameroon-tribune.cm".into()),
                phone: None,
            },
            destination: PayoutDestination {
                channel: "bank".into(),
                account_number: "CM2110002000300277976315008".into(),
            },
        };
        SettlementEngine::new(
            SettlementPorts {
                store: self.store.clone(),
                sales: self.sales.clone(),
                directory: Arc::new(
                    InMemoryDirectory::new()
                        .with_manager(self.org, self.owner)
                        .with_manager(self.other_org, self.owner)
                        .with_recipient(self.org, recipient),
                ),
                gateway: self.gateway.clone(),
            },
            SettlementConfig::default(),
        )
    }
}

#[tokio::test]
async fn test_worked_example_completed_withdrawal() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Success));
    let engine = h.engine();

    let before = engine.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(before.platform_amount, dec!(100000));
    assert_eq!(before.available_amount, dec!(300000));
    assert_eq!(before.total_sales_count, 40);

    let record = engine
        .request_withdrawal(h.org, dec!(100000), Some("Q1".into()), h.owner)
        .await
        .unwrap();
    assert_eq!(record.status, WithdrawalStatus::Completed);
    assert!(record.completed_at.is_some());
    assert_eq!(record.external_reference, "TRF-000001");

    let after = engine.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(after.withdrawn_amount, dec!(100000));
    assert_eq!(after.available_amount, dec!(200000));
}

#[tokio::test]
async fn test_amount_above_available_is_refused_without_side_effects() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Success));
    let engine = h.engine();

    let err = engine
        .request_withdrawal(h.org, dec!(300001), None, h.owner)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PayoutError::InsufficientBalance { available, .. } if available == dec!(300000)
    ));
    assert!(h.store.is_empty().await);
    assert_eq!(h.gateway.initiate_calls(), 0);

    let balance = engine.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(balance.available_amount, dec!(300000));
}

#[tokio::test]
async fn test_pending_then_failed_on_reverify() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Pending));
    let engine = h.engine();

    let record = engine
        .request_withdrawal(h.org, dec!(50000), None, h.owner)
        .await
        .unwrap();
    assert_eq!(record.status, WithdrawalStatus::Processing);
    assert!(record.completed_at.is_none());

    let balance = engine.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(balance.withdrawn_amount, dec!(50000));

    h.gateway
        .set_status(&record.external_reference, ProviderStatus::Failed)
        .await;
    let updated = engine
        .reverify(h.org, &record.external_reference, h.owner)
        .await
        .unwrap();
    assert_eq!(updated.status, WithdrawalStatus::Failed);
    assert!(updated.completed_at.is_some());

    let balance = engine.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(balance.withdrawn_amount, Decimal::ZERO);
    assert_eq!(balance.available_amount, dec!(300000));
}

#[tokio::test]
async fn test_reverify_completed_is_noop() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Success));
    let engine = h.engine();

    let record = engine
        .request_withdrawal(h.org, dec!(1000), None, h.owner)
        .await
        .unwrap();
    let balance_before = engine.get_balance(h.org, h.owner).await.unwrap();
    let verify_calls = h.gateway.verify_calls();

    let first = engine
        .reverify(h.org, &record.external_reference, h.owner)
        .await
        .unwrap();
    let second = engine
        .reverify(h.org, &record.external_reference, h.owner)
        .await
        .unwrap();

    assert_eq!(first, record);
    assert_eq!(second, record);
    assert_eq!(h.gateway.verify_calls(), verify_calls);
    assert_eq!(engine.get_balance(h.org, h.owner).await.unwrap(), balance_before);
}

#[tokio::test]
async fn test_initiate_unavailable_leaves_no_record() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Success));
    h.gateway
        .fail_initiate(GatewayError::Unavailable("provider returned 503".into()))
        .await;
    let engine = h.engine();

    let err = engine
        .request_withdrawal(h.org, dec!(1000), None, h.owner)
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::GatewayUnavailable(_)));
    assert!(h.store.is_empty().await);
    assert_eq!(
        engine.get_balance(h.org, h.owner).await.unwrap().available_amount,
        dec!(300000)
    );
}

#[tokio::test]
async fn test_initiate_rejected_surfaces_reason() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Success));
    h.gateway
        .fail_initiate(GatewayError::Rejected {
            status: 400,
            message: "account number invalid".into(),
        })
        .await;
    let engine = h.engine();

    let err = engine
        .request_withdrawal(h.org, dec!(1000), None, h.owner)
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::GatewayRejected(ref m) if m == "account number invalid"));
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_provider_failure_on_first_verify_writes_nothing() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Cancelled));
    let engine = h.engine();

    let err = engine
        .request_withdrawal(h.org, dec!(1000), None, h.owner)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PayoutError::TransferFailed {
            status: ProviderStatus::Cancelled,
            ..
        }
    ));
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_pending_record_completes_on_reverify() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Success));
    let engine = h.engine();

    let transfer = engine
        .initiate_withdrawal(h.org, dec!(20000), None, h.owner)
        .await
        .unwrap();
    h.gateway
        .fail_verify(&transfer.reference, GatewayError::Timeout)
        .await;
    let record = engine.reconcile(&transfer).await.unwrap();
    assert_eq!(record.status, WithdrawalStatus::Pending);

    let balance = engine.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(balance.withdrawn_amount, Decimal::ZERO);
    assert_eq!(balance.pending_amount, dec!(20000));
    assert_eq!(balance.withdrawable(), dec!(280000));

    h.gateway
        .set_status(&transfer.reference, ProviderStatus::Success)
        .await;
    let updated = engine.reverify(h.org, &transfer.reference, h.owner).await.unwrap();
    assert_eq!(updated.status, WithdrawalStatus::Completed);

    let balance = engine.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(balance.withdrawn_amount, dec!(20000));
    assert_eq!(balance.pending_amount, Decimal::ZERO);
    assert_eq!(balance.available_amount, dec!(280000));
}

#[tokio::test]
async fn test_reverify_unavailable_keeps_record() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Initiated));
    let engine = h.engine();

    let record = engine
        .request_withdrawal(h.org, dec!(1000), None, h.owner)
        .await
        .unwrap();
    h.gateway
        .fail_verify(
            &record.external_reference,
            GatewayError::Unavailable("connection reset".into()),
        )
        .await;

    let err = engine
        .reverify(h.org, &record.external_reference, h.owner)
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::GatewayUnavailable(_)));

    let stored = h.store.all().await;
    assert_eq!(stored, vec![record]);
}

#[tokio::test]
async fn test_reverify_unknown_and_forbidden() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Pending));
    let engine = h.engine();

    let err = engine.reverify(h.org, "TRF-999999", h.owner).await.unwrap_err();
    assert!(matches!(err, PayoutError::WithdrawalNotFound(_)));

    let record = engine
        .request_withdrawal(h.org, dec!(1000), None, h.owner)
        .await
        .unwrap();
    let err = engine
        .reverify(h.org, &record.external_reference, UserId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::Forbidden { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reconcile_in_one_process_writes_once() {
    let h = Harness::new(
        dec!(400000),
        ScriptedGateway::new(ProviderStatus::Success).with_verify_delay(Duration::from_millis(50)),
    );
    let engine = Arc::new(h.engine());
    let transfer = engine
        .initiate_withdrawal(h.org, dec!(5000), None, h.owner)
        .await
        .unwrap();

    let tasks = (0..8).map(|_| {
        let engine = Arc::clone(&engine);
        let transfer = transfer.clone();
        tokio::spawn(async move { engine.reconcile(&transfer).await })
    });
    let results = join_all(tasks).await;

    let mut stored = 0;
    for result in results {
        match result.unwrap() {
            Ok(record) => {
                assert_eq!(record.external_reference, transfer.reference);
                stored += 1;
            }
            Err(PayoutError::ReconciliationInProgress(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(stored >= 1);
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reconcile_across_processes_writes_once() {
    let h = Harness::new(
        dec!(400000),
        ScriptedGateway::new(ProviderStatus::Success).with_verify_delay(Duration::from_millis(20)),
    );
    let first = Arc::new(h.engine());
    let second = Arc::new(h.engine());
    let transfer = first
        .initiate_withdrawal(h.org, dec!(5000), None, h.owner)
        .await
        .unwrap();

    let (a, b) = tokio::join!(first.reconcile(&transfer), second.reconcile(&transfer));
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.id, b.id);
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn test_write_time_recheck_refuses_losing_request() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Success));
    let engine = h.engine();

    // Both pass the read-time check before either is recorded.
    let first = engine
        .initiate_withdrawal(h.org, dec!(200000), None, h.owner)
        .await
        .unwrap();
    let second = engine
        .initiate_withdrawal(h.org, dec!(200000), None, h.owner)
        .await
        .unwrap();

    engine.reconcile(&first).await.unwrap();
    let err = engine.reconcile(&second).await.unwrap_err();
    assert!(matches!(
        err,
        PayoutError::InsufficientBalance { available, .. } if available == dec!(100000)
    ));
    assert_eq!(h.store.len().await, 1);

    let balance = engine.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(balance.withdrawn_amount, dec!(200000));
    assert_eq!(balance.available_amount, dec!(100000));
}

#[tokio::test]
async fn test_list_withdrawals_newest_first() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Success));
    let engine = h.engine();

    for amount in [dec!(1000), dec!(2000), dec!(3000)] {
        engine
            .request_withdrawal(h.org, amount, None, h.owner)
            .await
            .unwrap();
    }

    let list = engine.list_withdrawals(h.org, h.owner).await.unwrap();
    let amounts: Vec<_> = list.iter().map(|r| r.amount).collect();
    assert_eq!(amounts, vec![dec!(3000), dec!(2000), dec!(1000)]);
}

#[tokio::test]
async fn test_revenue_growth_shows_after_cache_invalidation() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Success));
    let engine = h.engine();

    engine.get_balance(h.org, h.owner).await.unwrap();
    h.sales
        .set_revenue(
            h.org,
            RevenueSummary {
                total_revenue: dec!(800000),
                total_sales_count: 80,
            },
        )
        .await;

    // A reconciliation invalidates the cached balance.
    engine
        .request_withdrawal(h.org, dec!(1000), None, h.owner)
        .await
        .unwrap();
    let balance = engine.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(balance.total_revenue, dec!(800000));
    assert_eq!(balance.available_amount, dec!(599000));
}

#[tokio::test]
async fn test_reverify_under_other_organization_changes_nothing() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Pending));
    let engine = h.engine();

    let record = engine
        .request_withdrawal(h.org, dec!(1000), None, h.owner)
        .await
        .unwrap();
    assert_eq!(record.status, WithdrawalStatus::Processing);
    h.gateway
        .set_status(&record.external_reference, ProviderStatus::Success)
        .await;
    let verify_calls = h.gateway.verify_calls();

    let err = engine
        .reverify(h.other_org, &record.external_reference, h.owner)
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::WithdrawalNotFound(_)));
    assert_eq!(h.gateway.verify_calls(), verify_calls);
    assert_eq!(h.store.all().await, vec![record]);
}

#[tokio::test]
async fn test_write_in_another_process_is_seen_immediately() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Pending));
    let reader = h.engine();
    let writer = h.engine();

    let before = reader.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(before.available_amount, dec!(300000));

    let record = writer
        .request_withdrawal(h.org, dec!(50000), None, h.owner)
        .await
        .unwrap();
    let after_insert = reader.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(after_insert.withdrawn_amount, dec!(50000));
    assert_eq!(after_insert.available_amount, dec!(250000));

    h.gateway
        .set_status(&record.external_reference, ProviderStatus::Failed)
        .await;
    writer
        .reverify(h.org, &record.external_reference, h.owner)
        .await
        .unwrap();
    let after_update = reader.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(after_update.withdrawn_amount, Decimal::ZERO);
    assert_eq!(after_update.available_amount, dec!(300000));
}

#[tokio::test]
async fn test_balance_is_cached_while_records_are_unchanged() {
    let h = Harness::new(dec!(400000), ScriptedGateway::new(ProviderStatus::Success));
    let engine = h.engine();

    engine.get_balance(h.org, h.owner).await.unwrap();
    h.sales
        .set_revenue(
            h.org,
            RevenueSummary {
                total_revenue: dec!(800000),
                total_sales_count: 80,
            },
        )
        .await;

    let cached = engine.get_balance(h.org, h.owner).await.unwrap();
    assert_eq!(cached.total_revenue, dec!(400000));

    let fresh = engine.compute_balance(h.org).await.unwrap();
    assert_eq!(fresh.total_revenue, dec!(800000));
}
