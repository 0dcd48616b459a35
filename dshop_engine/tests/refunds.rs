use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dshop_engine::{
    db_types::{ExternalPayment, OfferId, OrderStatus},
    outcomes::{IngestOutcome, ReconcileOutcome, RefundOutcome},
    shop_config::ShopConfig,
    test_utils::fixtures::{ipfs, offer_log, order_payload, OfferEvent, NETWORK_ID},
    traits::{CollaboratorError, RefundProcessor, RefundResult},
    EngineConfig,
    OrderManagement,
};
use log::*;
use mockall::mock;
use sqlx::SqlitePool;
use support::{TestSystem, LISTING};

mod support;

mock! {
    pub Refunds {}
    #[async_trait]
    impl RefundProcessor for Refunds {
        async fn refund(
            &self,
            config: &ShopConfig,
            payment: &ExternalPayment,
            idempotency_key: &str,
        ) -> Result<RefundResult, CollaboratorError>;
    }
}

fn updated(result: IngestOutcome) -> (OrderStatus, Option<RefundOutcome>) {
    match result.reconcile_outcome() {
        Some(ReconcileOutcome::OrderUpdated { order, refund }) => (order.status, refund.clone()),
        other => panic!("Expected an order update, got {other:?}"),
    }
}

#[tokio::test]
async fn withdrawn_orders_are_refunded_exactly_once() {
    let mut refunds = MockRefunds::new();
    refunds
        .expect_refund()
        .withf(|_, payment, key| {
            payment.payment_reference.as_deref() == Some("ch_789") && key.to_string() == "refund-999-001-7-1"
        })
        .times(1)
        .returning(|_, _, _| Ok(RefundResult::Refunded));
    let sys = TestSystem::with_refunds(EngineConfig::default(), Arc::new(refunds)).await;
    sys.shop_with_listing("once").await;
    sys.stripe_payment("pc_1", "ch_789").await;
    sys.stubs.publish_offer(&ipfs(0x21), "QmEncrypted1", Some("pc_1"), order_payload(5000, "stripe"));
    sys.ingest(offer_log(OfferEvent::Created, LISTING, 1, 0x21, 101, 0)).await.unwrap();

    let withdrawn = sys.ingest(offer_log(OfferEvent::Withdrawn, LISTING, 1, 0x24, 102, 0)).await.unwrap();
    assert_eq!(updated(withdrawn), (OrderStatus::OfferWithdrawn, Some(RefundOutcome::Refunded)));

    // The replay is stale, so the refund processor is not called again
    let replay = sys.ingest(offer_log(OfferEvent::Withdrawn, LISTING, 1, 0x24, 102, 0)).await.unwrap();
    assert!(matches!(replay.reconcile_outcome(), Some(ReconcileOutcome::Ignored { .. })));
    sys.tear_down().await;
}

#[tokio::test]
async fn refund_processor_errors_are_recorded_on_the_order() {
    let mut refunds = MockRefunds::new();
    refunds
        .expect_refund()
        .times(1)
        .returning(|_, _, _| Err(CollaboratorError::Unavailable("Stripe is down".into())));
    let sys = TestSystem::with_refunds(EngineConfig::default(), Arc::new(refunds)).await;
    sys.shop_with_listing("outage").await;
    sys.stripe_payment("pc_1", "ch_789").await;
    sys.stubs.publish_offer(&ipfs(0x21), "QmEncrypted1", Some("pc_1"), order_payload(5000, "stripe"));
    sys.ingest(offer_log(OfferEvent::Created, LISTING, 1, 0x21, 101, 0)).await.unwrap();

    let withdrawn = sys.ingest(offer_log(OfferEvent::Withdrawn, LISTING, 1, 0x24, 102, 0)).await.unwrap();
    let (status, refund) = updated(withdrawn.clone());
    assert_eq!(status, OrderStatus::OfferWithdrawn);
    let Some(RefundOutcome::Failed(reason)) = refund else { panic!("Expected the refund to fail") };
    assert!(reason.contains("Stripe is down"));
    let order = withdrawn.reconcile_outcome().and_then(|o| o.order()).cloned().unwrap();
    assert_eq!(order.data.refund_error, Some(reason));
    sys.tear_down().await;
}

/// Refunds successfully, but the first refund also breaks order writes, so the withdrawal cannot be saved.
#[derive(Default)]
struct RefundThenBreakWrites {
    pool: Mutex<Option<SqlitePool>>,
    keys: Mutex<Vec<String>>,
}

impl RefundThenBreakWrites {
    fn attach(&self, pool: SqlitePool) {
        *self.pool.lock().unwrap() = Some(pool);
    }

    fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefundProcessor for RefundThenBreakWrites {
    async fn refund(
        &self,
        _config: &ShopConfig,
        _payment: &ExternalPayment,
        idempotency_key: &str,
    ) -> Result<RefundResult, CollaboratorError> {
        let first = {
            let mut keys = self.keys.lock().unwrap();
            keys.push(idempotency_key.to_string());
            keys.len() == 1
        };
        let pool = self.pool.lock().unwrap().clone();
        if let (true, Some(pool)) = (first, pool) {
            sqlx::query(
                "CREATE TRIGGER orders_read_only BEFORE UPDATE ON orders BEGIN SELECT RAISE(ABORT, 'db down'); END",
            )
            .execute(&pool)
            .await
            .unwrap();
        }
        Ok(RefundResult::Refunded)
    }
}

#[tokio::test]
async fn retried_withdrawal_reuses_the_refund_idempotency_key() {
    let refunds = Arc::new(RefundThenBreakWrites::default());
    let sys = TestSystem::with_refunds(EngineConfig::default(), refunds.clone()).await;
    refunds.attach(sys.db().pool().clone());
    let shop = sys.shop_with_listing("retry").await;
    sys.stripe_payment("pc_1", "ch_789").await;
    sys.stubs.publish_offer(&ipfs(0x21), "QmEncrypted1", Some("pc_1"), order_payload(5000, "stripe"));
    sys.ingest(offer_log(OfferEvent::Created, LISTING, 1, 0x21, 101, 0)).await.unwrap();

    let failed = sys.ingest(offer_log(OfferEvent::Withdrawn, LISTING, 1, 0x24, 102, 0)).await;
    assert!(failed.is_err(), "The withdrawal should not have been saved");
    let order_id = OfferId::from("999-001-7-1");
    let order = sys.db().fetch_order(NETWORK_ID, shop.id, &order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::OfferCreated);

    sqlx::query("DROP TRIGGER orders_read_only").execute(sys.db().pool()).await.unwrap();
    let retried = sys.ingest(offer_log(OfferEvent::Withdrawn, LISTING, 1, 0x24, 102, 0)).await.unwrap();
    assert_eq!(updated(retried), (OrderStatus::OfferWithdrawn, Some(RefundOutcome::Refunded)));
    // The gateway sees the same key twice and refunds only once
    assert_eq!(refunds.keys(), vec!["refund-999-001-7-1".to_string(), "refund-999-001-7-1".to_string()]);
    info!("💸️ Retried withdrawal used key {}", refunds.keys()[0]);
    sys.tear_down().await;
}
