use std::time::Duration;

use dshop_common::MinorUnits;
use dshop_engine::{
    db_types::{NewShop, OfferId, OrderStatus},
    outcomes::{IngestOutcome, ReconcileOutcome, RefundOutcome, SkipReason, StageOutcome},
    test_utils::fixtures::{
        ipfs,
        listing_created_log,
        network,
        offer_log,
        order_payload,
        pending_shop,
        with_referrer,
        OfferEvent,
        NETWORK_ID,
        REFERRER,
        SELLER,
    },
    refund_idempotency_key,
    EngineConfig,
    IngestError,
    OrderManagement,
    ReconcileError,
};
use serde_json::json;
use support::{listing_id, TestSystem, LISTING};

mod support;

const CHECKSUMMED_REFERRER: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";

fn outcome(result: Result<IngestOutcome, IngestError>) -> ReconcileOutcome {
    match result {
        Ok(IngestOutcome::Processed { outcome, .. }) => outcome,
        other => panic!("Expected the event to be processed, got {other:?}"),
    }
}

fn offer_id(offer: i64) -> OfferId {
    OfferId::new(&listing_id(), offer)
}

/// Publishes the offer content for offer 1 and ingests its `OfferCreated` event at block 101.
async fn create_offer(sys: &TestSystem, payment_method: &str) -> ReconcileOutcome {
    let data = with_referrer(order_payload(10050, payment_method), REFERRER);
    sys.stubs.publish_offer(&ipfs(0x21), "QmEncrypted1", Some("pc_1"), data);
    outcome(sys.ingest(offer_log(OfferEvent::Created, LISTING, 1, 0x21, 101, 0)).await)
}

#[tokio::test]
async fn order_lifecycle_to_finalized() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    let shop = sys.shop_with_listing("lifecycle").await;

    let ReconcileOutcome::OrderCreated { order, side_effects } = create_offer(&sys, "stripe").await else {
        panic!("Expected a new order");
    };
    assert_eq!(order.order_id, offer_id(1));
    assert_eq!(order.shop_id, shop.id);
    assert_eq!(order.status, OrderStatus::OfferCreated);
    assert_eq!(order.referrer.as_deref(), Some(CHECKSUMMED_REFERRER));
    assert_eq!(order.commission_pending, Some(MinorUnits::from(50)));
    assert_eq!(order.payment_code.as_deref(), Some("pc_1"));
    assert_eq!(order.encrypted_ipfs_hash.as_deref(), Some("QmEncrypted1"));
    assert_eq!(order.ipfs_hash, Some(ipfs(0x21)));
    assert_eq!(order.data.offer_id.as_deref(), Some("999-001-7-1"));
    assert!(order.data.tx.is_some());
    assert!(matches!(side_effects.fulfillment, StageOutcome::Skipped(_)));
    assert_eq!(side_effects.email, StageOutcome::Succeeded);
    assert_eq!(side_effects.webhook, StageOutcome::Succeeded);
    assert_eq!(sys.stubs.notifier.emails(), 1);
    assert_eq!(sys.stubs.notifier.webhooks(), 1);
    assert_eq!(sys.stubs.discounts.used(), 1);

    let accepted = outcome(sys.ingest(offer_log(OfferEvent::Accepted, LISTING, 1, 0x22, 102, 0)).await);
    let ReconcileOutcome::OrderUpdated { order, refund } = accepted else { panic!("Expected an update") };
    assert_eq!(order.status, OrderStatus::OfferAccepted);
    assert!(refund.is_none());

    let finalized = outcome(sys.ingest(offer_log(OfferEvent::Finalized, LISTING, 1, 0x23, 103, 0)).await);
    let ReconcileOutcome::OrderUpdated { order, .. } = finalized else { panic!("Expected an update") };
    assert_eq!(order.status, OrderStatus::OfferFinalized);
    assert_eq!(order.position(), (103, 0));
    // The payload is not touched by status changes
    assert_eq!(order.commission_pending, Some(MinorUnits::from(50)));

    let orders = sys.db().fetch_orders_for_shop(shop.id).await.unwrap();
    assert_eq!(orders.len(), 1);
    sys.tear_down().await;
}

#[tokio::test]
async fn replaying_an_offer_created_event_is_harmless() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    let shop = sys.shop_with_listing("replay").await;
    assert!(matches!(create_offer(&sys, "stripe").await, ReconcileOutcome::OrderCreated { .. }));

    let replay = sys.ingest(offer_log(OfferEvent::Created, LISTING, 1, 0x21, 101, 0)).await.unwrap();
    let IngestOutcome::Processed { newly_recorded, outcome, .. } = replay else { panic!("Expected a replay") };
    assert!(!newly_recorded);
    assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
    assert_eq!(sys.db().fetch_orders_for_shop(shop.id).await.unwrap().len(), 1);
    assert_eq!(sys.stubs.notifier.emails(), 1);
    assert_eq!(sys.stubs.content.calls(), 1);
    sys.tear_down().await;
}

#[tokio::test]
async fn withdrawal_with_declined_refund_records_the_reason() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    sys.shop_with_listing("declined").await;
    sys.stripe_payment("pc_1", "ch_123").await;
    sys.stubs.refunds.decline_with("card_declined");
    create_offer(&sys, "stripe").await;

    let withdrawn = outcome(sys.ingest(offer_log(OfferEvent::Withdrawn, LISTING, 1, 0x24, 102, 0)).await);
    let ReconcileOutcome::OrderUpdated { order, refund } = withdrawn else { panic!("Expected an update") };
    assert_eq!(order.status, OrderStatus::OfferWithdrawn);
    assert_eq!(refund, Some(RefundOutcome::Failed("card_declined".into())));
    assert_eq!(order.data.refund_error.as_deref(), Some("card_declined"));
    assert_eq!(sys.stubs.refunds.calls(), 1);
    sys.tear_down().await;
}

#[tokio::test]
async fn withdrawal_refunds_the_external_payment() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    sys.shop_with_listing("refunded").await;
    sys.stripe_payment("pc_1", "ch_456").await;
    create_offer(&sys, "stripe").await;

    let withdrawn = outcome(sys.ingest(offer_log(OfferEvent::Withdrawn, LISTING, 1, 0x24, 102, 0)).await);
    let ReconcileOutcome::OrderUpdated { order, refund } = withdrawn else { panic!("Expected an update") };
    assert_eq!(order.status, OrderStatus::OfferWithdrawn);
    assert_eq!(refund, Some(RefundOutcome::Refunded));
    assert!(order.data.refund_error.is_none());
    assert_eq!(sys.stubs.refunds.refunded(), vec!["ch_456".to_string()]);
    assert_eq!(sys.stubs.refunds.keys(), vec![refund_idempotency_key(&order)]);
    assert_eq!(refund_idempotency_key(&order), "refund-999-001-7-1");
    sys.tear_down().await;
}

#[tokio::test]
async fn withdrawal_without_an_external_payment_fails() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    let shop = sys.shop_with_listing("nopayment").await;
    create_offer(&sys, "stripe").await;

    let err = sys.ingest(offer_log(OfferEvent::Withdrawn, LISTING, 1, 0x24, 102, 0)).await.unwrap_err();
    assert!(matches!(err, IngestError::Reconcile(ReconcileError::MissingExternalPayment(..))));
    let order = sys.db().fetch_order(NETWORK_ID, shop.id, &offer_id(1)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::OfferCreated);
    assert_eq!(sys.stubs.refunds.calls(), 0);
    sys.tear_down().await;
}

#[tokio::test]
async fn withdrawal_of_a_non_refundable_order_skips_the_refund() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    sys.shop_with_listing("crypto").await;
    create_offer(&sys, "crypto").await;

    let withdrawn = outcome(sys.ingest(offer_log(OfferEvent::Withdrawn, LISTING, 1, 0x24, 102, 0)).await);
    let ReconcileOutcome::OrderUpdated { order, refund } = withdrawn else { panic!("Expected an update") };
    assert_eq!(order.status, OrderStatus::OfferWithdrawn);
    assert!(refund.is_none());
    assert_eq!(sys.stubs.refunds.calls(), 0);
    sys.tear_down().await;
}

#[tokio::test]
async fn accepting_an_unknown_offer_is_an_error() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    let shop = sys.shop_with_listing("unknown").await;

    let err = sys.ingest(offer_log(OfferEvent::Accepted, LISTING, 9, 0x22, 102, 0)).await.unwrap_err();
    match err {
        IngestError::Reconcile(ReconcileError::OrderNotFound(id, _)) => assert_eq!(id, offer_id(9)),
        other => panic!("Expected OrderNotFound, got {other:?}"),
    }
    assert!(sys.db().fetch_orders_for_shop(shop.id).await.unwrap().is_empty());
    sys.tear_down().await;
}

#[tokio::test]
async fn offer_events_for_a_shop_without_a_listing_id_are_fatal() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    let shop = sys.db().insert_shop(pending_shop("unlisted")).await.unwrap();
    assert!(shop.listing_id.is_none());
    let stored = sys.ingest(offer_log(OfferEvent::Created, LISTING, 1, 0x21, 101, 0)).await.unwrap();
    let IngestOutcome::Processed { event, outcome, .. } = stored else { panic!("Expected the event to be stored") };
    assert!(matches!(outcome, ReconcileOutcome::Skipped(SkipReason::UnassociatedShop)));

    let err = sys.ingestor.reconciler().process_event(&event, Some(shop.clone()), &network()).await.unwrap_err();
    match err {
        ReconcileError::ShopMissingListingId(id) => assert_eq!(id, shop.id),
        other => panic!("Expected ShopMissingListingId, got {other:?}"),
    }
    assert!(sys.db().fetch_orders_for_shop(shop.id).await.unwrap().is_empty());
    assert_eq!(sys.stubs.content.calls(), 0);
    sys.tear_down().await;
}

#[tokio::test]
async fn offers_on_foreign_listings_are_skipped() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    sys.shop_with_listing("foreign").await;

    let result = outcome(sys.ingest(offer_log(OfferEvent::Created, 8, 1, 0x21, 101, 0)).await);
    assert!(matches!(result, ReconcileOutcome::Skipped(SkipReason::UnassociatedShop)));
    let result = outcome(sys.ingest(offer_log(OfferEvent::Disputed, LISTING, 1, 0x21, 101, 1)).await);
    assert!(matches!(result, ReconcileOutcome::Skipped(SkipReason::UnhandledOfferEvent)));
    assert_eq!(sys.stubs.content.calls(), 0);
    sys.tear_down().await;
}

#[tokio::test]
async fn stale_events_are_ignored() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    let shop = sys.shop_with_listing("ordered").await;
    create_offer(&sys, "crypto").await;
    sys.ingest(offer_log(OfferEvent::Finalized, LISTING, 1, 0x23, 103, 0)).await.unwrap();

    let late = outcome(sys.ingest(offer_log(OfferEvent::Accepted, LISTING, 1, 0x22, 102, 0)).await);
    assert!(matches!(late, ReconcileOutcome::Ignored { .. }));
    let order = sys.db().fetch_order(NETWORK_ID, shop.id, &offer_id(1)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::OfferFinalized);

    // Newer, but not a forward transition
    let backwards = outcome(sys.ingest(offer_log(OfferEvent::Accepted, LISTING, 1, 0x22, 104, 0)).await);
    let ReconcileOutcome::Ignored { reason, .. } = backwards else { panic!("Expected the event to be ignored") };
    assert_eq!(reason, "the order is already OfferFinalized and cannot move to OfferAccepted");
    sys.tear_down().await;
}

#[tokio::test]
async fn legacy_mode_lets_late_events_overwrite_the_status() {
    let sys = TestSystem::new(EngineConfig::default().with_event_ordering(false)).await;
    sys.shop_with_listing("legacy").await;
    create_offer(&sys, "crypto").await;
    sys.ingest(offer_log(OfferEvent::Finalized, LISTING, 1, 0x23, 103, 0)).await.unwrap();

    let late = outcome(sys.ingest(offer_log(OfferEvent::Accepted, LISTING, 1, 0x22, 102, 0)).await);
    let ReconcileOutcome::OrderUpdated { order, .. } = late else { panic!("Expected an update") };
    assert_eq!(order.status, OrderStatus::OfferAccepted);
    sys.tear_down().await;
}

#[tokio::test]
async fn side_effect_failures_do_not_block_the_order() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    let config = json!({ "autoFulfill": true, "email": "shop@example.com" }).to_string();
    let shop = sys.db().insert_shop(pending_shop("fragile").with_config(config)).await.unwrap();
    sys.ingest(listing_created_log(SELLER, LISTING, 100, 0)).await.unwrap();
    sys.stubs.fulfillment.fail();
    sys.stubs.notifier.fail_email();
    sys.stubs.notifier.fail_webhook();

    let ReconcileOutcome::OrderCreated { order, side_effects } = create_offer(&sys, "stripe").await else {
        panic!("Expected a new order");
    };
    assert!(side_effects.fulfillment.is_failed());
    assert!(side_effects.email.is_failed());
    assert!(side_effects.webhook.is_failed());
    assert_eq!(sys.stubs.fulfillment.calls(), 1);
    let stored = sys.db().fetch_order(NETWORK_ID, shop.id, &order.order_id).await.unwrap();
    assert!(stored.is_some());
    sys.tear_down().await;
}

#[tokio::test]
async fn slow_content_storage_times_out() {
    let config = EngineConfig::default().with_content_fetch_timeout(Duration::from_millis(50));
    let sys = TestSystem::new(config).await;
    let shop = sys.shop_with_listing("slow").await;
    sys.stubs.content.set_delay(Duration::from_millis(500));

    let data = order_payload(1000, "stripe");
    sys.stubs.publish_offer(&ipfs(0x21), "QmEncrypted1", None, data);
    let err = sys.ingest(offer_log(OfferEvent::Created, LISTING, 1, 0x21, 101, 0)).await.unwrap_err();
    assert!(matches!(err, IngestError::Reconcile(ReconcileError::ContentFetchTimeout(..))));
    assert!(sys.db().fetch_orders_for_shop(shop.id).await.unwrap().is_empty());
    sys.tear_down().await;
}

#[tokio::test]
async fn offer_without_encrypted_data_is_rejected() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    let shop = sys.shop_with_listing("noenc").await;
    sys.stubs.content.add_document(&ipfs(0x21), &json!({ "paymentCode": "pc_1" }));

    let err = sys.ingest(offer_log(OfferEvent::Created, LISTING, 1, 0x21, 101, 0)).await.unwrap_err();
    assert!(matches!(err, IngestError::Reconcile(ReconcileError::NoEncryptedData)));
    assert_eq!(err.to_string(), "No encrypted data found");
    assert!(sys.db().fetch_orders_for_shop(shop.id).await.unwrap().is_empty());

    // Once the content is fixed, replaying the event creates the order
    sys.stubs.publish_offer(&ipfs(0x21), "QmEncrypted1", Some("pc_1"), order_payload(1000, "stripe"));
    let replay = outcome(sys.ingest(offer_log(OfferEvent::Created, LISTING, 1, 0x21, 101, 0)).await);
    assert!(matches!(replay, ReconcileOutcome::OrderCreated { .. }));
    sys.tear_down().await;
}

#[tokio::test]
async fn invalid_discounts_and_referrers_are_flagged_not_fatal() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    sys.shop_with_listing("discounts").await;
    sys.stubs.discounts.reject_with("Discount code SPRING has expired");
    let data = with_referrer(order_payload(10050, "stripe"), "not-an-address");
    sys.stubs.publish_offer(&ipfs(0x21), "QmEncrypted1", Some("pc_1"), data);

    let created = outcome(sys.ingest(offer_log(OfferEvent::Created, LISTING, 1, 0x21, 101, 0)).await);
    let ReconcileOutcome::OrderCreated { order, .. } = created else { panic!("Expected a new order") };
    assert_eq!(order.data.error.as_deref(), Some("Discount code SPRING has expired"));
    assert!(order.referrer.is_none());
    assert!(order.commission_pending.is_none());
    assert_eq!(sys.stubs.discounts.used(), 0);
    sys.tear_down().await;
}

#[tokio::test]
async fn shops_can_be_created_without_a_config() {
    let sys = TestSystem::new(EngineConfig::default()).await;
    let shop = sys
        .db()
        .insert_shop(NewShop::new("bare", "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed", "shops/bare"))
        .await
        .unwrap();
    assert!(shop.listing_id.is_none());
    sys.ingest(listing_created_log(SELLER, LISTING, 100, 0)).await.unwrap();
    let ReconcileOutcome::OrderCreated { side_effects, .. } = create_offer(&sys, "stripe").await else {
        panic!("Expected a new order");
    };
    assert!(matches!(side_effects.fulfillment, StageOutcome::Skipped(_)));
    sys.tear_down().await;
}
