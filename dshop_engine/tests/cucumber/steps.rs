use std::{str::FromStr, time::Duration};

use cucumber::{then, when};
use dshop_common::MinorUnits;
use dshop_engine::{
    db_types::{Order, OrderStatus},
    outcomes::{IngestOutcome, ReconcileOutcome},
    test_utils::fixtures::{listing_created_log, offer_log, OfferEvent, NETWORK_ID, SELLER},
    OrderManagement,
    ShopManagement,
};

use crate::cucumber::DshopWorld;

#[when(expr = "the seller creates listing {int} in block {int}")]
async fn create_listing(world: &mut DshopWorld, listing: u64, block: i64) {
    let result = world.system().ingest(listing_created_log(SELLER, listing, block, 0)).await;
    world.last_result = Some(result);
}

#[when(expr = "offer {int} on listing {int} is {word} in block {int}")]
async fn offer_event(world: &mut DshopWorld, offer: u8, listing: u64, action: String, block: i64) {
    let kind = match action.as_str() {
        "created" => OfferEvent::Created,
        "accepted" => OfferEvent::Accepted,
        "finalized" => OfferEvent::Finalized,
        "withdrawn" => OfferEvent::Withdrawn,
        "disputed" => OfferEvent::Disputed,
        _ => panic!("Unknown offer action: {action}"),
    };
    let log = offer_log(kind, listing, u64::from(offer), 0x20 + offer, block, 0);
    let result = world.system().ingest(log).await;
    world.last_result = Some(result);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut DshopWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

async fn fetch_order(world: &DshopWorld, shop: &str, order_id: &str) -> Option<Order> {
    let shop_id = world.shop_id(shop);
    world.system().db().fetch_order(NETWORK_ID, shop_id, &order_id.into()).await.expect("Error fetching order")
}

#[then(expr = "shop '{word}' has listing id '{word}'")]
async fn check_listing_id(world: &mut DshopWorld, shop: String, listing_id: String) {
    let shop = world.system().db().fetch_shop(world.shop_id(&shop)).await.expect("Error fetching shop").unwrap();
    assert_eq!(shop.listing_id.map(|l| l.to_string()), Some(listing_id));
}

#[then(expr = "shop '{word}' has no listing id")]
async fn check_no_listing_id(world: &mut DshopWorld, shop: String) {
    let shop = world.system().db().fetch_shop(world.shop_id(&shop)).await.expect("Error fetching shop").unwrap();
    assert!(shop.listing_id.is_none(), "Shop has listing id {:?}", shop.listing_id);
}

#[then(expr = "shop '{word}' has {int} order(s)")]
async fn check_order_count(world: &mut DshopWorld, shop: String, count: usize) {
    let orders = world.system().db().fetch_orders_for_shop(world.shop_id(&shop)).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
}

#[then(expr = "order '{word}' of shop '{word}' has status {word}")]
async fn check_order_status(world: &mut DshopWorld, order_id: String, shop: String, status: String) {
    let order = fetch_order(world, &shop, &order_id).await.expect("Order does not exist");
    let status = OrderStatus::from_str(&status).expect("Invalid order status");
    assert_eq!(order.status, status);
}

#[then(expr = "order '{word}' of shop '{word}' has a pending commission of {int}")]
async fn check_commission(world: &mut DshopWorld, order_id: String, shop: String, commission: i64) {
    let order = fetch_order(world, &shop, &order_id).await.expect("Order does not exist");
    assert_eq!(order.commission_pending, Some(MinorUnits::from(commission)));
}

#[then(expr = "order '{word}' of shop '{word}' has refund error '{word}'")]
async fn check_refund_error(world: &mut DshopWorld, order_id: String, shop: String, reason: String) {
    let order = fetch_order(world, &shop, &order_id).await.expect("Order does not exist");
    assert_eq!(order.data.refund_error, Some(reason));
}

#[then("the last event was ignored")]
async fn check_ignored(world: &mut DshopWorld) {
    match &world.last_result {
        Some(Ok(IngestOutcome::Processed { outcome: ReconcileOutcome::Ignored { .. }, .. })) => {},
        other => panic!("Expected the event to be ignored, got {other:?}"),
    }
}

#[then(expr = "the last event was skipped")]
async fn check_skipped(world: &mut DshopWorld) {
    match &world.last_result {
        Some(Ok(IngestOutcome::Processed { outcome: ReconcileOutcome::Skipped(_), .. })) => {},
        other => panic!("Expected the event to be skipped, got {other:?}"),
    }
}

#[then(expr = "the last event failed with {string}")]
async fn check_failed(world: &mut DshopWorld, message: String) {
    match &world.last_result {
        Some(Err(e)) => assert!(e.to_string().contains(&message), "Unexpected error: {e}"),
        other => panic!("Expected the event to fail, got {other:?}"),
    }
}
