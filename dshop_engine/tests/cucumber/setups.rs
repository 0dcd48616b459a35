use cucumber::given;
use dshop_engine::{
    test_utils::fixtures::{ipfs, order_payload, pending_shop, with_referrer},
    EngineConfig,
};

use crate::{cucumber::DshopWorld, support::TestSystem};

#[given("a fresh install")]
async fn fresh_database(world: &mut DshopWorld) {
    world.system = Some(TestSystem::new(EngineConfig::default()).await);
}

#[given("a fresh install without event ordering")]
async fn fresh_legacy_database(world: &mut DshopWorld) {
    world.system = Some(TestSystem::new(EngineConfig::default().with_event_ordering(false)).await);
}

#[given(expr = "a pending shop named '{word}' for the seller wallet")]
async fn pending_shop_for_seller(world: &mut DshopWorld, name: String) {
    let shop = world.system().db().insert_shop(pending_shop(&name)).await.expect("Error inserting shop");
    world.shops.insert(name, shop.id);
}

#[given(expr = "a {word} payment with code '{word}' and reference '{word}'")]
async fn external_payment(world: &mut DshopWorld, provider: String, code: String, reference: String) {
    assert_eq!(provider, "stripe", "Only stripe payments are supported in tests");
    world.system().stripe_payment(&code, &reference).await;
}

#[given(expr = "the refund processor declines refunds with '{word}'")]
async fn refunds_declined(world: &mut DshopWorld, reason: String) {
    world.system().stubs.refunds.decline_with(&reason);
}

#[given(expr = "offer {int} is for {int} paid with '{word}' using payment code '{word}'")]
async fn offer_content(world: &mut DshopWorld, offer: u8, amount: i64, method: String, code: String) {
    let data = order_payload(amount, &method);
    world.system().stubs.publish_offer(&ipfs(0x20 + offer), &format!("QmEncrypted{offer}"), Some(&code), data);
}

#[given(expr = "offer {int} is for {int} paid with '{word}' and referred by '{word}'")]
async fn referred_offer_content(world: &mut DshopWorld, offer: u8, amount: i64, method: String, referrer: String) {
    let data = with_referrer(order_payload(amount, &method), &referrer);
    world.system().stubs.publish_offer(&ipfs(0x20 + offer), &format!("QmEncrypted{offer}"), None, data);
}
