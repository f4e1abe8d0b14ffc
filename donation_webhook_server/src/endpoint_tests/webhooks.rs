use actix_web::http::StatusCode;
use donation_webhook_engine::{
    db_types::{Donation, DonationId, DonationStatus, RecurringDonation, SubscriptionId, SubscriptionStatus},
    processors::{MSG_COMPLETED, MSG_DONATION_NOT_MATCHED, MSG_REFUND, MSG_RENEWAL},
    MemoryStore,
};
use dwg_common::Money;

use super::helpers::{post_webhook, sign};
use crate::integrations::stripe::STRIPE_EVENT_ID_META_KEY;

fn charge_event(event_type: &str, donation_id: i64) -> String {
    format!(
        r#"{{"id": "evt_100", "type": "{event_type}",
            "data": {{"object": {{"id": "ch_100", "status": "succeeded", "amount_refunded": 5000,
                "metadata": {{"donation_id": "{donation_id}"}}}}}}}}"#
    )
}

#[actix_web::test]
async fn unknown_sources_get_a_404() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_webhook(MemoryStore::new(), "paypal", "{}", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Unknown webhook source.");
}

#[actix_web::test]
async fn unsigned_deliveries_are_denied() {
    let store = MemoryStore::new();
    store.seed_donation(Donation::new(DonationId(42), DonationStatus::Pending, Money::from(5000)));
    let body = charge_event("charge.succeeded", 42);

    let (status, response) = post_webhook(store.clone(), "stripe", &body, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response, "Invalid Stripe webhook signature.");

    let (status, response) = post_webhook(store.clone(), "stripe", &body, Some("bogus")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response, "Invalid Stripe webhook signature.");

    // The donation is untouched.
    assert_eq!(store.donation(DonationId(42)).unwrap().status, DonationStatus::Pending);
}

#[actix_web::test]
async fn undecodable_payloads_are_a_500() {
    let body = "not even json";
    let (status, response) = post_webhook(MemoryStore::new(), "stripe", body, Some(&sign(body))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response, "Missing webhook processor for stripe.");
}

#[actix_web::test]
async fn completed_payment_end_to_end() {
    let store = MemoryStore::new();
    store.seed_donation(Donation::new(DonationId(42), DonationStatus::Pending, Money::from(5000)));
    let body = charge_event("charge.succeeded", 42);

    let (status, response) = post_webhook(store.clone(), "stripe", &body, Some(&sign(&body))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, MSG_COMPLETED);

    let donation = store.donation(DonationId(42)).unwrap();
    assert_eq!(donation.status, DonationStatus::Completed);
    assert_eq!(donation.gateway_transaction_id.as_deref(), Some("ch_100"));
    assert_eq!(store.donation_meta(DonationId(42)).get(STRIPE_EVENT_ID_META_KEY).map(String::as_str), Some("evt_100"));
    let logs = store.donation_logs(DonationId(42));
    assert_eq!(logs, vec!["Stripe webhook received: charge.succeeded (evt_100)."]);
}

#[actix_web::test]
async fn completed_payment_is_idempotent() {
    let store = MemoryStore::new();
    store.seed_donation(Donation::new(DonationId(42), DonationStatus::Pending, Money::from(5000)));
    let body = charge_event("charge.succeeded", 42);

    for _ in 0..2 {
        let (status, response) = post_webhook(store.clone(), "stripe", &body, Some(&sign(&body))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, MSG_COMPLETED);
    }
    assert_eq!(store.donation(DonationId(42)).unwrap().status, DonationStatus::Completed);
    assert_eq!(store.donation_count(), 1);
}

#[actix_web::test]
async fn refunds_record_the_amount() {
    let store = MemoryStore::new();
    store.seed_donation(Donation::new(DonationId(42), DonationStatus::Completed, Money::from(5000)));
    let body = charge_event("charge.refunded", 42);

    let (status, response) = post_webhook(store.clone(), "stripe", &body, Some(&sign(&body))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, MSG_REFUND);

    let donation = store.donation(DonationId(42)).unwrap();
    assert_eq!(donation.status, DonationStatus::Refunded);
    let refunds = store.refunds(DonationId(42));
    assert_eq!(refunds, vec![(Money::from(5000), "Refunded 50.00 via Stripe.".to_string())]);
}

#[actix_web::test]
async fn unmatched_donation_is_still_acknowledged() {
    // 200 with an explanatory body, so the gateway does not keep retrying.
    let body = charge_event("charge.succeeded", 999);
    let (status, response) = post_webhook(MemoryStore::new(), "stripe", &body, Some(&sign(&body))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, MSG_DONATION_NOT_MATCHED);
}

#[actix_web::test]
async fn subscription_renewal_end_to_end() {
    let store = MemoryStore::new();
    let mut subscription = RecurringDonation::new(SubscriptionId(9), SubscriptionStatus::Active, Money::from(1500));
    subscription.gateway_subscription_id = Some("sub_9".to_string());
    store.seed_subscription(subscription);

    let body = r#"{"id": "evt_200", "type": "invoice.payment_succeeded",
        "data": {"object": {"id": "in_200", "charge": "ch_200", "subscription": "sub_9",
            "billing_reason": "subscription_cycle"}}}"#;
    let (status, response) = post_webhook(store.clone(), "stripe", body, Some(&sign(body))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, MSG_RENEWAL);

    // A fresh completed donation was spawned for the renewal and linked to the subscription.
    assert_eq!(store.donation_count(), 1);
    let donation = store.donation(DonationId(1)).unwrap();
    assert_eq!(donation.status, DonationStatus::Completed);
    assert_eq!(donation.subscription_id, Some(SubscriptionId(9)));
    assert_eq!(donation.gateway_transaction_id.as_deref(), Some("ch_200"));
    let sub_logs = store.subscription_logs(SubscriptionId(9));
    assert_eq!(sub_logs, vec!["Renewal processed. Donation #1"]);
}
