//! Payment rail integration tests: card webhooks and mobile verification.

mod common;

use common::{bearer_token, HarnessOptions, TestHarness};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chrono::{Duration, Utc};
use coin_ledger_core::{PaymentProvider, PaymentRecord, PaymentStatus, UserId};
use coin_ledger_store::Store;

// ============================================================================
// Card rail (webhooks)
// ============================================================================

/// Seed a pending card payment the way a checkout call would.
fn seed_pending_card_payment(harness: &TestHarness, coins: i64) -> PaymentRecord {
    let payment = PaymentRecord::pending(
        harness.user_id,
        PaymentProvider::Card,
        coins,
        499,
        "USD".into(),
    );
    harness.store.put_payment(&payment).unwrap();
    payment
}

fn checkout_completed_event(payment: &PaymentRecord, event_id: &str) -> serde_json::Value {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_123",
                "payment_status": "paid",
                "payment_intent": "pi_test_456",
                "metadata": { "payment_id": payment.id.to_string() }
            }
        }
    })
}

#[tokio::test]
async fn webhook_delivered_twice_credits_once() {
    let harness = TestHarness::new();
    let payment = seed_pending_card_payment(&harness, 500);
    let event = checkout_completed_event(&payment, "evt_001");

    for _ in 0..2 {
        let response = harness
            .server
            .post("/webhooks/stripe")
            .text(serde_json::to_string(&event).unwrap())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["received"], true);
    }

    let account = harness
        .store
        .get_account(&harness.user_id)
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, 500);

    let stored = harness.store.get_payment(&payment.id).unwrap().unwrap();
    assert!(stored.is_completed());
    assert_eq!(
        stored.meta.checkout_session_id.as_deref(),
        Some("cs_test_123")
    );
}

#[tokio::test]
async fn session_and_intent_events_converge_on_one_credit() {
    let harness = TestHarness::new();
    let payment = seed_pending_card_payment(&harness, 100);

    harness
        .server
        .post("/webhooks/stripe")
        .text(serde_json::to_string(&checkout_completed_event(&payment, "evt_010")).unwrap())
        .await
        .assert_status_ok();

    // The intent event for the same payment lands behind the same guard.
    let intent_event = json!({
        "id": "evt_011",
        "type": "payment_intent.succeeded",
        "data": {
            "object": {
                "id": "pi_test_456",
                "metadata": { "payment_id": payment.id.to_string() }
            }
        }
    });
    harness
        .server
        .post("/webhooks/stripe")
        .text(serde_json::to_string(&intent_event).unwrap())
        .await
        .assert_status_ok();

    let account = harness
        .store
        .get_account(&harness.user_id)
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, 100);
}

#[tokio::test]
async fn unpaid_session_is_skipped() {
    let harness = TestHarness::new();
    let payment = seed_pending_card_payment(&harness, 500);

    let event = json!({
        "id": "evt_020",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_123",
                "payment_status": "unpaid",
                "metadata": { "payment_id": payment.id.to_string() }
            }
        }
    });

    harness
        .server
        .post("/webhooks/stripe")
        .text(serde_json::to_string(&event).unwrap())
        .await
        .assert_status_ok();

    assert!(harness.store.get_account(&harness.user_id).unwrap().is_none());
    let stored = harness.store.get_payment(&payment.id).unwrap().unwrap();
    assert!(!stored.is_completed());
}

#[tokio::test]
async fn malformed_webhook_body_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/webhooks/stripe")
        .text("not json")
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn checkout_without_card_rail_configured_is_unavailable() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/payments/checkout")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "coins": 500 }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "external_service_unavailable");
}

// ============================================================================
// Mobile rail (verification)
// ============================================================================

async fn play_harness(daily_limit_coins: i64) -> (TestHarness, MockServer) {
    let mock_server = MockServer::start().await;
    let harness = TestHarness::with_options(HarnessOptions {
        daily_limit_coins,
        play_base_url: Some(mock_server.uri()),
        stripe_webhook_secret: None,
    });
    (harness, mock_server)
}

async fn mock_purchased_token(server: &MockServer, product_id: &str, token: &str) {
    let base = format!("/applications/com.example.app/purchases/products/{product_id}/tokens");

    Mock::given(method("GET"))
        .and(path(format!("{base}/{token}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "purchaseState": 0,
            "consumptionState": 0,
            "acknowledgementState": 0,
            "orderId": "GPA.1234-5678",
            "purchaseTimeMillis": "1724500000000"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{base}/{token}:consume")))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{base}/{token}:acknowledge")))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test]
async fn play_verify_credits_and_replays_safely() {
    let (harness, mock_server) = play_harness(0).await;
    mock_purchased_token(&mock_server, "coins_500", "tok_alpha").await;

    let response = harness
        .server
        .post("/v1/payments/play/verify")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "product_id": "coins_500", "purchase_token": "tok_alpha" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 500);
    assert_eq!(body["coins"], 500);
    assert_eq!(body["already_fulfilled"], false);

    // Replaying the same token for the same user is a no-op.
    let response = harness
        .server
        .post("/v1/payments/play/verify")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "product_id": "coins_500", "purchase_token": "tok_alpha" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 500);
    assert_eq!(body["already_fulfilled"], true);
}

#[tokio::test]
async fn token_claimed_by_another_user_is_rejected() {
    let (harness, mock_server) = play_harness(0).await;
    mock_purchased_token(&mock_server, "coins_100", "tok_shared").await;

    harness
        .server
        .post("/v1/payments/play/verify")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "product_id": "coins_100", "purchase_token": "tok_shared" }))
        .await
        .assert_status_ok();

    let other = UserId::generate();
    let response = harness
        .server
        .post("/v1/payments/play/verify")
        .add_header("authorization", bearer_token(&other, false))
        .json(&json!({ "product_id": "coins_100", "purchase_token": "tok_shared" }))
        .await;

    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "already_claimed");
}

#[tokio::test]
async fn unpurchased_token_is_rejected() {
    let (harness, mock_server) = play_harness(0).await;

    Mock::given(method("GET"))
        .and(path(
            "/applications/com.example.app/purchases/products/coins_100/tokens/tok_pending",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "purchaseState": 1,
            "consumptionState": 0,
            "acknowledgementState": 0
        })))
        .mount(&mock_server)
        .await;

    let response = harness
        .server
        .post("/v1/payments/play/verify")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "product_id": "coins_100", "purchase_token": "tok_pending" }))
        .await;

    response.assert_status(axum::http::StatusCode::PRECONDITION_FAILED);
    assert!(harness.store.get_account(&harness.user_id).unwrap().is_none());
}

#[tokio::test]
async fn unknown_sku_rejected_before_verification() {
    let (harness, _mock_server) = play_harness(0).await;

    let response = harness
        .server
        .post("/v1/payments/play/verify")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "product_id": "gems_50", "purchase_token": "tok_x" }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn daily_cap_blocks_purchase_and_reports_headroom() {
    let (harness, mock_server) = play_harness(600).await;
    mock_purchased_token(&mock_server, "coins_500", "tok_first").await;

    // A purchase completed before today's UTC midnight is outside the cap
    // window: it must not eat into today's headroom.
    let mut yesterday = PaymentRecord::pending(
        harness.user_id,
        PaymentProvider::Play,
        500,
        499,
        "USD".into(),
    );
    yesterday.status = PaymentStatus::Completed;
    yesterday.completed_at = Some(Utc::now() - Duration::hours(30));
    harness.store.put_payment(&yesterday).unwrap();

    // With yesterday's 500 excluded, today's first 500-coin purchase fits
    // under the 600 cap.
    harness
        .server
        .post("/v1/payments/play/verify")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "product_id": "coins_500", "purchase_token": "tok_first" }))
        .await
        .assert_status_ok();

    // 600 cap, 500 earned: a second 500-coin purchase exceeds the headroom.
    // The cap fires before the verifier is ever called, so no mock is needed.
    let response = harness
        .server
        .post("/v1/payments/play/verify")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "product_id": "coins_500", "purchase_token": "tok_second" }))
        .await;

    response.assert_status_forbidden();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "daily_limit_reached");
    assert_eq!(body["error"]["details"]["remaining"], 100);
}
