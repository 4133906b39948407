//! Wallet transaction integration tests.

mod common;

use common::{bearer_token, TestHarness};
use serde_json::json;

use coin_ledger_core::{UserId, VipTier};
use coin_ledger_store::Store;

// ============================================================================
// Transactions
// ============================================================================

#[tokio::test]
async fn earn_then_overdraft_spend_leaves_balance_intact() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "type": "earn", "delta": 100, "note": "daily reward" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 100);

    // Spending more than the balance is rejected and writes nothing.
    let response = harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "type": "spend", "delta": -150 }))
        .await;

    response.assert_status(axum::http::StatusCode::PRECONDITION_FAILED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "failed_precondition");
    assert_eq!(body["error"]["details"]["balance"], 100);
    assert_eq!(body["error"]["details"]["required"], 150);

    let response = harness
        .server
        .get("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 100);
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/wallet/transactions")
        .json(&json!({ "type": "earn", "delta": 100 }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn unknown_entry_type_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "type": "steal", "delta": 100 }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn zero_delta_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "type": "earn", "delta": 0 }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn overflowing_delta_rejected_without_panicking() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "type": "earn", "delta": 1 }))
        .await
        .assert_status_ok();

    // A delta that would push the balance past i64::MAX is a client error,
    // not a crash, and leaves the balance untouched.
    let response = harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "type": "earn", "delta": i64::MAX }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_argument");

    let account = harness
        .store
        .get_account(&harness.user_id)
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, 1);
}

#[tokio::test]
async fn vip_upgrade_deducts_coins_but_never_downgrades() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "type": "earn", "delta": 1000 }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "type": "vip_upgrade", "delta": -500, "vip_tier": "gold" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 500);

    // Buying a lower tier still spends the coins but the tier holds.
    harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "type": "vip_upgrade", "delta": -100, "vip_tier": "bronze" }))
        .await
        .assert_status_ok();

    let account = harness
        .store
        .get_account(&harness.user_id)
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, 400);
    assert_eq!(account.vip_tier, VipTier::Gold);
}

#[tokio::test]
async fn vip_upgrade_without_tier_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "type": "vip_upgrade", "delta": -100 }))
        .await;

    response.assert_status_bad_request();
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn non_admin_cannot_target_another_user() {
    let harness = TestHarness::new();
    let other = UserId::generate();

    let response = harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", harness.auth_header())
        .json(&json!({
            "type": "earn",
            "delta": 100,
            "user_id": other.to_string()
        }))
        .await;

    response.assert_status_forbidden();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "permission_denied");
}

#[tokio::test]
async fn admin_can_credit_another_user() {
    let harness = TestHarness::new();
    let admin = UserId::generate();

    let response = harness
        .server
        .post("/v1/wallet/transactions")
        .add_header("authorization", bearer_token(&admin, true))
        .json(&json!({
            "type": "bonus",
            "delta": 250,
            "user_id": harness.user_id.to_string(),
            "note": "support credit"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 250);

    let account = harness
        .store
        .get_account(&harness.user_id)
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, 250);
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn history_is_newest_first_and_paginates() {
    let harness = TestHarness::new();

    for delta in [10, 20, 30] {
        harness
            .server
            .post("/v1/wallet/transactions")
            .add_header("authorization", harness.auth_header())
            .json(&json!({ "type": "earn", "delta": delta }))
            .await
            .assert_status_ok();
        // Distinct millisecond timestamps keep the ordering unambiguous.
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    let response = harness
        .server
        .get("/v1/wallet/transactions")
        .add_query_param("limit", "2")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 60);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["amount"], 30);
    assert_eq!(entries[1]["amount"], 20);
    assert_eq!(body["has_more"], true);

    let response = harness
        .server
        .get("/v1/wallet/transactions")
        .add_query_param("limit", "2")
        .add_query_param("offset", "2")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["amount"], 10);
    assert_eq!(body["has_more"], false);
}
